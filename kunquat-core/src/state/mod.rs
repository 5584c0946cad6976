pub mod album;
pub mod clipboard;
pub mod column;
pub mod grid;
pub mod grid_pattern;
pub mod history;
pub mod keys;
pub mod pattern;
pub mod selection;
pub mod session;
pub mod store;

pub use album::Album;
pub use clipboard::{Clipboard, ClipboardContents, ClipboardError};
pub use column::{Column, OverlayEntry, TriggerRows};
pub use grid::Grid;
pub use grid_pattern::{GridLine, GridPattern, GridPatternError, GridPatterns};
pub use history::{HistoryStep, SheetHistory};
pub use pattern::Pattern;
pub use selection::{Area, AreaKind, RectArea, RowSlice, Selection};
pub use session::{PlaybackCursor, SessionState};
pub use store::{Store, Transaction, Value};
