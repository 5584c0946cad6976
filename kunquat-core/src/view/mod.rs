//! Interactive sheet view: layout of pattern instances, cursor navigation,
//! hit-testing, key bindings and trigger text entry.

mod controller;
pub mod field_edit;
pub mod hit_test;
pub mod keys;
pub mod layout;
pub mod motion;

pub use controller::View;
pub use field_edit::{EntryOutcome, EntryStage, TriggerEntry};
pub use keys::{KeyCode, KeyPress, Keymap, Modifiers, SheetCommand};
pub use layout::{LayoutEntry, SheetLayout};
pub use motion::{CursorMotion, Direction, Motion};
