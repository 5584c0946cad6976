//! # kunquat-core
//!
//! Sheet engine of the Kunquat editor: the pattern/trigger data model on a
//! flat key/value store, edit and undo machinery, grid snapping, the
//! clipboard codec, pixmap caches, and the interactive sheet view.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kunquat_core::config::Config;
//! use kunquat_core::sheet::SheetManager;
//! use kunquat_core::view::{KeyCode, KeyPress, View};
//! use kunquat_core::render::Pixmap;
//!
//! // 1. Load settings and wrap the module store in a manager
//! let config = Config::load();
//! let mut manager = SheetManager::with_store(store, config.sheet());
//!
//! // 2. Create the view and give it a viewport
//! let mut view = View::new(&manager, config.colours());
//! view.resize(&manager, 800, 600);
//!
//! // 3. Feed input; edits go through the manager's history
//! view.handle_key(&mut manager, KeyPress::plain(KeyCode::Down));
//!
//! // 4. Deliver signals, then paint
//! let signals = manager.perform_updates();
//! view.handle_signals(&manager, &signals);
//! let mut frame = Pixmap::new(800, 600);
//! view.paint(&manager, &mut frame);
//! ```
//!
//! ## Module Overview
//!
//! - [`state`]: store, album/pattern/column views, grid patterns, selection,
//!   sheet history, clipboard codec, session modes
//! - [`sheet`]: `SheetManager` (all edits), gestures, chord mode, and the
//!   toolbar, length and grid editors
//! - [`render`]: pixel geometry, pixmaps, trigger row images, column and
//!   ruler caches
//! - [`view`]: layout, cursor motion, hit-testing, key map, text entry, `View`
//! - [`playback`]: playback position observer fed from the audio thread
//! - [`config`]: TOML settings with embedded defaults
//! - [`updater`]: signal fan-out

pub mod config;
pub mod error;
pub mod playback;
pub mod render;
pub mod sheet;
pub mod state;
pub mod updater;
pub mod view;

pub use config::{Colours, Config, SheetConfig};
pub use error::{SheetError, SheetResult};
pub use playback::{PlaybackEvent, PlaybackFeed, PlaybackMonitor};
pub use sheet::SheetManager;
pub use state::{ClipboardError, GridPatternError, Store};
pub use updater::Updater;
pub use view::View;
