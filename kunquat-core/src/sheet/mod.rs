//! Editing front of the sheet: the edit manager and the small editors built
//! on it.

mod gesture;
pub mod grid_editor;
pub mod length_editor;
mod manager;
pub mod toolbar;

pub use gesture::Gesture;
pub use grid_editor::GridEditor;
pub use length_editor::LengthEditor;
pub use manager::SheetManager;
pub use toolbar::ToolbarState;
