//! Enabled/checked state of the sheet toolbar actions.

use kunquat_types::{Signal, SignalSet};

use super::manager::SheetManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolbarState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub can_cut: bool,
    pub can_copy: bool,
    pub can_paste: bool,
    pub can_delete: bool,
    pub can_convert_trigger: bool,
    pub edit_mode: bool,
    pub replace_mode: bool,
    pub grid_enabled: bool,
    pub follow_playback: bool,
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
    pub can_widen: bool,
    pub can_narrow: bool,
}

impl ToolbarState {
    pub fn from_manager(manager: &SheetManager) -> Self {
        let session = manager.session();
        let has_area = manager.selection().has_area();
        let (zoom_min, zoom_max) = manager.zoom_range();
        let (width_min, width_max) = manager.column_width_range();
        Self {
            can_undo: manager.can_undo(),
            can_redo: manager.can_redo(),
            can_cut: has_area && session.edit_mode,
            can_copy: has_area,
            can_paste: !manager.clipboard().is_empty() && session.edit_mode,
            can_delete: session.edit_mode && (has_area || manager.is_at_trigger()),
            can_convert_trigger: session.edit_mode && manager.is_at_convertible_set_or_slide_trigger(),
            edit_mode: session.edit_mode,
            replace_mode: session.replace_mode,
            grid_enabled: session.grid_enabled,
            follow_playback: session.follow_playback,
            can_zoom_in: manager.zoom() < zoom_max,
            can_zoom_out: manager.zoom() > zoom_min,
            can_widen: manager.column_width() < width_max,
            can_narrow: manager.column_width() > width_min,
        }
    }

    /// Whether a refresh is due after `signals`.
    pub fn is_affected_by(signals: &SignalSet) -> bool {
        signals.iter().any(|s| {
            matches!(
                s,
                Signal::Selection
                    | Signal::SheetUndo
                    | Signal::SheetRedo
                    | Signal::SheetZoom
                    | Signal::SheetZoomRange
                    | Signal::SheetColumnWidth
                    | Signal::ColumnUpdated
                    | Signal::EditMode
                    | Signal::ReplaceMode
                    | Signal::Grid
                    | Signal::FollowPlayback
                    | Signal::RecordMode
            )
        })
    }
}
