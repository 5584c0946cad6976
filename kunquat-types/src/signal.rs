//! Typed update signals.
//!
//! Subscribers receive a [`SignalSet`] once per update round. The stable
//! string names are kept for logging and for front-ends that still dispatch
//! on names.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Signal {
    Module,
    OrderList,
    PatternLength,
    Grid,
    Selection,
    SheetUndo,
    SheetRedo,
    SheetZoom,
    SheetZoomRange,
    SheetColumnWidth,
    /// Some column changed; always accompanied by per-column signals.
    ColumnUpdated,
    Column {
        track: usize,
        system: usize,
        col_num: usize,
    },
    GridPatternList,
    GridPatternModified,
    GridPatternSelection,
    GridPatternLineSelection,
    EditMode,
    ReplaceMode,
    ChannelMute,
    FollowPlayback,
    RecordMode,
    StyleChanged,
    /// Notation or hit names were renamed.
    Notation,
    PlaybackPosition,
}

pub type SignalSet = BTreeSet<Signal>;

impl Signal {
    pub fn name(&self) -> String {
        let name = match self {
            Signal::Module => "signal_module",
            Signal::OrderList => "signal_order_list",
            Signal::PatternLength => "signal_pattern_length",
            Signal::Grid => "signal_grid",
            Signal::Selection => "signal_selection",
            Signal::SheetUndo => "signal_sheet_undo",
            Signal::SheetRedo => "signal_sheet_redo",
            Signal::SheetZoom => "signal_sheet_zoom",
            Signal::SheetZoomRange => "signal_sheet_zoom_range",
            Signal::SheetColumnWidth => "signal_sheet_column_width",
            Signal::ColumnUpdated => "signal_column_updated",
            Signal::Column {
                track,
                system,
                col_num,
            } => return format!("signal_column_{}_{}_{}", track, system, col_num),
            Signal::GridPatternList => "signal_grid_pattern_list",
            Signal::GridPatternModified => "signal_grid_pattern_modified",
            Signal::GridPatternSelection => "signal_grid_pattern_selection",
            Signal::GridPatternLineSelection => "signal_grid_pattern_line_selection",
            Signal::EditMode => "signal_edit_mode",
            Signal::ReplaceMode => "signal_replace_mode",
            Signal::ChannelMute => "signal_channel_mute",
            Signal::FollowPlayback => "signal_follow_playback",
            Signal::RecordMode => "signal_record_mode",
            Signal::StyleChanged => "signal_style_changed",
            Signal::Notation => "signal_notation",
            Signal::PlaybackPosition => "signal_playback_position",
        };
        name.to_string()
    }

    /// Signals whose arrival invalidates every cached column pixmap.
    pub fn flushes_all_columns(&self) -> bool {
        matches!(
            self,
            Signal::Module
                | Signal::OrderList
                | Signal::PatternLength
                | Signal::Grid
                | Signal::GridPatternModified
                | Signal::SheetZoom
                | Signal::SheetColumnWidth
                | Signal::StyleChanged
        )
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
