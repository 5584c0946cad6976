//! UI modes that are not part of the module data.

use std::collections::BTreeSet;

use kunquat_types::Tstamp;

use crate::config::SheetConfig;

/// Where the player currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    pub track: usize,
    pub system: usize,
    pub row_ts: Tstamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub edit_mode: bool,
    pub replace_mode: bool,
    pub grid_enabled: bool,
    pub follow_playback: bool,
    pub record_mode: bool,
    pub playing: bool,
    pub playback_cursor: Option<PlaybackCursor>,
    pub zoom: i32,
    pub zoom_range: (i32, i32),
    pub column_width: i32,
    pub column_width_range: (i32, i32),
    pub muted_channels: BTreeSet<usize>,
}

impl SessionState {
    pub fn new(config: &SheetConfig) -> Self {
        Self {
            edit_mode: true,
            replace_mode: false,
            grid_enabled: true,
            follow_playback: false,
            record_mode: false,
            playing: false,
            playback_cursor: None,
            zoom: 0,
            zoom_range: (config.zoom_min, config.zoom_max),
            column_width: 0,
            column_width_range: (config.col_width_min, config.col_width_max),
            muted_channels: BTreeSet::new(),
        }
    }

    /// The view tracks the player instead of the edit cursor.
    pub fn is_following_playback(&self) -> bool {
        self.follow_playback && !self.record_mode
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(&SheetConfig::default())
    }
}
