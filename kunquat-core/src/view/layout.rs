//! Vertical placement of pattern instances.
//!
//! All systems of all tracks are stacked top to bottom in album order. Each
//! instance takes the pixel height of its pattern plus one pixel for the
//! end line, so the pattern end and the next instance's start are distinct
//! cursor rows.

use kunquat_types::{PatInstRef, Tstamp};

use crate::render::geometry::{get_px_from_tstamp, get_tstamp_from_px};
use crate::state::{Album, Pattern, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub track: usize,
    pub system: usize,
    pub pinst: PatInstRef,
    pub length: Tstamp,
    pub start_px: i64,
    pub height_px: i64,
}

impl LayoutEntry {
    pub fn stop_px(&self) -> i64 {
        self.start_px + self.height_px
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    entries: Vec<LayoutEntry>,
    px_per_beat: i64,
}

impl SheetLayout {
    pub fn build(store: &Store, px_per_beat: i64) -> Self {
        let mut entries = Vec::new();
        let mut y = 0;
        for (track, system, pinst) in Album::new(store).placements() {
            let length = Pattern::new(store, pinst.pat_num).length();
            let height_px = get_px_from_tstamp(length, px_per_beat) + 1;
            entries.push(LayoutEntry {
                track,
                system,
                pinst,
                length,
                start_px: y,
                height_px,
            });
            y += height_px;
        }
        Self {
            entries,
            px_per_beat,
        }
    }

    pub fn px_per_beat(&self) -> i64 {
        self.px_per_beat
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn total_height(&self) -> i64 {
        self.entries.last().map_or(0, |e| e.stop_px())
    }

    fn index_of(&self, track: usize, system: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.track == track && e.system == system)
    }

    pub fn entry(&self, track: usize, system: usize) -> Option<&LayoutEntry> {
        self.index_of(track, system).map(|i| &self.entries[i])
    }

    pub fn prev_entry(&self, track: usize, system: usize) -> Option<&LayoutEntry> {
        let i = self.index_of(track, system)?;
        i.checked_sub(1).map(|i| &self.entries[i])
    }

    pub fn next_entry(&self, track: usize, system: usize) -> Option<&LayoutEntry> {
        let i = self.index_of(track, system)?;
        self.entries.get(i + 1)
    }

    /// Instance covering absolute pixel row `y`.
    pub fn entry_at_y(&self, y: i64) -> Option<&LayoutEntry> {
        let i = self.entries.partition_point(|e| e.stop_px() <= y);
        self.entries.get(i).filter(|e| e.start_px <= y)
    }

    /// Absolute pixel row of `ts` inside an instance.
    pub fn y_of(&self, track: usize, system: usize, ts: Tstamp) -> Option<i64> {
        self.entry(track, system)
            .map(|e| e.start_px + get_px_from_tstamp(ts, self.px_per_beat))
    }

    /// Instance and pattern time at absolute pixel row `y`, clamped to the
    /// pattern length.
    pub fn tstamp_at_y(&self, y: i64) -> Option<(&LayoutEntry, Tstamp)> {
        let entry = self.entry_at_y(y)?;
        let ts = get_tstamp_from_px(y - entry.start_px, self.px_per_beat);
        Some((entry, ts.min(entry.length)))
    }
}
