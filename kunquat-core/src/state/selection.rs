//! Edit cursor and area selection.

use kunquat_types::limits::COLUMNS_MAX;
use kunquat_types::{TriggerPosition, Tstamp};

use super::album::Album;
use super::pattern::Pattern;
use super::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    /// Trigger indices within one row.
    RowSlice,
    /// Columns and a time range within one pattern instance.
    Rect,
}

/// Indices `[start, stop)` of the row at `row_ts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlice {
    pub track: usize,
    pub system: usize,
    pub col_num: usize,
    pub row_ts: Tstamp,
    pub start: usize,
    pub stop: usize,
}

/// Columns `[start_col, stop_col]` and times `[start_ts, stop_ts)`. An area
/// spanning columns of a single row covers that row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectArea {
    pub track: usize,
    pub system: usize,
    pub start_col: usize,
    pub stop_col: usize,
    pub start_ts: Tstamp,
    pub stop_ts: Tstamp,
}

impl RectArea {
    pub fn width(&self) -> usize {
        self.stop_col - self.start_col + 1
    }

    pub fn height(&self) -> Tstamp {
        self.stop_ts - self.start_ts
    }

    pub fn contains(&self, col_num: usize, row_ts: Tstamp) -> bool {
        (self.start_col..=self.stop_col).contains(&col_num)
            && row_ts >= self.start_ts
            && row_ts < self.stop_ts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub start: TriggerPosition,
    pub stop: TriggerPosition,
}

impl Area {
    pub fn kind(&self) -> AreaKind {
        if self.start.col_num == self.stop.col_num && self.start.row_ts == self.stop.row_ts {
            AreaKind::RowSlice
        } else {
            AreaKind::Rect
        }
    }

    pub fn row_slice(&self) -> Option<RowSlice> {
        if self.kind() != AreaKind::RowSlice {
            return None;
        }
        let (a, b) = (self.start.trigger_index, self.stop.trigger_index);
        Some(RowSlice {
            track: self.start.track,
            system: self.start.system,
            col_num: self.start.col_num,
            row_ts: self.start.row_ts,
            start: a.min(b),
            stop: a.max(b),
        })
    }

    pub fn rect(&self) -> Option<RectArea> {
        if self.kind() != AreaKind::Rect {
            return None;
        }
        Some(RectArea {
            track: self.start.track,
            system: self.start.system,
            start_col: self.start.col_num.min(self.stop.col_num),
            stop_col: self.start.col_num.max(self.stop.col_num),
            start_ts: self.start.row_ts.min(self.stop.row_ts),
            stop_ts: self
                .start
                .row_ts
                .max(self.stop.row_ts)
                .max(self.start.row_ts.min(self.stop.row_ts) + Tstamp::EPSILON),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    location: Option<TriggerPosition>,
    area: Option<Area>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self) -> TriggerPosition {
        self.location
            .unwrap_or_else(|| TriggerPosition::new(0, 0, 0, Tstamp::ZERO, 0))
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    /// Returns whether the location changed.
    pub fn set_location(&mut self, location: TriggerPosition) -> bool {
        let changed = self.location != Some(location);
        self.location = Some(location);
        changed
    }

    pub fn area(&self) -> Option<Area> {
        self.area
    }

    pub fn has_area(&self) -> bool {
        self.area.is_some()
    }

    pub fn has_trigger_row_slice(&self) -> bool {
        self.area.is_some_and(|a| a.kind() == AreaKind::RowSlice)
    }

    pub fn has_rect_area(&self) -> bool {
        self.area.is_some_and(|a| a.kind() == AreaKind::Rect)
    }

    pub fn row_slice(&self) -> Option<RowSlice> {
        self.area.and_then(|a| a.row_slice())
    }

    pub fn rect(&self) -> Option<RectArea> {
        self.area.and_then(|a| a.rect())
    }

    /// Set both corners. Corners in different pattern instances are refused.
    pub fn set_area(&mut self, start: TriggerPosition, stop: TriggerPosition) -> bool {
        if !start.same_system(&stop) {
            log::debug!(target: "selection", "refusing area across systems: {} .. {}", start, stop);
            return false;
        }
        let area = Some(Area { start, stop });
        let changed = self.area != area;
        self.area = area;
        changed
    }

    /// Move the stop corner to `location`, starting a new area from
    /// `anchor` when none exists.
    pub fn extend_area(&mut self, anchor: TriggerPosition, location: TriggerPosition) -> bool {
        let start = self.area.map_or(anchor, |a| a.start);
        self.set_area(start, location)
    }

    pub fn clear_area(&mut self) -> bool {
        self.area.take().is_some()
    }

    /// Clamp the cursor into the current album and drop areas whose pattern
    /// instance is gone. Returns whether anything changed.
    pub fn clamp(&mut self, store: &Store) -> bool {
        let before = (self.location, self.area);
        let album = Album::new(store);

        let mut loc = self.location();
        let placements = album.placements();
        match placements.first() {
            None => {
                loc = TriggerPosition::new(0, 0, 0, Tstamp::ZERO, 0);
            }
            Some(&(first_track, _, _)) => {
                if album.pattern_instance(loc.track, loc.system).is_none() {
                    let track = loc.track.min(album.track_count().saturating_sub(1));
                    let systems = album.system_count(track);
                    if systems > 0 {
                        loc.track = track;
                        loc.system = loc.system.min(systems - 1);
                    } else {
                        loc.track = first_track;
                        loc.system = 0;
                    }
                }
                if let Some(pinst) = album.pattern_instance(loc.track, loc.system) {
                    let pattern = Pattern::new(store, pinst.pat_num);
                    loc.col_num = loc.col_num.min(COLUMNS_MAX - 1);
                    loc.row_ts = loc.row_ts.clamp_to(Tstamp::ZERO, pattern.length());
                    let count = pattern.column(loc.col_num).trigger_count_at(loc.row_ts);
                    loc.trigger_index = loc.trigger_index.min(count);
                }
            }
        }
        if self.location.is_some() || !placements.is_empty() {
            self.location = Some(loc);
        }

        if let Some(area) = self.area {
            let stale = album
                .pattern_instance(area.start.track, area.start.system)
                .is_none();
            if stale {
                self.area = None;
            }
        }

        before != (self.location, self.area)
    }
}
