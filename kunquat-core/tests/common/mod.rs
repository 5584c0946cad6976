#![allow(dead_code)]
//! Fixture builders for kunquat-core integration tests.

use kunquat_core::config::{Colours, SheetConfig};
use kunquat_core::state::album::{order_list_transaction, tracks_transaction};
use kunquat_core::state::pattern::new_pattern_transaction;
use kunquat_core::state::{GridLine, GridPattern, GridPatterns, Pattern, Store};
use kunquat_core::{SheetManager, View};
use kunquat_types::{PatInstRef, Trigger, TriggerPosition, Tstamp};

/// Builds a store with patterns placed on tracks.
pub struct StoreBuilder {
    store: Store,
    songs: Vec<Vec<PatInstRef>>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            songs: Vec::new(),
        }
    }

    /// Add pattern `pat_num` with `instances` of the given length.
    pub fn pattern(mut self, pat_num: usize, instances: &[usize], length: Tstamp) -> Self {
        self.store
            .apply(&new_pattern_transaction(pat_num, instances, length));
        self
    }

    /// Add a track playing `order` in sequence.
    pub fn track(mut self, order: &[PatInstRef]) -> Self {
        self.songs.push(order.to_vec());
        self
    }

    pub fn trigger(mut self, pat_num: usize, col_num: usize, row_ts: Tstamp, trigger: Trigger) -> Self {
        let column = Pattern::new(&self.store, pat_num).column(col_num);
        let count = column.trigger_count_at(row_ts) as isize;
        let tr = column.edit_insert_trigger(row_ts, count, trigger);
        self.store.apply(&tr);
        self
    }

    pub fn grid_pattern(mut self, gp_id: &str, gp: &GridPattern) -> Self {
        let tr = GridPatterns::new(&self.store)
            .edit_set(gp_id, gp)
            .expect("valid grid pattern");
        self.store.apply(&tr);
        self
    }

    pub fn base_grid(mut self, pat_num: usize, gp_id: &str) -> Self {
        let tr = Pattern::new(&self.store, pat_num).edit_set_base_grid_pattern_id(Some(gp_id));
        self.store.apply(&tr);
        self
    }

    pub fn build(mut self) -> Store {
        let songs: Vec<usize> = (0..self.songs.len()).collect();
        self.store.apply(&tracks_transaction(&songs));
        for (song, order) in self.songs.iter().enumerate() {
            self.store.apply(&order_list_transaction(song, order));
        }
        self.store
    }

    pub fn manager(self) -> SheetManager {
        SheetManager::with_store(self.build(), SheetConfig::default())
    }
}

/// One track with one instance of pattern 0 of `beats` beats.
pub fn single_pattern(beats: i64) -> StoreBuilder {
    StoreBuilder::new()
        .pattern(0, &[0], Tstamp::from_beats(beats))
        .track(&[PatInstRef::new(0, 0)])
}

/// A grid pattern with one line per beat, style 0 on the first.
pub fn beat_grid(beats: i64) -> GridPattern {
    let lines = (0..beats)
        .map(|b| GridLine {
            ts: Tstamp::from_beats(b),
            style: if b == 0 { 0 } else { 1 },
        })
        .collect();
    GridPattern {
        name: "Beats".to_string(),
        length: Tstamp::from_beats(beats),
        lines,
        ..GridPattern::default()
    }
}

pub fn pos(col_num: usize, row_ts: Tstamp, trigger_index: usize) -> TriggerPosition {
    TriggerPosition::new(0, 0, col_num, row_ts, trigger_index)
}

pub fn note_on(cents: &str) -> Trigger {
    Trigger::new("n+", Some(cents.to_string()))
}

pub fn note_off() -> Trigger {
    Trigger::new("n-", None)
}

pub fn view(manager: &SheetManager, width: u32, height: u32) -> View {
    let mut view = View::new(manager, Colours::default());
    view.resize(manager, width, height);
    view
}

pub fn row(manager: &SheetManager, col_num: usize, row_ts: Tstamp) -> Vec<Trigger> {
    manager
        .column_at(0, 0, col_num)
        .map(|c| c.row(row_ts).to_vec())
        .unwrap_or_default()
}
