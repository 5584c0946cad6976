//! Sheet edit history.
//!
//! A step records, per store key, the value before its first edit and the
//! value after its latest edit, together with the cursor location and the
//! pattern instance the cursor was in. Steps stay open while a gesture is
//! running and close on [`SheetHistory::commit`].

use std::collections::{BTreeMap, VecDeque};

use kunquat_types::{PatInstRef, Signal, SignalSet, TriggerPosition};

use super::album::Album;
use super::keys::{self, StoreKey};
use super::store::{Store, Transaction, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStep {
    changes: BTreeMap<String, (Option<Value>, Option<Value>)>,
    location: Option<TriggerPosition>,
    pinst: Option<PatInstRef>,
}

impl HistoryStep {
    fn new(location: Option<TriggerPosition>, pinst: Option<PatInstRef>) -> Self {
        Self {
            changes: BTreeMap::new(),
            location,
            pinst,
        }
    }

    /// Cursor location before the step, if one was recorded.
    pub fn location(&self) -> Option<TriggerPosition> {
        self.location
    }

    pub fn pattern_instance(&self) -> Option<PatInstRef> {
        self.pinst
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// True when every recorded key ended up at its old value.
    pub fn is_noop(&self) -> bool {
        self.changes.values().all(|(old, new)| old == new)
    }

    pub fn touches_pattern(&self, pat_num: usize) -> bool {
        let prefix = keys::pattern_prefix(pat_num);
        self.changes.keys().any(|k| k.starts_with(&prefix))
    }

    fn record(&mut self, store: &Store, transaction: &Transaction) {
        for (key, new) in transaction {
            let old = store.get(key).cloned();
            self.changes
                .entry(key.clone())
                .and_modify(|(_, n)| *n = new.clone())
                .or_insert((old, new.clone()));
        }
    }

    pub fn apply_new_data(&self, store: &mut Store) {
        for (key, (_, new)) in &self.changes {
            store.set(key, new.clone());
        }
    }

    pub fn apply_old_data(&self, store: &mut Store) {
        for (key, (old, _)) in &self.changes {
            store.set(key, old.clone());
        }
    }

    pub fn signals(&self, store: &Store) -> SignalSet {
        signals_for_keys(store, self.keys())
    }
}

/// Update signals implied by edits to `keys`.
pub fn signals_for_keys<'a>(store: &Store, keys: impl IntoIterator<Item = &'a str>) -> SignalSet {
    let album = Album::new(store);
    let mut signals = SignalSet::new();
    for key in keys {
        match keys::parse_key(key) {
            Some(StoreKey::ColumnTriggers(pat_num, col_num)) => {
                signals.insert(Signal::ColumnUpdated);
                for (track, system) in album.pattern_locations(pat_num) {
                    signals.insert(Signal::Column {
                        track,
                        system,
                        col_num,
                    });
                }
            }
            Some(StoreKey::OverlayGrids(..)) | Some(StoreKey::BaseGrid(_)) => {
                signals.insert(Signal::Grid);
            }
            Some(StoreKey::PatternLength(_)) => {
                signals.insert(Signal::PatternLength);
            }
            Some(StoreKey::GridPatterns) => {
                signals.insert(Signal::GridPatternModified);
            }
            Some(StoreKey::AlbumTracks)
            | Some(StoreKey::OrderList(_))
            | Some(StoreKey::InstanceManifest(..)) => {
                signals.insert(Signal::OrderList);
            }
            Some(_) => {
                signals.insert(Signal::Module);
            }
            None => {
                log::debug!(target: "history", "no signal for key {}", key);
            }
        }
    }
    signals
}

pub struct SheetHistory {
    past: VecDeque<HistoryStep>,
    future: Vec<HistoryStep>,
    current: Option<HistoryStep>,
    max_depth: usize,
}

impl SheetHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            current: None,
            max_depth: max_depth.max(1),
        }
    }

    /// Record `transaction` against the current store contents. Must be
    /// called before the transaction is applied.
    pub fn add_step(
        &mut self,
        store: &Store,
        transaction: &Transaction,
        location: Option<TriggerPosition>,
        pinst: Option<PatInstRef>,
        commit: bool,
    ) {
        let step = self
            .current
            .get_or_insert_with(|| HistoryStep::new(location, pinst));
        if step.location.is_none() && location.is_some() {
            step.location = location;
            step.pinst = pinst;
        }
        step.record(store, transaction);
        self.future.clear();
        if commit {
            self.commit();
        }
    }

    pub fn has_open_step(&self) -> bool {
        self.current.is_some()
    }

    /// Close the open step. Steps that ended up changing nothing are dropped.
    pub fn commit(&mut self) {
        let Some(step) = self.current.take() else {
            return;
        };
        if step.is_noop() {
            log::trace!(target: "history", "dropping empty step");
            return;
        }
        if self.past.len() >= self.max_depth {
            self.past.pop_front();
        }
        self.past.push_back(step);
    }

    /// Revert and discard the open step.
    pub fn rollback_open_step(&mut self, store: &mut Store) -> Option<HistoryStep> {
        let step = self.current.take()?;
        step.apply_old_data(store);
        Some(step)
    }

    pub fn undo(&mut self, store: &mut Store) -> Option<&HistoryStep> {
        self.commit();
        let step = self.past.pop_back()?;
        step.apply_old_data(store);
        self.future.push(step);
        self.future.last()
    }

    pub fn redo(&mut self, store: &mut Store) -> Option<&HistoryStep> {
        self.commit();
        let step = self.future.pop()?;
        step.apply_new_data(store);
        if self.past.len() >= self.max_depth {
            self.past.pop_front();
        }
        self.past.push_back(step);
        self.past.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty() || self.current.as_ref().is_some_and(|s| !s.is_noop())
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Forget every step that edits keys of `pat_num`.
    pub fn remove_pattern_changes(&mut self, pat_num: usize) {
        self.past.retain(|s| !s.touches_pattern(pat_num));
        self.future.retain(|s| !s.touches_pattern(pat_num));
        if self.current.as_ref().is_some_and(|s| s.touches_pattern(pat_num)) {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.current = None;
    }
}
