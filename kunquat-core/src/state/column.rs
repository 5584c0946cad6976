//! One column of a pattern: trigger rows and overlay grid regions.
//!
//! The stored form is a flat list of `[[beats, rem], [type, argument]]`
//! sorted by time; in memory it is an ordered map from time to a non-empty
//! trigger list. Every `edit_*` method leaves `self` untouched and returns
//! the transaction that would produce the edited column, or an empty
//! transaction when the edit changes nothing.

use std::collections::BTreeMap;

use kunquat_types::{Trigger, Tstamp};

use super::keys;
use super::pattern::Pattern;
use super::store::{encode, Store, Transaction};

pub type TriggerRows = BTreeMap<Tstamp, Vec<Trigger>>;

/// One overlay region start. `gp_id == None` selects the pattern's base grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    pub start: Tstamp,
    pub gp_id: Option<String>,
    pub offset: Tstamp,
}

impl OverlayEntry {
    pub fn base() -> Self {
        Self {
            start: Tstamp::ZERO,
            gp_id: None,
            offset: Tstamp::ZERO,
        }
    }

    /// Time from which grid cycles are counted. Base grid lines are anchored
    /// at the pattern start, overlay grid lines at the region start.
    pub fn anchor(&self) -> Tstamp {
        match self.gp_id {
            None => self.offset,
            Some(_) => self.start + self.offset,
        }
    }

    fn same_lines_as(&self, other: &OverlayEntry) -> bool {
        self.gp_id == other.gp_id && self.anchor() == other.anchor()
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pat_num: usize,
    col_num: usize,
    length: Tstamp,
    rows: TriggerRows,
    overlays: Vec<OverlayEntry>,
}

impl Column {
    pub fn load(store: &Store, pat_num: usize, col_num: usize) -> Self {
        let length = Pattern::new(store, pat_num).length();
        let flat = store
            .get_as::<Vec<(Tstamp, Trigger)>>(&keys::column_triggers(pat_num, col_num))
            .unwrap_or_default();
        let mut rows = TriggerRows::new();
        for (row_ts, trigger) in flat {
            rows.entry(row_ts).or_default().push(trigger);
        }

        let mut overlays: Vec<OverlayEntry> = store
            .get_as::<Vec<(Tstamp, Option<String>, Tstamp)>>(&keys::overlay_grids(
                pat_num, col_num,
            ))
            .unwrap_or_default()
            .into_iter()
            .map(|(start, gp_id, offset)| OverlayEntry {
                start,
                gp_id,
                offset,
            })
            .collect();
        overlays.sort_by_key(|e| e.start);
        overlays.dedup_by_key(|e| e.start);

        Self {
            pat_num,
            col_num,
            length,
            rows,
            overlays,
        }
    }

    /// Check the stored form of a column. Loading tolerates these faults;
    /// editing refuses to build on them.
    pub fn check_stored(store: &Store, pat_num: usize, col_num: usize) -> Result<(), String> {
        let key = keys::column_triggers(pat_num, col_num);
        if store.contains(&key) {
            let flat = store
                .get_as::<Vec<(Tstamp, Trigger)>>(&key)
                .ok_or_else(|| format!("{} is malformed", key))?;
            if flat.is_empty() {
                return Err(format!("{} holds an empty list", key));
            }
            if flat.windows(2).any(|w| w[1].0 < w[0].0) {
                return Err(format!("{} is not sorted by time", key));
            }
        }

        let key = keys::overlay_grids(pat_num, col_num);
        if store.contains(&key) {
            let starts: Vec<Tstamp> = store
                .get_as::<Vec<(Tstamp, Option<String>, Tstamp)>>(&key)
                .ok_or_else(|| format!("{} is malformed", key))?
                .into_iter()
                .map(|(start, _, _)| start)
                .collect();
            if starts.is_empty() {
                return Err(format!("{} holds an empty list", key));
            }
            if starts.windows(2).any(|w| w[1] <= w[0]) {
                return Err(format!("{} has unordered region starts", key));
            }
        }
        Ok(())
    }

    pub fn pat_num(&self) -> usize {
        self.pat_num
    }

    pub fn col_num(&self) -> usize {
        self.col_num
    }

    pub fn length(&self) -> Tstamp {
        self.length
    }

    pub fn rows(&self) -> &TriggerRows {
        &self.rows
    }

    pub fn trigger_row_positions(&self) -> Vec<Tstamp> {
        self.rows.keys().copied().collect()
    }

    /// Row times in `[start, stop)`.
    pub fn trigger_row_positions_in_range(&self, start: Tstamp, stop: Tstamp) -> Vec<Tstamp> {
        if stop <= start {
            return Vec::new();
        }
        self.rows.range(start..stop).map(|(ts, _)| *ts).collect()
    }

    pub fn has_trigger(&self, row_ts: Tstamp, index: usize) -> bool {
        index < self.trigger_count_at(row_ts)
    }

    pub fn has_trigger_row(&self, row_ts: Tstamp) -> bool {
        self.rows.contains_key(&row_ts)
    }

    pub fn trigger_count_at(&self, row_ts: Tstamp) -> usize {
        self.rows.get(&row_ts).map_or(0, Vec::len)
    }

    pub fn get_trigger(&self, row_ts: Tstamp, index: usize) -> Option<&Trigger> {
        self.rows.get(&row_ts)?.get(index)
    }

    pub fn row(&self, row_ts: Tstamp) -> &[Trigger] {
        self.rows.get(&row_ts).map_or(&[], Vec::as_slice)
    }

    /// Nearest row strictly before `ts`.
    pub fn prev_row(&self, ts: Tstamp) -> Option<Tstamp> {
        self.rows.range(..ts).next_back().map(|(t, _)| *t)
    }

    /// Nearest row strictly after `ts`.
    pub fn next_row(&self, ts: Tstamp) -> Option<Tstamp> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.rows
            .range((Excluded(ts), Unbounded))
            .next()
            .map(|(t, _)| *t)
    }

    pub fn contains_hits(&self) -> bool {
        self.rows.values().flatten().any(Trigger::is_hit)
    }

    /// Rows in `[start, stop)` shifted to start at zero.
    pub fn slice_rows(&self, start: Tstamp, stop: Tstamp) -> TriggerRows {
        if stop <= start {
            return TriggerRows::new();
        }
        self.rows
            .range(start..stop)
            .map(|(ts, list)| (*ts - start, list.clone()))
            .collect()
    }

    fn key(&self) -> String {
        keys::column_triggers(self.pat_num, self.col_num)
    }

    fn with_rows(&self, rows: TriggerRows) -> Transaction {
        let mut tr = Transaction::new();
        if rows == self.rows {
            return tr;
        }
        tr.insert(self.key(), encode_rows(&rows));
        tr
    }

    pub fn edit_insert_trigger(&self, row_ts: Tstamp, index: isize, trigger: Trigger) -> Transaction {
        let mut rows = self.rows.clone();
        let list = rows.entry(row_ts).or_default();
        let index = clamp_index(index, list.len());
        list.insert(index, trigger);
        self.with_rows(rows)
    }

    /// Overwrite the trigger at `index` in replace mode, insert otherwise.
    pub fn edit_replace_or_insert(
        &self,
        row_ts: Tstamp,
        index: isize,
        trigger: Trigger,
        replace: bool,
    ) -> Transaction {
        let count = self.trigger_count_at(row_ts);
        if replace && index >= 0 && (index as usize) < count {
            let mut rows = self.rows.clone();
            if let Some(list) = rows.get_mut(&row_ts) {
                list[index as usize] = trigger;
            }
            return self.with_rows(rows);
        }
        self.edit_insert_trigger(row_ts, index, trigger)
    }

    pub fn edit_remove_trigger(&self, row_ts: Tstamp, index: usize) -> Transaction {
        self.edit_remove_trigger_row_slice(row_ts, index, index.saturating_add(1))
    }

    /// Remove indices `[start, stop)` of one row.
    pub fn edit_remove_trigger_row_slice(&self, row_ts: Tstamp, start: usize, stop: usize) -> Transaction {
        let count = self.trigger_count_at(row_ts);
        let stop = stop.min(count);
        if start >= stop {
            return Transaction::new();
        }
        let mut rows = self.rows.clone();
        if let Some(list) = rows.get_mut(&row_ts) {
            list.drain(start..stop);
            if list.is_empty() {
                rows.remove(&row_ts);
            }
        }
        self.with_rows(rows)
    }

    /// Replace the whole row at `row_ts`. An empty list removes the row.
    pub fn edit_set_row(&self, row_ts: Tstamp, triggers: Vec<Trigger>) -> Transaction {
        let mut rows = self.rows.clone();
        if triggers.is_empty() {
            rows.remove(&row_ts);
        } else {
            rows.insert(row_ts, triggers);
        }
        self.with_rows(rows)
    }

    /// Remove all rows in `[start, stop)`.
    pub fn edit_remove_trigger_rows(&self, start: Tstamp, stop: Tstamp) -> Transaction {
        if stop <= start {
            return Transaction::new();
        }
        let mut rows = self.rows.clone();
        rows.retain(|ts, _| *ts < start || *ts >= stop);
        self.with_rows(rows)
    }

    /// Clear `[start, stop)` and insert `new_rows`, whose times are relative
    /// to `start`. Empty lists are skipped.
    pub fn edit_replace_trigger_rows(&self, start: Tstamp, stop: Tstamp, new_rows: &TriggerRows) -> Transaction {
        if stop <= start {
            return Transaction::new();
        }
        let mut rows = self.rows.clone();
        rows.retain(|ts, _| *ts < start || *ts >= stop);
        for (rel_ts, list) in new_rows {
            if list.is_empty() || rel_ts.is_negative() {
                continue;
            }
            let row_ts = start + *rel_ts;
            if row_ts >= stop {
                continue;
            }
            rows.insert(row_ts, list.clone());
        }
        self.with_rows(rows)
    }

    pub fn overlays(&self) -> &[OverlayEntry] {
        &self.overlays
    }

    pub fn has_overlay_grids(&self) -> bool {
        !self.overlays.is_empty()
    }

    /// Overlay entries in effect, with the implicit base entry at zero.
    fn effective_overlays(&self) -> Vec<OverlayEntry> {
        let mut out = Vec::with_capacity(self.overlays.len() + 1);
        if self.overlays.first().map_or(true, |e| e.start > Tstamp::ZERO) {
            out.push(OverlayEntry::base());
        }
        out.extend(self.overlays.iter().cloned());
        out
    }

    pub fn overlay_grid_info_at(&self, ts: Tstamp) -> OverlayEntry {
        self.overlays
            .iter()
            .rev()
            .find(|e| e.start <= ts)
            .cloned()
            .unwrap_or_else(OverlayEntry::base)
    }

    /// Half-open range of the overlay region covering `ts`.
    pub fn overlay_grid_range_at(&self, ts: Tstamp) -> (Tstamp, Tstamp) {
        let start = self.overlay_grid_info_at(ts).start;
        let stop = self
            .overlays
            .iter()
            .find(|e| e.start > ts)
            .map_or(self.length, |e| e.start);
        (start, stop.max(start))
    }

    /// Entries whose regions intersect `[start, stop)`, in time order.
    /// Each entry keeps its own region start, which may precede `start`.
    pub fn overlay_grid_info_slice(&self, start: Tstamp, stop: Tstamp) -> Vec<OverlayEntry> {
        if stop <= start {
            return Vec::new();
        }
        let entries = self.effective_overlays();
        let mut out = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            let part_stop = entries.get(i + 1).map_or(Tstamp::from_beats(i64::MAX / 2), |e| e.start);
            if entry.start < stop && part_stop > start {
                out.push(entry.clone());
            }
        }
        out
    }

    fn with_overlays(&self, overlays: Vec<OverlayEntry>) -> Transaction {
        let mut tr = Transaction::new();
        if overlays == self.overlays {
            return tr;
        }
        let key = keys::overlay_grids(self.pat_num, self.col_num);
        if overlays.is_empty() {
            tr.insert(key, None);
        } else {
            let raw: Vec<(Tstamp, Option<&str>, Tstamp)> = overlays
                .iter()
                .map(|e| (e.start, e.gp_id.as_deref(), e.offset))
                .collect();
            tr.insert(key, encode(&raw));
        }
        tr
    }

    /// Use `gp_id` with `offset` in `[start, stop)`. The grid in effect at
    /// `stop` continues unchanged from there.
    pub fn edit_set_overlay_grid(
        &self,
        start: Tstamp,
        stop: Tstamp,
        gp_id: Option<&str>,
        offset: Tstamp,
    ) -> Transaction {
        let start = start.max(Tstamp::ZERO);
        let stop = stop.min(self.length);
        if stop <= start {
            return Transaction::new();
        }

        let mut entries: Vec<OverlayEntry> = self
            .overlays
            .iter()
            .filter(|e| e.start < start)
            .cloned()
            .collect();
        entries.push(OverlayEntry {
            start,
            gp_id: gp_id.map(str::to_string),
            offset,
        });
        if stop < self.length {
            let cont = self.overlay_grid_info_at(stop);
            let offset = match cont.gp_id {
                Some(_) => cont.offset + cont.start - stop,
                None => cont.offset,
            };
            entries.push(OverlayEntry {
                start: stop,
                gp_id: cont.gp_id,
                offset,
            });
        }
        entries.extend(self.overlays.iter().filter(|e| e.start > stop).cloned());

        self.with_overlays(merge_redundant(entries))
    }

    pub fn edit_clear_overlay_grids(&self) -> Transaction {
        self.with_overlays(Vec::new())
    }
}

fn clamp_index(index: isize, count: usize) -> usize {
    if index < 0 {
        0
    } else {
        (index as usize).min(count)
    }
}

/// Drop entries that produce the same lines as the entry before them.
fn merge_redundant(entries: Vec<OverlayEntry>) -> Vec<OverlayEntry> {
    let mut out: Vec<OverlayEntry> = Vec::with_capacity(entries.len());
    let mut prev = OverlayEntry::base();
    for entry in entries {
        if entry.same_lines_as(&prev) {
            continue;
        }
        prev = entry.clone();
        out.push(entry);
    }
    out
}

fn encode_rows(rows: &TriggerRows) -> Option<serde_json::Value> {
    if rows.is_empty() {
        return None;
    }
    let flat: Vec<(&Tstamp, &Trigger)> = rows
        .iter()
        .flat_map(|(ts, list)| list.iter().map(move |t| (ts, t)))
        .collect();
    encode(&flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kunquat_types::ts;

    fn note(arg: &str) -> Trigger {
        Trigger::new("n+", Some(arg.to_string()))
    }

    fn edited(store: &mut Store, tr: Transaction) -> Column {
        store.apply(&tr);
        Column::load(store, 0, 0)
    }

    #[test]
    fn insert_clamps_index() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(&mut store, col.edit_insert_trigger(ts(1, 0), 5, note("0")));
        let col = edited(&mut store, col.edit_insert_trigger(ts(1, 0), 0, note("1")));
        let col = edited(&mut store, col.edit_insert_trigger(ts(1, 0), -3, note("2")));
        let col = edited(&mut store, col.edit_insert_trigger(ts(1, 0), 99, note("3")));
        let args: Vec<_> = col.row(ts(1, 0)).iter().map(|t| t.argument().unwrap()).collect();
        assert_eq!(args, vec!["2", "1", "0", "3"]);
    }

    #[test]
    fn stored_form_is_flat_and_sorted() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(&mut store, col.edit_insert_trigger(ts(2, 0), 0, note("0")));
        edited(&mut store, col.edit_insert_trigger(ts(1, 0), 0, Trigger::new("n-", None)));
        let value = store.get(&keys::column_triggers(0, 0)).unwrap();
        assert_eq!(
            value,
            &serde_json::json!([[[1, 0], ["n-", null]], [[2, 0], ["n+", "0"]]])
        );
    }

    #[test]
    fn removing_last_trigger_removes_row_and_key() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(&mut store, col.edit_insert_trigger(ts(1, 0), 0, note("0")));
        assert_eq!(col.trigger_row_positions(), vec![ts(1, 0)]);
        let col = edited(&mut store, col.edit_remove_trigger(ts(1, 0), 0));
        assert!(col.trigger_row_positions().is_empty());
        assert!(!store.contains(&keys::column_triggers(0, 0)));
    }

    #[test]
    fn removing_from_empty_row_is_empty_edit() {
        let store = Store::new();
        let col = Column::load(&store, 0, 0);
        assert!(col.edit_remove_trigger(ts(3, 0), 0).is_empty());
        assert!(col.edit_remove_trigger_row_slice(ts(3, 0), 0, 4).is_empty());
        assert!(col.edit_remove_trigger_rows(ts(4, 0), ts(2, 0)).is_empty());
    }

    #[test]
    fn replace_mode() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(&mut store, col.edit_insert_trigger(ts(0, 0), 0, note("0")));
        let col = edited(&mut store, col.edit_replace_or_insert(ts(0, 0), 0, note("5"), true));
        assert_eq!(col.trigger_count_at(ts(0, 0)), 1);
        assert_eq!(col.get_trigger(ts(0, 0), 0), Some(&note("5")));
        let col = edited(&mut store, col.edit_replace_or_insert(ts(0, 0), 0, note("6"), false));
        assert_eq!(col.trigger_count_at(ts(0, 0)), 2);
        let col = edited(&mut store, col.edit_replace_or_insert(ts(0, 0), 2, note("7"), true));
        assert_eq!(col.trigger_count_at(ts(0, 0)), 3);
    }

    #[test]
    fn replace_rows_shifts_relative_times() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(&mut store, col.edit_insert_trigger(ts(4, 0), 0, note("0")));
        let mut new_rows = TriggerRows::new();
        new_rows.insert(ts(1, 0), vec![note("9")]);
        new_rows.insert(ts(0, 5), Vec::new());
        let col = edited(&mut store, col.edit_replace_trigger_rows(ts(4, 0), ts(6, 0), &new_rows));
        assert_eq!(col.trigger_row_positions(), vec![ts(5, 0)]);
    }

    #[test]
    fn overlay_lookup() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(
            &mut store,
            col.edit_set_overlay_grid(ts(2, 0), ts(4, 0), Some("tri"), Tstamp::ZERO),
        );
        assert_eq!(col.overlay_grid_info_at(ts(1, 0)).gp_id, None);
        assert_eq!(col.overlay_grid_info_at(ts(2, 0)).gp_id.as_deref(), Some("tri"));
        assert_eq!(col.overlay_grid_info_at(ts(4, 0)).gp_id, None);
        assert_eq!(col.overlay_grid_range_at(ts(3, 0)), (ts(2, 0), ts(4, 0)));
        assert_eq!(col.overlay_grid_range_at(ts(5, 0)), (ts(4, 0), ts(16, 0)));

        let slice = col.overlay_grid_info_slice(ts(1, 0), ts(3, 0));
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].start, ts(0, 0));
        assert_eq!(slice[1].start, ts(2, 0));
    }

    #[test]
    fn overlay_restores_following_grid() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(
            &mut store,
            col.edit_set_overlay_grid(ts(0, 0), ts(8, 0), Some("a"), Tstamp::ZERO),
        );
        let col = edited(
            &mut store,
            col.edit_set_overlay_grid(ts(3, 0), ts(5, 0), Some("b"), Tstamp::ZERO),
        );
        let restored = col.overlay_grid_info_at(ts(5, 0));
        assert_eq!(restored.gp_id.as_deref(), Some("a"));
        assert_eq!(restored.anchor(), ts(0, 0));
        assert_eq!(col.overlay_grid_info_at(ts(9, 0)).gp_id, None);

        // Setting the region back to the original grid merges the entries.
        let col = edited(
            &mut store,
            col.edit_set_overlay_grid(ts(3, 0), ts(5, 0), Some("a"), ts(-3, 0)),
        );
        assert_eq!(col.overlays().len(), 2);
    }

    #[test]
    fn clearing_overlays_removes_key() {
        let mut store = Store::new();
        let col = Column::load(&store, 0, 0);
        let col = edited(
            &mut store,
            col.edit_set_overlay_grid(ts(1, 0), ts(2, 0), Some("x"), Tstamp::ZERO),
        );
        assert!(store.contains(&keys::overlay_grids(0, 0)));
        let col = edited(&mut store, col.edit_clear_overlay_grids());
        assert!(!col.has_overlay_grids());
        assert!(!store.contains(&keys::overlay_grids(0, 0)));
    }

    #[test]
    fn stored_faults_are_reported() {
        let key = keys::column_triggers(0, 0);
        let mut store = Store::new();
        assert!(Column::check_stored(&store, 0, 0).is_ok());

        store.set(&key, Some(serde_json::json!([])));
        assert!(Column::check_stored(&store, 0, 0)
            .unwrap_err()
            .contains("empty list"));

        store.set(
            &key,
            Some(serde_json::json!([[[2, 0], ["n+", "0"]], [[1, 0], ["n-", null]]])),
        );
        assert!(Column::check_stored(&store, 0, 0)
            .unwrap_err()
            .contains("not sorted"));

        let tr = Column::load(&store, 0, 0).edit_insert_trigger(ts(3, 0), 0, note("100"));
        store.apply(&tr);
        assert!(Column::check_stored(&store, 0, 0).is_ok());
    }
}
