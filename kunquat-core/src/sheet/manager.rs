//! The sheet edit API.
//!
//! Every data edit funnels through [`SheetManager::add_transaction`]: the
//! transaction is recorded in the open history step, applied to the store,
//! and the implied update signals are queued on the updater. Subscribers
//! (renderer caches, toolbars) see the signals on the next
//! [`SheetManager::perform_updates`].

use kunquat_types::events::{self, SET_CONTROL};
use kunquat_types::limits::COLUMNS_MAX;
use kunquat_types::{PatInstRef, Signal, SignalSet, Trigger, TriggerPosition, Tstamp};

use crate::config::SheetConfig;
use crate::error::{SheetError, SheetResult};
use crate::render::geometry;
use crate::state::clipboard::{self, Clipboard, ClipboardContents};
use crate::state::history::{signals_for_keys, HistoryStep};
use crate::state::keys::{self, StoreKey};
use crate::state::pattern::{self, Pattern};
use crate::state::selection::Area;
use crate::state::{
    Album, Column, Grid, SessionState, Selection, SheetHistory, Store, Transaction, TriggerRows,
};
use crate::updater::Updater;

use super::gesture::Gesture;

pub struct SheetManager {
    store: Store,
    history: SheetHistory,
    selection: Selection,
    session: SessionState,
    updater: Updater,
    grid: Grid,
    clipboard: Clipboard,
    config: SheetConfig,
    /// Active gestures plus chord mode; edits are not committed while > 0.
    deferred: usize,
    chord_start: Option<TriggerPosition>,
}

impl SheetManager {
    pub fn new(config: SheetConfig) -> Self {
        Self::with_store(Store::new(), config)
    }

    pub fn with_store(store: Store, config: SheetConfig) -> Self {
        let mut manager = Self {
            store,
            history: SheetHistory::new(config.history_max_steps),
            selection: Selection::new(),
            session: SessionState::new(&config),
            updater: Updater::new(),
            grid: Grid::new(),
            clipboard: Clipboard::default(),
            config,
            deferred: 0,
            chord_start: None,
        };
        manager.selection.clamp(&manager.store);
        manager
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn history(&self) -> &SheetHistory {
        &self.history
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn updater(&mut self) -> &mut Updater {
        &mut self.updater
    }

    pub fn signal(&mut self, signal: Signal) {
        self.updater.signal_update(signal);
    }

    /// Deliver queued signals to subscribers.
    pub fn perform_updates(&mut self) -> SignalSet {
        self.updater.perform_updates()
    }

    pub fn album(&self) -> Album<'_> {
        Album::new(&self.store)
    }

    // Location queries

    pub fn pattern_instance_at(&self, track: usize, system: usize) -> Option<PatInstRef> {
        self.album().pattern_instance(track, system)
    }

    pub fn current_pattern_instance(&self) -> Option<PatInstRef> {
        let loc = self.selection.location();
        self.pattern_instance_at(loc.track, loc.system)
    }

    pub fn pattern_length_at(&self, track: usize, system: usize) -> Option<Tstamp> {
        self.pattern_instance_at(track, system)
            .map(|pinst| Pattern::new(&self.store, pinst.pat_num).length())
    }

    pub fn column_at(&self, track: usize, system: usize, col_num: usize) -> Option<Column> {
        let pinst = self.pattern_instance_at(track, system)?;
        Some(Pattern::new(&self.store, pinst.pat_num).column(col_num))
    }

    pub fn current_column(&self) -> Option<Column> {
        let loc = self.selection.location();
        self.column_at(loc.track, loc.system, loc.col_num)
    }

    /// Refuse to edit on top of stored data that breaks an invariant.
    fn check_column(&self, track: usize, system: usize, col_num: usize) -> SheetResult {
        let fault = self
            .pattern_instance_at(track, system)
            .and_then(|pinst| Column::check_stored(&self.store, pinst.pat_num, col_num).err())
            .or_else(|| {
                self.album().duplicate_placement().map(|pinst| {
                    format!(
                        "pattern {} instance {} is placed twice",
                        pinst.pat_num, pinst.inst_num
                    )
                })
            });
        match fault {
            Some(msg) => {
                log::error!(target: "sheet", "invariant violated: {}", msg);
                Err(SheetError::InvariantViolation(msg))
            }
            None => Ok(()),
        }
    }

    /// Check every placed column of the album.
    pub fn check_invariants(&self) -> SheetResult {
        for (track, system, _) in self.album().placements() {
            for col_num in 0..COLUMNS_MAX {
                self.check_column(track, system, col_num)?;
            }
        }
        Ok(())
    }

    pub fn px_per_beat(&self) -> i64 {
        geometry::px_per_beat(&self.config, self.session.zoom)
    }

    /// Time covered by one trigger row at the current zoom.
    pub fn tr_height_ts(&self) -> Tstamp {
        geometry::tr_height_ts(&self.config, self.px_per_beat())
    }

    // Selection

    pub fn set_location(&mut self, location: TriggerPosition) {
        if self.selection.set_location(location) {
            self.signal(Signal::Selection);
        }
    }

    pub fn set_area(&mut self, start: TriggerPosition, stop: TriggerPosition) -> bool {
        let changed = self.selection.set_area(start, stop);
        if changed {
            self.signal(Signal::Selection);
        }
        changed
    }

    /// Move the cursor to `location`, extending the area from the previous
    /// cursor location. Moves into another pattern instance are refused.
    pub fn extend_area_to(&mut self, location: TriggerPosition) -> bool {
        let anchor = self.selection.location();
        let start = self.selection.area().map_or(anchor, |a| a.start);
        if !start.same_system(&location) {
            return false;
        }
        self.selection.extend_area(anchor, location);
        self.selection.set_location(location);
        self.signal(Signal::Selection);
        true
    }

    pub fn clear_area(&mut self) {
        if self.selection.clear_area() {
            self.signal(Signal::Selection);
        }
    }

    // Edit core

    /// Record and apply `transaction`.
    ///
    /// Keys whose value would not change are dropped first; an empty result
    /// opens no history step and returns `false`. With `commit == None` the
    /// step is committed unless a gesture or chord mode is active.
    pub fn add_transaction(
        &mut self,
        transaction: Transaction,
        add_location: bool,
        commit: Option<bool>,
    ) -> bool {
        let transaction: Transaction = transaction
            .into_iter()
            .filter(|(key, value)| self.store.get(key) != value.as_ref())
            .collect();
        if transaction.is_empty() {
            log::trace!(target: "sheet", "dropping empty edit");
            return false;
        }

        let location = add_location.then(|| self.selection.location());
        let pinst = self.current_pattern_instance();
        let commit = commit.unwrap_or(self.deferred == 0);
        self.history
            .add_step(&self.store, &transaction, location, pinst, commit);
        self.apply_and_signal(&transaction);
        true
    }

    /// Apply a transaction that is not part of sheet history.
    pub fn apply_untracked(&mut self, transaction: Transaction) {
        if transaction.is_empty() {
            return;
        }
        self.apply_and_signal(&transaction);
    }

    fn apply_and_signal(&mut self, transaction: &Transaction) {
        self.store.apply(transaction);
        let touches_grids = transaction
            .keys()
            .any(|k| keys::parse_key(k) == Some(StoreKey::GridPatterns));
        if touches_grids {
            self.grid.invalidate();
        }
        let signals = signals_for_keys(&self.store, transaction.keys().map(String::as_str));
        self.updater.signal_all(signals);
    }

    pub fn begin_gesture(&mut self) -> Gesture<'_> {
        Gesture::new(self)
    }

    pub(crate) fn push_deferral(&mut self) {
        self.deferred += 1;
    }

    pub(crate) fn pop_deferral(&mut self) {
        self.deferred = self.deferred.saturating_sub(1);
        if self.deferred == 0 {
            self.history.commit();
        }
    }

    pub fn is_deferring(&self) -> bool {
        self.deferred > 0
    }

    /// Close the open step unless a gesture is alive.
    pub fn commit_open_step(&mut self) {
        if self.deferred == 0 {
            self.history.commit();
        }
    }

    pub fn is_chord_mode(&self) -> bool {
        self.chord_start.is_some()
    }

    /// In chord mode each added trigger moves the cursor to the next column
    /// and all additions share one history step.
    pub fn set_chord_mode(&mut self, enabled: bool) {
        match (enabled, self.chord_start) {
            (true, None) => {
                self.chord_start = Some(self.selection.location());
                self.push_deferral();
            }
            (false, Some(start)) => {
                self.chord_start = None;
                self.pop_deferral();
                let count = self
                    .column_at(start.track, start.system, start.col_num)
                    .map_or(0, |c| c.trigger_count_at(start.row_ts));
                let index = (start.trigger_index + 1).min(count);
                self.set_location(start.with_trigger_index(index));
            }
            _ => {}
        }
    }

    // Trigger edits

    pub fn add_trigger(&mut self, trigger: Trigger) -> SheetResult {
        self.insert_trigger(trigger, None)
    }

    /// Add a trigger and leave its history step open.
    pub fn add_trigger_uncommitted(&mut self, trigger: Trigger) -> SheetResult {
        self.insert_trigger(trigger, Some(false))
    }

    fn insert_trigger(&mut self, trigger: Trigger, commit: Option<bool>) -> SheetResult {
        events::validate_trigger(trigger.trigger_type(), trigger.argument())?;
        let loc = self.selection.location();
        let Some(column) = self.column_at(loc.track, loc.system, loc.col_num) else {
            return Err(SheetError::ValidationRejected(
                "no pattern instance at cursor".into(),
            ));
        };
        self.check_column(loc.track, loc.system, loc.col_num)?;
        let index = loc.trigger_index as isize;
        let tr = if self.session.replace_mode {
            column.edit_replace_or_insert(loc.row_ts, index, trigger, true)
        } else {
            column.edit_insert_trigger(loc.row_ts, index, trigger)
        };
        self.add_transaction(tr, true, commit);
        let next = self.location_after_insert(loc);
        self.set_location(next);
        Ok(())
    }

    /// Replace the trigger under the cursor.
    pub fn replace_selected_trigger(&mut self, trigger: Trigger, commit: Option<bool>) -> SheetResult {
        events::validate_trigger(trigger.trigger_type(), trigger.argument())?;
        let loc = self.selection.location();
        let Some(column) = self.current_column() else {
            return Ok(());
        };
        if !column.has_trigger(loc.row_ts, loc.trigger_index) {
            return Ok(());
        }
        self.check_column(loc.track, loc.system, loc.col_num)?;
        let tr = column.edit_replace_or_insert(loc.row_ts, loc.trigger_index as isize, trigger, true);
        self.add_transaction(tr, true, commit);
        Ok(())
    }

    /// Overwrite the whole trigger row at `location`. The edit joins the
    /// open step when a gesture or chord mode is active.
    pub fn set_trigger_row(&mut self, location: TriggerPosition, triggers: Vec<Trigger>) -> bool {
        let Some(column) = self.column_at(location.track, location.system, location.col_num) else {
            return false;
        };
        let tr = column.edit_set_row(location.row_ts, triggers);
        self.add_transaction(tr, true, None)
    }

    /// Cursor position after adding a trigger at `loc`.
    pub(crate) fn location_after_insert(&self, loc: TriggerPosition) -> TriggerPosition {
        if self.is_chord_mode() && loc.col_num + 1 < COLUMNS_MAX {
            loc.with_col(loc.col_num + 1)
        } else {
            loc.with_trigger_index(loc.trigger_index + 1)
        }
    }

    /// Delete the area, or the trigger under the cursor.
    pub fn try_remove_trigger(&mut self) -> bool {
        if self.selection.has_area() {
            return self.try_remove_area();
        }
        let loc = self.selection.location();
        let Some(column) = self.current_column() else {
            return false;
        };
        let tr = column.edit_remove_trigger(loc.row_ts, loc.trigger_index);
        self.add_transaction(tr, true, None)
    }

    /// Remove the trigger before the cursor and step back onto its slot.
    pub fn try_remove_prev_trigger(&mut self) -> bool {
        let loc = self.selection.location();
        if loc.trigger_index == 0 {
            return false;
        }
        let Some(column) = self.current_column() else {
            return false;
        };
        let tr = column.edit_remove_trigger(loc.row_ts, loc.trigger_index - 1);
        let removed = self.add_transaction(tr, true, None);
        if removed {
            self.set_location(loc.with_trigger_index(loc.trigger_index - 1));
        }
        removed
    }

    fn area_removal(&self, area: &Area) -> Transaction {
        let mut tr = Transaction::new();
        if let Some(slice) = area.row_slice() {
            if let Some(column) = self.column_at(slice.track, slice.system, slice.col_num) {
                tr = column.edit_remove_trigger_row_slice(slice.row_ts, slice.start, slice.stop);
            }
        } else if let Some(rect) = area.rect() {
            for col_num in rect.start_col..=rect.stop_col.min(COLUMNS_MAX - 1) {
                if let Some(column) = self.column_at(rect.track, rect.system, col_num) {
                    tr.extend(column.edit_remove_trigger_rows(rect.start_ts, rect.stop_ts));
                }
            }
        }
        tr
    }

    pub fn try_remove_area(&mut self) -> bool {
        let Some(area) = self.selection.area() else {
            return false;
        };
        let tr = self.area_removal(&area);
        let removed = self.add_transaction(tr, true, None);
        if let Some(slice) = area.row_slice() {
            let loc = self.selection.location();
            if loc.same_row(&area.start) {
                self.set_location(loc.with_trigger_index(slice.start));
            }
        }
        self.clear_area();
        removed
    }

    /// Clipboard contents of the selected area.
    pub fn get_area_contents(&self) -> Option<ClipboardContents> {
        let area = self.selection.area()?;
        if let Some(slice) = area.row_slice() {
            let column = self.column_at(slice.track, slice.system, slice.col_num)?;
            let row = column.row(slice.row_ts);
            let stop = slice.stop.min(row.len());
            if slice.start >= stop {
                return None;
            }
            return Some(ClipboardContents::RowSlice(row[slice.start..stop].to_vec()));
        }
        let rect = area.rect()?;
        let columns: Vec<TriggerRows> = (rect.start_col..=rect.stop_col)
            .map(|col_num| {
                self.column_at(rect.track, rect.system, col_num)
                    .map(|c| c.slice_rows(rect.start_ts, rect.stop_ts))
                    .unwrap_or_default()
            })
            .collect();
        Some(ClipboardContents::Rect {
            width: rect.width(),
            height: rect.height(),
            columns,
        })
    }

    /// Serialize the selected area into the clipboard.
    pub fn copy_selected_area(&mut self) -> Option<String> {
        let contents = self.get_area_contents()?;
        match clipboard::serialize(&contents) {
            Ok(data) => {
                self.clipboard.set(data.clone());
                Some(data)
            }
            Err(e) => {
                log::error!(target: "sheet", "could not serialize area: {}", e);
                None
            }
        }
    }

    pub fn cut_selected_area(&mut self) -> Option<String> {
        let data = self.copy_selected_area()?;
        self.try_remove_area();
        Some(data)
    }

    pub fn paste_from_clipboard(&mut self) -> SheetResult {
        let Some(data) = self.clipboard.data().map(str::to_string) else {
            return Ok(());
        };
        self.paste(&data)
    }

    /// Paste a clipboard payload at the cursor. Invalid payloads are
    /// rejected before anything is recorded.
    pub fn paste(&mut self, data: &str) -> SheetResult {
        let contents = clipboard::deserialize(data)?;
        let loc = self.selection.location();
        let Some(pinst) = self.pattern_instance_at(loc.track, loc.system) else {
            return Ok(());
        };
        let pattern = Pattern::new(&self.store, pinst.pat_num);

        match contents {
            ClipboardContents::RowSlice(triggers) => {
                if triggers.is_empty() {
                    return Ok(());
                }
                let count = triggers.len();
                let (target, start, stop) = match self.selection.row_slice() {
                    Some(slice) => (
                        TriggerPosition::new(slice.track, slice.system, slice.col_num, slice.row_ts, 0),
                        slice.start,
                        slice.stop,
                    ),
                    None => (loc, loc.trigger_index, loc.trigger_index),
                };
                let Some(column) = self.column_at(target.track, target.system, target.col_num) else {
                    return Ok(());
                };
                self.check_column(target.track, target.system, target.col_num)?;
                let mut row = column.row(target.row_ts).to_vec();
                let stop = stop.min(row.len());
                let start = start.min(stop);
                let _replaced: Vec<Trigger> = row.splice(start..stop, triggers).collect();
                let tr = column.edit_set_row(target.row_ts, row);
                self.add_transaction(tr, true, None);
                self.clear_area();
                self.set_location(target.with_trigger_index(start + count));
            }
            ClipboardContents::Rect {
                width,
                height,
                columns,
            } => {
                let (start_col, start_ts) = match self.selection.rect() {
                    Some(rect) if rect.track == loc.track && rect.system == loc.system => {
                        (rect.start_col, rect.start_ts)
                    }
                    _ => (loc.col_num, loc.row_ts),
                };
                let stop_ts = (start_ts + height).min(pattern.length() + Tstamp::EPSILON);
                let mut tr = Transaction::new();
                for (rel_col, rows) in columns.iter().enumerate().take(width) {
                    let col_num = start_col + rel_col;
                    if col_num >= COLUMNS_MAX {
                        break;
                    }
                    self.check_column(loc.track, loc.system, col_num)?;
                    tr.extend(pattern.column(col_num).edit_replace_trigger_rows(start_ts, stop_ts, rows));
                }
                self.add_transaction(tr, true, None);
            }
        }
        Ok(())
    }

    // Cursor queries

    pub fn is_at_trigger(&self) -> bool {
        let loc = self.selection.location();
        self.current_column()
            .is_some_and(|c| c.has_trigger(loc.row_ts, loc.trigger_index))
    }

    pub fn is_at_trigger_row(&self) -> bool {
        let loc = self.selection.location();
        self.current_column()
            .is_some_and(|c| c.has_trigger_row(loc.row_ts))
    }

    pub fn get_selected_trigger(&self) -> Option<Trigger> {
        let loc = self.selection.location();
        let column = self.current_column()?;
        column
            .get_trigger(loc.row_ts, loc.trigger_index)
            .map(|t| t.clone().with_location(loc))
    }

    pub fn is_at_convertible_set_or_slide_trigger(&self) -> bool {
        self.get_selected_trigger()
            .is_some_and(|t| events::set_slide_counterpart(t.trigger_type()).is_some())
    }

    /// Swap the trigger under the cursor between its set and slide forms.
    pub fn convert_set_or_slide_trigger(&mut self) -> SheetResult {
        let Some(trigger) = self.get_selected_trigger() else {
            return Ok(());
        };
        let Some(counterpart) = events::set_slide_counterpart(trigger.trigger_type()) else {
            return Ok(());
        };
        self.replace_selected_trigger(trigger.with_type(counterpart), None)
    }

    /// The control id set by the closest preceding `.a` trigger in the
    /// cursor column, or `control_00`.
    pub fn get_inferred_active_control_id_at_location(&self) -> String {
        let loc = self.selection.location();
        let default = "control_00".to_string();
        let Some(column) = self.current_column() else {
            return default;
        };
        let current = column.row(loc.row_ts);
        let before_cursor = current[..loc.trigger_index.min(current.len())].iter().rev();
        let earlier_rows = column
            .rows()
            .range(..loc.row_ts)
            .rev()
            .flat_map(|(_, list)| list.iter().rev());
        before_cursor
            .chain(earlier_rows)
            .find(|t| t.trigger_type() == SET_CONTROL)
            .and_then(|t| t.argument().and_then(events::parse_int))
            .map_or(default, |n| format!("control_{:02x}", n.max(0)))
    }

    // Zoom and column width

    pub fn zoom(&self) -> i32 {
        self.session.zoom
    }

    pub fn zoom_range(&self) -> (i32, i32) {
        self.session.zoom_range
    }

    pub fn set_zoom(&mut self, level: i32) -> bool {
        let (min, max) = self.session.zoom_range;
        let level = level.clamp(min, max);
        if level == self.session.zoom {
            return false;
        }
        self.session.zoom = level;
        self.signal(Signal::SheetZoom);
        true
    }

    pub fn set_zoom_range(&mut self, min: i32, max: i32) {
        let range = (min.min(max), min.max(max));
        if range != self.session.zoom_range {
            self.session.zoom_range = range;
            self.signal(Signal::SheetZoomRange);
        }
        let zoom = self.session.zoom;
        self.set_zoom(zoom);
    }

    pub fn column_width(&self) -> i32 {
        self.session.column_width
    }

    pub fn column_width_range(&self) -> (i32, i32) {
        self.session.column_width_range
    }

    pub fn set_column_width(&mut self, level: i32) -> bool {
        let (min, max) = self.session.column_width_range;
        let level = level.clamp(min, max);
        if level == self.session.column_width {
            return false;
        }
        self.session.column_width = level;
        self.signal(Signal::SheetColumnWidth);
        true
    }

    pub fn set_column_width_range(&mut self, min: i32, max: i32) {
        let range = (min.min(max), min.max(max));
        if range != self.session.column_width_range {
            self.session.column_width_range = range;
            self.signal(Signal::SheetColumnWidth);
        }
        let width = self.session.column_width;
        self.set_column_width(width);
    }

    // Modes

    pub fn set_edit_mode(&mut self, enabled: bool) {
        if self.session.edit_mode != enabled {
            self.session.edit_mode = enabled;
            self.signal(Signal::EditMode);
        }
    }

    pub fn set_replace_mode(&mut self, enabled: bool) {
        if self.session.replace_mode != enabled {
            self.session.replace_mode = enabled;
            self.signal(Signal::ReplaceMode);
        }
    }

    pub fn set_grid_enabled(&mut self, enabled: bool) {
        if self.session.grid_enabled != enabled {
            self.session.grid_enabled = enabled;
            self.signal(Signal::Grid);
        }
    }

    pub fn set_follow_playback(&mut self, enabled: bool) {
        if self.session.follow_playback != enabled {
            self.session.follow_playback = enabled;
            self.signal(Signal::FollowPlayback);
        }
    }

    pub fn set_record_mode(&mut self, enabled: bool) {
        if self.session.record_mode != enabled {
            self.session.record_mode = enabled;
            self.signal(Signal::RecordMode);
        }
    }

    pub fn set_channel_mute(&mut self, channel: usize, muted: bool) {
        let changed = if muted {
            self.session.muted_channels.insert(channel)
        } else {
            self.session.muted_channels.remove(&channel)
        };
        if changed {
            self.signal(Signal::ChannelMute);
        }
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    // Pattern and grid edits

    pub fn set_pattern_length(&mut self, pat_num: usize, length: Tstamp) -> bool {
        let tr = Pattern::new(&self.store, pat_num).edit_set_length(pattern::clamp_length(length));
        let changed = self.add_transaction(tr, true, None);
        if changed && self.selection.clamp(&self.store) {
            self.signal(Signal::Selection);
        }
        changed
    }

    pub fn set_pattern_base_grid_pattern_id(&mut self, pat_num: usize, gp_id: Option<&str>) -> bool {
        let tr = Pattern::new(&self.store, pat_num).edit_set_base_grid_pattern_id(gp_id);
        self.add_transaction(tr, true, None)
    }

    /// Use a grid pattern in columns `[start_col, stop_col)` and times
    /// `[start_ts, stop_ts)` of a pattern.
    #[allow(clippy::too_many_arguments)]
    pub fn set_overlay_grid(
        &mut self,
        pinst: PatInstRef,
        start_col: usize,
        stop_col: usize,
        start_ts: Tstamp,
        stop_ts: Tstamp,
        gp_id: Option<&str>,
        offset: Tstamp,
    ) -> bool {
        let pattern = Pattern::new(&self.store, pinst.pat_num);
        let mut tr = Transaction::new();
        for col_num in start_col..stop_col.min(COLUMNS_MAX) {
            tr.extend(
                pattern
                    .column(col_num)
                    .edit_set_overlay_grid(start_ts, stop_ts, gp_id, offset),
            );
        }
        self.add_transaction(tr, true, None)
    }

    pub fn clear_overlay_grids(&mut self, pinst: PatInstRef, start_col: usize, stop_col: usize) -> bool {
        let pattern = Pattern::new(&self.store, pinst.pat_num);
        let mut tr = Transaction::new();
        for col_num in start_col..stop_col.min(COLUMNS_MAX) {
            tr.extend(pattern.column(col_num).edit_clear_overlay_grids());
        }
        self.add_transaction(tr, true, None)
    }

    // History

    fn is_history_blocked(&self) -> bool {
        self.session.is_following_playback()
    }

    pub fn can_undo(&self) -> bool {
        !self.is_history_blocked() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.is_history_blocked() && self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        if self.is_history_blocked() {
            log::debug!(target: "sheet", "undo refused while following playback");
            return false;
        }
        self.end_chord_silently();
        let Some(step) = self.history.undo(&mut self.store).cloned() else {
            return false;
        };
        self.after_history_move(&step, Signal::SheetUndo);
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.is_history_blocked() {
            log::debug!(target: "sheet", "redo refused while following playback");
            return false;
        }
        self.end_chord_silently();
        let Some(step) = self.history.redo(&mut self.store).cloned() else {
            return false;
        };
        self.after_history_move(&step, Signal::SheetRedo);
        true
    }

    /// Revert and discard the open history step.
    pub fn rollback_open_step(&mut self) -> bool {
        let Some(step) = self.history.rollback_open_step(&mut self.store) else {
            return false;
        };
        self.after_history_move(&step, Signal::SheetUndo);
        true
    }

    fn after_history_move(&mut self, step: &HistoryStep, signal: Signal) {
        if step
            .keys()
            .any(|k| keys::parse_key(k) == Some(StoreKey::GridPatterns))
        {
            self.grid.invalidate();
        }
        let mut signals = step.signals(&self.store);
        signals.insert(signal);
        if let Some(mut loc) = step.location() {
            if let Some(pinst) = step.pattern_instance() {
                if let Some((track, system)) = self.album().pattern_instance_location(pinst) {
                    loc.track = track;
                    loc.system = system;
                }
            }
            self.selection.set_location(loc);
        }
        self.selection.clamp(&self.store);
        signals.insert(Signal::Selection);
        self.updater.signal_all(signals);
    }

    fn end_chord_silently(&mut self) {
        if self.chord_start.take().is_some() {
            self.deferred = self.deferred.saturating_sub(1);
        }
        if self.deferred == 0 {
            self.history.commit();
        }
    }

    /// Drop history for a deleted pattern.
    pub fn remove_pattern_changes(&mut self, pat_num: usize) {
        self.history.remove_pattern_changes(pat_num);
    }

    /// Re-clamp the cursor after songs, systems or patterns changed.
    pub fn on_album_changed(&mut self) {
        if self.selection.clamp(&self.store) {
            self.signal(Signal::Selection);
        }
    }

    /// Close any open step before save or exit.
    pub fn commit_before_exit(&mut self) {
        self.chord_start = None;
        self.deferred = 0;
        self.history.commit();
    }
}

impl Default for SheetManager {
    fn default() -> Self {
        Self::new(SheetConfig::default())
    }
}
