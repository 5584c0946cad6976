//! The sheet view: viewport state, cursor navigation, key dispatch and
//! painting.

use kunquat_types::limits::COLUMNS_MAX;
use kunquat_types::{Signal, SignalSet, TriggerPosition, Tstamp};

use super::field_edit::{EntryOutcome, TriggerEntry};
use super::hit_test::{hit_test, HitContext};
use super::keys::{KeyCode, KeyPress, Keymap, SheetCommand};
use super::layout::{LayoutEntry, SheetLayout};
use super::motion::{CursorMotion, Direction};
use crate::config::{Colours, SheetConfig};
use crate::render::geometry::{self, get_px_from_tstamp, get_tstamp_from_px};
use crate::render::trigger_row::{layout_row, row_width, FieldKind, TriggerLayout};
use crate::render::{
    active_pattern_instance, BlockGlyphs, ColumnCache, ColumnKey, GlyphPainter, Notation, Pixmap,
    RenderContext, RulerCache, StripKey, TwelveTone, Variant,
};
use crate::sheet::SheetManager;
use crate::state::{Column, Pattern};

pub struct View {
    config: SheetConfig,
    colours: Colours,
    px_per_beat: i64,
    column_width: u32,
    width: u32,
    height: u32,
    view_y: i64,
    first_column: usize,
    x_offset: i64,
    x_offset_row: Option<TriggerPosition>,
    motion: CursorMotion,
    layout: SheetLayout,
    columns: ColumnCache,
    ruler: RulerCache,
    notation: Box<dyn Notation>,
    glyphs: Box<dyn GlyphPainter>,
    keymap: Keymap,
    entry: Option<TriggerEntry>,
}

impl View {
    pub fn new(manager: &SheetManager, colours: Colours) -> Self {
        let config = *manager.config();
        let px_per_beat = manager.px_per_beat();
        let glyphs = BlockGlyphs {
            char_width: config.char_width,
            line_height: config.tr_height,
        };
        Self {
            config,
            colours,
            px_per_beat,
            column_width: geometry::column_width(&config, manager.column_width()),
            width: 0,
            height: 0,
            view_y: 0,
            first_column: 0,
            x_offset: 0,
            x_offset_row: None,
            motion: CursorMotion::new(config.snap_delay, config.max_move_delta),
            layout: SheetLayout::build(manager.store(), px_per_beat),
            columns: ColumnCache::new(&config),
            ruler: RulerCache::new(&config),
            notation: Box::new(TwelveTone::default()),
            glyphs: Box::new(glyphs),
            keymap: Keymap::embedded(),
            entry: None,
        }
    }

    pub fn set_keymap(&mut self, keymap: Keymap) {
        self.keymap = keymap;
    }

    pub fn set_notation(&mut self, notation: Box<dyn Notation>) {
        self.notation = notation;
        self.columns.flush_all();
    }

    pub fn set_glyphs(&mut self, glyphs: Box<dyn GlyphPainter>) {
        self.glyphs = glyphs;
        self.columns.flush_all();
        self.ruler = RulerCache::new(&self.config);
        self.ruler.set_viewport(&self.config, self.height);
    }

    pub fn px_per_beat(&self) -> i64 {
        self.px_per_beat
    }

    pub fn column_width(&self) -> u32 {
        self.column_width
    }

    pub fn view_y(&self) -> i64 {
        self.view_y
    }

    pub fn first_column(&self) -> usize {
        self.first_column
    }

    pub fn x_offset(&self) -> i64 {
        self.x_offset
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn column_cache(&self) -> &ColumnCache {
        &self.columns
    }

    pub fn entry(&self) -> Option<&TriggerEntry> {
        self.entry.as_ref()
    }

    fn tr_height_ts(&self) -> Tstamp {
        geometry::tr_height_ts(&self.config, self.px_per_beat)
    }

    // Viewport

    pub fn resize(&mut self, manager: &SheetManager, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.columns.set_viewport(&self.config, width, height);
        self.ruler.set_viewport(&self.config, height);
        self.set_view_y(self.view_y);
        self.follow_cursor(manager);
    }

    pub fn set_view_y(&mut self, y: i64) {
        let max = (self.layout.total_height() - self.height as i64).max(0);
        self.view_y = y.clamp(0, max);
    }

    pub fn scroll(&mut self, dy: i64) {
        self.set_view_y(self.view_y + dy);
    }

    /// Whole columns that fit next to the ruler.
    fn visible_columns(&self) -> usize {
        let cw = self.column_width.max(1) as i64;
        let avail = self.width as i64 - self.config.ruler_width as i64;
        ((avail / cw).max(1) as usize).min(COLUMNS_MAX)
    }

    fn column_x(&self, col_num: usize) -> i64 {
        self.config.ruler_width as i64
            + (col_num as i64 - self.first_column as i64) * self.column_width as i64
    }

    fn cursor_y(&self, loc: &TriggerPosition) -> Option<i64> {
        self.layout.y_of(loc.track, loc.system, loc.row_ts)
    }

    /// Change the zoom while keeping the edit cursor at the same viewport
    /// height.
    pub fn set_px_per_beat(&mut self, manager: &SheetManager, px_per_beat: i64) {
        let px_per_beat = px_per_beat.max(1);
        if px_per_beat == self.px_per_beat {
            return;
        }
        let loc = manager.selection().location();
        let rel_y = self.cursor_y(&loc).map(|y| y - self.view_y);
        self.px_per_beat = px_per_beat;
        self.layout = SheetLayout::build(manager.store(), px_per_beat);
        self.columns.flush_all();
        if let (Some(rel_y), Some(y)) = (rel_y, self.cursor_y(&loc)) {
            self.set_view_y(y - rel_y);
        } else {
            self.set_view_y(self.view_y);
        }
        log::debug!(target: "view", "zoom {} px/beat, view at {}", px_per_beat, self.view_y);
    }

    fn set_column_width_level(&mut self, manager: &SheetManager) {
        let width = geometry::column_width(&self.config, manager.column_width());
        if width != self.column_width {
            self.column_width = width;
            self.columns.flush_all();
        }
    }

    /// Scroll so that the edit cursor stays inside the snap margins.
    pub fn follow_cursor(&mut self, manager: &SheetManager) {
        let loc = manager.selection().location();
        if let Some(y) = self.cursor_y(&loc) {
            let height = self.height as i64;
            let margin = self.config.min_snap_dist.min(height / 2).max(0);
            let rel_y = y - self.view_y;
            if rel_y < margin {
                self.set_view_y(y - margin);
            } else if rel_y + self.config.tr_height as i64 > height - margin {
                self.set_view_y(y + self.config.tr_height as i64 - height + margin);
            }
        }

        let visible = self.visible_columns();
        if loc.col_num < self.first_column {
            self.first_column = loc.col_num;
        } else if loc.col_num >= self.first_column + visible {
            self.first_column = loc.col_num + 1 - visible;
        }

        self.update_x_offset(manager, loc);
    }

    fn cursor_row_layout(&self, manager: &SheetManager, loc: &TriggerPosition) -> Vec<TriggerLayout> {
        let column = manager.column_at(loc.track, loc.system, loc.col_num);
        let triggers = column.as_ref().map_or(&[][..], |c| c.row(loc.row_ts));
        layout_row(triggers, &*self.notation, &*self.glyphs, self.config.field_padding)
    }

    /// Pixel span of the cursor inside its row.
    fn cursor_span(&self, layout: &[TriggerLayout], index: usize) -> (i64, i64) {
        match layout.get(index) {
            Some(t) => (t.x as i64, (t.x + t.width) as i64),
            None => {
                let x = row_width(layout) as i64;
                (x, x + self.config.char_width as i64)
            }
        }
    }

    fn update_x_offset(&mut self, manager: &SheetManager, loc: TriggerPosition) {
        if self.x_offset_row.is_some_and(|r| !r.same_row(&loc)) {
            self.x_offset = 0;
        }
        self.x_offset_row = Some(loc);
        let layout = self.cursor_row_layout(manager, &loc);
        let (start, stop) = self.cursor_span(&layout, loc.trigger_index);
        let cw = self.column_width as i64;
        if stop - self.x_offset > cw {
            self.x_offset = stop - cw;
        }
        if start < self.x_offset {
            self.x_offset = start;
        }
        self.x_offset = self.x_offset.max(0);
    }

    /// Centre the playback cursor while following playback.
    pub fn follow_playback(&mut self, manager: &SheetManager) {
        let session = manager.session();
        if !session.is_following_playback() {
            return;
        }
        let Some(cursor) = session.playback_cursor else {
            return;
        };
        if let Some(y) = self.layout.y_of(cursor.track, cursor.system, cursor.row_ts) {
            self.set_view_y(y - self.height as i64 / 2);
        }
    }

    pub fn handle_signals(&mut self, manager: &SheetManager, signals: &SignalSet) {
        self.columns.handle_signals(manager.store(), signals);
        self.ruler.handle_signals(signals);

        if signals.contains(&Signal::SheetZoom) {
            self.set_px_per_beat(manager, manager.px_per_beat());
        }
        if signals.contains(&Signal::SheetColumnWidth) {
            self.set_column_width_level(manager);
        }
        let relayout = signals.iter().any(|s| {
            matches!(
                s,
                Signal::Module | Signal::OrderList | Signal::PatternLength | Signal::SheetUndo | Signal::SheetRedo
            )
        });
        if relayout {
            self.layout = SheetLayout::build(manager.store(), self.px_per_beat);
            self.set_view_y(self.view_y);
        }
        if signals.contains(&Signal::Selection) {
            self.follow_cursor(manager);
        }
        if signals.contains(&Signal::PlaybackPosition) || signals.contains(&Signal::FollowPlayback) {
            self.follow_playback(manager);
        }
    }

    // Cursor motion

    fn move_to(&mut self, manager: &mut SheetManager, loc: TriggerPosition, extend: bool) {
        if extend {
            if !manager.extend_area_to(loc) {
                return;
            }
        } else {
            manager.clear_area();
            manager.set_location(loc);
        }
        self.follow_cursor(manager);
    }

    fn entry_of(&self, loc: &TriggerPosition) -> Option<LayoutEntry> {
        self.layout.entry(loc.track, loc.system).copied()
    }

    /// One vertical step from `loc`, or `None` when there is nowhere to go.
    fn vertical_target(
        &mut self,
        manager: &SheetManager,
        loc: TriggerPosition,
        dir: Direction,
        px_delta: i64,
        extend: bool,
    ) -> Option<TriggerPosition> {
        let entry = self.entry_of(&loc)?;
        let pat_num = entry.pinst.pat_num;
        let column: Column = Pattern::new(manager.store(), pat_num).column(loc.col_num);
        let ts = loc.row_ts;

        match dir {
            Direction::Forward if ts >= entry.length => {
                if extend {
                    return None;
                }
                let next = self.layout.next_entry(loc.track, loc.system)?;
                return Some(TriggerPosition::new(next.track, next.system, loc.col_num, Tstamp::ZERO, 0));
            }
            Direction::Backward if ts <= Tstamp::ZERO => {
                if extend {
                    return None;
                }
                let prev = self.layout.prev_entry(loc.track, loc.system)?;
                return Some(TriggerPosition::new(prev.track, prev.system, loc.col_num, prev.length, 0));
            }
            _ => {}
        }

        let target = if manager.session().grid_enabled {
            let grid = manager.grid();
            let trh = self.tr_height_ts();
            let stop_at_rows = self.config.grid_stops_at_triggers;
            match dir {
                Direction::Forward => [
                    grid.next_line(manager.store(), pat_num, loc.col_num, ts, trh),
                    column.next_row(ts).filter(|_| stop_at_rows),
                ]
                .into_iter()
                .flatten()
                .fold(entry.length, Tstamp::min),
                Direction::Backward => [
                    grid.prev_line(manager.store(), pat_num, loc.col_num, ts, trh),
                    column.prev_row(ts).filter(|_| stop_at_rows),
                ]
                .into_iter()
                .flatten()
                .fold(Tstamp::ZERO, Tstamp::max),
            }
        } else {
            let cur_px = get_px_from_tstamp(ts, self.px_per_beat);
            let target_px = cur_px + dir.sign() * px_delta.max(1);
            let target = get_tstamp_from_px(target_px, self.px_per_beat).clamp_to(Tstamp::ZERO, entry.length);
            let between = match dir {
                Direction::Forward => column.next_row(ts).filter(|&r| r < target),
                Direction::Backward => column.prev_row(ts).filter(|&r| r > target),
            };
            match between {
                Some(row) => {
                    self.motion.vertical.reset_snap_delay();
                    row
                }
                None => target,
            }
        };
        Some(loc.with_row(target, 0))
    }

    pub fn step_vertical(&mut self, manager: &mut SheetManager, delta: i64, extend: bool) {
        if delta == 0 {
            return;
        }
        let dir = if delta > 0 { Direction::Forward } else { Direction::Backward };
        let mut loc = manager.selection().location();
        let start = loc;
        if manager.session().grid_enabled {
            for _ in 0..delta.abs() {
                match self.vertical_target(manager, loc, dir, 1, extend) {
                    Some(next) => loc = next,
                    None => break,
                }
            }
        } else if let Some(next) = self.vertical_target(manager, loc, dir, delta.abs(), extend) {
            loc = next;
        }
        if loc != start {
            self.move_to(manager, loc, extend);
        }
    }

    /// Move between trigger slots, spilling into the neighbouring column at
    /// either end of the row.
    pub fn step_horizontal(&mut self, manager: &mut SheetManager, dir: Direction, extend: bool) {
        let loc = manager.selection().location();
        let count = manager
            .column_at(loc.track, loc.system, loc.col_num)
            .map_or(0, |c| c.trigger_count_at(loc.row_ts));
        let target = match dir {
            Direction::Forward if loc.trigger_index < count => {
                loc.with_trigger_index(loc.trigger_index + 1)
            }
            Direction::Forward if loc.col_num + 1 < COLUMNS_MAX => {
                loc.with_col(loc.col_num + 1).with_trigger_index(0)
            }
            Direction::Backward if loc.trigger_index > 0 => {
                loc.with_trigger_index(loc.trigger_index.min(count).saturating_sub(1))
            }
            Direction::Backward if loc.col_num > 0 => {
                let col = loc.col_num - 1;
                let prev_count = manager
                    .column_at(loc.track, loc.system, col)
                    .map_or(0, |c| c.trigger_count_at(loc.row_ts));
                loc.with_col(col).with_trigger_index(prev_count)
            }
            _ => return,
        };
        self.move_to(manager, target, extend);
    }

    pub fn step_column(&mut self, manager: &mut SheetManager, dir: Direction) {
        let loc = manager.selection().location();
        let col = match dir {
            Direction::Forward if loc.col_num + 1 < COLUMNS_MAX => loc.col_num + 1,
            Direction::Backward if loc.col_num > 0 => loc.col_num - 1,
            _ => return,
        };
        self.move_to(manager, loc.with_col(col).with_trigger_index(0), false);
    }

    fn jump_to_pattern_edge(&mut self, manager: &mut SheetManager, end: bool) {
        let loc = manager.selection().location();
        let Some(entry) = self.entry_of(&loc) else {
            return;
        };
        let ts = if end { entry.length } else { Tstamp::ZERO };
        self.move_to(manager, loc.with_row(ts, 0), false);
    }

    fn page(&mut self, manager: &mut SheetManager, dir: Direction) {
        let loc = manager.selection().location();
        let Some(entry) = self.entry_of(&loc) else {
            return;
        };
        let cur_px = get_px_from_tstamp(loc.row_ts, self.px_per_beat);
        let target_px = cur_px + dir.sign() * self.height.max(1) as i64;
        let mut ts = get_tstamp_from_px(target_px, self.px_per_beat).clamp_to(Tstamp::ZERO, entry.length);
        if manager.session().grid_enabled {
            ts = manager
                .grid()
                .snap(manager.store(), entry.pinst.pat_num, loc.col_num, ts, self.tr_height_ts())
                .clamp_to(Tstamp::ZERO, entry.length);
        }
        self.move_to(manager, loc.with_row(ts, 0), false);
    }

    fn select_all(&mut self, manager: &mut SheetManager) {
        let loc = manager.selection().location();
        let Some(entry) = self.entry_of(&loc) else {
            return;
        };
        let start = TriggerPosition::new(loc.track, loc.system, 0, Tstamp::ZERO, 0);
        // Rect areas are half-open in time; reach past a row at the pattern end.
        let stop_ts = entry.length + Tstamp::EPSILON;
        let stop = TriggerPosition::new(loc.track, loc.system, COLUMNS_MAX - 1, stop_ts, 0);
        manager.set_area(start, stop);
    }

    // Mouse

    pub fn position_at(&self, manager: &SheetManager, x: i64, y: i64) -> Option<TriggerPosition> {
        let ctx = HitContext {
            store: manager.store(),
            grid: manager.grid(),
            layout: &self.layout,
            notation: &*self.notation,
            glyphs: &*self.glyphs,
            field_padding: self.config.field_padding,
            ruler_width: self.config.ruler_width as i64,
            column_width: self.column_width as i64,
            first_column: self.first_column,
            view_y: self.view_y,
            tr_height_px: self.config.tr_height as i64,
            tr_height_ts: self.tr_height_ts(),
            grid_enabled: manager.session().grid_enabled,
            row_x_offset: self.x_offset_row.map(|r| (r, self.x_offset)),
        };
        hit_test(&ctx, x, y)
    }

    pub fn click(&mut self, manager: &mut SheetManager, x: i64, y: i64, extend: bool) {
        if let Some(entry) = self.entry.take() {
            entry.cancel(manager);
        }
        if let Some(loc) = self.position_at(manager, x, y) {
            self.move_to(manager, loc, extend);
        }
    }

    // Keyboard

    /// Returns whether the key was consumed.
    pub fn handle_key(&mut self, manager: &mut SheetManager, press: KeyPress) -> bool {
        if self.entry.is_some() {
            return self.handle_entry_key(manager, press);
        }
        if let Some(command) = self.keymap.lookup(press) {
            return self.handle_command(manager, command);
        }
        match press.key {
            KeyCode::Char(c)
                if !press.modifiers.ctrl
                    && !press.modifiers.alt
                    && !c.is_whitespace()
                    && manager.session().edit_mode =>
            {
                let mut entry = TriggerEntry::new_trigger(manager);
                entry.insert_char(c);
                self.entry = Some(entry);
                true
            }
            _ => false,
        }
    }

    pub fn handle_key_release(&mut self, press: KeyPress) {
        match press.key {
            KeyCode::Up => self.motion.release_up(),
            KeyCode::Down => self.motion.release_down(),
            KeyCode::Left => self.motion.release_left(),
            KeyCode::Right => self.motion.release_right(),
            _ => {}
        }
    }

    fn handle_entry_key(&mut self, manager: &mut SheetManager, press: KeyPress) -> bool {
        let Some(mut entry) = self.entry.take() else {
            return false;
        };
        match press.key {
            KeyCode::Escape => {
                entry.cancel(manager);
                return true;
            }
            KeyCode::Enter => match entry.confirm(manager) {
                Ok(EntryOutcome::Done) => {
                    self.follow_cursor(manager);
                    return true;
                }
                Ok(EntryOutcome::Continue) => {}
                Err(e) => log::warn!(target: "view", "{}", e),
            },
            KeyCode::Backspace => entry.backspace(),
            KeyCode::Char(c) if !press.modifiers.ctrl && !press.modifiers.alt => entry.insert_char(c),
            _ => {}
        }
        self.entry = Some(entry);
        true
    }

    pub fn handle_command(&mut self, manager: &mut SheetManager, command: SheetCommand) -> bool {
        use SheetCommand::*;
        log::trace!(target: "view", "command {:?}", command);
        match command {
            CursorUp | ExtendUp => {
                let delta = self.motion.press_up();
                self.step_vertical(manager, delta, command == ExtendUp);
            }
            CursorDown | ExtendDown => {
                let delta = self.motion.press_down();
                self.step_vertical(manager, delta, command == ExtendDown);
            }
            CursorLeft | ExtendLeft => {
                self.motion.press_left();
                self.step_horizontal(manager, Direction::Backward, command == ExtendLeft);
            }
            CursorRight | ExtendRight => {
                self.motion.press_right();
                self.step_horizontal(manager, Direction::Forward, command == ExtendRight);
            }
            NextColumn => self.step_column(manager, Direction::Forward),
            PrevColumn => self.step_column(manager, Direction::Backward),
            PatternStart => self.jump_to_pattern_edge(manager, false),
            PatternEnd => self.jump_to_pattern_edge(manager, true),
            PageUp => self.page(manager, Direction::Backward),
            PageDown => self.page(manager, Direction::Forward),
            Delete => {
                if manager.selection().has_area() {
                    manager.try_remove_area();
                } else {
                    manager.try_remove_trigger();
                }
            }
            Backspace => {
                manager.try_remove_prev_trigger();
            }
            ToggleReplace => {
                let replace = manager.session().replace_mode;
                manager.set_replace_mode(!replace);
            }
            Cancel => manager.clear_area(),
            EditTrigger => {
                if !manager.session().edit_mode {
                    return false;
                }
                self.entry = Some(
                    TriggerEntry::edit_argument(manager)
                        .unwrap_or_else(|| TriggerEntry::new_trigger(manager)),
                );
            }
            Undo => {
                manager.undo();
            }
            Redo => {
                manager.redo();
            }
            Cut => {
                manager.cut_selected_area();
            }
            Copy => {
                manager.copy_selected_area();
            }
            Paste => {
                if let Err(e) = manager.paste_from_clipboard() {
                    log::warn!(target: "view", "paste failed: {}", e);
                }
            }
            SelectAll => self.select_all(manager),
            ZoomIn | ZoomOut | ZoomReset => {
                let level = match command {
                    ZoomIn => manager.zoom() + 1,
                    ZoomOut => manager.zoom() - 1,
                    _ => 0,
                };
                self.zoom(manager, level);
            }
            WidenColumns | NarrowColumns | ResetColumnWidth => {
                let level = match command {
                    WidenColumns => manager.column_width() + 1,
                    NarrowColumns => manager.column_width() - 1,
                    _ => 0,
                };
                self.set_column_width(manager, level);
            }
            ToggleGrid => {
                let enabled = manager.session().grid_enabled;
                manager.set_grid_enabled(!enabled);
            }
            ToggleEdit => {
                let enabled = manager.session().edit_mode;
                manager.set_edit_mode(!enabled);
            }
            ConvertSetSlide => {
                if let Err(e) = manager.convert_set_or_slide_trigger() {
                    log::debug!(target: "view", "{}", e);
                }
            }
        }
        true
    }

    fn zoom(&mut self, manager: &mut SheetManager, level: i32) {
        if manager.set_zoom(level) {
            let ppb = manager.px_per_beat();
            self.set_px_per_beat(manager, ppb);
        }
    }

    fn set_column_width(&mut self, manager: &mut SheetManager, level: i32) {
        if manager.set_column_width(level) {
            self.set_column_width_level(manager);
            self.follow_cursor(manager);
        }
    }

    // Painting

    fn visible_entries(&self) -> Vec<LayoutEntry> {
        let top = self.view_y;
        let bottom = self.view_y + self.height as i64;
        self.layout
            .entries()
            .iter()
            .filter(|e| e.stop_px() > top && e.start_px < bottom)
            .copied()
            .collect()
    }

    /// Strip indices of `entry` that intersect the viewport.
    fn strip_range(&self, entry: &LayoutEntry) -> std::ops::Range<usize> {
        let ph = self.config.pixmap_height.max(1) as i64;
        let first = ((self.view_y - entry.start_px).max(0)) / ph;
        let bottom = (self.view_y + self.height as i64).min(entry.stop_px());
        let last = (bottom - entry.start_px - 1).max(0) / ph;
        first as usize..last as usize + 1
    }

    fn column_range(&self) -> std::ops::Range<usize> {
        let stop = (self.first_column + self.visible_columns() + 1).min(COLUMNS_MAX);
        self.first_column..stop
    }

    /// Draw the sheet into `target`. Returns the number of pixmaps created;
    /// when none were, one pixmap is predrawn for later use.
    pub fn paint(&mut self, manager: &SheetManager, target: &mut Pixmap) -> usize {
        target.fill(self.colours.background);
        let store = manager.store();
        let session = manager.session();
        let active = active_pattern_instance(store, session, manager.selection());
        let entries = self.visible_entries();
        let columns = self.column_range();
        let ph = self.config.pixmap_height as i64;

        let ctx = RenderContext {
            store,
            grid: manager.grid(),
            config: &self.config,
            colours: &self.colours,
            notation: &*self.notation,
            glyphs: &*self.glyphs,
            px_per_beat: self.px_per_beat,
            column_width: self.column_width,
            tr_height_ts: geometry::tr_height_ts(&self.config, self.px_per_beat),
            grid_enabled: session.grid_enabled,
        };

        let mut predraw = Vec::new();
        for entry in &entries {
            let variant = if Some(entry.pinst) == active {
                Variant::Active
            } else {
                Variant::Inactive
            };
            let other = match variant {
                Variant::Active => Variant::Inactive,
                Variant::Inactive => Variant::Active,
            };
            let strips = self.strip_range(entry);
            let total_strips = ((entry.height_px + ph - 1) / ph.max(1)).max(1) as usize;
            for index in strips.clone() {
                let y = entry.start_px + index as i64 * ph - self.view_y;
                let ruler = self.ruler.get(
                    &self.config,
                    &self.colours,
                    &*self.glyphs,
                    self.px_per_beat,
                    entry.length,
                    variant,
                    index,
                );
                target.draw(&ruler, 0, y);
                for col_num in columns.clone() {
                    let column = ColumnKey {
                        pinst: entry.pinst,
                        col_num,
                    };
                    let strip = self.columns.get(
                        &ctx,
                        StripKey {
                            column,
                            variant,
                            index,
                        },
                    );
                    target.draw(&strip, self.column_x(col_num), y);
                    predraw.push(StripKey {
                        column,
                        variant: other,
                        index,
                    });
                }
            }
            if strips.end < total_strips {
                for col_num in columns.clone() {
                    predraw.insert(
                        0,
                        StripKey {
                            column: ColumnKey {
                                pinst: entry.pinst,
                                col_num,
                            },
                            variant,
                            index: strips.end,
                        },
                    );
                }
            }
        }
        let created = self.columns.take_created();

        self.paint_selection(manager, target);
        self.paint_cursor(manager, target);
        self.paint_playback_cursor(manager, target);
        self.paint_entry(manager, target);

        if created == 0 {
            self.columns.predraw(&ctx, &predraw);
            self.columns.take_created();
        }
        created
    }

    fn paint_selection(&self, manager: &SheetManager, target: &mut Pixmap) {
        let selection = manager.selection();
        let colour = self.colours.selection;
        if let Some(rect) = selection.rect() {
            let (Some(y0), Some(y1)) = (
                self.layout.y_of(rect.track, rect.system, rect.start_ts),
                self.layout.y_of(rect.track, rect.system, rect.stop_ts),
            ) else {
                return;
            };
            let h = (y1 - y0).max(self.config.tr_height as i64);
            let cw = self.column_width as i64;
            let shade = Pixmap::filled(cw.max(1) as u32, h.max(1) as u32, colour);
            for col in self.column_range().filter(|c| (rect.start_col..=rect.stop_col).contains(c)) {
                target.add_blend(&shade, self.column_x(col), y0 - self.view_y);
            }
        } else if let Some(slice) = selection.row_slice() {
            let Some(y) = self.layout.y_of(slice.track, slice.system, slice.row_ts) else {
                return;
            };
            let loc = TriggerPosition::new(slice.track, slice.system, slice.col_num, slice.row_ts, 0);
            let layout = self.cursor_row_layout(manager, &loc);
            let offset = self.row_offset(&loc);
            let (x0, _) = self.cursor_span(&layout, slice.start);
            let x1 = if slice.stop > slice.start {
                self.cursor_span(&layout, slice.stop - 1).1
            } else {
                x0
            };
            if x1 <= x0 {
                return;
            }
            let shade = Pixmap::filled((x1 - x0) as u32, self.config.tr_height, colour);
            target.add_blend(
                &shade,
                self.column_x(slice.col_num) + x0 - offset,
                y - self.view_y,
            );
        }
    }

    fn row_offset(&self, loc: &TriggerPosition) -> i64 {
        match self.x_offset_row {
            Some(r) if r.same_row(loc) => self.x_offset,
            _ => 0,
        }
    }

    fn paint_cursor(&self, manager: &SheetManager, target: &mut Pixmap) {
        let session = manager.session();
        let loc = manager.selection().location();
        let Some(abs_y) = self.cursor_y(&loc) else {
            return;
        };
        let y = abs_y - self.view_y;
        let cw = self.column_width as i64;
        let row_h = self.config.tr_height as i64;

        if session.edit_mode {
            for col in self.column_range().filter(|&c| c != loc.col_num) {
                let x = self.column_x(col);
                target.hline(x, x + cw - 1, y, self.colours.cursor_guide);
            }
        }
        if !self.column_range().contains(&loc.col_num) {
            return;
        }

        // Cursor row, redrawn with its horizontal scroll.
        let col_x = self.column_x(loc.col_num);
        let layout = self.cursor_row_layout(manager, &loc);
        let offset = self.row_offset(&loc);
        let mut row = Pixmap::filled(cw.max(1) as u32, row_h.max(1) as u32, self.colours.background);
        for t in &layout {
            for field in &t.fields {
                let colour = if t.warn {
                    self.colours.trigger_warning
                } else {
                    match field.kind {
                        FieldKind::Type => self.colours.trigger_type,
                        FieldKind::Argument => self.colours.trigger_argument,
                    }
                };
                let fx = field.x as i64 - offset;
                self.glyphs.paint_text(&mut row, fx + self.config.field_padding as i64, 0, &field.text, colour);
            }
        }

        let (start, stop) = self.cursor_span(&layout, loc.trigger_index);
        let (start, stop) = (start - offset, stop - offset);
        if let Some(t) = layout.get(loc.trigger_index) {
            // Inverted active trigger field.
            if let Some(field) = t.fields.first() {
                let fx = field.x as i64 - offset;
                row.fill_rect(fx, 0, field.width as i64, row_h, self.colours.cursor);
                self.glyphs.paint_text(
                    &mut row,
                    fx + self.config.field_padding as i64,
                    0,
                    &field.text,
                    self.colours.background,
                );
            }
        }
        if session.replace_mode {
            row.rect_outline(start, 0, (stop - start).max(1), row_h, self.colours.cursor);
        } else {
            row.vline(start, 0, row_h, self.colours.cursor);
        }
        target.draw(&row, col_x, y);
        target.hline(col_x, col_x + cw - 1, y, self.colours.cursor);
    }

    fn paint_playback_cursor(&self, manager: &SheetManager, target: &mut Pixmap) {
        let session = manager.session();
        if !session.playing {
            return;
        }
        let Some(cursor) = session.playback_cursor else {
            return;
        };
        if let Some(y) = self.layout.y_of(cursor.track, cursor.system, cursor.row_ts) {
            target.hline(0, self.width as i64 - 1, y - self.view_y, self.colours.playback_cursor);
        }
    }

    fn paint_entry(&self, manager: &SheetManager, target: &mut Pixmap) {
        let Some(entry) = &self.entry else {
            return;
        };
        let loc = manager.selection().location();
        let Some(abs_y) = self.cursor_y(&loc) else {
            return;
        };
        let cw = self.column_width as i64;
        let row_h = self.config.tr_height as i64;
        let mut field = Pixmap::filled(cw.max(1) as u32, row_h.max(1) as u32, self.colours.background);
        field.rect_outline(0, 0, cw, row_h, self.colours.cursor);
        self.glyphs.paint_text(&mut field, 2, 0, entry.text(), self.colours.trigger_default);
        target.draw(&field, self.column_x(loc.col_num), abs_y - self.view_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::album::{order_list_transaction, tracks_transaction};
    use crate::state::pattern::new_pattern_transaction;
    use crate::state::Store;
    use kunquat_types::{ts, PatInstRef, Trigger};

    fn manager() -> SheetManager {
        let mut store = Store::new();
        store.apply(&new_pattern_transaction(0, &[0, 1], ts(4, 0)));
        store.apply(&tracks_transaction(&[0]));
        store.apply(&order_list_transaction(
            0,
            &[PatInstRef::new(0, 0), PatInstRef::new(0, 1)],
        ));
        let mut m = SheetManager::with_store(store, SheetConfig::default());
        m.set_location(TriggerPosition::new(0, 0, 0, Tstamp::ZERO, 0));
        m
    }

    fn view(m: &SheetManager) -> View {
        let mut v = View::new(m, Colours::default());
        v.resize(m, 640, 480);
        v
    }

    #[test]
    fn pixel_steps_stop_at_trigger_rows() {
        let mut m = manager();
        m.set_grid_enabled(false);
        m.set_location(TriggerPosition::new(0, 0, 0, ts(1, 0), 0));
        m.add_trigger(Trigger::new("n-", None)).unwrap();
        m.set_location(TriggerPosition::new(0, 0, 0, Tstamp::ZERO, 0));
        let mut v = view(&m);
        v.step_vertical(&mut m, 200, false);
        assert_eq!(m.selection().location().row_ts, ts(1, 0));
        v.step_vertical(&mut m, 1, false);
        assert_eq!(
            m.selection().location().row_ts,
            get_tstamp_from_px(v.px_per_beat() + 1, v.px_per_beat())
        );
    }

    #[test]
    fn crossing_pattern_boundaries() {
        let mut m = manager();
        m.set_grid_enabled(false);
        let mut v = view(&m);
        m.set_location(TriggerPosition::new(0, 0, 0, ts(4, 0), 0));
        v.step_vertical(&mut m, 1, false);
        assert_eq!(m.selection().location(), TriggerPosition::new(0, 1, 0, Tstamp::ZERO, 0));
        v.step_vertical(&mut m, -1, false);
        assert_eq!(m.selection().location(), TriggerPosition::new(0, 0, 0, ts(4, 0), 0));
    }

    #[test]
    fn extending_is_clamped_to_the_pattern() {
        let mut m = manager();
        m.set_grid_enabled(false);
        let mut v = view(&m);
        m.set_location(TriggerPosition::new(0, 0, 0, ts(4, 0), 0));
        v.step_vertical(&mut m, 1, true);
        assert_eq!(m.selection().location().system, 0);
        assert!(!m.selection().has_area());
    }

    #[test]
    fn horizontal_steps_spill_into_neighbour_columns() {
        let mut m = manager();
        m.add_trigger(Trigger::new("n-", None)).unwrap();
        m.set_location(TriggerPosition::new(0, 0, 0, Tstamp::ZERO, 0));
        let mut v = view(&m);
        v.step_horizontal(&mut m, Direction::Forward, false);
        assert_eq!(m.selection().location().trigger_index, 1);
        v.step_horizontal(&mut m, Direction::Forward, false);
        assert_eq!(m.selection().location().col_num, 1);
        v.step_horizontal(&mut m, Direction::Backward, false);
        let loc = m.selection().location();
        assert_eq!((loc.col_num, loc.trigger_index), (0, 1));
    }

    #[test]
    fn zoom_keeps_cursor_height() {
        let mut m = manager();
        let mut v = view(&m);
        m.set_location(TriggerPosition::new(0, 0, 0, ts(3, 0), 0));
        v.set_px_per_beat(&m, 100);
        v.set_view_y(200);
        v.set_px_per_beat(&m, 200);
        assert_eq!(v.view_y(), 500);
    }

    #[test]
    fn follow_cursor_scrolls_columns() {
        let mut m = manager();
        let mut v = view(&m);
        let visible = v.visible_columns();
        m.set_location(TriggerPosition::new(0, 0, visible + 2, Tstamp::ZERO, 0));
        v.follow_cursor(&m);
        assert_eq!(v.first_column(), 3);
        m.set_location(TriggerPosition::new(0, 0, 1, Tstamp::ZERO, 0));
        v.follow_cursor(&m);
        assert_eq!(v.first_column(), 1);
    }

    #[test]
    fn select_all_covers_the_pattern_end() {
        let mut m = manager();
        for (col_num, row_ts) in [(0, Tstamp::ZERO), (2, ts(4, 0))] {
            m.set_location(TriggerPosition::new(0, 0, col_num, row_ts, 0));
            m.add_trigger(Trigger::new("n-", None)).unwrap();
        }
        let mut v = view(&m);
        v.select_all(&mut m);
        assert!(m.selection().rect().unwrap().contains(2, ts(4, 0)));

        assert!(m.try_remove_area());
        for col_num in [0, 2] {
            let column = m.column_at(0, 0, col_num).unwrap();
            assert!(column.trigger_row_positions().is_empty());
        }
    }

    #[test]
    fn typing_opens_trigger_entry() {
        let mut m = manager();
        let mut v = view(&m);
        for c in ['n', '-'] {
            assert!(v.handle_key(&mut m, KeyPress::plain(KeyCode::Char(c))));
        }
        assert_eq!(v.entry().map(|e| e.text()), Some("n-"));
        v.handle_key(&mut m, KeyPress::plain(KeyCode::Enter));
        assert!(v.entry().is_none());
        assert!(m.can_undo());
    }

    #[test]
    fn paint_reports_created_pixmaps() {
        let m = manager();
        let mut v = view(&m);
        let mut target = Pixmap::new(640, 480);
        let created = v.paint(&m, &mut target);
        assert!(created > 0);
        let cached = v.column_cache().len();
        assert_eq!(v.paint(&m, &mut target), 0);
        assert_eq!(v.column_cache().len(), cached + 1);
    }
}
