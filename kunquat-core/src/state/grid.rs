//! Grid line enumeration and snapping.
//!
//! Lines come from the pattern's base grid pattern, replaced inside overlay
//! regions of a column. Dense styles are filtered out at the current zoom:
//! `tr_height_ts` is the time covered by one trigger row's pixel height.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use kunquat_types::limits::STYLE_COUNT;
use kunquat_types::Tstamp;

use super::column::{Column, OverlayEntry};
use super::grid_pattern::{GridPattern, GridPatterns, DEFAULT_GRID_PATTERN_ID};
use super::pattern::Pattern;
use super::store::Store;

/// Styles visible at one row height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedStyles {
    /// Highest style number drawn; styles `0..=max_style` are shown.
    pub max_style: usize,
    /// Major lines are drawn on every `cycles_per_line`th cycle.
    pub cycles_per_line: i64,
}

/// Smallest distance between consecutive lines of style `<= style`,
/// counting the wrap from the last line to the first line of the next cycle.
fn min_line_distance(gp: &GridPattern, style: usize) -> Tstamp {
    let times: Vec<Tstamp> = gp
        .lines
        .iter()
        .filter(|l| l.style <= style)
        .map(|l| l.ts)
        .collect();
    let Some(&first) = times.first() else {
        return gp.length;
    };
    let mut min = gp.length;
    for pair in times.windows(2) {
        min = min.min(pair[1] - pair[0]);
    }
    if let Some(&last) = times.last() {
        if times.len() > 1 {
            min = min.min(first + gp.length - last);
        }
    }
    min
}

pub fn allowed_styles(gp: &GridPattern, tr_height_ts: Tstamp) -> AllowedStyles {
    let threshold = |style: usize| tr_height_ts.mul_f64(gp.min_style_spacing[style]);

    let top_dist = min_line_distance(gp, 0);
    let top_min = threshold(0);
    let cycles_per_line = if top_dist >= top_min {
        1
    } else {
        let ratio = top_min.to_f64() / gp.length.to_f64();
        let exp = ratio.log2().ceil().max(0.0) as u32;
        1_i64 << exp.min(62)
    };

    let mut max_style = 0;
    if cycles_per_line == 1 {
        for style in 1..STYLE_COUNT {
            if min_line_distance(gp, style) < threshold(style) {
                break;
            }
            max_style = style;
        }
    }

    AllowedStyles {
        max_style,
        cycles_per_line,
    }
}

/// Grid line model for snapping, cursor motion and drawing.
///
/// The parsed grid pattern table and the style filters are memoized; the
/// owner calls [`Grid::invalidate`] whenever the stored table changes.
#[derive(Default)]
pub struct Grid {
    memo: RefCell<HashMap<(String, Tstamp), AllowedStyles>>,
    patterns: RefCell<Option<BTreeMap<String, GridPattern>>>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached patterns and style filters after grid pattern edits.
    pub fn invalidate(&self) {
        self.memo.borrow_mut().clear();
        self.patterns.borrow_mut().take();
    }

    /// The named grid pattern, or the built-in one for missing or unknown ids.
    pub fn resolve(&self, store: &Store, gp_id: Option<&str>) -> GridPattern {
        let mut patterns = self.patterns.borrow_mut();
        let table = patterns.get_or_insert_with(|| GridPatterns::new(store).all());
        gp_id
            .and_then(|id| table.get(id))
            .cloned()
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn is_table_cached(&self) -> bool {
        self.patterns.borrow().is_some()
    }

    fn allowed(&self, gp_key: &str, gp: &GridPattern, tr_height_ts: Tstamp) -> AllowedStyles {
        let key = (gp_key.to_string(), tr_height_ts);
        if let Some(found) = self.memo.borrow().get(&key) {
            return *found;
        }
        let allowed = allowed_styles(gp, tr_height_ts);
        self.memo.borrow_mut().insert(key, allowed);
        allowed
    }

    /// Lines `(ts, style)` of one column in `[start, stop)`, in pattern time.
    pub fn get_grid_lines(
        &self,
        store: &Store,
        pat_num: usize,
        col_num: usize,
        start: Tstamp,
        stop: Tstamp,
        tr_height_ts: Tstamp,
    ) -> Vec<(Tstamp, usize)> {
        let pattern = Pattern::new(store, pat_num);
        let column = pattern.column(col_num);
        let stop = stop.min(pattern.length());
        let start = start.max(Tstamp::ZERO);
        if stop <= start {
            return Vec::new();
        }

        let base_id = pattern.base_grid_pattern_id();
        let parts = column.overlay_grid_info_slice(start, stop);

        let mut lines = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            let part_stop = parts.get(i + 1).map_or(stop, |p| p.start.min(stop));
            let part_start = part.start.max(start);
            let gp_id = part.gp_id.clone().or_else(|| base_id.clone());
            let gp = self.resolve(store, gp_id.as_deref());
            let gp_key = gp_id.unwrap_or_else(|| DEFAULT_GRID_PATTERN_ID.to_string());
            let allowed = self.allowed(&gp_key, &gp, tr_height_ts);
            emit_part_lines(&gp, allowed, part, part_start, part_stop, &mut lines);
        }
        lines
    }

    fn lines_around(
        &self,
        store: &Store,
        pat_num: usize,
        col_num: usize,
        start: Tstamp,
        stop: Tstamp,
        tr_height_ts: Tstamp,
    ) -> Vec<Tstamp> {
        self.get_grid_lines(store, pat_num, col_num, start, stop, tr_height_ts)
            .into_iter()
            .map(|(ts, _)| ts)
            .collect()
    }

    /// First visible line strictly after `ts`, below the pattern end.
    pub fn next_line(
        &self,
        store: &Store,
        pat_num: usize,
        col_num: usize,
        ts: Tstamp,
        tr_height_ts: Tstamp,
    ) -> Option<Tstamp> {
        let length = Pattern::new(store, pat_num).length();
        self.lines_around(store, pat_num, col_num, ts + Tstamp::EPSILON, length, tr_height_ts)
            .first()
            .copied()
    }

    pub fn next_or_current_line(
        &self,
        store: &Store,
        pat_num: usize,
        col_num: usize,
        ts: Tstamp,
        tr_height_ts: Tstamp,
    ) -> Option<Tstamp> {
        let length = Pattern::new(store, pat_num).length();
        self.lines_around(store, pat_num, col_num, ts, length, tr_height_ts)
            .first()
            .copied()
    }

    /// Last visible line strictly before `ts`.
    pub fn prev_line(
        &self,
        store: &Store,
        pat_num: usize,
        col_num: usize,
        ts: Tstamp,
        tr_height_ts: Tstamp,
    ) -> Option<Tstamp> {
        self.lines_around(store, pat_num, col_num, Tstamp::ZERO, ts, tr_height_ts)
            .last()
            .copied()
    }

    pub fn prev_or_current_line(
        &self,
        store: &Store,
        pat_num: usize,
        col_num: usize,
        ts: Tstamp,
        tr_height_ts: Tstamp,
    ) -> Option<Tstamp> {
        self.lines_around(store, pat_num, col_num, Tstamp::ZERO, ts + Tstamp::EPSILON, tr_height_ts)
            .last()
            .copied()
    }

    /// Snap `ts` to the closest of the neighbouring grid lines and trigger
    /// rows. Ties go to the earlier candidate.
    pub fn snap(
        &self,
        store: &Store,
        pat_num: usize,
        col_num: usize,
        ts: Tstamp,
        tr_height_ts: Tstamp,
    ) -> Tstamp {
        let column: Column = Pattern::new(store, pat_num).column(col_num);
        let candidates = [
            self.prev_or_current_line(store, pat_num, col_num, ts, tr_height_ts),
            self.next_line(store, pat_num, col_num, ts, tr_height_ts),
            column.has_trigger_row(ts).then_some(ts).or_else(|| column.prev_row(ts)),
            column.next_row(ts),
        ];
        let mut best: Option<Tstamp> = None;
        for cand in candidates.into_iter().flatten() {
            let dist = distance(cand, ts);
            match best {
                Some(b) if distance(b, ts) < dist || (distance(b, ts) == dist && b <= cand) => {}
                _ => best = Some(cand),
            }
        }
        best.unwrap_or(ts)
    }
}

fn distance(a: Tstamp, b: Tstamp) -> Tstamp {
    if a > b {
        a - b
    } else {
        b - a
    }
}

fn emit_part_lines(
    gp: &GridPattern,
    allowed: AllowedStyles,
    part: &OverlayEntry,
    start: Tstamp,
    stop: Tstamp,
    out: &mut Vec<(Tstamp, usize)>,
) {
    if stop <= start || gp.lines.is_empty() {
        return;
    }
    let origin = part.anchor() + gp.offset;
    let rel = start - origin;
    let local = rel.modulo(gp.length);
    let (mut cycle, mut index) = match gp.lines.iter().position(|l| l.ts >= local) {
        Some(i) => (rel.floordiv(gp.length), i),
        None => (rel.floordiv(gp.length) + 1, 0),
    };
    let cpl = allowed.cycles_per_line.max(1);

    loop {
        if cpl > 1 && cycle.rem_euclid(cpl) != 0 {
            cycle += cpl - cycle.rem_euclid(cpl);
            index = 0;
        }
        let cycle_start = origin + gp.length * cycle;
        if cycle_start >= stop {
            break;
        }
        let line = gp.lines[index];
        let ts = cycle_start + line.ts;
        if ts >= stop {
            break;
        }
        if line.style <= allowed.max_style && ts >= start {
            out.push((ts, line.style));
        }
        index += 1;
        if index >= gp.lines.len() {
            index = 0;
            cycle += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::grid_pattern::GridLine;
    use crate::state::pattern::new_pattern_transaction;
    use kunquat_types::ts;

    fn four_beats() -> GridPattern {
        GridPattern {
            name: "Four".into(),
            length: ts(4, 0),
            offset: Tstamp::ZERO,
            min_style_spacing: [1.0; STYLE_COUNT],
            lines: vec![
                GridLine { ts: ts(0, 0), style: 0 },
                GridLine { ts: ts(1, 0), style: 1 },
                GridLine { ts: ts(2, 0), style: 1 },
                GridLine { ts: ts(3, 0), style: 1 },
            ],
        }
    }

    fn store_with_grid(length: Tstamp) -> Store {
        let mut store = Store::new();
        store.apply(&new_pattern_transaction(0, &[0], length));
        let tr = GridPatterns::new(&store).edit_set("four", &four_beats()).unwrap();
        store.apply(&tr);
        let tr = Pattern::new(&store, 0).edit_set_base_grid_pattern_id(Some("four"));
        store.apply(&tr);
        store
    }

    #[test]
    fn style_filter_is_a_prefix() {
        let gp = GridPattern::default();
        let fine = allowed_styles(&gp, ts(0, 1000));
        assert_eq!(fine.max_style, STYLE_COUNT - 1);
        assert_eq!(fine.cycles_per_line, 1);
        let coarse = allowed_styles(&gp, Tstamp::from_beats(1) / 4);
        assert_eq!(coarse.max_style, 3);
    }

    #[test]
    fn cycle_skipping_uses_powers_of_two() {
        let gp = four_beats();
        let allowed = allowed_styles(&gp, ts(10, 0));
        assert_eq!(allowed.max_style, 0);
        assert_eq!(allowed.cycles_per_line, 4);
    }

    #[test]
    fn lines_over_pattern() {
        let store = store_with_grid(ts(8, 0));
        let grid = Grid::new();
        let lines = grid.get_grid_lines(&store, 0, 0, ts(0, 0), ts(8, 0), ts(0, 1));
        let times: Vec<_> = lines.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, (0..8).map(|b| ts(b, 0)).collect::<Vec<_>>());
        assert_eq!(lines[4].1, 0);
    }

    #[test]
    fn empty_range_has_no_lines() {
        let store = store_with_grid(ts(8, 0));
        let grid = Grid::new();
        assert!(grid
            .get_grid_lines(&store, 0, 0, ts(3, 0), ts(3, 0), ts(0, 1))
            .is_empty());
        assert!(grid
            .get_grid_lines(&store, 0, 0, ts(4, 0), ts(2, 0), ts(0, 1))
            .is_empty());
    }

    #[test]
    fn skipped_cycles_land_on_multiples() {
        let store = store_with_grid(ts(64, 0));
        let grid = Grid::new();
        let lines = grid.get_grid_lines(&store, 0, 0, ts(1, 0), ts(64, 0), ts(10, 0));
        let times: Vec<_> = lines.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![ts(16, 0), ts(32, 0), ts(48, 0)]);
    }

    #[test]
    fn neighbour_queries() {
        let store = store_with_grid(ts(4, 0));
        let grid = Grid::new();
        let h = ts(0, 1);
        assert_eq!(grid.next_line(&store, 0, 0, ts(1, 0), h), Some(ts(2, 0)));
        assert_eq!(grid.next_line(&store, 0, 0, ts(3, 0), h), None);
        assert_eq!(grid.next_or_current_line(&store, 0, 0, ts(1, 0), h), Some(ts(1, 0)));
        assert_eq!(grid.prev_line(&store, 0, 0, ts(1, 0), h), Some(ts(0, 0)));
        assert_eq!(grid.prev_line(&store, 0, 0, ts(0, 0), h), None);
        assert_eq!(grid.prev_or_current_line(&store, 0, 0, ts(1, 5), h), Some(ts(1, 0)));
        assert_eq!(grid.snap(&store, 0, 0, ts(2, 0) - ts(0, 3), h), ts(2, 0));
    }

    #[test]
    fn overlay_lines_are_anchored_at_region_start() {
        let mut store = store_with_grid(ts(16, 0));
        let tr = Pattern::new(&store, 0)
            .column(0)
            .edit_set_overlay_grid(ts(1, 0) / 2, ts(6, 0), Some("four"), Tstamp::ZERO);
        store.apply(&tr);
        let grid = Grid::new();
        let lines = grid.get_grid_lines(&store, 0, 0, ts(0, 0), ts(7, 0), ts(0, 1));
        let times: Vec<_> = lines.iter().map(|(t, _)| *t).collect();
        let half = ts(1, 0) / 2;
        assert_eq!(
            times,
            vec![
                ts(0, 0),
                half,
                half + ts(1, 0),
                half + ts(2, 0),
                half + ts(3, 0),
                half + ts(4, 0),
                half + ts(5, 0),
                ts(6, 0),
            ]
        );
    }

    #[test]
    fn table_is_parsed_once_until_invalidated() {
        let mut store = store_with_grid(ts(4, 0));
        let grid = Grid::new();
        assert!(!grid.is_table_cached());
        assert_eq!(grid.resolve(&store, Some("four")), four_beats());
        assert!(grid.is_table_cached());

        let tr = GridPatterns::new(&store).edit_remove("four").unwrap();
        store.apply(&tr);
        assert_eq!(grid.resolve(&store, Some("four")), four_beats());

        grid.invalidate();
        assert!(!grid.is_table_cached());
        assert_eq!(grid.resolve(&store, Some("four")), GridPattern::default());
    }
}
