//! Mapping viewport clicks to trigger positions.

use kunquat_types::limits::COLUMNS_MAX;
use kunquat_types::{Tstamp, TriggerPosition};

use super::layout::{LayoutEntry, SheetLayout};
use crate::render::geometry::get_px_from_tstamp;
use crate::render::trigger_row::{layout_row, row_width, trigger_at_x, GlyphPainter, Notation};
use crate::state::{Grid, Pattern, Store};

pub struct HitContext<'a> {
    pub store: &'a Store,
    pub grid: &'a Grid,
    pub layout: &'a SheetLayout,
    pub notation: &'a dyn Notation,
    pub glyphs: &'a dyn GlyphPainter,
    pub field_padding: u32,
    pub ruler_width: i64,
    pub column_width: i64,
    pub first_column: usize,
    pub view_y: i64,
    pub tr_height_px: i64,
    pub tr_height_ts: Tstamp,
    pub grid_enabled: bool,
    /// Horizontal scroll inside the cursor row, with that row.
    pub row_x_offset: Option<(TriggerPosition, i64)>,
}

/// Trigger row drawn over `abs_y`: the last row at or above it whose drawn
/// height still covers it, looking back into earlier instances as needed.
fn row_under(ctx: &HitContext, entry: &LayoutEntry, col_num: usize, abs_y: i64) -> Option<(LayoutEntry, Tstamp)> {
    let mut current = *entry;
    loop {
        let column = Pattern::new(ctx.store, current.pinst.pat_num).column(col_num);
        let row = column
            .rows()
            .keys()
            .rev()
            .copied()
            .find(|&ts| current.start_px + get_px_from_tstamp(ts, ctx.layout.px_per_beat()) <= abs_y);
        if let Some(ts) = row {
            let row_y = current.start_px + get_px_from_tstamp(ts, ctx.layout.px_per_beat());
            return (abs_y < row_y + ctx.tr_height_px).then_some((current, ts));
        }
        let prev = *ctx.layout.prev_entry(current.track, current.system)?;
        if prev.stop_px() + ctx.tr_height_px <= abs_y {
            return None;
        }
        current = prev;
    }
}

/// Position under viewport pixel `(x, y)`, or `None` outside the columns.
pub fn hit_test(ctx: &HitContext, x: i64, y: i64) -> Option<TriggerPosition> {
    if x < ctx.ruler_width || ctx.column_width <= 0 {
        return None;
    }
    let col_offset = (x - ctx.ruler_width) / ctx.column_width;
    let col_num = ctx.first_column + col_offset as usize;
    if col_num >= COLUMNS_MAX {
        return None;
    }
    let abs_y = ctx.view_y + y;
    let (entry, click_ts) = ctx.layout.tstamp_at_y(abs_y)?;
    let entry = *entry;

    if let Some((row_entry, row_ts)) = row_under(ctx, &entry, col_num, abs_y) {
        let column = Pattern::new(ctx.store, row_entry.pinst.pat_num).column(col_num);
        let triggers = column.row(row_ts);
        let layout = layout_row(triggers, ctx.notation, ctx.glyphs, ctx.field_padding);
        let pos = TriggerPosition::new(row_entry.track, row_entry.system, col_num, row_ts, 0);
        let x_offset = match ctx.row_x_offset {
            Some((loc, offset)) if loc.same_row(&pos) => offset,
            _ => 0,
        };
        let rel_x = x - ctx.ruler_width - col_offset * ctx.column_width + x_offset;
        if let Some(index) = trigger_at_x(&layout, rel_x) {
            return Some(pos.with_trigger_index(index));
        }
        if rel_x >= row_width(&layout) as i64 && row_entry == entry {
            return Some(pos.with_trigger_index(triggers.len()));
        }
    }

    let ts = if ctx.grid_enabled {
        ctx.grid
            .snap(ctx.store, entry.pinst.pat_num, col_num, click_ts, ctx.tr_height_ts)
            .min(entry.length)
    } else {
        click_ts
    };
    Some(TriggerPosition::new(entry.track, entry.system, col_num, ts, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::trigger_row::{BlockGlyphs, TwelveTone};
    use crate::state::album::{order_list_transaction, tracks_transaction};
    use crate::state::pattern::new_pattern_transaction;
    use kunquat_types::{ts, PatInstRef, Trigger};

    struct Fixture {
        store: Store,
        grid: Grid,
        layout: SheetLayout,
        notation: TwelveTone,
        glyphs: BlockGlyphs,
    }

    impl Fixture {
        fn new() -> Self {
            let mut store = Store::new();
            store.apply(&new_pattern_transaction(0, &[0, 1], ts(4, 0)));
            store.apply(&tracks_transaction(&[0]));
            store.apply(&order_list_transaction(
                0,
                &[PatInstRef::new(0, 0), PatInstRef::new(0, 1)],
            ));
            let column = Pattern::new(&store, 0).column(1);
            let tr = column.edit_insert_trigger(ts(1, 0), 0, Trigger::new("n+", Some("0".into())));
            store.apply(&tr);
            let column = Pattern::new(&store, 0).column(1);
            let tr = column.edit_insert_trigger(ts(1, 0), 1, Trigger::new("n-", None));
            store.apply(&tr);
            // A row just before the pattern end, overflowing into the next instance.
            let column = Pattern::new(&store, 0).column(2);
            let last = ts(4, 0) - Tstamp::from_beats(1) / 16;
            let tr = column.edit_insert_trigger(last, 0, Trigger::new("n-", None));
            store.apply(&tr);
            let layout = SheetLayout::build(&store, 64);
            Self {
                store,
                grid: Grid::new(),
                layout,
                notation: TwelveTone::default(),
                glyphs: BlockGlyphs {
                    char_width: 8,
                    line_height: 16,
                },
            }
        }

        fn ctx(&self, grid_enabled: bool) -> HitContext<'_> {
            HitContext {
                store: &self.store,
                grid: &self.grid,
                layout: &self.layout,
                notation: &self.notation,
                glyphs: &self.glyphs,
                field_padding: 2,
                ruler_width: 40,
                column_width: 128,
                first_column: 0,
                view_y: 0,
                tr_height_px: 16,
                tr_height_ts: Tstamp::from_beats(1) / 4,
                grid_enabled,
                row_x_offset: None,
            }
        }
    }

    #[test]
    fn ruler_is_not_a_column() {
        let fx = Fixture::new();
        assert_eq!(hit_test(&fx.ctx(true), 10, 10), None);
    }

    #[test]
    fn click_on_trigger_fields() {
        let fx = Fixture::new();
        let ctx = fx.ctx(true);
        let col_x = 40 + 128;
        // Row (1, 0) is at y 64; the first trigger spans "n+" and "A4".
        let hit = hit_test(&ctx, col_x + 2, 70).unwrap();
        assert_eq!((hit.col_num, hit.row_ts, hit.trigger_index), (1, ts(1, 0), 0));
        let hit = hit_test(&ctx, col_x + 45, 70).unwrap();
        assert_eq!(hit.trigger_index, 1);
        let hit = hit_test(&ctx, col_x + 120, 70).unwrap();
        assert_eq!(hit.trigger_index, 2);
    }

    #[test]
    fn empty_area_snaps_to_grid() {
        let fx = Fixture::new();
        let hit = hit_test(&fx.ctx(true), 45, 2 * 64 + 3).unwrap();
        assert_eq!((hit.col_num, hit.row_ts), (0, ts(2, 0)));
        let hit = hit_test(&fx.ctx(false), 45, 2 * 64).unwrap();
        assert_eq!(hit.row_ts, ts(2, 0));
    }

    #[test]
    fn overflowing_row_belongs_to_previous_instance() {
        let fx = Fixture::new();
        let second = fx.layout.entry(0, 1).unwrap().start_px;
        let hit = hit_test(&fx.ctx(true), 40 + 256 + 2, second + 3).unwrap();
        assert_eq!((hit.system, hit.col_num), (0, 2));
        assert_eq!(hit.row_ts, ts(4, 0) - Tstamp::from_beats(1) / 16);
    }
}
