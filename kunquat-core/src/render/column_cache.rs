//! Column pixmap cache.
//!
//! Each column of each pattern instance is rasterized lazily in strips of
//! `pixmap_height` pixels. Strips are kept in two variants, active and
//! inactive, and all strips share one byte budget tracked by an LRU.

use std::collections::HashSet;
use std::rc::Rc;

use lru::LruCache;

use kunquat_types::{PatInstRef, Signal, SignalSet, Tstamp};

use super::geometry::{get_px_from_tstamp, get_tstamp_from_px};
use super::pixmap::Pixmap;
use super::trigger_row::{layout_row, GlyphPainter, Notation, RowImageCache};
use crate::config::{Colours, SheetConfig};
use crate::state::{Album, Grid, Pattern, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub pinst: PatInstRef,
    pub col_num: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StripKey {
    pub column: ColumnKey,
    pub variant: Variant,
    pub index: usize,
}

/// Everything a strip is drawn from.
pub struct RenderContext<'a> {
    pub store: &'a Store,
    pub grid: &'a Grid,
    pub config: &'a SheetConfig,
    pub colours: &'a Colours,
    pub notation: &'a dyn Notation,
    pub glyphs: &'a dyn GlyphPainter,
    pub px_per_beat: i64,
    pub column_width: u32,
    pub tr_height_ts: Tstamp,
    pub grid_enabled: bool,
}

pub struct ColumnCache {
    strips: LruCache<StripKey, Rc<Pixmap>>,
    bytes: usize,
    budget: usize,
    hit_columns: HashSet<ColumnKey>,
    row_images: RowImageCache,
    created: usize,
}

impl ColumnCache {
    pub fn new(config: &SheetConfig) -> Self {
        Self {
            strips: LruCache::unbounded(),
            bytes: 0,
            budget: usize::MAX,
            hit_columns: HashSet::new(),
            row_images: RowImageCache::new(config.row_image_capacity),
            created: 0,
        }
    }

    /// Budget of `cache_screens` viewports of pixels.
    pub fn set_viewport(&mut self, config: &SheetConfig, width: u32, height: u32) {
        let screens = config.cache_screens.max(1) as usize;
        self.budget = (width as usize * height as usize * 4 * screens).max(1);
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.strips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    pub fn byte_size(&self) -> usize {
        self.bytes
    }

    pub fn contains(&self, key: &StripKey) -> bool {
        self.strips.contains(key)
    }

    /// Strips created since the last call.
    pub fn take_created(&mut self) -> usize {
        std::mem::take(&mut self.created)
    }

    pub fn get(&mut self, ctx: &RenderContext, key: StripKey) -> Rc<Pixmap> {
        if let Some(strip) = self.strips.get(&key) {
            return strip.clone();
        }
        let strip = Rc::new(self.render(ctx, key));
        self.created += 1;
        self.bytes += strip.byte_size();
        self.strips.put(key, strip.clone());
        self.evict();
        strip
    }

    /// Render the first missing strip among `candidates`. Returns whether
    /// anything was drawn.
    pub fn predraw(&mut self, ctx: &RenderContext, candidates: &[StripKey]) -> bool {
        let Some(&key) = candidates.iter().find(|k| !self.strips.contains(*k)) else {
            return false;
        };
        log::trace!(target: "render", "predrawing {:?}", key);
        self.get(ctx, key);
        true
    }

    fn evict(&mut self) {
        // The newest strip always survives.
        while self.bytes > self.budget && self.strips.len() > 1 {
            let Some((key, strip)) = self.strips.pop_lru() else {
                break;
            };
            self.bytes -= strip.byte_size();
            log::trace!(target: "render", "evicted {:?}", key);
        }
    }

    pub fn flush_all(&mut self) {
        self.strips.clear();
        self.bytes = 0;
        self.hit_columns.clear();
        self.row_images.clear();
    }

    pub fn flush_column(&mut self, column: ColumnKey) {
        let stale: Vec<StripKey> = self
            .strips
            .iter()
            .filter(|(k, _)| k.column == column)
            .map(|(k, _)| *k)
            .collect();
        for key in stale {
            if let Some(strip) = self.strips.pop(&key) {
                self.bytes -= strip.byte_size();
            }
        }
        self.hit_columns.remove(&column);
    }

    fn flush_hit_columns(&mut self) {
        let columns: Vec<ColumnKey> = self.hit_columns.iter().copied().collect();
        for column in columns {
            self.flush_column(column);
        }
        self.row_images.flush_hits();
    }

    /// Drop whatever `signals` make stale.
    pub fn handle_signals(&mut self, store: &Store, signals: &SignalSet) {
        if signals.iter().any(Signal::flushes_all_columns) {
            log::debug!(target: "render", "flushing all column pixmaps");
            self.flush_all();
            return;
        }
        let album = Album::new(store);
        for signal in signals {
            match *signal {
                Signal::Column {
                    track,
                    system,
                    col_num,
                } => {
                    if let Some(pinst) = album.pattern_instance(track, system) {
                        self.flush_column(ColumnKey { pinst, col_num });
                    }
                }
                Signal::Notation => self.flush_hit_columns(),
                _ => {}
            }
        }
    }

    fn render(&mut self, ctx: &RenderContext, key: StripKey) -> Pixmap {
        let height = ctx.config.pixmap_height;
        let width = ctx.column_width;
        let ppb = ctx.px_per_beat;
        let top_px = key.index as i64 * height as i64;
        let start = get_tstamp_from_px(top_px, ppb);
        let stop = get_tstamp_from_px(top_px + height as i64, ppb);

        let pattern = Pattern::new(ctx.store, key.column.pinst.pat_num);
        let length = pattern.length();
        let column = pattern.column(key.column.col_num);

        let mut strip = Pixmap::filled(width, height, ctx.colours.background);
        let end_px = get_px_from_tstamp(length, ppb) - top_px;
        if end_px < height as i64 {
            strip.fill_rect(0, end_px.max(0), width as i64, height as i64, ctx.colours.border);
        }
        strip.vline(width as i64 - 1, 0, end_px.min(height as i64), ctx.colours.border);

        if ctx.grid_enabled {
            let lines = ctx.grid.get_grid_lines(
                ctx.store,
                key.column.pinst.pat_num,
                key.column.col_num,
                start,
                stop,
                ctx.tr_height_ts,
            );
            for (ts, style) in lines {
                let y = get_px_from_tstamp(ts, ppb) - top_px;
                strip.hline(0, width as i64 - 1, y, ctx.colours.grid[style]);
            }
        }

        let inactive = key.variant == Variant::Inactive;
        if inactive {
            strip.dim(ctx.config.inactive_dim);
        }

        if column.contains_hits() {
            self.hit_columns.insert(key.column);
        }
        let row_height = ctx.config.tr_height;
        let row_line = if inactive {
            ctx.colours.trigger_default.scaled(0.5 * ctx.config.inactive_dim)
        } else {
            ctx.colours.trigger_default.scaled(0.5)
        };
        let first = (start - ctx.tr_height_ts).max(Tstamp::ZERO);
        for row_ts in column.trigger_row_positions_in_range(first, stop.min(length)) {
            let layout = layout_row(
                column.row(row_ts),
                ctx.notation,
                ctx.glyphs,
                ctx.config.field_padding,
            );
            let image = self.row_images.get(
                &layout,
                inactive,
                row_height,
                ctx.glyphs,
                ctx.colours,
                ctx.config.inactive_dim,
            );
            let y = get_px_from_tstamp(row_ts, ppb) - top_px;
            strip.hline(0, width as i64 - 1, y, row_line);
            strip.add_blend(&image, 0, y);
        }
        strip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::trigger_row::{BlockGlyphs, TwelveTone};
    use crate::state::album::{order_list_transaction, tracks_transaction};
    use crate::state::pattern::new_pattern_transaction;
    use kunquat_types::{ts, Trigger};

    struct Fixture {
        store: Store,
        grid: Grid,
        config: SheetConfig,
        colours: Colours,
        notation: TwelveTone,
        glyphs: BlockGlyphs,
    }

    impl Fixture {
        fn new() -> Self {
            let mut store = Store::new();
            store.apply(&new_pattern_transaction(0, &[0, 1], ts(8, 0)));
            store.apply(&tracks_transaction(&[0]));
            store.apply(&order_list_transaction(
                0,
                &[PatInstRef::new(0, 0), PatInstRef::new(0, 1)],
            ));
            let column = Pattern::new(&store, 0).column(0);
            let tr = column.edit_insert_trigger(ts(1, 0), 0, Trigger::new("h", Some("0".into())));
            store.apply(&tr);
            Self {
                store,
                grid: Grid::new(),
                config: SheetConfig::default(),
                colours: Colours::default(),
                notation: TwelveTone::default(),
                glyphs: BlockGlyphs {
                    char_width: 8,
                    line_height: 16,
                },
            }
        }

        fn ctx(&self) -> RenderContext<'_> {
            RenderContext {
                store: &self.store,
                grid: &self.grid,
                config: &self.config,
                colours: &self.colours,
                notation: &self.notation,
                glyphs: &self.glyphs,
                px_per_beat: 64,
                column_width: 128,
                tr_height_ts: Tstamp::from_beats(1) / 4,
                grid_enabled: true,
            }
        }
    }

    fn key(col_num: usize, variant: Variant, index: usize) -> StripKey {
        StripKey {
            column: ColumnKey {
                pinst: PatInstRef::new(0, 0),
                col_num,
            },
            variant,
            index,
        }
    }

    #[test]
    fn strips_are_reused() {
        let fx = Fixture::new();
        let mut cache = ColumnCache::new(&fx.config);
        let a = cache.get(&fx.ctx(), key(0, Variant::Active, 0));
        let b = cache.get(&fx.ctx(), key(0, Variant::Active, 0));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.take_created(), 1);
        cache.get(&fx.ctx(), key(0, Variant::Inactive, 0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn budget_evicts_oldest() {
        let fx = Fixture::new();
        let mut cache = ColumnCache::new(&fx.config);
        // One strip's worth of bytes.
        cache.budget = 128 * fx.config.pixmap_height as usize * 4;
        cache.get(&fx.ctx(), key(0, Variant::Active, 0));
        cache.get(&fx.ctx(), key(1, Variant::Active, 0));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key(1, Variant::Active, 0)));
        assert_eq!(cache.byte_size(), 128 * fx.config.pixmap_height as usize * 4);
    }

    #[test]
    fn column_signal_flushes_one_column() {
        let fx = Fixture::new();
        let mut cache = ColumnCache::new(&fx.config);
        cache.get(&fx.ctx(), key(0, Variant::Active, 0));
        cache.get(&fx.ctx(), key(1, Variant::Active, 0));
        let signals: SignalSet = [Signal::Column {
            track: 0,
            system: 0,
            col_num: 0,
        }]
        .into_iter()
        .collect();
        cache.handle_signals(&fx.store, &signals);
        assert!(!cache.contains(&key(0, Variant::Active, 0)));
        assert!(cache.contains(&key(1, Variant::Active, 0)));
    }

    #[test]
    fn zoom_flushes_everything() {
        let fx = Fixture::new();
        let mut cache = ColumnCache::new(&fx.config);
        cache.get(&fx.ctx(), key(0, Variant::Active, 0));
        let signals: SignalSet = [Signal::SheetZoom].into_iter().collect();
        cache.handle_signals(&fx.store, &signals);
        assert!(cache.is_empty());
        assert_eq!(cache.byte_size(), 0);
    }

    #[test]
    fn notation_flushes_only_hit_columns() {
        let fx = Fixture::new();
        let mut cache = ColumnCache::new(&fx.config);
        cache.get(&fx.ctx(), key(0, Variant::Active, 0));
        cache.get(&fx.ctx(), key(1, Variant::Active, 0));
        let signals: SignalSet = [Signal::Notation].into_iter().collect();
        cache.handle_signals(&fx.store, &signals);
        assert!(!cache.contains(&key(0, Variant::Active, 0)));
        assert!(cache.contains(&key(1, Variant::Active, 0)));
    }

    #[test]
    fn inactive_strip_is_dimmer() {
        let fx = Fixture::new();
        let mut cache = ColumnCache::new(&fx.config);
        let active = cache.get(&fx.ctx(), key(0, Variant::Active, 0));
        let inactive = cache.get(&fx.ctx(), key(0, Variant::Inactive, 0));
        // Style-0 grid line at the top of the pattern.
        let a = active.colour_at(10, 0).unwrap();
        let i = inactive.colour_at(10, 0).unwrap();
        assert!(i.r() < a.r());
    }

    #[test]
    fn predraw_fills_first_missing() {
        let fx = Fixture::new();
        let mut cache = ColumnCache::new(&fx.config);
        let candidates = [key(0, Variant::Active, 1), key(0, Variant::Inactive, 0)];
        assert!(cache.predraw(&fx.ctx(), &candidates));
        assert!(cache.contains(&candidates[0]));
        assert!(cache.predraw(&fx.ctx(), &candidates));
        assert!(!cache.predraw(&fx.ctx(), &candidates));
    }
}
