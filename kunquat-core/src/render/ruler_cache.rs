//! Ruler strips: beat ticks and beat numbers along the time axis.

use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use kunquat_types::{Signal, SignalSet, Tstamp};

use super::column_cache::Variant;
use super::geometry::{get_px_from_tstamp, get_tstamp_from_px};
use super::pixmap::Pixmap;
use super::trigger_row::GlyphPainter;
use crate::config::{Colours, SheetConfig};

/// Interval between marks: the finest power-of-two beat subdivision (or
/// multiple) whose pixel spacing is at least `min_spacing`.
pub fn mark_interval(px_per_beat: i64, min_spacing: u32) -> Tstamp {
    let ppb = px_per_beat.max(1);
    let min = min_spacing.max(1) as i64;
    if ppb >= min {
        let mut div = 1;
        while ppb / (div * 2) >= min && div < 1 << 20 {
            div *= 2;
        }
        Tstamp::from_beats(1) / div
    } else {
        let mut beats = 2;
        while beats * ppb < min {
            beats *= 2;
        }
        Tstamp::from_beats(beats)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RulerKey {
    variant: Variant,
    length: Tstamp,
    index: usize,
}

/// Ruler strips, at most `cache_screens` viewports of them per variant.
pub struct RulerCache {
    strips: LruCache<RulerKey, Rc<Pixmap>>,
}

impl RulerCache {
    pub fn new(config: &SheetConfig) -> Self {
        Self {
            strips: LruCache::new(strip_capacity(config, config.pixmap_height)),
        }
    }

    pub fn set_viewport(&mut self, config: &SheetConfig, height: u32) {
        self.strips.resize(strip_capacity(config, height));
    }

    pub fn capacity(&self) -> usize {
        self.strips.cap().get()
    }

    pub fn len(&self) -> usize {
        self.strips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    pub fn handle_signals(&mut self, signals: &SignalSet) {
        let flush = signals.iter().any(|s| {
            matches!(
                s,
                Signal::SheetZoom | Signal::StyleChanged | Signal::PatternLength | Signal::Module
            )
        });
        if flush {
            self.strips.clear();
        }
    }

    /// Strip `index` of the ruler for a pattern of `length`.
    #[allow(clippy::too_many_arguments)]
    pub fn get(
        &mut self,
        config: &SheetConfig,
        colours: &Colours,
        glyphs: &dyn GlyphPainter,
        px_per_beat: i64,
        length: Tstamp,
        variant: Variant,
        index: usize,
    ) -> Rc<Pixmap> {
        let key = RulerKey {
            variant,
            length,
            index,
        };
        if let Some(strip) = self.strips.get(&key) {
            return Rc::clone(strip);
        }
        let mut strip = render(config, colours, glyphs, px_per_beat, length, index);
        if variant == Variant::Inactive {
            strip.dim(config.inactive_dim);
        }
        let strip = Rc::new(strip);
        if let Some((old, _)) = self.strips.push(key, Rc::clone(&strip)) {
            if old != key {
                log::trace!(target: "render", "evicted ruler strip {}", old.index);
            }
        }
        strip
    }
}

/// Strips covering `cache_screens` viewports of `height` pixels, for both
/// variants.
fn strip_capacity(config: &SheetConfig, height: u32) -> NonZeroUsize {
    let per_screen = height.div_ceil(config.pixmap_height.max(1)) as usize + 1;
    let count = per_screen * config.cache_screens.max(1) as usize * 2;
    NonZeroUsize::new(count).unwrap_or(NonZeroUsize::MIN)
}

fn render(
    config: &SheetConfig,
    colours: &Colours,
    glyphs: &dyn GlyphPainter,
    px_per_beat: i64,
    length: Tstamp,
    index: usize,
) -> Pixmap {
    let width = config.ruler_width.max(1);
    let height = config.pixmap_height;
    let top_px = index as i64 * height as i64;
    let start = get_tstamp_from_px(top_px, px_per_beat);
    let stop = get_tstamp_from_px(top_px + height as i64, px_per_beat).min(length + Tstamp::EPSILON);

    let mut strip = Pixmap::filled(width, height, colours.ruler_background);
    let end_px = get_px_from_tstamp(length, px_per_beat) - top_px;
    if end_px < height as i64 {
        strip.fill_rect(0, end_px.max(0) + 1, width as i64, height as i64, colours.background);
    }

    let tick = mark_interval(px_per_beat, config.ruler_min_tick_spacing);
    let number = mark_interval(px_per_beat, config.ruler_min_number_spacing).max(tick);
    let mut ts = tick * start.floordiv(tick).max(0);
    if ts < start {
        ts = ts + tick;
    }
    while ts < stop {
        let y = get_px_from_tstamp(ts, px_per_beat) - top_px;
        let is_beat = ts.rem() == 0;
        let tick_len = if is_beat { width as i64 / 2 } else { width as i64 / 4 };
        strip.hline(width as i64 - tick_len, width as i64, y, colours.ruler_foreground);
        if ts.modulo(number) == Tstamp::ZERO {
            let text = format_ruler_time(ts);
            glyphs.paint_text(&mut strip, 2, y + 1, &text, colours.ruler_foreground);
        }
        ts = ts + tick;
    }
    strip
}

fn format_ruler_time(ts: Tstamp) -> String {
    if ts.rem() == 0 {
        ts.beats().to_string()
    } else {
        format!("{:.3}", ts.to_f64())
            .trim_end_matches('0')
            .to_string()
    }
}
