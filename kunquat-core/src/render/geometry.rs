//! Conversions between pattern time and pixels.

use kunquat_types::limits::TSTAMP_BEAT;
use kunquat_types::Tstamp;

use crate::config::SheetConfig;

/// Time at pixel `px` from the start of a pattern. Rounds up, so that
/// [`get_px_from_tstamp`] maps the result back to `px`.
pub fn get_tstamp_from_px(px: i64, px_per_beat: i64) -> Tstamp {
    let ppb = px_per_beat.max(1);
    let beats = px.div_euclid(ppb);
    let frac = px.rem_euclid(ppb) as i128;
    let beat = TSTAMP_BEAT as i128;
    let rem = (frac * beat + ppb as i128 - 1) / ppb as i128;
    Tstamp::new(beats, rem as i64)
}

pub fn get_px_from_tstamp(ts: Tstamp, px_per_beat: i64) -> i64 {
    let ppb = px_per_beat.max(1);
    let rem_px = (ts.rem() as i128 * ppb as i128).div_euclid(TSTAMP_BEAT as i128);
    ts.beats() * ppb + rem_px as i64
}

pub fn px_per_beat(config: &SheetConfig, zoom: i32) -> i64 {
    let scale = config.zoom_factor.powi(zoom);
    (config.default_px_per_beat() * scale).round().max(1.0) as i64
}

pub fn column_width(config: &SheetConfig, level: i32) -> u32 {
    let scale = config.col_width_factor.powi(level);
    let min = config.char_width * 3;
    ((config.col_width as f64 * scale).round() as u32).max(min)
}

/// Time covered by the pixel height of one trigger row.
pub fn tr_height_ts(config: &SheetConfig, px_per_beat: i64) -> Tstamp {
    get_tstamp_from_px(config.tr_height as i64, px_per_beat)
}
