//! Fixed numeric limits shared by every part of the sheet.

/// Number of columns in a pattern.
pub const COLUMNS_MAX: usize = 64;

/// Number of patterns in a module.
pub const PATTERNS_MAX: usize = 1024;

/// Number of instances a single pattern may have.
pub const PAT_INSTANCES_MAX: usize = 1023;

/// Number of songs in the album. Each song is shown as one track.
pub const SONGS_MAX: usize = 256;
pub const TRACKS_MAX: usize = SONGS_MAX;

/// Number of pattern instances in one song's order list.
pub const SYSTEMS_MAX: usize = 1024;

/// Number of grid line styles; style 0 is the anchor.
pub const STYLE_COUNT: usize = 9;

/// Rational denominator of [`crate::Tstamp`].
pub const TSTAMP_BEAT: i64 = 882_161_280;

/// Longest allowed pattern, in beats.
pub const PAT_LENGTH_MAX_BEATS: i64 = 1024;

/// Longest allowed trigger type name.
pub const TRIGGER_TYPE_LENGTH_MAX: usize = 15;
