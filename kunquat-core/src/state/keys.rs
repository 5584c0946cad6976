//! Persistent store key formats.

use std::sync::LazyLock;

use regex::Regex;

pub const GRID_PATTERNS: &str = "i_grid_patterns.json";
pub const ALBUM_MANIFEST: &str = "album/p_manifest.json";
pub const ALBUM_TRACKS: &str = "album/p_tracks.json";

pub fn pattern_prefix(pat_num: usize) -> String {
    format!("pat_{:03x}/", pat_num)
}

pub fn pattern_manifest(pat_num: usize) -> String {
    format!("pat_{:03x}/p_manifest.json", pat_num)
}

pub fn pattern_length(pat_num: usize) -> String {
    format!("pat_{:03x}/p_length.json", pat_num)
}

pub fn base_grid(pat_num: usize) -> String {
    format!("pat_{:03x}/i_base_grid.json", pat_num)
}

pub fn instance_manifest(pat_num: usize, inst_num: usize) -> String {
    format!("pat_{:03x}/instance_{:03x}/p_manifest.json", pat_num, inst_num)
}

pub fn column_triggers(pat_num: usize, col_num: usize) -> String {
    format!("pat_{:03x}/col_{:02x}/p_triggers.json", pat_num, col_num)
}

pub fn overlay_grids(pat_num: usize, col_num: usize) -> String {
    format!("pat_{:03x}/col_{:02x}/i_overlay_grids.json", pat_num, col_num)
}

pub fn song_manifest(song_num: usize) -> String {
    format!("song_{:02x}/p_manifest.json", song_num)
}

pub fn order_list(song_num: usize) -> String {
    format!("song_{:02x}/p_order_list.json", song_num)
}

/// A parsed store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    PatternManifest(usize),
    PatternLength(usize),
    BaseGrid(usize),
    InstanceManifest(usize, usize),
    ColumnTriggers(usize, usize),
    OverlayGrids(usize, usize),
    GridPatterns,
    AlbumManifest,
    AlbumTracks,
    SongManifest(usize),
    OrderList(usize),
}

impl StoreKey {
    /// Pattern number for keys inside a pattern directory.
    pub fn pattern(&self) -> Option<usize> {
        match *self {
            StoreKey::PatternManifest(p)
            | StoreKey::PatternLength(p)
            | StoreKey::BaseGrid(p)
            | StoreKey::InstanceManifest(p, _)
            | StoreKey::ColumnTriggers(p, _)
            | StoreKey::OverlayGrids(p, _) => Some(p),
            _ => None,
        }
    }
}

static PATTERN_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^pat_([0-9a-f]{3})/(.+)$").ok()
});

static INSTANCE_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^instance_([0-9a-f]{3})/p_manifest\.json$").ok()
});

static COLUMN_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^col_([0-9a-f]{2})/(p_triggers|i_overlay_grids)\.json$").ok()
});

static SONG_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^song_([0-9a-f]{2})/(p_manifest|p_order_list)\.json$").ok()
});

fn hex(text: &str) -> Option<usize> {
    usize::from_str_radix(text, 16).ok()
}

pub fn parse_key(key: &str) -> Option<StoreKey> {
    match key {
        GRID_PATTERNS => return Some(StoreKey::GridPatterns),
        ALBUM_MANIFEST => return Some(StoreKey::AlbumManifest),
        ALBUM_TRACKS => return Some(StoreKey::AlbumTracks),
        _ => {}
    }

    if let Some(caps) = SONG_KEY.as_ref()?.captures(key) {
        let song = hex(&caps[1])?;
        return match &caps[2] {
            "p_manifest" => Some(StoreKey::SongManifest(song)),
            _ => Some(StoreKey::OrderList(song)),
        };
    }

    let caps = PATTERN_KEY.as_ref()?.captures(key)?;
    let pat = hex(&caps[1])?;
    let rest = caps.get(2)?.as_str();
    match rest {
        "p_manifest.json" => return Some(StoreKey::PatternManifest(pat)),
        "p_length.json" => return Some(StoreKey::PatternLength(pat)),
        "i_base_grid.json" => return Some(StoreKey::BaseGrid(pat)),
        _ => {}
    }
    if let Some(inst) = INSTANCE_KEY.as_ref()?.captures(rest) {
        return Some(StoreKey::InstanceManifest(pat, hex(&inst[1])?));
    }
    let col = COLUMN_KEY.as_ref()?.captures(rest)?;
    let col_num = hex(&col[1])?;
    match &col[2] {
        "p_triggers" => Some(StoreKey::ColumnTriggers(pat, col_num)),
        _ => Some(StoreKey::OverlayGrids(pat, col_num)),
    }
}
