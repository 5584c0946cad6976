use std::path::{Path, PathBuf};

use serde::Deserialize;

use kunquat_types::limits::STYLE_COUNT;

use crate::render::pixmap::Rgb;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    sheet: SheetFile,
    #[serde(default)]
    colours: ColoursFile,
}

#[derive(Deserialize, Default)]
struct SheetFile {
    tr_height: Option<u32>,
    trs_per_beat: Option<u32>,
    zoom_factor: Option<f64>,
    zoom_min: Option<i32>,
    zoom_max: Option<i32>,
    col_width: Option<u32>,
    col_width_factor: Option<f64>,
    col_width_min: Option<i32>,
    col_width_max: Option<i32>,
    char_width: Option<u32>,
    field_padding: Option<u32>,
    min_snap_dist: Option<i64>,
    pixmap_height: Option<u32>,
    cache_screens: Option<u32>,
    row_image_capacity: Option<usize>,
    inactive_dim: Option<f32>,
    ruler_width: Option<u32>,
    ruler_min_tick_spacing: Option<u32>,
    ruler_min_number_spacing: Option<u32>,
    history_max_steps: Option<usize>,
    snap_delay: Option<u32>,
    max_move_delta: Option<i64>,
    grid_stops_at_triggers: Option<bool>,
}

#[derive(Deserialize, Default)]
struct ColoursFile {
    background: Option<String>,
    border: Option<String>,
    grid: Option<Vec<String>>,
    trigger_type: Option<String>,
    trigger_argument: Option<String>,
    trigger_warning: Option<String>,
    trigger_default: Option<String>,
    cursor: Option<String>,
    cursor_guide: Option<String>,
    selection: Option<String>,
    playback_cursor: Option<String>,
    ruler_background: Option<String>,
    ruler_foreground: Option<String>,
}

/// Resolved sheet geometry and cache settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetConfig {
    /// Pixel height of one trigger row.
    pub tr_height: u32,
    /// Trigger rows per beat at zoom level 0.
    pub trs_per_beat: u32,
    pub zoom_factor: f64,
    pub zoom_min: i32,
    pub zoom_max: i32,
    /// Column width in pixels at width level 0.
    pub col_width: u32,
    pub col_width_factor: f64,
    pub col_width_min: i32,
    pub col_width_max: i32,
    pub char_width: u32,
    pub field_padding: u32,
    /// Distance in pixels the edit cursor keeps from the viewport edges.
    pub min_snap_dist: i64,
    pub pixmap_height: u32,
    /// Pixmap memory budget, in viewports.
    pub cache_screens: u32,
    pub row_image_capacity: usize,
    pub inactive_dim: f32,
    pub ruler_width: u32,
    pub ruler_min_tick_spacing: u32,
    pub ruler_min_number_spacing: u32,
    pub history_max_steps: usize,
    pub snap_delay: u32,
    pub max_move_delta: i64,
    /// Vertical grid steps also stop at trigger rows between grid lines.
    pub grid_stops_at_triggers: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            tr_height: 16,
            trs_per_beat: 4,
            zoom_factor: 1.2,
            zoom_min: -12,
            zoom_max: 12,
            col_width: 128,
            col_width_factor: 1.1,
            col_width_min: -8,
            col_width_max: 8,
            char_width: 8,
            field_padding: 2,
            min_snap_dist: 64,
            pixmap_height: 256,
            cache_screens: 4,
            row_image_capacity: 1024,
            inactive_dim: 0.6,
            ruler_width: 40,
            ruler_min_tick_spacing: 6,
            ruler_min_number_spacing: 24,
            history_max_steps: 1000,
            snap_delay: 7,
            max_move_delta: 16,
            grid_stops_at_triggers: false,
        }
    }
}

impl SheetConfig {
    /// Pixels per beat at zoom level 0.
    pub fn default_px_per_beat(&self) -> f64 {
        (self.tr_height * self.trs_per_beat) as f64
    }
}

/// Resolved sheet colours.
#[derive(Debug, Clone, PartialEq)]
pub struct Colours {
    pub background: Rgb,
    pub border: Rgb,
    pub grid: [Rgb; STYLE_COUNT],
    pub trigger_type: Rgb,
    pub trigger_argument: Rgb,
    pub trigger_warning: Rgb,
    pub trigger_default: Rgb,
    pub cursor: Rgb,
    pub cursor_guide: Rgb,
    pub selection: Rgb,
    pub playback_cursor: Rgb,
    pub ruler_background: Rgb,
    pub ruler_foreground: Rgb,
}

impl Default for Colours {
    fn default() -> Self {
        let mut grid = [Rgb(0x262626); STYLE_COUNT];
        for (i, c) in [0xaaaaaa, 0x8c8c8c, 0x767676, 0x626262, 0x525252, 0x444444, 0x383838, 0x2e2e2e]
            .into_iter()
            .enumerate()
        {
            grid[i] = Rgb(c);
        }
        Self {
            background: Rgb(0x000000),
            border: Rgb(0x222222),
            grid,
            trigger_type: Rgb(0xddccbb),
            trigger_argument: Rgb(0xbbddcc),
            trigger_warning: Rgb(0xff5555),
            trigger_default: Rgb(0xcccccc),
            cursor: Rgb(0xeeaa66),
            cursor_guide: Rgb(0x7f5533),
            selection: Rgb(0x3355aa),
            playback_cursor: Rgb(0x66ee66),
            ruler_background: Rgb(0x112233),
            ruler_foreground: Rgb(0xaaccff),
        }
    }
}

pub struct Config {
    sheet: SheetFile,
    colours: ColoursFile,
}

impl Config {
    /// Embedded defaults overridden by the user's `sheet.toml`, if any.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::embedded(),
        }
    }

    /// Embedded defaults overridden by the file at `path`. Unreadable or
    /// malformed files are logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::embedded();
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => config.merge(user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
        config
    }

    /// Embedded defaults overridden by a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let user = toml::from_str::<ConfigFile>(contents)?;
        let mut config = Self::embedded();
        config.merge(user);
        Ok(config)
    }

    fn embedded() -> Self {
        let base = match toml::from_str::<ConfigFile>(DEFAULT_CONFIG) {
            Ok(base) => base,
            Err(e) => {
                log::error!(target: "config", "embedded config is malformed: {}", e);
                ConfigFile::default()
            }
        };
        Config {
            sheet: base.sheet,
            colours: base.colours,
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_sheet(&mut self.sheet, user.sheet);
        merge_colours(&mut self.colours, user.colours);
    }

    pub fn sheet(&self) -> SheetConfig {
        let fallback = SheetConfig::default();
        let s = &self.sheet;
        let mut config = SheetConfig {
            tr_height: s.tr_height.unwrap_or(fallback.tr_height).max(1),
            trs_per_beat: s.trs_per_beat.unwrap_or(fallback.trs_per_beat).max(1),
            zoom_factor: s.zoom_factor.unwrap_or(fallback.zoom_factor),
            zoom_min: s.zoom_min.unwrap_or(fallback.zoom_min),
            zoom_max: s.zoom_max.unwrap_or(fallback.zoom_max),
            col_width: s.col_width.unwrap_or(fallback.col_width).max(8),
            col_width_factor: s.col_width_factor.unwrap_or(fallback.col_width_factor),
            col_width_min: s.col_width_min.unwrap_or(fallback.col_width_min),
            col_width_max: s.col_width_max.unwrap_or(fallback.col_width_max),
            char_width: s.char_width.unwrap_or(fallback.char_width).max(1),
            field_padding: s.field_padding.unwrap_or(fallback.field_padding),
            min_snap_dist: s.min_snap_dist.unwrap_or(fallback.min_snap_dist).max(0),
            pixmap_height: s.pixmap_height.unwrap_or(fallback.pixmap_height).max(16),
            cache_screens: s.cache_screens.unwrap_or(fallback.cache_screens).max(1),
            row_image_capacity: s.row_image_capacity.unwrap_or(fallback.row_image_capacity).max(1),
            inactive_dim: s.inactive_dim.unwrap_or(fallback.inactive_dim).clamp(0.0, 1.0),
            ruler_width: s.ruler_width.unwrap_or(fallback.ruler_width),
            ruler_min_tick_spacing: s
                .ruler_min_tick_spacing
                .unwrap_or(fallback.ruler_min_tick_spacing)
                .max(1),
            ruler_min_number_spacing: s
                .ruler_min_number_spacing
                .unwrap_or(fallback.ruler_min_number_spacing)
                .max(1),
            history_max_steps: s.history_max_steps.unwrap_or(fallback.history_max_steps).max(1),
            snap_delay: s.snap_delay.unwrap_or(fallback.snap_delay),
            max_move_delta: s.max_move_delta.unwrap_or(fallback.max_move_delta).max(1),
            grid_stops_at_triggers: s
                .grid_stops_at_triggers
                .unwrap_or(fallback.grid_stops_at_triggers),
        };
        if config.zoom_factor <= 1.0 || !config.zoom_factor.is_finite() {
            config.zoom_factor = fallback.zoom_factor;
        }
        if config.col_width_factor <= 1.0 || !config.col_width_factor.is_finite() {
            config.col_width_factor = fallback.col_width_factor;
        }
        if config.zoom_min > config.zoom_max {
            std::mem::swap(&mut config.zoom_min, &mut config.zoom_max);
        }
        if config.col_width_min > config.col_width_max {
            std::mem::swap(&mut config.col_width_min, &mut config.col_width_max);
        }
        config
    }

    pub fn colours(&self) -> Colours {
        let fallback = Colours::default();
        let c = &self.colours;
        let pick = |value: &Option<String>, fallback: Rgb| {
            value.as_deref().and_then(parse_colour).unwrap_or(fallback)
        };
        let mut grid = fallback.grid;
        if let Some(list) = &c.grid {
            for (slot, text) in grid.iter_mut().zip(list) {
                if let Some(colour) = parse_colour(text) {
                    *slot = colour;
                }
            }
        }
        Colours {
            background: pick(&c.background, fallback.background),
            border: pick(&c.border, fallback.border),
            grid,
            trigger_type: pick(&c.trigger_type, fallback.trigger_type),
            trigger_argument: pick(&c.trigger_argument, fallback.trigger_argument),
            trigger_warning: pick(&c.trigger_warning, fallback.trigger_warning),
            trigger_default: pick(&c.trigger_default, fallback.trigger_default),
            cursor: pick(&c.cursor, fallback.cursor),
            cursor_guide: pick(&c.cursor_guide, fallback.cursor_guide),
            selection: pick(&c.selection, fallback.selection),
            playback_cursor: pick(&c.playback_cursor, fallback.playback_cursor),
            ruler_background: pick(&c.ruler_background, fallback.ruler_background),
            ruler_foreground: pick(&c.ruler_foreground, fallback.ruler_foreground),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::embedded()
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kunquat").join("sheet.toml"))
}

macro_rules! merge_fields {
    ($base:expr, $user:expr, $($field:ident),+ $(,)?) => {
        $(
            if $user.$field.is_some() {
                $base.$field = $user.$field;
            }
        )+
    };
}

fn merge_sheet(base: &mut SheetFile, user: SheetFile) {
    merge_fields!(
        base,
        user,
        tr_height,
        trs_per_beat,
        zoom_factor,
        zoom_min,
        zoom_max,
        col_width,
        col_width_factor,
        col_width_min,
        col_width_max,
        char_width,
        field_padding,
        min_snap_dist,
        pixmap_height,
        cache_screens,
        row_image_capacity,
        inactive_dim,
        ruler_width,
        ruler_min_tick_spacing,
        ruler_min_number_spacing,
        history_max_steps,
        snap_delay,
        max_move_delta,
        grid_stops_at_triggers,
    );
}

fn merge_colours(base: &mut ColoursFile, user: ColoursFile) {
    merge_fields!(
        base,
        user,
        background,
        border,
        grid,
        trigger_type,
        trigger_argument,
        trigger_warning,
        trigger_default,
        cursor,
        cursor_guide,
        selection,
        playback_cursor,
        ruler_background,
        ruler_foreground,
    );
}

/// Parse `#rrggbb`.
fn parse_colour(s: &str) -> Option<Rgb> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().map(Rgb)
}
