//! Named grid patterns stored under `i_grid_patterns.json`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use kunquat_types::limits::STYLE_COUNT;
use kunquat_types::Tstamp;

use super::keys;
use super::store::{encode, Store, Transaction};

/// Id under which the built-in grid is reported. Never stored.
pub const DEFAULT_GRID_PATTERN_ID: &str = "";

#[derive(Debug, Clone, PartialEq)]
pub enum GridPatternError {
    LengthTooShort(Tstamp),
    NegativeOffset(Tstamp),
    LineOutOfRange(Tstamp),
    LinesNotAscending,
    MissingMajorLine,
    MultipleMajorLines,
    InvalidStyle(usize),
    InvalidSpacing { style: usize, value: f64 },
    UnknownId(String),
    DuplicateId(String),
    LineNotFound(Tstamp),
}

impl fmt::Display for GridPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthTooShort(len) => write!(f, "length {} is shorter than one beat", len),
            Self::NegativeOffset(off) => write!(f, "negative offset {}", off),
            Self::LineOutOfRange(ts) => write!(f, "line at {} is outside the pattern", ts),
            Self::LinesNotAscending => write!(f, "lines are not in ascending order"),
            Self::MissingMajorLine => write!(f, "no line has style 0"),
            Self::MultipleMajorLines => write!(f, "more than one line has style 0"),
            Self::InvalidStyle(style) => write!(f, "invalid style {}", style),
            Self::InvalidSpacing { style, value } => {
                write!(f, "invalid spacing {} for style {}", value, style)
            }
            Self::UnknownId(id) => write!(f, "unknown grid pattern '{}'", id),
            Self::DuplicateId(id) => write!(f, "grid pattern '{}' already exists", id),
            Self::LineNotFound(ts) => write!(f, "no line at {}", ts),
        }
    }
}

impl std::error::Error for GridPatternError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLine {
    pub ts: Tstamp,
    pub style: usize,
}

/// Stored as `[[beats, rem], style]`.
#[derive(Serialize, Deserialize)]
struct RawLine(Tstamp, usize);

#[derive(Serialize, Deserialize)]
struct RawGridPattern {
    name: String,
    length: Tstamp,
    #[serde(default)]
    offset: Tstamp,
    min_style_spacing: Vec<f64>,
    lines: Vec<RawLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridPattern {
    pub name: String,
    pub length: Tstamp,
    pub offset: Tstamp,
    /// Per style, in trigger row heights.
    pub min_style_spacing: [f64; STYLE_COUNT],
    pub lines: Vec<GridLine>,
}

impl Default for GridPattern {
    /// One beat divided down to 32nd notes.
    fn default() -> Self {
        let beat = Tstamp::from_beats(1);
        let mut lines = Vec::new();
        for i in 0..8 {
            let style = match i {
                0 => 0,
                4 => 2,
                2 | 6 => 3,
                _ => 4,
            };
            lines.push(GridLine {
                ts: beat * i / 8,
                style,
            });
        }
        Self {
            name: "Default".to_string(),
            length: beat,
            offset: Tstamp::ZERO,
            min_style_spacing: [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.2, 1.4, 1.6],
            lines,
        }
    }
}

impl GridPattern {
    pub fn validate(&self) -> Result<(), GridPatternError> {
        if self.length < Tstamp::from_beats(1) {
            return Err(GridPatternError::LengthTooShort(self.length));
        }
        if self.offset.is_negative() {
            return Err(GridPatternError::NegativeOffset(self.offset));
        }
        for (style, &value) in self.min_style_spacing.iter().enumerate() {
            if !(value > 0.0 && value.is_finite()) {
                return Err(GridPatternError::InvalidSpacing { style, value });
            }
        }
        let mut majors = 0;
        for (i, line) in self.lines.iter().enumerate() {
            if line.ts.is_negative() || line.ts >= self.length {
                return Err(GridPatternError::LineOutOfRange(line.ts));
            }
            if line.style >= STYLE_COUNT {
                return Err(GridPatternError::InvalidStyle(line.style));
            }
            if i > 0 && self.lines[i - 1].ts >= line.ts {
                return Err(GridPatternError::LinesNotAscending);
            }
            if line.style == 0 {
                majors += 1;
            }
        }
        match majors {
            0 => Err(GridPatternError::MissingMajorLine),
            1 => Ok(()),
            _ => Err(GridPatternError::MultipleMajorLines),
        }
    }

    pub fn line_at(&self, ts: Tstamp) -> Option<&GridLine> {
        self.lines.iter().find(|l| l.ts == ts)
    }

    fn from_raw(raw: RawGridPattern) -> Self {
        let mut spacing = GridPattern::default().min_style_spacing;
        for (slot, value) in spacing.iter_mut().zip(raw.min_style_spacing) {
            *slot = value;
        }
        Self {
            name: raw.name,
            length: raw.length,
            offset: raw.offset,
            min_style_spacing: spacing,
            lines: raw
                .lines
                .into_iter()
                .map(|RawLine(ts, style)| GridLine { ts, style })
                .collect(),
        }
    }

    fn to_raw(&self) -> RawGridPattern {
        RawGridPattern {
            name: self.name.clone(),
            length: self.length,
            offset: self.offset,
            min_style_spacing: self.min_style_spacing.to_vec(),
            lines: self.lines.iter().map(|l| RawLine(l.ts, l.style)).collect(),
        }
    }
}

/// Read access to the grid pattern table.
pub struct GridPatterns<'a> {
    store: &'a Store,
}

impl<'a> GridPatterns<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    fn raw_table(&self) -> BTreeMap<String, RawGridPattern> {
        self.store
            .get_as::<BTreeMap<String, RawGridPattern>>(keys::GRID_PATTERNS)
            .unwrap_or_default()
    }

    /// Valid stored grid patterns. Invalid records are logged and skipped.
    pub fn all(&self) -> BTreeMap<String, GridPattern> {
        let mut out = BTreeMap::new();
        for (id, raw) in self.raw_table() {
            let gp = GridPattern::from_raw(raw);
            match gp.validate() {
                Ok(()) => {
                    out.insert(id, gp);
                }
                Err(e) => {
                    log::warn!(target: "grid", "ignoring invalid grid pattern {}: {}", id, e);
                }
            }
        }
        out
    }

    pub fn ids(&self) -> Vec<String> {
        self.all().into_keys().collect()
    }

    pub fn get(&self, gp_id: &str) -> Option<GridPattern> {
        self.all().remove(gp_id)
    }

    /// The named grid pattern, or the built-in one for missing or unknown ids.
    pub fn resolve(&self, gp_id: Option<&str>) -> GridPattern {
        gp_id.and_then(|id| self.get(id)).unwrap_or_default()
    }

    pub fn edit_set(&self, gp_id: &str, gp: &GridPattern) -> Result<Transaction, GridPatternError> {
        gp.validate()?;
        let mut table = self.raw_table();
        table.insert(gp_id.to_string(), gp.to_raw());
        Ok(self.with_table(&table))
    }

    pub fn edit_remove(&self, gp_id: &str) -> Result<Transaction, GridPatternError> {
        let mut table = self.raw_table();
        if table.remove(gp_id).is_none() {
            return Err(GridPatternError::UnknownId(gp_id.to_string()));
        }
        Ok(self.with_table(&table))
    }

    fn with_table(&self, table: &BTreeMap<String, RawGridPattern>) -> Transaction {
        let mut tr = Transaction::new();
        let value = if table.is_empty() { None } else { encode(table) };
        tr.insert(keys::GRID_PATTERNS.to_string(), value);
        tr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kunquat_types::ts;

    fn four_beats() -> GridPattern {
        GridPattern {
            name: "Four".into(),
            length: ts(4, 0),
            offset: Tstamp::ZERO,
            min_style_spacing: [0.5; STYLE_COUNT],
            lines: vec![
                GridLine { ts: ts(0, 0), style: 0 },
                GridLine { ts: ts(1, 0), style: 1 },
                GridLine { ts: ts(2, 0), style: 1 },
                GridLine { ts: ts(3, 0), style: 1 },
            ],
        }
    }

    #[test]
    fn default_is_valid() {
        assert_eq!(GridPattern::default().validate(), Ok(()));
    }

    #[test]
    fn validation_catches_bad_models() {
        let mut gp = four_beats();
        gp.lines[1].style = 0;
        assert_eq!(gp.validate(), Err(GridPatternError::MultipleMajorLines));

        let mut gp = four_beats();
        gp.lines.remove(0);
        assert_eq!(gp.validate(), Err(GridPatternError::MissingMajorLine));

        let mut gp = four_beats();
        gp.lines.swap(1, 2);
        assert_eq!(gp.validate(), Err(GridPatternError::LinesNotAscending));

        let mut gp = four_beats();
        gp.lines[3].ts = ts(4, 0);
        assert_eq!(gp.validate(), Err(GridPatternError::LineOutOfRange(ts(4, 0))));

        let mut gp = four_beats();
        gp.length = ts(0, 1);
        assert!(matches!(gp.validate(), Err(GridPatternError::LengthTooShort(_))));
    }

    #[test]
    fn stored_table_round_trip() {
        let mut store = Store::new();
        let tr = GridPatterns::new(&store).edit_set("four", &four_beats()).unwrap();
        store.apply(&tr);
        let table = GridPatterns::new(&store);
        assert_eq!(table.ids(), vec!["four".to_string()]);
        assert_eq!(table.get("four"), Some(four_beats()));
        assert_eq!(table.resolve(Some("missing")), GridPattern::default());

        let tr = table.edit_remove("four").unwrap();
        store.apply(&tr);
        assert!(!store.contains(keys::GRID_PATTERNS));
    }

    #[test]
    fn invalid_edit_is_refused() {
        let store = Store::new();
        let mut gp = four_beats();
        gp.lines.clear();
        assert!(GridPatterns::new(&store).edit_set("x", &gp).is_err());
        assert!(GridPatterns::new(&store).edit_remove("x").is_err());
    }

    #[test]
    fn stored_record_shape() {
        let mut store = Store::new();
        let tr = GridPatterns::new(&store).edit_set("four", &four_beats()).unwrap();
        store.apply(&tr);
        let value = store.get(keys::GRID_PATTERNS).unwrap();
        assert_eq!(value["four"]["length"], serde_json::json!([4, 0]));
        assert_eq!(value["four"]["lines"][1], serde_json::json!([[1, 0], 1]));
    }
}
