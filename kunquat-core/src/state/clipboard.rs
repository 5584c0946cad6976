//! Clipboard payloads for sheet areas.
//!
//! Two self-describing JSON shapes:
//!
//! ```json
//! {"type": "trow_slice", "triggers": [["n+", "0"], ["n-", null]]}
//! {"type": "rect", "width": 2, "height": [2, 0],
//!  "col_00": {"[1, 0]": [["n+", "0"]]}, "col_01": {"[1, 0]": [["n-", null]]}}
//! ```

use std::fmt;

use serde_json::{Map, Value};

use kunquat_types::limits::COLUMNS_MAX;
use kunquat_types::{events, ArgError, Trigger, Tstamp};

use super::column::TriggerRows;

pub const MIME_TYPE: &str = "application/json";

const TYPE_ROW_SLICE: &str = "trow_slice";
const TYPE_RECT: &str = "rect";

#[derive(Debug)]
pub enum ClipboardError {
    Json(serde_json::Error),
    UnknownType(String),
    UnknownTrigger(String),
    BadArgument { trigger_type: String, error: ArgError },
    ColumnOutOfRange(usize),
    RowOutOfRange(Tstamp),
    BadWidth(usize),
    BadHeight(Tstamp),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "malformed payload: {}", e),
            Self::UnknownType(t) => write!(f, "unknown area type '{}'", t),
            Self::UnknownTrigger(t) => write!(f, "unknown trigger type '{}'", t),
            Self::BadArgument {
                trigger_type,
                error,
            } => write!(f, "bad argument for '{}': {}", trigger_type, error),
            Self::ColumnOutOfRange(col) => write!(f, "column {} outside area", col),
            Self::RowOutOfRange(ts) => write!(f, "row {} outside area", ts),
            Self::BadWidth(w) => write!(f, "invalid area width {}", w),
            Self::BadHeight(h) => write!(f, "invalid area height {}", h),
        }
    }
}

impl std::error::Error for ClipboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::BadArgument { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClipboardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// A copied area.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardContents {
    /// Consecutive triggers of one row.
    RowSlice(Vec<Trigger>),
    /// Rows of `width` columns, times relative to the area start.
    Rect {
        width: usize,
        height: Tstamp,
        columns: Vec<TriggerRows>,
    },
}

/// In-process clipboard holding the last serialized area.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    pub contents: Option<String>,
}

impl Clipboard {
    pub fn set(&mut self, data: String) {
        self.contents = Some(data);
    }

    pub fn data(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_none()
    }
}

fn trigger_value(trigger: &Trigger) -> Value {
    Value::Array(vec![
        Value::String(trigger.trigger_type().to_string()),
        trigger
            .argument()
            .map_or(Value::Null, |a| Value::String(a.to_string())),
    ])
}

fn tstamp_key(ts: Tstamp) -> String {
    format!("[{}, {}]", ts.beats(), ts.rem())
}

pub fn serialize(contents: &ClipboardContents) -> Result<String, ClipboardError> {
    let mut root = Map::new();
    match contents {
        ClipboardContents::RowSlice(triggers) => {
            root.insert("type".into(), Value::String(TYPE_ROW_SLICE.into()));
            root.insert(
                "triggers".into(),
                Value::Array(triggers.iter().map(trigger_value).collect()),
            );
        }
        ClipboardContents::Rect {
            width,
            height,
            columns,
        } => {
            root.insert("type".into(), Value::String(TYPE_RECT.into()));
            root.insert("width".into(), Value::from(*width));
            root.insert("height".into(), serde_json::to_value(height)?);
            for (rel_col, rows) in columns.iter().enumerate() {
                if rows.is_empty() {
                    continue;
                }
                let mut col = Map::new();
                for (ts, list) in rows {
                    col.insert(
                        tstamp_key(*ts),
                        Value::Array(list.iter().map(trigger_value).collect()),
                    );
                }
                root.insert(format!("col_{:02x}", rel_col), Value::Object(col));
            }
        }
    }
    Ok(serde_json::to_string(&Value::Object(root))?)
}

fn checked_trigger(raw: (String, Option<String>)) -> Result<Trigger, ClipboardError> {
    let (trigger_type, argument) = raw;
    if !events::is_valid_trigger_type(&trigger_type) {
        return Err(ClipboardError::UnknownTrigger(trigger_type));
    }
    Trigger::checked(&trigger_type, argument.as_deref())
        .map_err(|error| ClipboardError::BadArgument {
            trigger_type,
            error,
        })
}

fn trigger_list(value: Value) -> Result<Vec<Trigger>, ClipboardError> {
    let raw: Vec<(String, Option<String>)> = serde_json::from_value(value)?;
    raw.into_iter().map(checked_trigger).collect()
}

/// Parse and validate a payload.
pub fn deserialize(data: &str) -> Result<ClipboardContents, ClipboardError> {
    let mut root: Map<String, Value> = serde_json::from_str(data)?;
    let area_type: String = serde_json::from_value(root.remove("type").unwrap_or(Value::Null))?;
    match area_type.as_str() {
        TYPE_ROW_SLICE => {
            let triggers = trigger_list(root.remove("triggers").unwrap_or(Value::Null))?;
            Ok(ClipboardContents::RowSlice(triggers))
        }
        TYPE_RECT => {
            let width: usize = serde_json::from_value(root.remove("width").unwrap_or(Value::Null))?;
            if width == 0 || width > COLUMNS_MAX {
                return Err(ClipboardError::BadWidth(width));
            }
            let height: Tstamp =
                serde_json::from_value(root.remove("height").unwrap_or(Value::Null))?;
            if height <= Tstamp::ZERO {
                return Err(ClipboardError::BadHeight(height));
            }

            let mut columns = vec![TriggerRows::new(); width];
            for (key, value) in root {
                let Some(hex) = key.strip_prefix("col_") else {
                    continue;
                };
                let Ok(rel_col) = usize::from_str_radix(hex, 16) else {
                    continue;
                };
                if rel_col >= width {
                    return Err(ClipboardError::ColumnOutOfRange(rel_col));
                }
                let rows: Map<String, Value> = serde_json::from_value(value)?;
                for (ts_text, list) in rows {
                    let rel_ts: Tstamp = serde_json::from_str(&ts_text)?;
                    if rel_ts.is_negative() || rel_ts >= height {
                        return Err(ClipboardError::RowOutOfRange(rel_ts));
                    }
                    let triggers = trigger_list(list)?;
                    if !triggers.is_empty() {
                        columns[rel_col].insert(rel_ts, triggers);
                    }
                }
            }
            Ok(ClipboardContents::Rect {
                width,
                height,
                columns,
            })
        }
        _ => Err(ClipboardError::UnknownType(area_type)),
    }
}
