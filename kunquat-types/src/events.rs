//! Trigger event catalogue.
//!
//! The set of trigger types is closed: every trigger stored in a column must
//! name one of the events below, and its argument must parse as the event's
//! [`ArgType`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::limits::{PATTERNS_MAX, PAT_INSTANCES_MAX};

/// Kind of argument a trigger event takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    #[serde(rename = "null")]
    None,
    Bool,
    Int,
    Float,
    Tstamp,
    String,
    Pitch,
    Pat,
    Realtime,
    MaybeString,
    MaybeRealtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    General,
    Control,
    Master,
    Channel,
    AudioUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub name: &'static str,
    pub arg_type: ArgType,
    pub category: EventCategory,
}

/// Trigger type of a note-on; argument is a pitch in cents.
pub const NOTE_ON: &str = "n+";
/// Trigger type of a hit; argument is the hit index.
pub const HIT: &str = "h";
pub const NOTE_OFF: &str = "n-";
/// Trigger type that selects the control (audio unit input) of a channel.
pub const SET_CONTROL: &str = ".a";

macro_rules! ev {
    ($name:expr, $arg:ident, $cat:ident) => {
        TriggerEvent {
            name: $name,
            arg_type: ArgType::$arg,
            category: EventCategory::$cat,
        }
    };
}

pub static TRIGGER_EVENTS: &[TriggerEvent] = &[
    ev!("#", String, General),
    ev!("?", Bool, General),
    ev!("?if", Bool, General),
    ev!("?else", None, General),
    ev!("?end", None, General),
    ev!("signal", String, General),
    ev!("call", MaybeString, General),
    ev!("cpause", None, Control),
    ev!("cresume", None, Control),
    ev!("cpattern", Pat, Control),
    ev!("cinfinite+", None, Control),
    ev!("cinfinite-", None, Control),
    ev!("m.t", Float, Master),
    ev!("m/t", Float, Master),
    ev!("m/=t", Tstamp, Master),
    ev!("m.v", Float, Master),
    ev!("m/v", Float, Master),
    ev!("m/=v", Tstamp, Master),
    ev!("mpd", Tstamp, Master),
    ev!("m.jc", Int, Master),
    ev!("m.jr", Tstamp, Master),
    ev!("m.jp", Pat, Master),
    ev!("mj", None, Master),
    ev!("m.s", Int, Master),
    ev!("m.so", Float, Master),
    ev!(SET_CONTROL, Int, Channel),
    ev!(NOTE_ON, Pitch, Channel),
    ev!(HIT, Int, Channel),
    ev!(NOTE_OFF, None, Channel),
    ev!(".f", Float, Channel),
    ev!("/f", Float, Channel),
    ev!("/=f", Tstamp, Channel),
    ev!("ts", Float, Channel),
    ev!("td", Float, Channel),
    ev!("/p", Pitch, Channel),
    ev!("/=p", Tstamp, Channel),
    ev!("vs", Float, Channel),
    ev!("vd", Float, Channel),
    ev!(".x", MaybeString, Channel),
    ev!("->f+", None, Channel),
    ev!("->f-", None, Channel),
    ev!("->p+", None, Channel),
    ev!("->p-", None, Channel),
    ev!(".s", Float, Channel),
    ev!("/s", Float, Channel),
    ev!("/=s", Tstamp, Channel),
    ev!(".sn", MaybeString, Channel),
    ev!(".dn", MaybeString, Channel),
    ev!("d", MaybeRealtime, Channel),
    ev!("a.sus", Float, AudioUnit),
    ev!("a.v", Realtime, AudioUnit),
];

/// Pairs of event names that can be converted into each other
/// (`set` form first, `slide` form second).
static SET_SLIDE_PAIRS: &[(&str, &str)] = &[
    (".f", "/f"),
    (".s", "/s"),
    ("m.t", "m/t"),
    ("m.v", "m/v"),
];

pub fn trigger_event_by_name(name: &str) -> Option<&'static TriggerEvent> {
    TRIGGER_EVENTS.iter().find(|ev| ev.name == name)
}

pub fn is_valid_trigger_type(name: &str) -> bool {
    trigger_event_by_name(name).is_some()
}

/// The other half of a set/slide pair, if `name` belongs to one.
pub fn set_slide_counterpart(name: &str) -> Option<&'static str> {
    SET_SLIDE_PAIRS.iter().find_map(|&(set, slide)| {
        if name == set {
            Some(slide)
        } else if name == slide {
            Some(set)
        } else {
            None
        }
    })
}

/// Check a trigger's argument against the catalogue.
pub fn validate_trigger(trigger_type: &str, argument: Option<&str>) -> Result<(), ArgError> {
    let event = trigger_event_by_name(trigger_type)
        .ok_or_else(|| ArgError::UnknownType(trigger_type.to_string()))?;
    event.arg_type.validate(argument)
}

/// Rejected trigger argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    UnknownType(String),
    Missing(ArgType),
    Unexpected(String),
    Invalid { kind: ArgType, text: String },
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "unknown trigger type '{}'", name),
            Self::Missing(kind) => write!(f, "missing {:?} argument", kind),
            Self::Unexpected(text) => write!(f, "unexpected argument '{}'", text),
            Self::Invalid { kind, text } => write!(f, "'{}' is not a valid {:?}", text, kind),
        }
    }
}

impl std::error::Error for ArgError {}

impl ArgType {
    pub fn takes_argument(self) -> bool {
        self != ArgType::None
    }

    /// Default argument inserted when a new trigger of this kind is typed in.
    pub fn example_argument(self) -> Option<&'static str> {
        match self {
            ArgType::None => None,
            ArgType::Bool => Some("true"),
            ArgType::Int | ArgType::Float | ArgType::Tstamp | ArgType::Pitch => Some("0"),
            ArgType::Realtime => Some("0"),
            ArgType::Pat => Some("[0, 0]"),
            ArgType::String | ArgType::MaybeString | ArgType::MaybeRealtime => Some(""),
        }
    }

    pub fn validate(self, argument: Option<&str>) -> Result<(), ArgError> {
        let text = match (self, argument) {
            (ArgType::None, None) => return Ok(()),
            (ArgType::None, Some(text)) => return Err(ArgError::Unexpected(text.to_string())),
            (kind, None) => return Err(ArgError::Missing(kind)),
            (_, Some(text)) => text,
        };
        let ok = match self {
            ArgType::None => false,
            ArgType::Bool => parse_bool(text).is_some(),
            ArgType::Int => parse_int(text).is_some(),
            ArgType::Float | ArgType::Pitch => parse_float(text).is_some(),
            ArgType::Tstamp => parse_tstamp_literal(text),
            ArgType::String | ArgType::MaybeString => true,
            ArgType::Pat => parse_pat(text).is_some(),
            ArgType::Realtime => is_realtime(text),
            ArgType::MaybeRealtime => text.trim().is_empty() || is_realtime(text),
        };
        if ok {
            Ok(())
        } else {
            Err(ArgError::Invalid {
                kind: self,
                text: text.to_string(),
            })
        }
    }
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_int_pair(text: &str) -> Option<(i64, i64)> {
    serde_json::from_str::<(i64, i64)>(text.trim()).ok()
}

fn parse_tstamp_literal(text: &str) -> bool {
    parse_float(text).is_some() || parse_int_pair(text).is_some()
}

/// Parse a `[pattern, instance]` reference.
pub fn parse_pat(text: &str) -> Option<(usize, usize)> {
    let (pat, inst) = parse_int_pair(text)?;
    if (0..PATTERNS_MAX as i64).contains(&pat) && (0..PAT_INSTANCES_MAX as i64).contains(&inst) {
        Some((pat as usize, inst as usize))
    } else {
        None
    }
}

fn is_realtime(text: &str) -> bool {
    parse_bool(text).is_some() || parse_float(text).is_some() || parse_int_pair(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(trigger_event_by_name("n+").map(|e| e.arg_type), Some(ArgType::Pitch));
        assert_eq!(trigger_event_by_name("n-").map(|e| e.arg_type), Some(ArgType::None));
        assert!(trigger_event_by_name("nope").is_none());
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in TRIGGER_EVENTS.iter().enumerate() {
            for b in &TRIGGER_EVENTS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn none_kind_rejects_argument() {
        assert!(validate_trigger("n-", None).is_ok());
        assert_eq!(
            validate_trigger("n-", Some("1")),
            Err(ArgError::Unexpected("1".into()))
        );
    }

    #[test]
    fn valued_kinds_require_argument() {
        assert_eq!(validate_trigger("n+", None), Err(ArgError::Missing(ArgType::Pitch)));
        assert!(validate_trigger("n+", Some("-1200")).is_ok());
        assert!(validate_trigger("n+", Some("abc")).is_err());
    }

    #[test]
    fn specific_kinds() {
        assert!(ArgType::Bool.validate(Some("false")).is_ok());
        assert!(ArgType::Bool.validate(Some("1")).is_err());
        assert!(ArgType::Int.validate(Some("12")).is_ok());
        assert!(ArgType::Int.validate(Some("1.5")).is_err());
        assert!(ArgType::Tstamp.validate(Some("[1, 0]")).is_ok());
        assert!(ArgType::Tstamp.validate(Some("0.25")).is_ok());
        assert!(ArgType::Pat.validate(Some("[3, 1]")).is_ok());
        assert!(ArgType::Pat.validate(Some("[3000, 1]")).is_err());
        assert!(ArgType::Realtime.validate(Some("true")).is_ok());
        assert!(ArgType::MaybeRealtime.validate(Some("")).is_ok());
        assert!(ArgType::Realtime.validate(Some("")).is_err());
        assert!(ArgType::Float.validate(Some("inf")).is_err());
    }

    #[test]
    fn example_arguments_validate() {
        for ev in TRIGGER_EVENTS {
            let example = ev.arg_type.example_argument();
            assert!(ev.arg_type.validate(example).is_ok(), "example for {}", ev.name);
        }
    }

    #[test]
    fn set_slide_pairs_are_symmetric() {
        assert_eq!(set_slide_counterpart(".f"), Some("/f"));
        assert_eq!(set_slide_counterpart("/f"), Some(".f"));
        assert_eq!(set_slide_counterpart("n+"), None);
        for &(set, slide) in SET_SLIDE_PAIRS {
            assert_eq!(
                trigger_event_by_name(set).map(|e| e.arg_type),
                trigger_event_by_name(slide).map(|e| e.arg_type)
            );
        }
    }
}
