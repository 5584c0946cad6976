use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::events::{self, ArgError, ArgType};
use crate::TriggerPosition;

/// A single event record in a column. Immutable; edits build replacements.
///
/// `location` records where the trigger was read from and takes no part in
/// equality or hashing.
#[derive(Debug, Clone)]
pub struct Trigger {
    trigger_type: String,
    argument: Option<String>,
    location: Option<TriggerPosition>,
}

impl Trigger {
    pub fn new(trigger_type: impl Into<String>, argument: Option<String>) -> Self {
        Self {
            trigger_type: trigger_type.into(),
            argument,
            location: None,
        }
    }

    /// Build a trigger, rejecting unknown types and mismatched arguments.
    pub fn checked(trigger_type: &str, argument: Option<&str>) -> Result<Self, ArgError> {
        events::validate_trigger(trigger_type, argument)?;
        Ok(Self::new(trigger_type, argument.map(str::to_string)))
    }

    pub fn with_location(mut self, location: TriggerPosition) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_argument(&self, argument: Option<String>) -> Self {
        Self {
            trigger_type: self.trigger_type.clone(),
            argument,
            location: self.location,
        }
    }

    pub fn with_type(&self, trigger_type: &str) -> Self {
        Self {
            trigger_type: trigger_type.to_string(),
            argument: self.argument.clone(),
            location: self.location,
        }
    }

    pub fn trigger_type(&self) -> &str {
        &self.trigger_type
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn location(&self) -> Option<TriggerPosition> {
        self.location
    }

    pub fn arg_type(&self) -> Option<ArgType> {
        events::trigger_event_by_name(&self.trigger_type).map(|ev| ev.arg_type)
    }

    /// Whether type and argument agree with the event catalogue.
    pub fn is_valid(&self) -> bool {
        events::validate_trigger(&self.trigger_type, self.argument()).is_ok()
    }

    pub fn is_hit(&self) -> bool {
        self.trigger_type == events::HIT
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        self.trigger_type == other.trigger_type && self.argument == other.argument
    }
}

impl Eq for Trigger {}

impl Hash for Trigger {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trigger_type.hash(state);
        self.argument.hash(state);
    }
}

/// Stored as `[type, argument]`.
impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.trigger_type, &self.argument).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Trigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (trigger_type, argument) = <(String, Option<String>)>::deserialize(deserializer)?;
        Ok(Trigger::new(trigger_type, argument))
    }
}
