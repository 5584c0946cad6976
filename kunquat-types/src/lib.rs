//! # kunquat-types
//!
//! Value types shared by the Kunquat sheet engine: exact timestamps, the
//! trigger record and its event catalogue, cursor positions, limits, and the
//! typed update signals. Nothing in this crate holds mutable editor state.

pub mod events;
pub mod limits;
mod position;
mod signal;
mod trigger;
mod tstamp;

pub use events::{ArgError, ArgType, TriggerEvent};
pub use position::{PatInstRef, TriggerPosition};
pub use signal::{Signal, SignalSet};
pub use trigger::Trigger;
pub use tstamp::Tstamp;

/// Shorthand used throughout the engine and its tests.
pub fn ts(beats: i64, rem: i64) -> Tstamp {
    Tstamp::new(beats, rem)
}
