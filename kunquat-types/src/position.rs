use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Tstamp;

/// Identifies one placement of a pattern: `(pattern number, instance number)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct PatInstRef {
    pub pat_num: usize,
    pub inst_num: usize,
}

impl PatInstRef {
    pub fn new(pat_num: usize, inst_num: usize) -> Self {
        Self { pat_num, inst_num }
    }
}

impl fmt::Display for PatInstRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pat_{:03x}/instance_{:03x}", self.pat_num, self.inst_num)
    }
}

/// Location of the edit cursor: a slot between (or on) triggers of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerPosition {
    pub track: usize,
    pub system: usize,
    pub col_num: usize,
    pub row_ts: Tstamp,
    pub trigger_index: usize,
}

impl TriggerPosition {
    pub fn new(
        track: usize,
        system: usize,
        col_num: usize,
        row_ts: Tstamp,
        trigger_index: usize,
    ) -> Self {
        Self {
            track,
            system,
            col_num,
            row_ts,
            trigger_index,
        }
    }

    pub fn with_row(self, row_ts: Tstamp, trigger_index: usize) -> Self {
        Self {
            row_ts,
            trigger_index,
            ..self
        }
    }

    pub fn with_col(self, col_num: usize) -> Self {
        Self {
            col_num,
            trigger_index: 0,
            ..self
        }
    }

    pub fn with_trigger_index(self, trigger_index: usize) -> Self {
        Self {
            trigger_index,
            ..self
        }
    }

    /// Whether both positions lie in the same pattern instance.
    pub fn same_system(&self, other: &TriggerPosition) -> bool {
        self.track == other.track && self.system == other.system
    }

    pub fn same_row(&self, other: &TriggerPosition) -> bool {
        self.same_system(other) && self.col_num == other.col_num && self.row_ts == other.row_ts
    }
}

impl fmt::Display for TriggerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {:?}, {})",
            self.track, self.system, self.col_num, self.row_ts, self.trigger_index
        )
    }
}
