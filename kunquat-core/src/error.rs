//! Error types of the sheet engine.
//!
//! Only rejected input is reported as an error. Out-of-range requests are
//! clamped and edits that change nothing are dropped without an error.

use std::fmt;

use kunquat_types::ArgError;

use crate::state::clipboard::ClipboardError;
use crate::state::grid_pattern::GridPatternError;

#[derive(Debug)]
pub enum SheetError {
    /// The edit was refused; nothing was recorded.
    ValidationRejected(String),
    /// Stored data breaks an invariant; the store is left unchanged.
    InvariantViolation(String),
    Clipboard(ClipboardError),
    GridPattern(GridPatternError),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationRejected(msg) => write!(f, "edit rejected: {}", msg),
            Self::InvariantViolation(msg) => write!(f, "invariant violated: {}", msg),
            Self::Clipboard(e) => write!(f, "clipboard: {}", e),
            Self::GridPattern(e) => write!(f, "grid pattern: {}", e),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Clipboard(e) => Some(e),
            Self::GridPattern(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArgError> for SheetError {
    fn from(e: ArgError) -> Self {
        Self::ValidationRejected(e.to_string())
    }
}

impl From<ClipboardError> for SheetError {
    fn from(e: ClipboardError) -> Self {
        Self::Clipboard(e)
    }
}

impl From<GridPatternError> for SheetError {
    fn from(e: GridPatternError) -> Self {
        Self::GridPattern(e)
    }
}

pub type SheetResult<T = ()> = Result<T, SheetError>;
