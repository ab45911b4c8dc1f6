//! Error taxonomy for the persistent ordered map.
//!
//! Kept deliberately small, per spec: the engine distinguishes exactly the
//! failure modes a caller needs to branch on and absorbs everything else
//! (unknown keys, empty inputs) into the no-op return value of the
//! operation that hit them.

use std::{error, fmt, result};

/// Crate-wide result alias, following the `rdms::Result` convention.
pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// A single-mode map was mutated a second time. Carries the name of the
    /// operation that was attempted (`"set"`, `"replace"`, `"unset"`,
    /// `"empty"`).
    SingleModeMutationAlreadyOccurred(&'static str),
    /// A lightweight-mode map was used, for any operation, after it had
    /// already produced a mutated child.
    LightweightModePostMutationUse(&'static str),
    /// `reduce` was called on an empty map without an initial accumulator.
    ReduceEmptyNoInitialValue,
    /// Internal invariant breach: the ordered-link primitive was asked to
    /// remove a key it does not hold. Should never surface under correct
    /// engine use.
    LinkedOrderedMapUnknownKey(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SingleModeMutationAlreadyOccurred(op) => write!(
                f,
                "single-mode map already mutated once, cannot {op} again"
            ),
            Error::LightweightModePostMutationUse(op) => write!(
                f,
                "lightweight-mode map used for {op} after a prior mutation"
            ),
            Error::ReduceEmptyNoInitialValue => {
                write!(f, "reduce called on an empty map with no initial value")
            }
            Error::LinkedOrderedMapUnknownKey(key) => {
                write!(f, "linked ordered map has no entry for key {key:?}")
            }
        }
    }
}

impl error::Error for Error {}
