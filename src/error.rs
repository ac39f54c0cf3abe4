use std::error::Error;
use std::fmt;

use crate::Str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The participant id is not in `0..capacity`.
    InvalidId { id: usize, capacity: usize },
    InvalidCapacity { requested: usize, reason: Str },
    /// A filter lock must hold back at least one participant.
    ZoneTooLarge { n_threads: usize, n_in_zone: usize },
    EmptyZone,
    /// Bakery labels are unbounded in theory; a `usize` label ran out.
    LabelOverflow { id: usize },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LockError::*;
        match self {
            InvalidId { id, capacity } => {
                write!(f, "participant id {id} out of range for {capacity} participants")
            }
            InvalidCapacity { requested, reason } => {
                write!(f, "cannot build a lock for {requested} participants: {reason}")
            }
            ZoneTooLarge { n_threads, n_in_zone } => write!(
                f,
                "filter lock needs more participants ({n_threads}) than zone slots ({n_in_zone})"
            ),
            EmptyZone => write!(f, "filter lock zone must admit at least one participant"),
            LabelOverflow { id } => write!(f, "bakery label overflow for participant {id}"),
        }
    }
}

impl Error for LockError {}

/// Fails with [`LockError::InvalidId`] unless `id < capacity`.
pub(crate) fn check_id(id: usize, capacity: usize) -> Result<(), LockError> {
    if id < capacity {
        Ok(())
    } else {
        Err(LockError::InvalidId { id, capacity })
    }
}
