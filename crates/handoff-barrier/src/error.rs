use thiserror::Error;

use crate::TaskKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BarrierError {
    #[error("task key must not be empty")]
    EmptyKey,
    #[error("task is already pending: {0}")]
    AlreadyPending(TaskKey),
    #[error("observer is already registered")]
    DuplicateObserver,
}
