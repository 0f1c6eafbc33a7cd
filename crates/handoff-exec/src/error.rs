use handoff_barrier::BarrierError;
use thiserror::Error;

use crate::QueueId;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),
    #[error("failed to build background runtime: {0}")]
    Runtime(String),
    #[error("background runtime has been already configured")]
    AlreadyConfigured,
    #[error("queue closed: {0}")]
    QueueClosed(QueueId),
    #[error("failed to spawn main loop thread: {0}")]
    MainLoop(String),
    #[error("main loop closed")]
    MainLoopClosed,
    #[error("barrier error: {0}")]
    Barrier(#[from] BarrierError),
}
