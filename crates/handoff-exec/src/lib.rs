//! Background/foreground hand-off around a [`TaskBarrier`].
//!
//! An [`ExecutionContext`] runs work on a background queue chosen by its
//! [`ScopePolicy`] and resumes on the single foreground thread owned by the
//! [`MainLoop`]. Paired hand-offs are registered with the context's barrier,
//! so observers learn when a whole batch has drained.
//!
//! [`TaskBarrier`]: handoff_barrier::TaskBarrier

mod error;
pub use error::ExecError;

mod config;
pub use config::RuntimeConfig;

mod runtime;
pub use runtime::configure;

pub mod queue;
pub use queue::{Queue, QueueId, QueueKind, current_queue};

mod registry;
pub use registry::QueueRegistry;

mod main_loop;
pub use main_loop::{MainLoop, is_main_thread};

mod scope;
pub use scope::{Owner, ScopePolicy};

mod context;
pub use context::{ExecutionContext, TaskOutcome};

pub mod prelude {
    pub use crate::error::ExecError;
    pub use crate::{ExecutionContext, ScopePolicy, TaskOutcome};
    pub use handoff_barrier::prelude::*;
}
