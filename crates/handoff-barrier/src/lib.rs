//! Join/aggregation primitive over a dynamic set of named asynchronous tasks.
//!
//! A [`TaskBarrier`] tracks which [`TaskKey`]s are in flight, collects the
//! per-task payloads they retire with, and notifies every registered
//! [`BarrierObserver`] once the in-flight set drains to empty.

mod error;
pub use error::BarrierError;

mod key;
pub use key::TaskKey;

mod report;
pub use report::DrainReport;

mod observer;
pub use observer::BarrierObserver;

mod barrier;
pub use barrier::TaskBarrier;

pub mod prelude {
    pub use crate::{BarrierError, BarrierObserver, DrainReport, TaskBarrier, TaskKey};
}
