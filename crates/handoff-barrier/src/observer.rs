use crate::{DrainReport, TaskBarrier};

/// Listener notified when a barrier's pending set drains to empty.
///
/// The barrier only keeps a weak handle: an observer that is dropped stops
/// receiving notifications without having to deregister.
///
/// Notifications are delivered outside the barrier lock, from whichever
/// thread retired the last key. Calling back into the barrier from
/// `on_drain` is allowed.
pub trait BarrierObserver<P>: Send + Sync {
    fn on_drain(&self, barrier: &TaskBarrier<P>, report: &DrainReport<P>);
}

impl<P, F> BarrierObserver<P> for F
where
    F: Fn(&TaskBarrier<P>, &DrainReport<P>) + Send + Sync,
{
    fn on_drain(&self, barrier: &TaskBarrier<P>, report: &DrainReport<P>) {
        self(barrier, report)
    }
}
