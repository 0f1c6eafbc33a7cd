use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use handoff_barrier::{TaskBarrier, TaskKey};
use tracing::{debug, error, instrument, trace};

use crate::{ExecError, MainLoop, Owner, Queue, QueueId, QueueRegistry, ScopePolicy};

/// How the background half of a paired hand-off ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<P> {
    Completed(P),
    Failed(P),
    /// The background callback panicked; the task was failed without payload.
    Panicked,
}

impl<P> TaskOutcome<P> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            TaskOutcome::Completed(p) | TaskOutcome::Failed(p) => Some(p),
            TaskOutcome::Panicked => None,
        }
    }
}

/// Runs work off the foreground thread and resumes on it.
///
/// The background queue is resolved once, at construction, from the scope
/// policy. The context owns a handle to its [`TaskBarrier`]; several
/// contexts may share one barrier through [`ExecutionContext::with_barrier`].
pub struct ExecutionContext<P = ()> {
    policy: ScopePolicy,
    owner: Owner,
    queue: Arc<Queue>,
    main: &'static MainLoop,
    barrier: TaskBarrier<P>,
}

impl<P> ExecutionContext<P>
where
    P: Clone + Send + 'static,
{
    /// Create a context owned by type `O`, with a fresh barrier.
    pub fn new<O: ?Sized + 'static>(policy: ScopePolicy) -> Result<Self, ExecError> {
        Self::with_barrier::<O>(policy, TaskBarrier::new())
    }

    /// Create a context owned by type `O` that reports into `barrier`.
    pub fn with_barrier<O: ?Sized + 'static>(
        policy: ScopePolicy,
        barrier: TaskBarrier<P>,
    ) -> Result<Self, ExecError> {
        let owner = Owner::of::<O>();
        let queue = match policy {
            ScopePolicy::SharedQueue => QueueRegistry::global().shared()?,
            ScopePolicy::ClassQueue => QueueRegistry::global().for_owner(owner)?,
            ScopePolicy::InstanceQueue => Arc::new(Queue::serial(owner.short_name())?),
        };
        let main = MainLoop::global()?;

        debug!(
            owner = owner.short_name(),
            policy = %policy,
            queue = %queue.id(),
            "execution context created"
        );
        Ok(Self {
            policy,
            owner,
            queue,
            main,
            barrier,
        })
    }

    #[inline]
    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    #[inline]
    pub fn owner(&self) -> Owner {
        self.owner
    }

    #[inline]
    pub fn queue_id(&self) -> QueueId {
        self.queue.id()
    }

    #[inline]
    pub fn barrier(&self) -> &TaskBarrier<P> {
        &self.barrier
    }

    /// Submit `callback` to this context's background queue.
    pub fn run_background<F>(&self, callback: F) -> Result<(), ExecError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.submit(callback)
    }

    /// Submit `callback` to the foreground thread.
    pub fn run_foreground<F>(&self, callback: F) -> Result<(), ExecError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.main.submit(callback)
    }

    /// Run `background` off the foreground thread, then `foreground` on it.
    ///
    /// A fresh key is started on the barrier before submission. When
    /// `background` returns, the key is completed (`Ok`) or failed (`Err` or
    /// panic) with the returned payload, and only then is `foreground`
    /// queued with the outcome. Returns the generated key.
    #[instrument(level = "trace", skip_all, fields(owner = self.owner.short_name(), queue = %self.queue.id()))]
    pub fn run_background_then_foreground<B, F>(
        &self,
        background: B,
        foreground: F,
    ) -> Result<TaskKey, ExecError>
    where
        B: FnOnce() -> Result<P, P> + Send + 'static,
        F: FnOnce(TaskOutcome<P>) + Send + 'static,
    {
        let key = TaskKey::unique(self.owner.short_name());
        self.barrier.start(key.clone())?;

        let barrier = self.barrier.clone();
        let main = self.main;
        let task = key.clone();

        let submitted = self.queue.submit(move || {
            let outcome = match catch_unwind(AssertUnwindSafe(background)) {
                Ok(Ok(payload)) => {
                    barrier.complete(&task, Some(payload.clone()));
                    TaskOutcome::Completed(payload)
                }
                Ok(Err(payload)) => {
                    barrier.fail(&task, Some(payload.clone()));
                    TaskOutcome::Failed(payload)
                }
                Err(_) => {
                    error!(task = %task, "background callback panicked");
                    barrier.fail(&task, None);
                    TaskOutcome::Panicked
                }
            };

            if let Err(e) = main.submit(move || foreground(outcome)) {
                error!(task = %task, error = %e, "foreground callback dropped");
            }
        });

        if let Err(e) = submitted {
            self.barrier.fail(&key, None);
            return Err(e);
        }

        trace!(task = %key, "hand-off submitted");
        Ok(key)
    }
}

impl<P> fmt::Debug for ExecutionContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("policy", &self.policy)
            .field("owner", &self.owner.name())
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueueKind, current_queue, is_main_thread};
    use handoff_barrier::DrainReport;
    use std::sync::mpsc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    struct Profile;
    struct Feed;

    #[test]
    fn instance_contexts_get_private_serial_queues() {
        let a = ExecutionContext::<()>::new::<Profile>(ScopePolicy::InstanceQueue).unwrap();
        let b = ExecutionContext::<()>::new::<Profile>(ScopePolicy::InstanceQueue).unwrap();
        assert_ne!(a.queue_id(), b.queue_id());
        assert_eq!(a.queue.kind(), QueueKind::Serial);
    }

    #[test]
    fn shared_contexts_share_one_queue() {
        let a = ExecutionContext::<()>::new::<Profile>(ScopePolicy::SharedQueue).unwrap();
        let b = ExecutionContext::<()>::new::<Feed>(ScopePolicy::SharedQueue).unwrap();
        assert_eq!(a.queue_id(), b.queue_id());
        assert_eq!(a.queue.kind(), QueueKind::Concurrent);
    }

    #[test]
    fn class_contexts_share_per_owner() {
        let a = ExecutionContext::<()>::new::<Profile>(ScopePolicy::ClassQueue).unwrap();
        let b = ExecutionContext::<()>::new::<Profile>(ScopePolicy::ClassQueue).unwrap();
        let c = ExecutionContext::<()>::new::<Feed>(ScopePolicy::ClassQueue).unwrap();
        assert_eq!(a.queue_id(), b.queue_id());
        assert_ne!(a.queue_id(), c.queue_id());
    }

    #[test]
    fn background_runs_on_context_queue() {
        let ctx = ExecutionContext::<()>::new::<Profile>(ScopePolicy::InstanceQueue).unwrap();
        let (tx, rx) = mpsc::channel();
        ctx.run_background(move || tx.send((current_queue(), is_main_thread())).unwrap())
            .unwrap();

        let (queue, on_main) = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(queue, Some(ctx.queue_id()));
        assert!(!on_main);
    }

    #[test]
    fn foreground_runs_on_main_thread_in_order() {
        let ctx = ExecutionContext::<()>::new::<Feed>(ScopePolicy::SharedQueue).unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..100 {
            let tx = tx.clone();
            ctx.run_foreground(move || tx.send((i, is_main_thread())).unwrap())
                .unwrap();
        }

        for expected in 0..100 {
            let (i, on_main) = rx.recv_timeout(WAIT).unwrap();
            assert_eq!(i, expected);
            assert!(on_main);
        }
    }

    #[test]
    fn pair_reports_outcome_and_retires_key() {
        let ctx = ExecutionContext::<u32>::new::<Profile>(ScopePolicy::InstanceQueue).unwrap();
        let (tx, rx) = mpsc::channel();

        let ok_tx = tx.clone();
        let ok = ctx
            .run_background_then_foreground(|| Ok(7), move |o| ok_tx.send(o).unwrap())
            .unwrap();
        let failed = ctx
            .run_background_then_foreground(|| Err(13), move |o| tx.send(o).unwrap())
            .unwrap();

        assert!(ok.as_str().starts_with("Profile-"));
        assert_ne!(ok, failed);

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), TaskOutcome::Completed(7));
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), TaskOutcome::Failed(13));
        assert_eq!(ctx.barrier().count(), 0);
    }

    #[test]
    fn panicking_background_fails_the_task() {
        let ctx = ExecutionContext::<u32>::new::<Feed>(ScopePolicy::InstanceQueue).unwrap();
        let (tx, rx) = mpsc::channel();
        let observer = Arc::new(move |_: &TaskBarrier<u32>, report: &DrainReport<u32>| {
            tx.send(report.clone()).unwrap();
        });
        ctx.barrier().add_observer(&observer).unwrap();

        let (out_tx, out_rx) = mpsc::channel();
        let key = ctx
            .run_background_then_foreground(|| panic!("boom"), move |o| out_tx.send(o).unwrap())
            .unwrap();

        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), TaskOutcome::Panicked);
        let report = rx.recv_timeout(WAIT).unwrap();
        assert!(report.failed.contains(&key));
        assert!(report.payloads.is_empty());
    }

    struct Faulty;

    impl handoff_barrier::BarrierObserver<u32> for Faulty {
        fn on_drain(&self, _barrier: &TaskBarrier<u32>, _report: &DrainReport<u32>) {
            panic!("observer bug");
        }
    }

    #[test]
    fn faulty_observer_keeps_foreground_and_other_observers() {
        let ctx = ExecutionContext::<u32>::new::<Profile>(ScopePolicy::InstanceQueue).unwrap();
        let faulty = Arc::new(Faulty);
        let (tx, rx) = mpsc::channel();
        let recorder = Arc::new(move |_: &TaskBarrier<u32>, report: &DrainReport<u32>| {
            tx.send(report.clone()).unwrap();
        });
        ctx.barrier().add_observer(&faulty).unwrap();
        ctx.barrier().add_observer(&recorder).unwrap();

        let (out_tx, out_rx) = mpsc::channel();
        let key = ctx
            .run_background_then_foreground(|| Ok(1), move |o| out_tx.send(o).unwrap())
            .unwrap();

        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), TaskOutcome::Completed(1));
        let report = rx.recv_timeout(WAIT).unwrap();
        assert!(report.completed.contains(&key));
        assert_eq!(ctx.barrier().count(), 0);
    }

    #[test]
    fn outcome_accessors() {
        assert!(TaskOutcome::Completed(1).is_completed());
        assert_eq!(TaskOutcome::Failed(2).payload(), Some(&2));
        assert_eq!(TaskOutcome::<u8>::Panicked.payload(), None);
    }
}
