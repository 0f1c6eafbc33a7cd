use std::{
    collections::{HashMap, HashSet},
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    ptr,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tracing::{debug, error, trace};

use crate::{BarrierError, BarrierObserver, DrainReport, TaskKey};

/// Thread-safe barrier over an open set of named tasks.
///
/// Every mutation runs under one lock. When a retirement empties the
/// pending set, the barrier snapshots the cycle's results, releases the
/// lock and then calls each live observer exactly once. A panicking
/// observer is logged and does not stop the others.
///
/// Contract of this implementation:
/// - starting a key that is already pending is rejected;
/// - the result maps reset when the pending set goes from empty to
///   non-empty, so each drain reports only its own cycle;
/// - retiring a key that is not pending records its payload but never
///   triggers a notification.
///
/// Cloning yields another handle to the same barrier.
pub struct TaskBarrier<P> {
    inner: Arc<Mutex<BarrierInner<P>>>,
}

struct BarrierInner<P> {
    /// Keys currently in flight.
    pending: HashSet<TaskKey>,
    /// Successful retirements of the current cycle.
    completed: HashMap<TaskKey, Option<P>>,
    /// Failed retirements of the current cycle.
    failed: HashMap<TaskKey, Option<P>>,
    observers: Vec<Weak<dyn BarrierObserver<P>>>,
    cycles: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retire {
    Completed,
    Failed,
}

type Snapshot<P> = (DrainReport<P>, Vec<Arc<dyn BarrierObserver<P>>>);

impl<P> BarrierInner<P> {
    fn record(&mut self, how: Retire, key: TaskKey, payload: Option<P>) {
        match how {
            Retire::Completed => {
                self.failed.remove(&key);
                self.completed.insert(key, payload);
            }
            Retire::Failed => {
                self.completed.remove(&key);
                self.failed.insert(key, payload);
            }
        }
    }

    fn prune_observers(&mut self) {
        self.observers.retain(|o| o.strong_count() > 0);
    }
}

impl<P: Clone> BarrierInner<P> {
    fn drain(&mut self) -> Snapshot<P> {
        self.cycles += 1;

        let payloads = self
            .completed
            .iter()
            .chain(self.failed.iter())
            .filter_map(|(key, payload)| payload.as_ref().map(|p| (key.clone(), p.clone())))
            .collect();

        let report = DrainReport {
            cycle: self.cycles,
            completed: self.completed.keys().cloned().collect(),
            failed: self.failed.keys().cloned().collect(),
            payloads,
        };

        self.prune_observers();
        let observers = self.observers.iter().filter_map(Weak::upgrade).collect();
        (report, observers)
    }
}

impl<P: Clone> TaskBarrier<P> {
    /// Create an empty barrier.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BarrierInner {
                pending: HashSet::new(),
                completed: HashMap::new(),
                failed: HashMap::new(),
                observers: Vec::new(),
                cycles: 0,
            })),
        }
    }

    /// Number of pending tasks.
    pub fn count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().pending.contains(key)
    }

    /// Snapshot of the pending keys, in no particular order.
    pub fn pending_keys(&self) -> Vec<TaskKey> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Number of registered observers that are still alive.
    pub fn observer_count(&self) -> usize {
        let mut inner = self.lock();
        inner.prune_observers();
        inner.observers.len()
    }

    /// Mark `key` as in flight.
    ///
    /// Starting the first key of a new cycle clears the previous cycle's results.
    pub fn start(&self, key: TaskKey) -> Result<(), BarrierError> {
        let mut inner = self.lock();

        if inner.pending.contains(&key) {
            return Err(BarrierError::AlreadyPending(key));
        }
        if inner.pending.is_empty() {
            inner.completed.clear();
            inner.failed.clear();
        }

        inner.completed.remove(&key);
        inner.failed.remove(&key);

        trace!(task = %key, pending = inner.pending.len() + 1, "task started");
        inner.pending.insert(key);
        Ok(())
    }

    /// Retire `key` successfully, recording `payload` for it.
    pub fn complete(&self, key: &TaskKey, payload: Option<P>) {
        self.retire(key, Retire::Completed, payload);
    }

    /// Retire `key` with failure, recording `payload` for it.
    pub fn fail(&self, key: &TaskKey, payload: Option<P>) {
        self.retire(key, Retire::Failed, payload);
    }

    /// Complete every pending key with the same payload.
    ///
    /// Fires the notification if anything was pending.
    pub fn complete_all_pending(&self, payload: Option<P>) {
        self.retire_all(Retire::Completed, payload);
    }

    /// Fail every pending key with the same payload.
    ///
    /// Fires the notification if anything was pending.
    pub fn fail_all_pending(&self, payload: Option<P>) {
        self.retire_all(Retire::Failed, payload);
    }

    /// Register an observer.
    ///
    /// Only a weak handle is kept. Registering the same instance twice is an error.
    pub fn add_observer<O>(&self, observer: &Arc<O>) -> Result<(), BarrierError>
    where
        O: BarrierObserver<P> + 'static,
    {
        let mut inner = self.lock();
        inner.prune_observers();

        if inner
            .observers
            .iter()
            .any(|o| ptr::addr_eq(o.as_ptr(), Arc::as_ptr(observer)))
        {
            return Err(BarrierError::DuplicateObserver);
        }

        let observer: Arc<dyn BarrierObserver<P>> = observer.clone();
        inner.observers.push(Arc::downgrade(&observer));
        Ok(())
    }

    /// Deregister an observer. Returns `false` if it was not registered.
    ///
    /// Safe to call from inside a notification; observers already picked
    /// for the current round still receive it.
    pub fn remove_observer<O>(&self, observer: &Arc<O>) -> bool
    where
        O: ?Sized,
    {
        let mut inner = self.lock();
        let before = inner.observers.len();
        inner
            .observers
            .retain(|o| !ptr::addr_eq(o.as_ptr(), Arc::as_ptr(observer)));
        inner.observers.len() != before
    }

    fn retire(&self, key: &TaskKey, how: Retire, payload: Option<P>) {
        let snapshot = {
            let mut inner = self.lock();
            let was_pending = inner.pending.remove(key);
            inner.record(how, key.clone(), payload);

            if !was_pending {
                debug!(task = %key, outcome = ?how, "retired a task that was not pending");
                None
            } else {
                trace!(task = %key, outcome = ?how, pending = inner.pending.len(), "task retired");
                inner.pending.is_empty().then(|| inner.drain())
            }
        };

        if let Some(snapshot) = snapshot {
            self.notify(snapshot);
        }
    }

    fn retire_all(&self, how: Retire, payload: Option<P>) {
        let snapshot = {
            let mut inner = self.lock();
            if inner.pending.is_empty() {
                return;
            }

            let keys: Vec<TaskKey> = inner.pending.drain().collect();
            debug!(count = keys.len(), outcome = ?how, "retiring all pending tasks");
            for key in keys {
                inner.record(how, key, payload.clone());
            }
            inner.drain()
        };

        self.notify(snapshot);
    }

    fn notify(&self, (report, observers): Snapshot<P>) {
        debug!(
            cycle = report.cycle,
            completed = report.completed.len(),
            failed = report.failed.len(),
            observers = observers.len(),
            "pending tasks drained"
        );
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer.on_drain(self, &report))).is_err() {
                error!(cycle = report.cycle, "barrier observer panicked");
            }
        }
    }
}

impl<P> TaskBarrier<P> {
    // Critical sections never run user code, so a poisoned lock still
    // guards consistent state.
    fn lock(&self) -> MutexGuard<'_, BarrierInner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> Clone for TaskBarrier<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Clone> Default for TaskBarrier<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for TaskBarrier<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("TaskBarrier")
            .field("pending", &inner.pending.len())
            .field("completed", &inner.completed.len())
            .field("failed", &inner.failed.len())
            .field("cycles", &inner.cycles)
            .finish()
    }
}
