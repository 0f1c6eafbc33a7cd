//! Background execution queues.
//!
//! A [`Queue`] is a submission handle onto the background runtime. Concurrent
//! queues hand each job straight to the blocking pool; serial queues feed a
//! single worker task that runs their jobs one after another, in submission
//! order.

use std::{
    cell::Cell,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::{runtime::Handle, sync::mpsc, task};
use tracing::{error, trace};

use crate::{ExecError, runtime};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: Cell<Option<QueueId>> = const { Cell::new(None) };
}

/// Process-unique queue identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl QueueId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Jobs may run in parallel, in any order.
    Concurrent,
    /// Jobs run one at a time, in submission order.
    Serial,
}

enum Dispatch {
    Concurrent(Handle),
    Serial(mpsc::UnboundedSender<Job>),
}

pub struct Queue {
    id: QueueId,
    label: String,
    dispatch: Dispatch,
}

impl Queue {
    pub(crate) fn concurrent(label: impl Into<String>) -> Result<Self, ExecError> {
        let handle = runtime::handle()?;
        let queue = Self {
            id: QueueId::next(),
            label: label.into(),
            dispatch: Dispatch::Concurrent(handle),
        };
        trace!(queue = %queue.id, label = %queue.label, "concurrent queue created");
        Ok(queue)
    }

    pub(crate) fn serial(label: impl Into<String>) -> Result<Self, ExecError> {
        let handle = runtime::handle()?;
        let id = QueueId::next();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        handle.spawn(async move {
            while let Some(job) = rx.recv().await {
                if task::spawn_blocking(move || run_on(id, job)).await.is_err() {
                    error!(queue = %id, "serial queue worker lost a job");
                }
            }
            trace!(queue = %id, "serial queue closed");
        });

        let queue = Self {
            id,
            label: label.into(),
            dispatch: Dispatch::Serial(tx),
        };
        trace!(queue = %queue.id, label = %queue.label, "serial queue created");
        Ok(queue)
    }

    #[inline]
    pub fn id(&self) -> QueueId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> QueueKind {
        match self.dispatch {
            Dispatch::Concurrent(_) => QueueKind::Concurrent,
            Dispatch::Serial(_) => QueueKind::Serial,
        }
    }

    /// Enqueue `job` and return immediately.
    pub fn submit<F>(&self, job: F) -> Result<(), ExecError>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.id;
        match &self.dispatch {
            Dispatch::Concurrent(handle) => {
                // Detached: the job reports its own panics.
                drop(handle.spawn_blocking(move || run_on(id, job)));
                Ok(())
            }
            Dispatch::Serial(tx) => tx
                .send(Box::new(job))
                .map_err(|_| ExecError::QueueClosed(id)),
        }
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Identity of the queue running the calling code, if any.
pub fn current_queue() -> Option<QueueId> {
    CURRENT.with(Cell::get)
}

fn run_on<F: FnOnce()>(id: QueueId, job: F) {
    let previous = CURRENT.replace(Some(id));
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!(queue = %id, "background job panicked");
    }
    CURRENT.set(previous);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    #[test]
    fn ids_are_unique() {
        let a = Queue::concurrent("a").unwrap();
        let b = Queue::concurrent("b").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), QueueKind::Concurrent);
        assert_eq!(a.label(), "a");
    }

    #[test]
    fn no_current_queue_outside_jobs() {
        assert_eq!(current_queue(), None);
    }

    #[test]
    fn job_sees_its_queue() {
        let queue = Queue::concurrent("probe").unwrap();
        let (tx, rx) = std_mpsc::channel();
        queue.submit(move || tx.send(current_queue()).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some(queue.id()));
    }

    #[test]
    fn serial_queue_keeps_order() {
        let queue = Queue::serial("ordered").unwrap();
        assert_eq!(queue.kind(), QueueKind::Serial);

        let (tx, rx) = std_mpsc::channel();
        for i in 0..100 {
            let tx = tx.clone();
            queue
                .submit(move || {
                    if i % 10 == 0 {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    tx.send(i).unwrap();
                })
                .unwrap();
        }

        let seen: Vec<i32> = (0..100).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_job_does_not_stop_serial_queue() {
        let queue = Queue::serial("panics").unwrap();
        let (tx, rx) = std_mpsc::channel();

        queue.submit(|| panic!("boom")).unwrap();
        queue.submit(move || tx.send(current_queue()).unwrap()).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some(queue.id()));
    }
}
