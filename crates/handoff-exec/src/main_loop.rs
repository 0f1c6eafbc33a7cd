//! The single foreground thread.
//!
//! Every foreground callback of every context runs on one dedicated thread,
//! strictly in submission order. The thread is spawned on first use and
//! lives until process exit.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Mutex, OnceLock, PoisonError},
    thread::{self, ThreadId},
};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{ExecError, queue::Job};

static MAIN: OnceLock<MainLoop> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

const THREAD_NAME: &str = "handoff-main";

pub struct MainLoop {
    tx: mpsc::UnboundedSender<Job>,
    thread: ThreadId,
}

impl MainLoop {
    /// The process-wide foreground loop, spawning its thread if needed.
    pub fn global() -> Result<&'static MainLoop, ExecError> {
        if let Some(main) = MAIN.get() {
            return Ok(main);
        }

        let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(main) = MAIN.get() {
            return Ok(main);
        }

        let main = Self::spawn()?;
        Ok(MAIN.get_or_init(|| main))
    }

    fn spawn() -> Result<Self, ExecError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("foreground job panicked");
                    }
                }
                debug!("main loop stopped");
            })
            .map_err(|e| ExecError::MainLoop(e.to_string()))?;

        debug!(thread = THREAD_NAME, "main loop started");
        Ok(Self {
            tx,
            thread: handle.thread().id(),
        })
    }

    /// Enqueue `job` for the foreground thread.
    ///
    /// Always enqueues, even when called from the foreground thread itself.
    pub fn submit<F>(&self, job: F) -> Result<(), ExecError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx
            .send(Box::new(job))
            .map_err(|_| ExecError::MainLoopClosed)
    }

    /// `true` when called from the foreground thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }
}

/// `true` when called from the foreground thread.
pub fn is_main_thread() -> bool {
    MAIN.get().is_some_and(MainLoop::is_current)
}
