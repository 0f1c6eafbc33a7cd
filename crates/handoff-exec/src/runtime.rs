//! Process-wide tokio runtime behind every background queue.
//!
//! Built on first use with [`RuntimeConfig::default`], or earlier through
//! [`configure`]. Lives until process exit.

use std::sync::{Mutex, OnceLock, PoisonError};

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

use crate::{ExecError, RuntimeConfig};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// Build the background runtime from `cfg`.
///
/// Must run before the first queue is created; afterwards it returns
/// [`ExecError::AlreadyConfigured`].
pub fn configure(cfg: RuntimeConfig) -> Result<(), ExecError> {
    cfg.validate()?;

    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if RUNTIME.get().is_some() {
        return Err(ExecError::AlreadyConfigured);
    }

    let rt = build(&cfg)?;
    let _ = RUNTIME.set(rt);
    Ok(())
}

pub(crate) fn handle() -> Result<Handle, ExecError> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt.handle().clone());
    }

    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt.handle().clone());
    }

    let rt = build(&RuntimeConfig::default())?;
    Ok(RUNTIME.get_or_init(|| rt).handle().clone())
}

fn build(cfg: &RuntimeConfig) -> Result<Runtime, ExecError> {
    let mut builder = Builder::new_multi_thread();
    builder.thread_name(cfg.thread_name.clone());
    if let Some(n) = cfg.worker_threads {
        builder.worker_threads(n);
    }
    if let Some(n) = cfg.max_blocking_threads {
        builder.max_blocking_threads(n);
    }

    let rt = builder
        .build()
        .map_err(|e| ExecError::Runtime(e.to_string()))?;
    info!(
        thread_name = %cfg.thread_name,
        worker_threads = ?cfg.worker_threads,
        max_blocking_threads = ?cfg.max_blocking_threads,
        "background runtime started"
    );
    Ok(rt)
}
