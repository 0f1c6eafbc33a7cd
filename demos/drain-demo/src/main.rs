use std::{
    sync::{Arc, mpsc},
    time::Duration,
};

use tracing::{info, warn};

use handoff_barrier::{DrainReport, TaskBarrier, TaskKey};
use handoff_exec::{ExecutionContext, RuntimeConfig, ScopePolicy, TaskOutcome, configure};
use handoff_observe::{DrainJournal, LoggerConfig, logger_init};

struct ThumbnailInteractor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Logger
    let cfg = LoggerConfig {
        level: "debug".to_string(),
        ..Default::default()
    };
    logger_init(&cfg)?;
    info!("logger initialized");

    // 2) Background runtime
    configure(RuntimeConfig {
        max_blocking_threads: Some(8),
        ..Default::default()
    })?;

    // 3) Barrier + observers
    let barrier = TaskBarrier::<u64>::new();
    let journal = Arc::new(DrainJournal::new("thumbnails"));
    barrier.add_observer(&journal)?;

    let (tx, rx) = mpsc::channel();
    let waiter = Arc::new(move |_: &TaskBarrier<u64>, report: &DrainReport<u64>| {
        let _ = tx.send(report.clone());
    });
    barrier.add_observer(&waiter)?;

    // 4) Hold the batch open while submitting so it drains exactly once
    let batch = TaskKey::new("batch")?;
    barrier.start(batch.clone())?;

    let (fg_tx, fg_rx) = mpsc::channel();
    let mut contexts = Vec::new();
    for policy in [
        ScopePolicy::SharedQueue,
        ScopePolicy::ClassQueue,
        ScopePolicy::InstanceQueue,
    ] {
        let ctx =
            ExecutionContext::with_barrier::<ThumbnailInteractor>(policy, barrier.clone())?;
        for n in 1..=4u64 {
            let fg_tx = fg_tx.clone();
            ctx.run_background_then_foreground(
                move || {
                    std::thread::sleep(Duration::from_millis(10 * n));
                    if n == 3 { Err(n) } else { Ok(n * n) }
                },
                move |outcome| {
                    match outcome {
                        TaskOutcome::Completed(size) => info!(%policy, n, size, "thumbnail ready"),
                        TaskOutcome::Failed(n) => warn!(%policy, n, "thumbnail failed"),
                        TaskOutcome::Panicked => warn!(%policy, "thumbnail worker panicked"),
                    }
                    let _ = fg_tx.send(());
                },
            )?;
        }
        contexts.push(ctx);
    }

    barrier.complete(&batch, None);

    // 5) Wait for the drain
    let report = rx.recv_timeout(Duration::from_secs(10))?;
    info!(
        cycle = report.cycle,
        completed = report.completed.len(),
        failed = report.failed.len(),
        "batch drained"
    );

    // Foreground callbacks are queued right behind their retirement.
    for _ in 0..report.len() - 1 {
        fg_rx.recv_timeout(Duration::from_secs(10))?;
    }
    info!(contexts = contexts.len(), "all foreground callbacks ran");
    Ok(())
}
