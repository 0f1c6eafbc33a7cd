use handoff_barrier::DrainReport;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainKind {
    Clean,
    Partial,
    Failed,
}

impl DrainKind {
    pub fn of<P>(report: &DrainReport<P>) -> Self {
        match (report.completed.is_empty(), report.failed.is_empty()) {
            (_, true) => DrainKind::Clean,
            (true, false) => DrainKind::Failed,
            (false, false) => DrainKind::Partial,
        }
    }
}

#[inline]
pub fn message_for(kind: DrainKind) -> &'static str {
    match kind {
        DrainKind::Clean => "all tasks completed",
        DrainKind::Partial => "tasks drained with failures",
        DrainKind::Failed => "all tasks failed",
    }
}

/// Log one drain: the summary at `info`, then each failed key at `warn`.
pub fn log_drain<P>(barrier: &str, report: &DrainReport<P>) {
    let msg = message_for(DrainKind::of(report));
    info!(
        barrier,
        cycle = report.cycle,
        completed = report.completed.len(),
        failed = report.failed.len(),
        payloads = report.payloads.len(),
        "{msg}"
    );

    for key in &report.failed {
        warn!(
            barrier,
            cycle = report.cycle,
            task = %key,
            has_payload = report.payloads.contains_key(key),
            "task failed"
        );
    }
}
