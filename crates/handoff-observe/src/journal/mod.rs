use handoff_barrier::{BarrierObserver, DrainReport, TaskBarrier};

mod view;
use view::log_drain;

/// Observer that writes every drain of a barrier to the log.
pub struct DrainJournal {
    name: &'static str,
}

impl DrainJournal {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for DrainJournal {
    fn default() -> Self {
        Self::new("barrier")
    }
}

impl<P> BarrierObserver<P> for DrainJournal {
    fn on_drain(&self, _barrier: &TaskBarrier<P>, report: &DrainReport<P>) {
        log_drain(self.name, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_barrier::TaskKey;
    use std::sync::Arc;

    #[test]
    fn journal_observes_any_payload() {
        let journal = Arc::new(DrainJournal::new("profile"));

        let barrier = TaskBarrier::<String>::new();
        barrier.add_observer(&journal).unwrap();
        barrier.start(TaskKey::new("a").unwrap()).unwrap();
        barrier.fail_all_pending(Some("offline".to_string()));

        let other = TaskBarrier::<u64>::new();
        other.add_observer(&journal).unwrap();
        assert_eq!(other.observer_count(), 1);
        assert_eq!(journal.name(), "profile");
    }
}
