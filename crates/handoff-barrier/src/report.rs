use std::collections::{HashMap, HashSet};

use crate::TaskKey;

/// Summary of one drain cycle, handed to every observer.
#[derive(Debug, Clone)]
pub struct DrainReport<P> {
    /// Number of drains since the barrier was created, starting at 1.
    pub cycle: u64,
    /// Keys that finished successfully during the cycle.
    pub completed: HashSet<TaskKey>,
    /// Keys that finished with failure during the cycle.
    pub failed: HashSet<TaskKey>,
    /// Payload for every retired key that carried one.
    pub payloads: HashMap<TaskKey, P>,
}

impl<P> DrainReport<P> {
    /// Total number of retired keys.
    pub fn len(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }

    /// `true` if no key failed during the cycle.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn payload(&self, key: &str) -> Option<&P> {
        self.payloads.get(key)
    }
}
