use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use tracing::debug;

use crate::{ExecError, Owner, Queue};

static REGISTRY: OnceLock<QueueRegistry> = OnceLock::new();

/// Process-wide lookup table for shared and per-type queues.
///
/// Queues are created lazily on first lookup and then live for the rest of
/// the process. Instance-scoped queues never go through the registry.
pub struct QueueRegistry {
    shared: Mutex<Option<Arc<Queue>>>,
    by_type: Mutex<HashMap<TypeId, Arc<Queue>>>,
}

impl QueueRegistry {
    pub fn global() -> &'static QueueRegistry {
        REGISTRY.get_or_init(Self::new)
    }

    fn new() -> Self {
        Self {
            shared: Mutex::new(None),
            by_type: Mutex::new(HashMap::new()),
        }
    }

    /// The single concurrent queue behind [`ScopePolicy::SharedQueue`](crate::ScopePolicy::SharedQueue).
    pub fn shared(&self) -> Result<Arc<Queue>, ExecError> {
        let mut slot = lock(&self.shared);
        if let Some(queue) = slot.as_ref() {
            return Ok(Arc::clone(queue));
        }

        let queue = Arc::new(Queue::concurrent("shared")?);
        debug!(queue = %queue.id(), "shared queue registered");
        *slot = Some(Arc::clone(&queue));
        Ok(queue)
    }

    /// The concurrent queue shared by every context owned by `owner`'s type.
    pub fn for_owner(&self, owner: Owner) -> Result<Arc<Queue>, ExecError> {
        let mut map = lock(&self.by_type);
        if let Some(queue) = map.get(&owner.type_id()) {
            return Ok(Arc::clone(queue));
        }

        let queue = Arc::new(Queue::concurrent(owner.short_name())?);
        debug!(queue = %queue.id(), owner = owner.name(), "class queue registered");
        map.insert(owner.type_id(), Arc::clone(&queue));
        Ok(queue)
    }

    pub fn for_type<T: ?Sized + 'static>(&self) -> Result<Arc<Queue>, ExecError> {
        self.for_owner(Owner::of::<T>())
    }

    /// Number of per-type queues created so far.
    pub fn class_queue_count(&self) -> usize {
        lock(&self.by_type).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
