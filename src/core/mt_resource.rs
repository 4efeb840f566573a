use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write
/// locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can
/// be shared across threads, using an `Arc<RwLock<T>>` internally. The
/// engine uses it for state that worker threads read while the owning thread
/// occasionally mutates, such as the block registry.
///
/// # Performance Considerations
/// - Read guards (`get()`) can be held concurrently by many threads
/// - Write guards (`get_mut()`) are exclusive and block all other access
/// - Prefer `get()` whenever read access suffices
pub struct MtResource<T: Send + Sync> {
    /// The shared, lock-guarded resource.
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard on the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Returns a write guard on the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_the_same_value_across_threads() {
        let counter = MtResource::new(0u32);
        let clone = counter.clone();

        let handle = thread::spawn(move || {
            *clone.get_mut() += 1;
        });
        handle.join().unwrap();

        assert_eq!(*counter.get(), 1);
    }
}
