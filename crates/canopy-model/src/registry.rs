//! Registry of views derived from a model.
//!
//! The registry does not own the views. It only records which view ids are
//! alive so the model can enumerate them; views add and remove themselves.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Identity of a view within the registry of its source model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Contract violations on a model's derived-view registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The view was registered twice.
    #[error("view {0} is already registered with this model")]
    DuplicateView(ViewId),
    /// The view was removed without being registered.
    #[error("view {0} is not registered with this model")]
    UnknownView(ViewId),
}

/// Thread-safe set of live view ids, in registration order.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    next_id: AtomicU64,
    views: Mutex<Vec<ViewId>>,
}

impl ViewRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out an id that no other view of this registry has used.
    #[must_use]
    pub fn allocate_id(&self) -> ViewId {
        ViewId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Record `id` as a live view.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateView`] if `id` is already registered.
    pub fn register(&self, id: ViewId) -> Result<(), ModelError> {
        let mut views = self.lock();
        if views.contains(&id) {
            return Err(ModelError::DuplicateView(id));
        }
        views.push(id);
        Ok(())
    }

    /// Forget `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownView`] if `id` was not registered.
    pub fn unregister(&self, id: ViewId) -> Result<(), ModelError> {
        let mut views = self.lock();
        let Some(position) = views.iter().position(|&view| view == id) else {
            return Err(ModelError::UnknownView(id));
        };
        let _ = views.remove(position);
        Ok(())
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: ViewId) -> bool {
        self.lock().contains(&id)
    }

    /// Copy of the live ids, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ViewId> {
        self.lock().clone()
    }

    /// Number of live views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no views are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the list half-updated.
    fn lock(&self) -> MutexGuard<'_, Vec<ViewId>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
