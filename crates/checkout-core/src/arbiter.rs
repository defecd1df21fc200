//! Playback Arbiter
//!
//! At most one media element plays at a time. Starting a new one hands back
//! the element that was playing so the caller can pause it. The arbiter only
//! holds a weak reference, so a dropped element never needs releasing.

use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Single-active-element registry
#[derive(Debug)]
pub struct PlaybackArbiter<T> {
    active: Mutex<Option<Weak<T>>>,
}

impl<T> Default for PlaybackArbiter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PlaybackArbiter<T> {
    pub const fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Make `element` the active one.
    ///
    /// Returns the previously active element if it is still alive and is not
    /// `element` itself.
    pub fn request_play(&self, element: &Arc<T>) -> Option<Arc<T>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = active
            .replace(Arc::downgrade(element))
            .and_then(|weak| weak.upgrade());
        previous.filter(|p| !Arc::ptr_eq(p, element))
    }

    /// Clear the slot if `element` holds it
    pub fn release(&self, element: &Arc<T>) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active
            .as_ref()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(element)))
        {
            *active = None;
        }
    }

    /// Currently playing element, if still alive
    pub fn active(&self) -> Option<Arc<T>> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }
}
