//! Window-resize listener registry.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Dimensions of the render surface in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

/// Handle returned by [`ResizeHub::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(SurfaceSize) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: BTreeMap<ListenerId, Listener>,
    last_size: Option<SurfaceSize>,
}

/// Fan-out of resize notifications to registered listeners.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ResizeHub {
    inner: Arc<Mutex<HubInner>>,
}

impl ResizeHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_listener(&self, listener: impl Fn(SurfaceSize) + Send + Sync + 'static) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.insert(id, Arc::new(listener));
        id
    }

    /// Returns `false` if the listener was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().listeners.remove(&id).is_some()
    }

    /// Notify every listener. Listeners run outside the registry lock, so
    /// they may add or remove listeners themselves.
    pub fn dispatch(&self, size: SurfaceSize) {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            inner.last_size = Some(size);
            inner.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(size);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Size passed to the most recent [`dispatch`](Self::dispatch).
    pub fn last_size(&self) -> Option<SurfaceSize> {
        self.lock().last_size
    }
}
