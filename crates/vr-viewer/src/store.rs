//! Shared slot holding the live engine instance.
//!
//! The app root owns one [`EngineSlot`] and provides it through context.
//! The mounted viewer is its only writer; sibling components read or
//! subscribe to it to control the same engine.

use std::sync::Arc;

use tokio::sync::watch;

use crate::engine::{Engine, EngineId};

pub struct EngineSlot<E> {
    tx: Arc<watch::Sender<Option<Arc<E>>>>,
}

impl<E> Clone for EngineSlot<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> PartialEq for EngineSlot<E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl<E: Engine> Default for EngineSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> EngineSlot<E> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, engine: Arc<E>) {
        self.tx.send_replace(Some(engine));
    }

    /// Clear the slot only if it still holds the engine `id`, so a stale
    /// viewer cannot evict its successor.
    pub fn clear_if(&self, id: EngineId) -> bool {
        self.tx.send_if_modified(|current| {
            if current.as_ref().is_some_and(|e| e.id() == id) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    pub fn current(&self) -> Option<Arc<E>> {
        self.tx.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_none()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<E>>> {
        self.tx.subscribe()
    }
}
