//! Engine lifecycle for one mounted viewer.
//!
//! A [`ViewerSession`] exists from the moment the engine is attached to its
//! surface until the viewer unmounts. Dropping it releases everything the
//! session acquired, in this order: the engine is disposed, the shared
//! slot is cleared and the resize listener is unregistered. The last two
//! happen even if dispose fails or panics.

use std::sync::Arc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, EngineId, SurfaceHandle};
use crate::fetch::FetchedWork;
use crate::resize::{ListenerId, ResizeHub};
use crate::store::EngineSlot;

struct Release<E: Engine> {
    engine_id: EngineId,
    slot: EngineSlot<E>,
    resize: ResizeHub,
    listener: ListenerId,
}

impl<E: Engine> Drop for Release<E> {
    fn drop(&mut self) {
        self.slot.clear_if(self.engine_id);
        self.resize.remove_listener(self.listener);
        debug!(
            engine_id = %self.engine_id,
            listeners = self.resize.listener_count(),
            "viewer resources released"
        );
    }
}

pub struct ViewerSession<E: Engine> {
    engine: Arc<E>,
    release: Option<Release<E>>,
}

impl<E: Engine> ViewerSession<E> {
    /// Attach `engine` to `surface`, publish it and start forwarding
    /// resize notifications to it.
    pub fn mount(engine: E, surface: &SurfaceHandle, slot: &EngineSlot<E>, resize: &ResizeHub) -> Self {
        let engine = Arc::new(engine);
        engine.attach(surface);
        slot.publish(engine.clone());

        let target = engine.clone();
        let listener = resize.add_listener(move |size| target.refresh(size));

        info!(engine_id = %engine.id(), surface = %surface.element_id, "viewer mounted");
        Self {
            release: Some(Release {
                engine_id: engine.id(),
                slot: slot.clone(),
                resize: resize.clone(),
                listener,
            }),
            engine,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }
}

impl<E: Engine> Drop for ViewerSession<E> {
    fn drop(&mut self) {
        // Runs when this function returns or unwinds.
        let _release = self.release.take();
        if let Err(e) = self.engine.dispose() {
            warn!(engine_id = %self.engine.id(), error = %e, "engine dispose failed");
        }
        info!(engine_id = %self.engine.id(), "viewer unmounted");
    }
}

/// Loads each fetched payload into the engine exactly once.
///
/// Engine creation and the data fetch complete in either order. Whenever
/// either changes, [`poll`](Self::poll) is called with the current pair and
/// returns a load to run if this (engine, revision) pair has not been
/// loaded yet.
#[derive(Debug, Default)]
pub struct SceneLoader {
    loaded: Option<(EngineId, u64)>,
}

impl SceneLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll<E: Engine>(
        &mut self,
        engine: Option<&Arc<E>>,
        work: Option<&FetchedWork>,
    ) -> Option<LocalBoxFuture<'static, ()>> {
        let (engine, work) = (engine?, work?);
        let key = (engine.id(), work.revision);
        if self.loaded == Some(key) {
            return None;
        }
        self.loaded = Some(key);

        let engine_id = engine.id();
        let revision = work.revision;
        let load = engine.load(work.data.clone());
        Some(
            async move {
                match load.await {
                    Ok(()) => debug!(engine_id = %engine_id, revision, "scene loaded"),
                    Err(e) => error!(engine_id = %engine_id, revision, error = %e, "scene load failed"),
                }
            }
            .boxed_local(),
        )
    }
}


#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::Ordering;

    use futures::executor::block_on;
    use serde_json::json;

    use super::testing::FakeEngine;
    use super::*;
    use crate::resize::SurfaceSize;

    struct Fixture {
        slot: EngineSlot<FakeEngine>,
        resize: ResizeHub,
        surface: SurfaceHandle,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                slot: EngineSlot::new(),
                resize: ResizeHub::new(),
                surface: SurfaceHandle::new("vr-surface"),
            }
        }

        fn mount(&self, engine: FakeEngine) -> ViewerSession<FakeEngine> {
            ViewerSession::mount(engine, &self.surface, &self.slot, &self.resize)
        }
    }

    fn work(revision: u64) -> FetchedWork {
        FetchedWork {
            revision,
            data: Arc::new(json!({ "revision": revision })),
        }
    }

    #[test]
    fn mount_attaches_and_publishes() {
        let fx = Fixture::new();
        let session = fx.mount(FakeEngine::new());

        assert_eq!(*session.engine().attached.lock().unwrap(), vec![fx.surface.clone()]);
        assert_eq!(fx.slot.current().map(|e| e.id()), Some(session.engine().id()));
        assert_eq!(fx.resize.listener_count(), 1);
    }

    #[test]
    fn unmount_before_data_releases_everything() {
        let fx = Fixture::new();
        let session = fx.mount(FakeEngine::new());
        let engine = session.engine().clone();

        drop(session);

        assert_eq!(engine.disposals(), 1);
        assert_eq!(engine.load_count(), 0);
        assert!(fx.slot.is_empty());
        assert_eq!(fx.resize.listener_count(), 0);
    }

    #[test]
    fn failing_dispose_still_releases() {
        let fx = Fixture::new();
        let engine = FakeEngine::new();
        engine.fail_dispose.store(true, Ordering::SeqCst);
        drop(fx.mount(engine));

        assert!(fx.slot.is_empty());
        assert_eq!(fx.resize.listener_count(), 0);
    }

    #[test]
    fn panicking_dispose_still_releases() {
        let fx = Fixture::new();
        let engine = FakeEngine::new();
        engine.panic_on_dispose.store(true, Ordering::SeqCst);
        let session = fx.mount(engine);

        let result = catch_unwind(AssertUnwindSafe(move || drop(session)));
        assert!(result.is_err());
        assert!(fx.slot.is_empty());
        assert_eq!(fx.resize.listener_count(), 0);
    }

    #[test]
    fn stale_session_does_not_clear_successor() {
        let fx = Fixture::new();
        let old = fx.mount(FakeEngine::new());
        let new = fx.mount(FakeEngine::new());

        drop(old);
        assert_eq!(fx.slot.current().map(|e| e.id()), Some(new.engine().id()));
        assert_eq!(fx.resize.listener_count(), 1);
    }

    #[test]
    fn resize_reaches_engine() {
        let fx = Fixture::new();
        let session = fx.mount(FakeEngine::new());
        let size = SurfaceSize {
            width: 1024.0,
            height: 768.0,
        };

        fx.resize.dispatch(size);
        assert_eq!(*session.engine().refreshes.lock().unwrap(), vec![size]);

        let engine = session.engine().clone();
        drop(session);
        fx.resize.dispatch(size);
        assert_eq!(engine.refreshes.lock().unwrap().len(), 1);
    }

    #[test]
    fn loads_once_when_engine_arrives_first() {
        let fx = Fixture::new();
        let session = fx.mount(FakeEngine::new());
        let mut loader = SceneLoader::new();

        assert!(loader.poll(Some(session.engine()), None).is_none());
        let load = loader.poll(Some(session.engine()), Some(&work(1))).unwrap();
        block_on(load);
        assert!(loader.poll(Some(session.engine()), Some(&work(1))).is_none());

        assert_eq!(*session.engine().loads.lock().unwrap(), vec![json!({ "revision": 1 })]);
    }

    #[test]
    fn loads_once_when_data_arrives_first() {
        let fx = Fixture::new();
        let mut loader = SceneLoader::new();
        let data = work(1);

        assert!(loader.poll::<FakeEngine>(None, Some(&data)).is_none());
        let session = fx.mount(FakeEngine::new());
        block_on(loader.poll(Some(session.engine()), Some(&data)).unwrap());
        assert!(loader.poll(Some(session.engine()), Some(&data)).is_none());

        assert_eq!(session.engine().load_count(), 1);
    }

    #[test]
    fn new_revision_or_engine_reloads() {
        let fx = Fixture::new();
        let first = fx.mount(FakeEngine::new());
        let mut loader = SceneLoader::new();

        block_on(loader.poll(Some(first.engine()), Some(&work(1))).unwrap());
        block_on(loader.poll(Some(first.engine()), Some(&work(2))).unwrap());
        assert_eq!(first.engine().load_count(), 2);

        let second = fx.mount(FakeEngine::new());
        block_on(loader.poll(Some(second.engine()), Some(&work(2))).unwrap());
        assert_eq!(second.engine().load_count(), 1);
    }

    #[test]
    fn load_failure_is_swallowed() {
        let fx = Fixture::new();
        let engine = FakeEngine::new();
        engine.fail_load.store(true, Ordering::SeqCst);
        let session = fx.mount(engine);
        let mut loader = SceneLoader::new();

        block_on(loader.poll(Some(session.engine()), Some(&work(1))).unwrap());
        assert_eq!(session.engine().load_count(), 1);
        assert!(loader.poll(Some(session.engine()), Some(&work(1))).is_none());
        assert!(!fx.slot.is_empty());
    }
}
