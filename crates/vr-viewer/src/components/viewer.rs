use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use dioxus::prelude::*;
use tracing::info;
use vr_models::ResourceCode;

use crate::boundary::ErrorBoundary;
use crate::components::screens::{EngineLoadingScreen, ErrorFallback, SceneLoadingOverlay};
use crate::engine::{Engine, EngineId, EngineRuntime, ScriptEngine, SurfaceHandle};
use crate::error::ViewerError;
use crate::fetch::{ProxyClient, WorkCache};
use crate::resize::{ResizeHub, SurfaceSize};
use crate::session::{SceneLoader, ViewerSession};
use crate::store::EngineSlot;

const SURFACE_ID: &str = "vr-surface";

/// Process-wide services provided by the app root.
#[derive(Clone)]
pub struct ViewerContext {
    pub client: ProxyClient,
    pub cache: WorkCache,
    pub slot: EngineSlot<ScriptEngine>,
    pub resize: ResizeHub,
    pub runtime: EngineRuntime,
}

/// Page for one resource: engine bootstrap, error boundary and canvas.
#[component]
pub fn ViewerPage(code: ResourceCode) -> Element {
    let ctx = use_context::<ViewerContext>();
    let mut boundary = use_signal(ErrorBoundary::new);

    let runtime = ctx.runtime.clone();
    let mut engine_ready = use_resource(move || {
        let runtime = runtime.clone();
        async move { runtime.ensure_loaded().await }
    });

    use_effect(move || {
        let failed = engine_ready.read().as_ref().and_then(|r| r.as_ref().err()).cloned();
        if let Some(e) = failed {
            boundary.write().raise(&e);
        }
    });

    let failure = {
        let b = boundary.read();
        b.error().map(|_| b.display_message().to_string())
    };
    if let Some(message) = failure {
        let cache = ctx.cache.clone();
        return rsx! {
            ErrorFallback {
                message,
                on_retry: move |_| {
                    cache.invalidate(&code);
                    boundary.write().reset();
                    if matches!(*engine_ready.peek(), Some(Err(_))) {
                        engine_ready.restart();
                    }
                    info!(attempt = boundary.read().attempt(), "retrying VR page");
                },
            }
        };
    }

    let ready = matches!(*engine_ready.read(), Some(Ok(())));
    if !ready {
        return rsx! { EngineLoadingScreen {} };
    }

    rsx! {
        div { class: "viewer-page",
            VrCanvas {
                code,
                on_error: move |e: ViewerError| boundary.write().raise(&e),
            }
            EngineStatus {}
        }
    }
}

/// Screen-filling render surface bound to one engine instance.
#[component]
fn VrCanvas(code: ResourceCode, on_error: EventHandler<ViewerError>) -> Element {
    let ctx = use_context::<ViewerContext>();
    let session = use_hook(|| Rc::new(RefCell::new(None::<ViewerSession<ScriptEngine>>)));
    let loader = use_hook(|| Rc::new(RefCell::new(SceneLoader::new())));
    let mut engine = use_signal(|| None::<Arc<ScriptEngine>>);

    let (client, cache) = (ctx.client.clone(), ctx.cache.clone());
    let work = use_resource(move || {
        let (client, cache, code) = (client.clone(), cache.clone(), code.clone());
        async move { cache.fetch_cached(&client, &code).await }
    });

    use_effect(move || {
        let current = engine.read().clone();
        let fetched = work.read().as_ref().and_then(|r| r.as_ref().ok()).cloned();
        let load = loader.borrow_mut().poll(current.as_ref(), fetched.as_ref());
        if let Some(load) = load {
            spawn(load);
        }
    });

    use_effect(move || {
        let failed = work.read().as_ref().and_then(|r| r.as_ref().err()).cloned();
        if let Some(e) = failed {
            on_error.call(e);
        }
    });

    let on_unmount = session.clone();
    use_drop(move || {
        let released = on_unmount.borrow_mut().take();
        drop(released);
    });

    let mount_ctx = ctx.clone();
    let resize = ctx.resize.clone();
    let fetching = work.read().is_none();

    rsx! {
        div {
            class: "vr-container",
            onresize: move |evt: Event<ResizeData>| {
                if let Ok(size) = evt.get_content_box_size() {
                    resize.dispatch(SurfaceSize {
                        width: size.width,
                        height: size.height,
                    });
                }
            },
            div {
                id: SURFACE_ID,
                class: "vr-surface",
                onmounted: move |_| {
                    if session.borrow().is_some() {
                        return;
                    }
                    let mounted = ViewerSession::mount(
                        mount_ctx.runtime.create_engine(),
                        &SurfaceHandle::new(SURFACE_ID),
                        &mount_ctx.slot,
                        &mount_ctx.resize,
                    );
                    if let Some(size) = mount_ctx.resize.last_size() {
                        mounted.engine().refresh(size);
                    }
                    engine.set(Some(mounted.engine().clone()));
                    *session.borrow_mut() = Some(mounted);
                },
            }
            if fetching {
                SceneLoadingOverlay {}
            }
        }
    }
}

/// Reads the shared engine slot from outside the canvas component.
#[component]
fn EngineStatus() -> Element {
    let ctx = use_context::<ViewerContext>();
    let mut current = use_signal(|| ctx.slot.current().map(|e| e.id()));

    let slot = ctx.slot.clone();
    use_future(move || {
        let mut rx = slot.subscribe();
        async move {
            while rx.changed().await.is_ok() {
                let id: Option<EngineId> = rx.borrow_and_update().as_ref().map(|e| e.id());
                current.set(id);
            }
        }
    });

    let (slot, resize) = (ctx.slot.clone(), ctx.resize.clone());
    let label = match *current.read() {
        Some(id) => format!("engine {id}"),
        None => "no engine".to_string(),
    };

    rsx! {
        div { class: "engine-status",
            span { class: "engine-label", "{label}" }
            button {
                class: "btn btn-small",
                disabled: current.read().is_none(),
                onclick: move |_| {
                    if let (Some(engine), Some(size)) = (slot.current(), resize.last_size()) {
                        engine.refresh(size);
                    }
                },
                "Refit"
            }
        }
    }
}
