//! Rendering-engine seam.
//!
//! The VR engine is an external JavaScript library running inside the
//! desktop webview. [`Engine`] exposes only its lifecycle operations;
//! [`ScriptEngine`] implements them by evaluating small scripts through
//! `document::eval`, and [`EngineRuntime`] injects the library itself on
//! first use.

use std::fmt;
use std::sync::Arc;

use dioxus::core::spawn_forever;
use dioxus::prelude::*;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ViewerError;
use crate::resize::SurfaceSize;

/// Identity of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(Uuid);

impl EngineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// DOM element the engine renders into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub element_id: String,
}

impl SurfaceHandle {
    pub fn new(element_id: &str) -> Self {
        Self {
            element_id: element_id.to_string(),
        }
    }
}

/// Lifecycle operations of a VR engine instance.
pub trait Engine: Send + Sync + 'static {
    fn id(&self) -> EngineId;

    /// Mount the engine's canvas inside `surface`.
    fn attach(&self, surface: &SurfaceHandle);

    /// Resize the internal render surface.
    fn refresh(&self, size: SurfaceSize);

    /// Render a scene payload. May fail asynchronously.
    fn load(&self, work: Arc<Value>) -> LocalBoxFuture<'static, Result<(), ViewerError>>;

    /// Release every resource held by the instance.
    fn dispose(&self) -> Result<(), ViewerError>;
}

// ---------------------------------------------------------------------------
// Script generation
// ---------------------------------------------------------------------------

/// JavaScript snippets driving engine instances stored in
/// `window.__vrEngines`, keyed by [`EngineId`].
mod script {
    use super::*;

    fn literal(value: &str) -> String {
        // A JSON string is a valid JS string literal.
        Value::String(value.to_string()).to_string()
    }

    pub(super) fn load_library(script_url: &str) -> String {
        let url = literal(script_url);
        format!(
            r#"if (!window.__vrEngineLoaded) {{
  await new Promise((resolve, reject) => {{
    const s = document.createElement("script");
    s.src = {url};
    s.onload = resolve;
    s.onerror = () => reject(new Error("failed to load " + {url}));
    document.head.appendChild(s);
  }});
  window.__vrEngineLoaded = true;
}}
return true;"#
        )
    }

    pub(super) fn construct(id: EngineId, constructor: &str) -> String {
        let id = literal(&id.to_string());
        format!(
            "window.__vrEngines = window.__vrEngines || {{}};\nwindow.__vrEngines[{id}] = {constructor};\nreturn true;"
        )
    }

    pub(super) fn attach(id: EngineId, element_id: &str) -> String {
        let id = literal(&id.to_string());
        let element = literal(element_id);
        format!(
            "const e = (window.__vrEngines || {{}})[{id}];\nconst el = document.getElementById({element});\nif (e && el) {{ e.appendTo(el); }}\nreturn true;"
        )
    }

    pub(super) fn refresh(id: EngineId, size: SurfaceSize) -> String {
        let id = literal(&id.to_string());
        let dims = serde_json::json!({ "width": size.width, "height": size.height });
        format!(
            "const e = (window.__vrEngines || {{}})[{id}];\nif (e) {{ e.refresh({dims}); }}\nreturn true;"
        )
    }

    pub(super) fn load(id: EngineId, work: &Value) -> String {
        let id = literal(&id.to_string());
        format!(
            "const e = (window.__vrEngines || {{}})[{id}];\nif (!e) {{ throw new Error(\"engine not found\"); }}\nawait e.load({work});\nreturn true;"
        )
    }

    pub(super) fn dispose(id: EngineId) -> String {
        let id = literal(&id.to_string());
        format!(
            "const engines = window.__vrEngines || {{}};\nconst e = engines[{id}];\nif (e) {{\n  try {{ e.dispose(); }} finally {{ delete engines[{id}]; }}\n}}\nreturn true;"
        )
    }
}

/// Run `js` in the webview and log a failure once the result arrives.
///
/// The script is submitted immediately; the result is awaited on a root
/// task so it is still observed when the calling component is unmounting.
fn eval_logged(
    js: &str,
    engine_id: EngineId,
    operation: &'static str,
    wrap: fn(String) -> ViewerError,
) {
    let eval = document::eval(js);
    spawn_forever(async move {
        if let Err(e) = eval.await {
            let err = wrap(e.to_string());
            warn!(engine_id = %engine_id, operation, error = %err, "engine script failed");
        }
    });
}

// ---------------------------------------------------------------------------
// EngineRuntime
// ---------------------------------------------------------------------------

/// Lazily loaded engine library, shared by every viewer in the process.
#[derive(Clone)]
pub struct EngineRuntime {
    /// Script to inject; `None` when the host page already provides it.
    script_url: Option<String>,
    /// JavaScript expression creating a fresh engine instance.
    constructor: Arc<str>,
    ready: Arc<tokio::sync::OnceCell<()>>,
}

impl EngineRuntime {
    pub fn new(script_url: Option<String>, constructor: &str) -> Self {
        Self {
            script_url,
            constructor: constructor.into(),
            ready: Arc::new(tokio::sync::OnceCell::new()),
        }
    }

    /// Load the library once. A failed load is not remembered, so a later
    /// call tries again.
    pub async fn ensure_loaded(&self) -> Result<(), ViewerError> {
        self.ready
            .get_or_try_init(|| async {
                let Some(url) = self.script_url.as_deref() else {
                    debug!("engine library provided by host page");
                    return Ok(());
                };
                info!(script_url = %url, "loading VR engine library");
                document::eval(&script::load_library(url))
                    .await
                    .map_err(|e| {
                        error!(script_url = %url, error = %e, "VR engine library failed to load");
                        ViewerError::EngineRuntime(e.to_string())
                    })?;
                info!("VR engine library ready");
                Ok(())
            })
            .await
            .map(|_| ())
    }

    /// Instantiate a new engine. Requires [`ensure_loaded`](Self::ensure_loaded).
    pub fn create_engine(&self) -> ScriptEngine {
        let id = EngineId::new();
        eval_logged(
            &script::construct(id, &self.constructor),
            id,
            "construct",
            ViewerError::EngineRuntime,
        );
        debug!(engine_id = %id, "engine constructed");
        ScriptEngine { id }
    }
}

// ---------------------------------------------------------------------------
// ScriptEngine
// ---------------------------------------------------------------------------

/// Handle to an engine instance living in the webview.
#[derive(Debug)]
pub struct ScriptEngine {
    id: EngineId,
}

impl Engine for ScriptEngine {
    fn id(&self) -> EngineId {
        self.id
    }

    fn attach(&self, surface: &SurfaceHandle) {
        eval_logged(
            &script::attach(self.id, &surface.element_id),
            self.id,
            "attach",
            ViewerError::EngineRuntime,
        );
    }

    fn refresh(&self, size: SurfaceSize) {
        eval_logged(
            &script::refresh(self.id, size),
            self.id,
            "refresh",
            ViewerError::EngineRuntime,
        );
    }

    fn load(&self, work: Arc<Value>) -> LocalBoxFuture<'static, Result<(), ViewerError>> {
        let eval = document::eval(&script::load(self.id, &work));
        async move {
            eval.await
                .map(|_| ())
                .map_err(|e| ViewerError::EngineLoad(e.to_string()))
        }
        .boxed_local()
    }

    /// Submits the dispose script. The instance is removed from the page
    /// registry even when the engine's own `dispose` throws; that failure
    /// arrives asynchronously and is logged as [`ViewerError::EngineDispose`].
    fn dispose(&self) -> Result<(), ViewerError> {
        eval_logged(
            &script::dispose(self.id),
            self.id,
            "dispose",
            ViewerError::EngineDispose,
        );
        Ok(())
    }
}
