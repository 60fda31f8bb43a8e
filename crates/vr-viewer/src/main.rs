//! Desktop viewer for VR works.
//!
//! Opens `/{resourceCode}`, fetches the work's scene data through the VR
//! proxy and renders it with the external engine library.

mod boundary;
mod components;
mod engine;
mod error;
mod fetch;
mod resize;
mod route;
mod session;
mod store;

use std::sync::OnceLock;

use clap::Parser;
use dioxus::prelude::*;
use tracing::info;

use crate::components::screens::NotFoundScreen;
use crate::components::viewer::{ViewerContext, ViewerPage};
use crate::engine::EngineRuntime;
use crate::fetch::{ProxyClient, WorkCache};
use crate::resize::ResizeHub;
use crate::route::Route;
use crate::store::EngineSlot;

#[derive(Parser, Debug, Clone)]
#[command(name = "vr-viewer")]
#[command(about = "View a VR work by resource code")]
struct Args {
    /// Route to open, e.g. `/kv4Y7rB2`.
    #[arg(default_value = "")]
    route: String,

    /// Base URL of the VR proxy.
    #[arg(long, env = "VR_PROXY_URL", default_value = "http://localhost:3000")]
    proxy_url: String,

    /// Engine library to inject. Omit when the page already provides it.
    #[arg(long, env = "VR_ENGINE_SCRIPT_URL")]
    engine_script_url: Option<String>,

    /// JavaScript expression creating an engine instance.
    #[arg(long, env = "VR_ENGINE_CONSTRUCTOR", default_value = "new window.Five.Five()")]
    engine_constructor: String,
}

static LAUNCH: OnceLock<Args> = OnceLock::new();

fn launch_args() -> &'static Args {
    LAUNCH.get_or_init(Args::parse)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = launch_args();
    info!(
        route = %args.route,
        proxy_url = %args.proxy_url,
        engine_script = args.engine_script_url.as_deref().unwrap_or("<host page>"),
        "starting VR viewer"
    );

    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    let args = launch_args();
    use_context_provider(|| ViewerContext {
        client: ProxyClient::new(&args.proxy_url),
        cache: WorkCache::new(),
        slot: EngineSlot::new(),
        resize: ResizeHub::new(),
        runtime: EngineRuntime::new(args.engine_script_url.clone(), &args.engine_constructor),
    });

    let route = use_hook(|| Route::parse(&args.route));
    let meta = route.meta();

    rsx! {
        document::Title { "{meta.title}" }
        document::Meta { name: "description", content: meta.description }
        style { {include_str!("style.css")} }

        match route {
            Route::Viewer(code) => rsx! { ViewerPage { code } },
            Route::NotFound => rsx! { NotFoundScreen {} },
        }
    }
}
