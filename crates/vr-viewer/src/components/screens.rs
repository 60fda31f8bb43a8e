use dioxus::prelude::*;

#[component]
fn Spinner() -> Element {
    rsx! {
        div { class: "spinner" }
    }
}

/// Full-screen placeholder shown while the engine library loads.
#[component]
pub fn EngineLoadingScreen() -> Element {
    rsx! {
        div { class: "screen screen-dark",
            Spinner {}
            p { class: "screen-text", "Loading VR Engine..." }
        }
    }
}

/// Translucent overlay drawn above the canvas while the scene is fetched.
#[component]
pub fn SceneLoadingOverlay() -> Element {
    rsx! {
        div { class: "scene-overlay",
            Spinner {}
            p { class: "screen-text", "Loading VR Scene..." }
        }
    }
}

#[component]
pub fn NotFoundScreen() -> Element {
    rsx! {
        div { class: "screen screen-muted",
            h2 { class: "screen-title", "Resource Not Found" }
            p { class: "screen-hint", "Could not find the requested VR resource." }
        }
    }
}

#[component]
pub fn ErrorFallback(message: String, on_retry: EventHandler<()>) -> Element {
    rsx! {
        div { class: "screen screen-muted",
            div { class: "error-card",
                h2 { class: "error-title", "Something went wrong!" }
                p { class: "error-message", "{message}" }
                button {
                    class: "btn btn-danger",
                    onclick: move |_| on_retry.call(()),
                    "Try again"
                }
            }
        }
    }
}
