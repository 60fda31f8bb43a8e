//! Client route resolution.
//!
//! The viewer has a single route, `/{resourceCode}`. Anything else resolves
//! to [`Route::NotFound`].

use vr_models::ResourceCode;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    Viewer(ResourceCode),
    #[default]
    NotFound,
}

/// Title and description of the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
}

impl Route {
    /// Resolve a path such as `/kv4Y7rB2`. A bare code without the leading
    /// slash is accepted too.
    pub fn parse(path: &str) -> Self {
        let segment = path.trim().trim_matches('/');
        if segment.contains('/') {
            return Route::NotFound;
        }
        ResourceCode::new(segment).map_or(Route::NotFound, Route::Viewer)
    }

    pub fn meta(&self) -> PageMeta {
        match self {
            Route::Viewer(code) => PageMeta {
                title: format!("VR Demo - {code}"),
                description: format!("View Realsee VR content for resource {code}"),
            },
            Route::NotFound => PageMeta {
                title: "Resource Not Found".to_string(),
                description: "Could not find the requested VR resource.".to_string(),
            },
        }
    }
}
