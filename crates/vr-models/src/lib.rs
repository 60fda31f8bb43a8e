#![deny(missing_docs)]

//! # VR Models
//!
//! Wire types shared by the VR proxy, the desktop viewer and the mock
//! gateway.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`gateway`] | Upstream gateway envelope and access-token payload |
//! | [`resource`] | `ResourceCode` identifier of a VR work |
//! | [`api`] | Request parameters and error body of the local proxy API |
//! | [`error`] | Validation errors |

pub mod api;
pub mod error;
pub mod gateway;
pub mod resource;

pub use api::*;
pub use error::*;
pub use gateway::*;
pub use resource::*;
