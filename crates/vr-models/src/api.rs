//! Local proxy API shared by `vr-proxy` and its clients.

use serde::{Deserialize, Serialize};

/// Route of the VR metadata proxy endpoint.
pub const VR_INFO_PATH: &str = "/api/vr/info";

/// Query parameter carrying the resource code on [`VR_INFO_PATH`].
pub const RESOURCE_CODE_PARAM: &str = "resourceCode";

/// Error message returned when [`RESOURCE_CODE_PARAM`] is absent or empty.
pub const MISSING_RESOURCE_CODE: &str = "Missing \"resourceCode\" query parameter.";

/// Query string of `GET /api/vr/info`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct VrInfoQuery {
    /// Code of the requested work. Optional at the wire level so that a
    /// missing value can be reported with a dedicated message.
    #[serde(rename = "resourceCode", default)]
    pub resource_code: Option<String>,
}

impl VrInfoQuery {
    /// Build the query from raw key/value pairs. When the parameter is
    /// repeated, the first occurrence wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            resource_code: pairs
                .into_iter()
                .find(|(key, _)| key == RESOURCE_CODE_PARAM)
                .map(|(_, value)| value),
        }
    }
}

/// JSON body of every proxy error response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    /// Explanation of the failure.
    pub error: String,
}

impl ErrorBody {
    /// Wrap a message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
