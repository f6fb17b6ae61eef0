//! Response envelope
//!
//! Success is `{status: "ok", data}`; failure is `{status: <kind>}` with no
//! detail beyond the kind.

use crate::pipeline::{PieceError, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    /// Successful response carrying `data`
    pub fn ok(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                status: Status::Ok,
                data: Some(data),
            },
            Err(e) => {
                warn!(error = %e, "failed to serialize response data");
                Self::status(Status::Error)
            }
        }
    }

    /// Response with a status and no data
    #[must_use]
    pub const fn status(status: Status) -> Self {
        Self { status, data: None }
    }

    #[must_use]
    pub fn failure(err: &PieceError) -> Self {
        Self::status(err.status())
    }

    pub fn from_result<T: Serialize>(result: Result<T, PieceError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(&err),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// What a route sends back
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(ApiResponse),
    /// A rendered presentational fragment
    Fragment(String),
}

impl Reply {
    /// The status of the reply; fragments are always successful
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Json(response) => response.status,
            Self::Fragment(_) => Status::Ok,
        }
    }

    /// The body as sent over the wire
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::Json(response) => serde_json::to_string(response)
                .unwrap_or_else(|_| r#"{"status":"error"}"#.to_string()),
            Self::Fragment(fragment) => fragment.clone(),
        }
    }

    #[must_use]
    pub fn into_json(self) -> Option<ApiResponse> {
        match self {
            Self::Json(response) => Some(response),
            Self::Fragment(_) => None,
        }
    }
}
