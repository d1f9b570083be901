//! HTTP error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use licensekey_engine::LicenseError;
use licensekey_store::StoreError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// One rejected property and the reasons it was rejected.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub property: String,
    pub constraints: Vec<String>,
}

/// JSON body of every error response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub response: Vec<Violation>,
}

/// An error that renders as an [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    violations: Vec<Violation>,
}

impl ApiError {
    const DEFAULT_PROPERTY: &'static str = "error";

    fn new(status: StatusCode, property: &str, constraint: impl Into<String>) -> Self {
        Self {
            status,
            violations: vec![Violation {
                property: property.to_string(),
                constraints: vec![constraint.into()],
            }],
        }
    }

    pub fn bad_request(property: &str, constraint: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, property, constraint)
    }

    pub fn not_found(constraint: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, Self::DEFAULT_PROPERTY, constraint)
    }

    /// Logs the cause and hides it from the client.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!("Request failed: {}", cause);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            Self::DEFAULT_PROPERTY,
            "internal error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Builds the response body. `error` is the upper-case reason phrase.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_uppercase(),
            response: self.violations.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::InvalidAttributes { field, reason } => Self::bad_request(field, reason),
            other => Self::internal(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("body", rejection.body_text())
    }
}
