use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

const GENERIC_FAILURE: &str = "Internal server error";

/// Every failure a route can produce. `status` is the one place where a
/// failure is turned into an HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Validation { message: String },
    Unauthorized,
    NotFound { message: String },
    Transport { operation: &'static str },
    Internal { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    pub fn validation<S: Into<String>>(msg: S) -> Error {
        Error::Validation {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn internal<S: Into<String>>(msg: S) -> Error {
        Error::Internal {
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Transport { .. } | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Server-side faults collapse into a
    /// generic notice; their detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation { message } | Error::NotFound { message } => message.clone(),
            Error::Unauthorized => "Authentication required".to_string(),
            Error::Transport { .. } | Error::Internal { .. } => GENERIC_FAILURE.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Transport { operation } => write!(f, "remote store failure during {}", operation),
            Error::Internal { message } => write!(f, "internal error: {}", message),
            other => f.write_str(&other.public_message()),
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Error::Internal { message } = &self {
            log::error!("Internal error: {}", message);
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<axum::http::header::InvalidHeaderValue> for Error {
    fn from(err: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal {
            message: format!("invalid header value: {}", err),
        }
    }
}
