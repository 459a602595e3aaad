use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// ApiError
///
/// The single funnel every handler failure flows through. Converting this enum into a
/// response centralizes the HTTP status / JSON body mapping in one place, so handlers
/// only ever describe *what* went wrong, never how it is formatted on the wire.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failures, reported together so the frontend can
    /// annotate every offending input at once.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// FieldError
///
/// One offending input field and the human-readable reason it was rejected.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// ErrorBody
///
/// The JSON shape of every error response: a top-level message plus a (possibly empty)
/// list of field errors. Only validation failures populate `errors`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    errors: Vec<FieldError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg, vec![])
            }
            ApiError::Validation(errors) => {
                tracing::warn!("validation failed: {:?}", errors);
                (
                    StatusCode::BAD_REQUEST,
                    "Validation failed".to_string(),
                    errors,
                )
            }
            ApiError::Unauthorized(msg) => {
                tracing::warn!("unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, msg, vec![])
            }
            ApiError::Forbidden(msg) => {
                tracing::warn!("forbidden: {}", msg);
                (StatusCode::FORBIDDEN, msg, vec![])
            }
            ApiError::NotFound(msg) => {
                tracing::warn!("not found: {}", msg);
                (StatusCode::NOT_FOUND, msg, vec![])
            }
            ApiError::Conflict(msg) => {
                tracing::warn!("conflict: {}", msg);
                (StatusCode::CONFLICT, msg, vec![])
            }
            ApiError::Internal(msg) => {
                // Internal detail is logged for operators but never leaked to clients.
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    vec![],
                )
            }
        };

        let body = Json(ErrorBody { message, errors });

        (status, body).into_response()
    }
}

impl ApiError {
    /// Flattens `validator`'s nested error map into the flat field list the
    /// frontend consumes. Unset messages fall back to the validator's default
    /// wording, mirroring what the validation layer reported.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(|e| FieldError {
                        field: wire_field_name(field.as_ref()),
                        message: e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Invalid value".to_string()),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        ApiError::Validation(field_errors)
    }
}

/// Validation errors carry Rust field identifiers; payloads travel in
/// camelCase. Reported field names must match the keys the client sent.
fn wire_field_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
