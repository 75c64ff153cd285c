//! Application error type and the stable error codes exposed to clients.
//!
//! Every failure the pipeline produces is an [`AppError`]. Converting it into a
//! response always yields the [`ApiResponse`](crate::envelope::ApiResponse) error
//! shape. Internal errors never reach the client verbatim: the body carries a generic
//! message and the real detail rides along in an [`InternalFailure`] response
//! extension so the dispatcher can hand it to the telemetry sink.

use std::fmt;

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::envelope::{ApiResponse, ErrorBody, FieldError};

/// Stable, machine-readable error codes. Clients may branch on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthRequired,
    AuthInvalid,
    Forbidden,
    CsrfMissing,
    ValidationFailed,
    NotFound,
    MethodNotAllowed,
    RateLimited,
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::AuthRequired | Self::AuthInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::CsrfMissing => StatusCode::FORBIDDEN,
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::AuthInvalid => "AUTH_INVALID",
            Self::Forbidden => "FORBIDDEN",
            Self::CsrfMissing => "CSRF_MISSING",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::RateLimited => "RATE_LIMITED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Message shown to clients when the caller does not supply a more specific one.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication required",
            Self::AuthInvalid => "Invalid or expired credentials",
            Self::Forbidden => "You do not have permission to perform this action",
            Self::CsrfMissing => "Missing anti-forgery token",
            Self::ValidationFailed => "Request validation failed",
            Self::NotFound => "Resource not found",
            Self::MethodNotAllowed => "Method not allowed",
            Self::RateLimited => "Too many requests, please try again later",
            Self::InternalError => "An unexpected error occurred",
            Self::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail of an internal failure, attached to the response extensions and never
/// serialized into the client body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalFailure {
    /// Short classification, e.g. `InternalError` or `Panic`.
    pub kind: String,
    /// Full detail including the error chain.
    pub detail: String,
}

impl InternalFailure {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }

    pub fn from_error(error: &Error) -> Self {
        Self::new("InternalError", format!("{:#}", error))
    }
}

#[derive(Debug)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub fields: Vec<FieldError>,
    pub source: Option<Error>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: Vec::new(),
            source: None,
        }
    }

    /// Error carrying the code's default client-facing message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn auth_required() -> Self {
        Self::from_code(ErrorCode::AuthRequired)
    }

    pub fn auth_invalid() -> Self {
        Self::from_code(ErrorCode::AuthInvalid)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn csrf_missing() -> Self {
        Self::from_code(ErrorCode::CsrfMissing)
    }

    pub fn not_found() -> Self {
        Self::from_code(ErrorCode::NotFound)
    }

    pub fn method_not_allowed() -> Self {
        Self::from_code(ErrorCode::MethodNotAllowed)
    }

    pub fn rate_limited() -> Self {
        Self::from_code(ErrorCode::RateLimited)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self {
            fields,
            ..Self::from_code(ErrorCode::ValidationFailed)
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        let error = err.into();
        Self {
            code: ErrorCode::InternalError,
            message: error.to_string(),
            fields: Vec::new(),
            source: Some(error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    fn client_message(&self) -> String {
        match self.code {
            ErrorCode::InternalError => self.code.default_message().to_string(),
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let failure = (self.code == ErrorCode::InternalError).then(|| match &self.source {
            Some(source) => InternalFailure::from_error(source),
            None => InternalFailure::new("InternalError", self.message.clone()),
        });

        let body = ApiResponse::<()>::failure(ErrorBody {
            code: self.code,
            message: self.client_message(),
            fields: self.fields,
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(failure) = failure {
            response.extensions_mut().insert(failure);
        }
        response
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

/// Flattens `validator` errors into one entry per offending field.
///
/// Nested struct and list errors are reported with a dotted path
/// (`address.city`, `tags[2]`).
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields = Vec::new();
    collect_field_errors(None, errors, &mut fields);
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

fn collect_field_errors(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                let message = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", path));
                out.push(FieldError::new(path, message));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_field_errors(Some(&path), nested, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item_path = format!("{}[{}]", path, index);
                    collect_field_errors(Some(&item_path), nested, out);
                }
            }
        }
    }
}
