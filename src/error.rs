//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure a handler can produce is one of its variants, and each variant maps to
//! exactly one HTTP status code and JSON body shape.
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can simply return
//! `Result<impl Responder, AppError>`. Server-side failures are logged here and reach
//! the client only as a generic message.
//! `From` implementations cover `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, `bcrypt::BcryptError` and `BlockingError`, so the `?`
//! operator works across all layers.

use actix_web::{
    error::{BlockingError, JsonPayloadError, PathError, QueryPayloadError, ResponseError},
    http::StatusCode,
    HttpRequest, HttpResponse,
};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use validator::{ValidationErrors, ValidationErrorsKind};

/// A single field-level validation failure, as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Input failed validation (HTTP 400). Carries one entry per offending field.
    ValidationError(Vec<FieldError>),
    /// The request could not be understood at all, e.g. a non-JSON body (HTTP 400).
    BadRequest(String),
    /// Registration or profile update with an email that is already taken (HTTP 400).
    DuplicateEmail,
    /// Unknown email or wrong password (HTTP 401). The two cases are deliberately
    /// indistinguishable.
    InvalidCredentials,
    /// No bearer token on a protected route (HTTP 401).
    MissingToken,
    /// Malformed token or bad signature (HTTP 401).
    InvalidToken(String),
    /// Token signature is valid but `exp` has passed (HTTP 401).
    ExpiredToken,
    /// The resource does not exist or is not visible to the caller (HTTP 404).
    NotFound(String),
    /// Represents an error originating from database operations (HTTP 500).
    DatabaseError(String),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
}

impl AppError {
    pub fn task_not_found() -> Self {
        AppError::NotFound("Task not found".into())
    }

    pub fn user_not_found() -> Self {
        AppError::NotFound("User not found".into())
    }

    /// Builds a validation error for a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![FieldError::new(field, message)])
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                write!(f, "Validation Error: {}", fields.join(", "))
            }
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::DuplicateEmail => write!(f, "Duplicate Email"),
            AppError::InvalidCredentials => write!(f, "Invalid Credentials"),
            AppError::MissingToken => write!(f, "Missing Token"),
            AppError::InvalidToken(msg) => write!(f, "Invalid Token: {}", msg),
            AppError::ExpiredToken => write!(f, "Expired Token"),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Every body carries a `message` key; validation failures add an `errors` array.
/// 500-class errors are logged and replaced by a generic message.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) | AppError::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials
            | AppError::MissingToken
            | AppError::InvalidToken(_)
            | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            AppError::ValidationError(errors) => builder.json(json!({
                "message": "Validation failed",
                "errors": errors
            })),
            AppError::BadRequest(msg) | AppError::NotFound(msg) => builder.json(json!({
                "message": msg
            })),
            AppError::DuplicateEmail => builder.json(json!({
                "message": "User already exists"
            })),
            AppError::InvalidCredentials => builder.json(json!({
                "message": "Invalid email or password"
            })),
            AppError::MissingToken => builder.json(json!({
                "message": "Not authorized, no token"
            })),
            AppError::InvalidToken(_) => builder.json(json!({
                "message": "Not authorized, token failed"
            })),
            AppError::ExpiredToken => builder.json(json!({
                "message": "Not authorized, token expired"
            })),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                log::error!("{}", self);
                builder.json(json!({
                    "message": "Server error"
                }))
            }
        }
    }
}

/// Converts `sqlx::Error` into `AppError::DatabaseError`.
///
/// Constraint violations are interpreted by the store, which knows which constraint
/// was hit. Lookups use `fetch_optional`, so a missing row never arrives here.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        AppError::DatabaseError(error.to_string())
    }
}

/// Flattens `validator::ValidationErrors` into field-level messages.
///
/// Fields are sorted by name so responses are stable.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<FieldError> = Vec::new();
        for (field, kind) in errors.errors() {
            if let ValidationErrorsKind::Field(field_errors) = kind {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid ({})", field, err.code));
                    fields.push(FieldError::new(*field, message));
                }
            }
        }
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationError(fields)
    }
}

/// Converts `jsonwebtoken::errors::Error` into the matching 401 variant.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        match error.kind() {
            JwtErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken(error.to_string()),
        }
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(format!("Password hashing failed: {}", error))
    }
}

impl From<BlockingError> for AppError {
    fn from(error: BlockingError) -> AppError {
        AppError::InternalServerError(format!("Blocking task failed: {}", error))
    }
}

/// Error handler for `web::JsonConfig`.
///
/// Deserialization failures (wrong type, unknown enum variant, missing field) are
/// validation errors; anything else about the payload is a plain bad request.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = match &err {
        JsonPayloadError::Deserialize(e) => AppError::invalid_field("body", e.to_string()),
        _ => AppError::BadRequest(err.to_string()),
    };
    app_err.into()
}

/// Error handler for `web::QueryConfig`.
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::invalid_field("query", err.to_string()).into()
}

/// Error handler for `web::PathConfig`. The only path parameter is a task id, so a
/// value that does not parse is reported as a missing task.
pub fn path_error_handler(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::task_not_found().into()
}
