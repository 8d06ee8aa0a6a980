use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::notification::DispatchError;
use crate::registration::{ApprovalError, LedgerError};

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `DUPLICATE_ROLL_IN_TEAM`, `EVENT_NOT_FOUND`, `REGISTRATION_CLOSED`,
    /// `DUPLICATE_REGISTRANT`, `TOKEN_MISSING`, `TOKEN_INVALID`,
    /// `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`, `DEPENDENCY_ERROR`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "DUPLICATE_REGISTRANT")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "This email is already registered for this event")]
    pub message: String,
    /// Request fields the error refers to, using the request's field names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(example = json!(["leaderRoll", "member1Roll"]))]
    pub fields: Vec<String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Field-level validation failure.
    InvalidFields {
        code: &'static str,
        message: String,
        fields: Vec<String>,
    },
    /// The event a registration targets does not exist.
    EventNotFound,
    /// The event's registration deadline has passed.
    RegistrationClosed,
    /// A uniqueness key of the submission is already claimed for the event.
    DuplicateRegistrant {
        field: String,
        message: String,
    },
    TokenMissing,
    TokenInvalid,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    /// A collaborator (mail relay, storage) failed for reasons not caused by the caller.
    Dependency(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, code, message, fields) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg, vec![]),
            AppError::InvalidFields {
                code,
                message,
                fields,
            } => (StatusCode::BAD_REQUEST, code, message, fields),
            AppError::EventNotFound => (
                StatusCode::BAD_REQUEST,
                "EVENT_NOT_FOUND",
                "Event not found".into(),
                vec![],
            ),
            AppError::RegistrationClosed => (
                StatusCode::BAD_REQUEST,
                "REGISTRATION_CLOSED",
                "Registration period has ended".into(),
                vec![],
            ),
            AppError::DuplicateRegistrant { field, message } => (
                StatusCode::BAD_REQUEST,
                "DUPLICATE_REGISTRANT",
                message,
                vec![field],
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "Authentication required".into(),
                vec![],
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid or expired token".into(),
                vec![],
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                "Insufficient permissions".into(),
                vec![],
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, vec![]),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, vec![]),
            AppError::Dependency(detail) => {
                tracing::error!("Dependency failure: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "DEPENDENCY_ERROR",
                    "An upstream service failed".into(),
                    vec![],
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                    vec![],
                )
            }
        };

        (
            status,
            ErrorBody {
                code,
                message,
                fields,
            },
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("Image not found".into()),
            StorageError::InvalidRef(msg) => AppError::Validation(msg),
            StorageError::Empty => AppError::Validation("Image must not be empty".into()),
            e @ StorageError::SizeLimitExceeded { .. } => AppError::Validation(e.to_string()),
            StorageError::Io(e) => AppError::Dependency(format!("image storage: {e}")),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::EventNotFound(_) => AppError::EventNotFound,
            LedgerError::RegistrationClosed(_) => AppError::RegistrationClosed,
            LedgerError::DuplicateRollWithinTeam(fields) => AppError::InvalidFields {
                code: "DUPLICATE_ROLL_IN_TEAM",
                message: "This roll number is already used by another team member".into(),
                fields: fields.into_iter().map(String::from).collect(),
            },
            LedgerError::Invalid(errors) => AppError::InvalidFields {
                code: "VALIDATION_ERROR",
                message: errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                fields: errors.into_iter().map(|e| e.field.to_owned()).collect(),
            },
            LedgerError::Duplicate(claim) => AppError::DuplicateRegistrant {
                field: claim.field.to_owned(),
                message: claim.kind.duplicate_message().to_owned(),
            },
            LedgerError::Db(e) => e.into(),
        }
    }
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::NotFound(_) => AppError::NotFound("Registration not found".into()),
            ApprovalError::InvalidStatus(e) => AppError::Validation(e.to_string()),
            ApprovalError::Db(e) => e.into(),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound(_) => AppError::NotFound("Notification not found".into()),
            DispatchError::AlreadySent(_) => {
                AppError::Conflict("Notification has already been sent".into())
            }
            DispatchError::InFlight(_) => {
                AppError::Conflict("Notification is being delivered".into())
            }
            DispatchError::Db(e) => e.into(),
        }
    }
}
