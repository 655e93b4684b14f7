//! Crate-level error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::{AuthError, AuthorityError};
use crate::ledger::LedgerError;
use crate::store::StoreError;
use crate::token::DecodeError;

/// Broad failure classes a UI reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; nothing was changed.
    Validation,
    /// Wrong credentials, inactive account or missing role.
    AuthFailure,
    /// Username or phone already in use.
    Conflict,
    /// Malformed credential token.
    Decode,
    NotFound,
    /// The authority could not be reached or answered nonsense.
    Unavailable,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("No active session")]
    NoSession,

    #[error("Sign in required")]
    Unauthenticated,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Store(_) => ErrorKind::Internal,
            Error::Ledger(e) => match e {
                LedgerError::NoActiveSession | LedgerError::UserNotFound(_) => ErrorKind::NotFound,
                LedgerError::SessionMismatch | LedgerError::NotAdmin => ErrorKind::AuthFailure,
                LedgerError::InvalidAmount(_) | LedgerError::BalanceOverflow => ErrorKind::Validation,
                LedgerError::Store(_) => ErrorKind::Internal,
            },
            Error::Auth(e) => match e {
                AuthError::MissingField(_)
                | AuthError::PasswordMismatch
                | AuthError::RegistrationFailed(_) => ErrorKind::Validation,
                AuthError::InvalidCredentials | AuthError::AccountDeactivated | AuthError::NotAdmin => {
                    ErrorKind::AuthFailure
                }
                AuthError::UsernameTaken | AuthError::PhoneTaken => ErrorKind::Conflict,
                AuthError::Authority(_) => ErrorKind::Unavailable,
                AuthError::Store(_) => ErrorKind::Internal,
            },
            Error::Decode(_) => ErrorKind::Decode,
            Error::NoSession => ErrorKind::NotFound,
            Error::Unauthenticated => ErrorKind::AuthFailure,
            Error::InvalidRequest(_) => ErrorKind::Validation,
        }
    }

    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            Error::Ledger(e) => match e {
                LedgerError::NoActiveSession => (StatusCode::NOT_FOUND, "no_active_session"),
                LedgerError::SessionMismatch => (StatusCode::FORBIDDEN, "session_mismatch"),
                LedgerError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
                LedgerError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                LedgerError::NotAdmin => (StatusCode::FORBIDDEN, "not_admin"),
                LedgerError::BalanceOverflow => (StatusCode::UNPROCESSABLE_ENTITY, "balance_overflow"),
                LedgerError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            },
            Error::Auth(e) => match e {
                AuthError::MissingField(_) => (StatusCode::BAD_REQUEST, "missing_field"),
                AuthError::PasswordMismatch => (StatusCode::BAD_REQUEST, "password_mismatch"),
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                AuthError::AccountDeactivated => (StatusCode::FORBIDDEN, "account_deactivated"),
                AuthError::NotAdmin => (StatusCode::FORBIDDEN, "not_admin"),
                AuthError::UsernameTaken => (StatusCode::CONFLICT, "username_taken"),
                AuthError::PhoneTaken => (StatusCode::CONFLICT, "phone_taken"),
                AuthError::RegistrationFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "registration_failed"),
                AuthError::Authority(AuthorityError::Transport(_)) => {
                    (StatusCode::BAD_GATEWAY, "authority_unavailable")
                }
                AuthError::Authority(_) => (StatusCode::BAD_GATEWAY, "authority_error"),
                AuthError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            },
            Error::Decode(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_token"),
            Error::NoSession => (StatusCode::NOT_FOUND, "no_active_session"),
            Error::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_type().0
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
