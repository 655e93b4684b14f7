//! Seam to the external identity authority.

use async_trait::async_trait;

use wagerwave_common::protocol::{
    PHONE_REGISTERED_MESSAGE, PHONE_TAKEN_CODE, USERNAME_EXISTS_MESSAGE, USERNAME_TAKEN_CODE,
};
use wagerwave_common::CanonicalUser;

#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    #[error("Authority unreachable: {0}")]
    Transport(String),
    #[error("Authority rejected the request: {message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },
    #[error("Invalid authority response: {0}")]
    InvalidResponse(String),
}

/// Why a registration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UsernameTaken,
    PhoneTaken,
    Unknown,
}

impl AuthorityError {
    /// Classify a rejection by its structured code, falling back to the
    /// message text older authority versions send.
    pub fn classify(&self) -> Rejection {
        let AuthorityError::Rejected { code, message } = self else {
            return Rejection::Unknown;
        };

        match code.as_deref() {
            Some(USERNAME_TAKEN_CODE) => return Rejection::UsernameTaken,
            Some(PHONE_TAKEN_CODE) => return Rejection::PhoneTaken,
            _ => {}
        }

        if message.contains(USERNAME_EXISTS_MESSAGE) {
            Rejection::UsernameTaken
        } else if message.contains(PHONE_REGISTERED_MESSAGE) {
            Rejection::PhoneTaken
        } else {
            Rejection::Unknown
        }
    }
}

/// Verifies credentials and creates accounts. This crate never checks a
/// password itself.
#[async_trait]
pub trait Authority: Send + Sync {
    /// `Ok(None)` means the credentials did not match.
    async fn authenticate_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<CanonicalUser>, AuthorityError>;

    async fn register_user(
        &self,
        username: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<CanonicalUser, AuthorityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(code: Option<&str>, message: &str) -> AuthorityError {
        AuthorityError::Rejected {
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_by_code_first() {
        assert_eq!(
            rejected(Some("username_taken"), "Phone number already registered").classify(),
            Rejection::UsernameTaken
        );
        assert_eq!(rejected(Some("phone_taken"), "").classify(), Rejection::PhoneTaken);
    }

    #[test]
    fn test_classify_by_message() {
        assert_eq!(
            rejected(Some("P0001"), "Username already exists").classify(),
            Rejection::UsernameTaken
        );
        assert_eq!(
            rejected(None, "ERROR: Phone number already registered for another user").classify(),
            Rejection::PhoneTaken
        );
        assert_eq!(rejected(None, "database is down").classify(), Rejection::Unknown);
    }

    #[test]
    fn test_non_rejections_are_unknown() {
        assert_eq!(
            AuthorityError::Transport("Username already exists".to_string()).classify(),
            Rejection::Unknown
        );
    }
}
