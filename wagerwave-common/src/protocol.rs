//! RPC payloads exchanged with the external authority.
//!
//! The authority exposes two PostgREST-style procedures:
//!
//! - `authenticate_wager_user(username_input, password_input)` returns an
//!   array with zero (bad credentials) or one [`CanonicalUser`].
//! - `register_wager_user(username_input, password_input, phone_input)`
//!   returns an array with the created [`CanonicalUser`].
//!
//! Failures come back as an [`RpcErrorBody`].
//!
//! [`CanonicalUser`]: crate::user::CanonicalUser

use serde::{Deserialize, Serialize};

/// Procedure name for credential verification.
pub const AUTHENTICATE_RPC: &str = "authenticate_wager_user";

/// Procedure name for account creation.
pub const REGISTER_RPC: &str = "register_wager_user";

/// Message substring the authority uses for a duplicate username.
pub const USERNAME_EXISTS_MESSAGE: &str = "Username already exists";

/// Message substring the authority uses for a duplicate phone number.
pub const PHONE_REGISTERED_MESSAGE: &str = "Phone number already registered";

/// Structured error code for a duplicate username.
pub const USERNAME_TAKEN_CODE: &str = "username_taken";

/// Structured error code for a duplicate phone number.
pub const PHONE_TAKEN_CODE: &str = "phone_taken";

/// Arguments of `authenticate_wager_user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateParams {
    pub username_input: String,
    pub password_input: String,
}

/// Arguments of `register_wager_user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterParams {
    pub username_input: String,
    pub password_input: String,
    /// Sent as `null` when the user left the field empty.
    pub phone_input: Option<String>,
}

/// Error body returned by the authority.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}
