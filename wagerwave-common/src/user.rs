//! User record types.

use serde::{Deserialize, Serialize};

/// Which dashboard a session may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular player account.
    #[default]
    User,
    /// May open the admin dashboard and grant points.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Login eligibility of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Deactivated,
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Active => write!(f, "active"),
            Status::Deactivated => write!(f, "deactivated"),
        }
    }
}

/// Locally cached compatibility record for one registered user.
///
/// This is the shape persisted under the `users` key. Missing `points`,
/// `status` and `role` fall back to their defaults so records written by
/// older clients still parse; unknown fields (a legacy `password`, for one)
/// are dropped on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Identifier issued by the external authority. Never changes.
    pub id: String,
    /// Case-sensitive login name.
    pub username: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub referral_code: Option<String>,
    /// Points balance.
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub role: Role,
    /// Creation time reported by the authority, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserRecord {
    /// A fresh compatibility record: no points, active, regular role.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            phone: None,
            referral_code: None,
            points: 0,
            status: Status::Active,
            role: Role::User,
            created_at: None,
        }
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone.filter(|p| !p.is_empty());
        self
    }

    pub fn with_referral_code(mut self, code: Option<String>) -> Self {
        self.referral_code = code.filter(|c| !c.is_empty());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Older clients stored absent optional text as `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Canonical user record as issued by the external authority.
///
/// Stored verbatim under `wagerWaveUser` next to the session. Fields this
/// crate does not know about are kept in `extra` so they survive a rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_and_status_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
        assert_eq!(
            serde_json::to_string(&Status::Deactivated).unwrap(),
            r#""deactivated""#
        );
        let parsed: Status = serde_json::from_str(r#""active""#).unwrap();
        assert!(parsed.is_active());
    }

    #[test]
    fn test_user_record_camel_case() {
        let user = UserRecord::new("u1", "alice").with_referral_code(Some("FRIEND".to_string()));
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains(r#""referralCode":"FRIEND""#));
        assert!(json.contains(r#""status":"active""#));
        assert!(json.contains(r#""role":"user""#));
        assert!(!json.contains("createdAt"));
    }

    #[test]
    fn test_legacy_record_parses_with_defaults() {
        let json = r#"{
            "id": "u1",
            "username": "alice",
            "password": "hunter2",
            "phone": "",
            "referralCode": ""
        }"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.points, 0);
        assert_eq!(user.status, Status::Active);
        assert_eq!(user.role, Role::User);
        assert!(user.phone.is_none());
        assert!(user.referral_code.is_none());

        let rewritten = serde_json::to_string(&user).unwrap();
        assert!(!rewritten.contains("password"));
    }

    #[test]
    fn test_canonical_user_keeps_unknown_fields() {
        let json = r#"{
            "id": "c1",
            "username": "bob",
            "phone": null,
            "is_active": false,
            "created_at": "2025-07-30T10:00:00Z",
            "last_login": "2025-08-01T09:00:00Z"
        }"#;
        let user: CanonicalUser = serde_json::from_str(json).unwrap();
        assert!(!user.is_active);
        assert_eq!(user.created_at.as_deref(), Some("2025-07-30T10:00:00Z"));
        assert!(user.extra.contains_key("last_login"));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["last_login"], "2025-08-01T09:00:00Z");
    }
}
