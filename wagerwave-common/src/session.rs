//! Session types.
//!
//! The persisted session is only a pointer into the user list. The view a
//! dashboard renders is [`Session`], assembled on read from the pointer and
//! the matching [`UserRecord`], so the two can never disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::{CanonicalUser, UserRecord};

/// Persisted under `currentUser`: which user is signed in.
///
/// Older clients stored a full user record under the same key; its `id`
/// is all that is read back, the rest is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPointer {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionPointer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            started_at: Some(Utc::now()),
        }
    }
}

/// The signed-in user as seen by every view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: UserRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// The authority's record from the last login, when one was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<CanonicalUser>,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn points(&self) -> u64 {
        self.user.points
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_current_user_parses_as_pointer() {
        let json = r#"{
            "id": "u1",
            "username": "alice",
            "role": "user",
            "phone": "",
            "points": 0,
            "status": "active"
        }"#;
        let pointer: SessionPointer = serde_json::from_str(json).unwrap();
        assert_eq!(pointer.id, "u1");
        assert!(pointer.started_at.is_none());
    }

    #[test]
    fn test_pointer_serializes_camel_case() {
        let pointer = SessionPointer::new("u1");
        let json = serde_json::to_string(&pointer).unwrap();
        assert!(json.contains(r#""id":"u1""#));
        assert!(json.contains("startedAt"));
    }
}
