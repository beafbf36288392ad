//! Provider-issued identity record.

use serde::{Deserialize, Serialize};

/// A user as returned by the identity provider.
///
/// Two records describe the same identity iff their `id` values are equal;
/// the remaining fields are informational and may lag behind the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable, opaque identifier.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Create a user with only an identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            aud: None,
            role: None,
            email: None,
            phone: None,
            created_at: None,
            updated_at: None,
            app_metadata: serde_json::Value::Null,
            user_metadata: serde_json::Value::Null,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns true if both records name the same identity.
    pub fn same_identity(&self, other: &User) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_is_keyed_by_id_only() {
        let a = User::new("u1").with_email("a@example.com");
        let b = User::new("u1").with_email("changed@example.com");
        let c = User::new("u2").with_email("a@example.com");
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
        assert_ne!(a, b);
    }

    #[test]
    fn decodes_gotrue_user_payload() {
        let user: User = serde_json::from_value(json!({
            "id": "8d1c5c1a-0000-4000-8000-000000000001",
            "aud": "authenticated",
            "role": "authenticated",
            "email": "alice@example.com",
            "app_metadata": {"provider": "email"},
            "user_metadata": {},
            "identities": [],
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(user.id, "8d1c5c1a-0000-4000-8000-000000000001");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.app_metadata["provider"], "email");
    }
}
