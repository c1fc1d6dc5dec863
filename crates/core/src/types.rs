//! Shared session and profile types.

use serde::{Deserialize, Serialize};

/// Role attached to a platform account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => f.write_str("student"),
            Self::Teacher => f.write_str("teacher"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// Account profile as served by `GET /users/profile/`.
///
/// Role-specific fields are optional: `student_id` is only present for
/// students, `department` only for teachers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: UserRole,
    /// URL of the uploaded profile image, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl UserProfile {
    /// Display name, falling back to the account email when the name
    /// fields are blank.
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// Authentication lifecycle of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    /// A login or session restore is in flight.
    Authenticating,
    Authenticated,
}

/// Combined authentication state for the current user: the token pair, the
/// cached profile, and where the session is in its lifecycle.
///
/// Invariant: `status` is `Authenticated` exactly when both `access_token`
/// and `user` are present. The mutators on
/// [`SessionState`](crate::state::SessionState) maintain this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub status: SessionStatus,
}

impl Session {
    /// A fully authenticated session.
    pub fn authenticated(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user: UserProfile,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
            user: Some(user),
            status: SessionStatus::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Recompute `status` after a field-level mutation. An in-flight
    /// `Authenticating` marker is preserved until the token/user pair is
    /// complete.
    pub(crate) fn settle_status(&mut self) {
        if self.access_token.is_some() && self.user.is_some() {
            self.status = SessionStatus::Authenticated;
        } else if self.status == SessionStatus::Authenticated {
            self.status = SessionStatus::Unauthenticated;
        }
    }
}

/// List responses arrive either as a pagination envelope
/// (`{count, next, previous, results}`) or as a bare array depending on the
/// endpoint. Both shapes decode through this one type; consumers normalize
/// with [`into_items`](Self::into_items).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Paginated {
        #[serde(default)]
        count: u64,
        next: Option<String>,
        previous: Option<String>,
        results: Vec<T>,
    },
    Plain(Vec<T>),
}

impl<T> ListEnvelope<T> {
    /// Items on this page.
    pub fn len(&self) -> usize {
        match self {
            Self::Paginated { results, .. } => results.len(),
            Self::Plain(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total item count across all pages when the envelope reports one,
    /// otherwise the length of the bare list.
    pub fn total(&self) -> u64 {
        match self {
            Self::Paginated { count, .. } => *count,
            Self::Plain(items) => items.len() as u64,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Paginated { results, .. } => results,
            Self::Plain(items) => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: 1,
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            role: UserRole::Student,
            profile_image: None,
            student_id: Some("S-1001".into()),
            department: None,
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Teacher).unwrap(),
            "\"teacher\""
        );
        let role: UserRole = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, UserRole::Student);
    }

    #[test]
    fn profile_tolerates_missing_optional_fields() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"id": 7, "username": "x", "email": "x@example.com", "role": "admin"}"#,
        )
        .unwrap();
        assert_eq!(profile.first_name, "");
        assert_eq!(profile.student_id, None);
        assert_eq!(profile.full_name(), "x@example.com");
    }

    #[test]
    fn empty_session_is_unauthenticated() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert_eq!(session.status, SessionStatus::Unauthenticated);
    }

    #[test]
    fn authenticated_constructor_upholds_invariant() {
        let session = Session::authenticated("tok", Some("ref".into()), profile());
        assert!(session.is_authenticated());
        assert_eq!(session.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn settle_status_downgrades_incomplete_sessions() {
        let mut session = Session::authenticated("tok", None, profile());
        session.user = None;
        session.settle_status();
        assert_eq!(session.status, SessionStatus::Unauthenticated);
    }

    #[test]
    fn list_envelope_decodes_paginated_shape() {
        let body = r#"{"count": 12, "next": "/courses/?page=2", "previous": null, "results": [1, 2, 3]}"#;
        let envelope: ListEnvelope<u32> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.len(), 3);
        assert_eq!(envelope.total(), 12);
        assert_eq!(envelope.into_items(), vec![1, 2, 3]);
    }

    #[test]
    fn list_envelope_decodes_bare_array() {
        let envelope: ListEnvelope<u32> = serde_json::from_str("[4, 5]").unwrap();
        assert_eq!(envelope.total(), 2);
        assert_eq!(envelope.into_items(), vec![4, 5]);
    }
}
