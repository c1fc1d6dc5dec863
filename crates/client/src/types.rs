//! Wire types for the Campus HTTP surface.

use campus_core::{UserProfile, UserRole};
use serde::{Deserialize, Serialize};

/// Credentials accepted by `POST /users/login/`: email or username plus
/// password.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
}

impl LoginRequest {
    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            username: None,
            password: password.into(),
        }
    }

    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: None,
            username: Some(username.into()),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Payload for `POST /users/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Registration may or may not come back with a token pair; the session
/// controller turns this into a [`RegisterOutcome`].
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub user: UserProfile,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// What a successful registration left behind.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    /// The backend issued a token pair and the session is live.
    AutoAuthenticated(UserProfile),
    /// No tokens were issued; an explicit login is required.
    RequiresLogin(UserProfile),
}

impl RegisterOutcome {
    pub fn profile(&self) -> &UserProfile {
        match self {
            Self::AutoAuthenticated(profile) | Self::RequiresLogin(profile) => profile,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenRefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Structured-field half of a profile update (`PATCH /users/profile/` as
/// JSON).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Binary half of a profile update: an image uploaded as multipart form
/// data.
#[derive(Debug, Clone)]
pub struct ProfileImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The two payload encodings `update_profile` accepts.
#[derive(Debug, Clone)]
pub enum ProfileUpdate {
    Fields(ProfileFields),
    Image(ProfileImage),
}

/// Student as listed under `/students/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

/// Course as served under `/courses/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Payload for creating or updating a course.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CourseFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EnrollmentRequest {
    pub student_id: i64,
}
