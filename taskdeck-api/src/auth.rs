//! Authentication request/response types.

use serde::{Deserialize, Serialize};

/// An authenticated user profile as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Display name.
    pub fullname: String,
    /// Contact email.
    pub email: String,
    /// Account creation timestamp; not all endpoints include it.
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password; only ever sent over the transport, never stored.
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Login name.
    pub username: String,
    /// Display name.
    pub fullname: String,
    /// Contact email.
    pub email: String,
    /// Plaintext password; only ever sent over the transport, never stored.
    pub password: String,
}

/// Response of both auth endpoints: the profile plus a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The authenticated user's profile.
    pub user: User,
    /// Bearer token authorizing subsequent requests.
    pub access_token: String,
}
