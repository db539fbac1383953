use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::AppError;

/// Role of a user account.
/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account; sees only projects they own or belong to.
    Member,
    /// Manager account. Carries no extra API rights today; kept for the
    /// role field of the account model.
    Manager,
    /// Administrator; bypasses ownership and membership checks.
    Admin,
}

/// A user row as stored in the database. Never serialized directly —
/// `password_hash` must not leave the server, use [`UserResponse`] instead.
#[derive(Debug, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public shape of a user, as returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Minimal user reference embedded in project and task responses
/// (owner, members, assignee).
#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// The requester as seen by authorization checks: identity plus role.
///
/// Loaded per request by handlers that gate on ownership or role. The token
/// only carries the user id; the role is always read back from the database
/// so that demotions take effect immediately.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct CurrentUser {
    pub id: i32,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Fetches the requester's id and role.
    ///
    /// Returns `AppError::Unauthorized` when the account behind a still-valid
    /// token has been deleted.
    pub async fn load(pool: &PgPool, user_id: i32) -> Result<Self, AppError> {
        let user = sqlx::query_as::<_, CurrentUser>("SELECT id, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        user.ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))
    }
}

/// Payload for `PUT /api/users/{id}`. Absent fields keep their current value.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    /// New password, hashed before storage.
    #[validate(length(min = 6))]
    pub password: Option<String>,

    /// Role change; only admins may set this.
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_admin() {
        let admin = CurrentUser {
            id: 1,
            role: UserRole::Admin,
        };
        let member = CurrentUser {
            id: 2,
            role: UserRole::Member,
        };
        let manager = CurrentUser {
            id: 3,
            role: UserRole::Manager,
        };

        assert!(admin.is_admin());
        assert!(!member.is_admin());
        assert!(!manager.is_admin());
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(
            serde_json::to_string(&UserRole::Member).unwrap(),
            "\"member\""
        );
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");

        let role: UserRole = serde_json::from_str("\"manager\"").unwrap();
        assert_eq!(role, UserRole::Manager);
    }

    #[test]
    fn test_user_update_validation() {
        let valid = UserUpdate {
            name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            password: None,
            role: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = UserUpdate {
            name: None,
            email: Some("not-an-email".to_string()),
            password: None,
            role: None,
        };
        assert!(bad_email.validate().is_err());

        let short_password = UserUpdate {
            name: None,
            email: None,
            password: Some("123".to_string()),
            role: None,
        };
        assert!(short_password.validate().is_err());
    }
}
