use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::repo_types::User;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Read-only copy of a user, without the stored password.
///
/// Also the payload kept in the session, so field names must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<User> for UserSnapshot {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            birth_date: u.birth_date,
            created_at: u.created_at,
        }
    }
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Editable profile fields. The password is not changed here.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn snapshot_json_shape_is_stable() {
        let snap = UserSnapshot {
            id: 7,
            email: "a@x.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            birth_date: date!(1990 - 12 - 10),
            created_at: datetime!(2024-01-02 03:04:05 UTC),
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["birth_date"], "1990-12-10");
        assert_eq!(json["created_at"], "2024-01-02T03:04:05Z");
        assert_eq!(json["first_name"], "Ada");
        assert!(json.get("password").is_none());
        assert_eq!(snap.full_name(), "Ada Lovelace");

        let back: UserSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap);
    }
}
