mod repository;

pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account roles, a closed set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    MessOwner,
    Admin,
}

impl Role {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::MessOwner => "mess-owner",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "mess-owner" => Ok(Role::MessOwner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// User as saved on database.
///
/// Secret columns stay [`None`] unless the row was fetched through a
/// `_with_secrets` repository call, and never serialize either way.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(skip)]
    #[sqlx(default)]
    pub password: Option<String>,
    #[serde(skip)]
    #[sqlx(default)]
    pub otp: Option<String>,
    #[serde(skip)]
    #[sqlx(default)]
    pub otp_expiry: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
