//! Handle database requests.

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::otp::Challenge;
use crate::user::{Role, User};

/// Fields required to persist a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    /// Already normalized to lowercase.
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub phone: Option<&'a str>,
    pub challenge: &'a Challenge,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

const PUBLIC_COLUMNS: &str =
    "id, name, email, role, phone, is_verified, is_active, last_login, created_at";
const SECRET_COLUMNS: &str = ", password, otp, otp_expiry";

#[derive(Debug, Clone)]
enum Field {
    Id,
    Email,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Email => write!(f, "email"),
        }
    }
}

/// Projection is default-deny: secret columns are only selected on
/// explicit request.
fn get_by_field_query(field: Field, with_secrets: bool) -> String {
    format!(
        "SELECT {PUBLIC_COLUMNS}{} FROM users WHERE {field} = $1",
        if with_secrets { SECRET_COLUMNS } else { "" },
    )
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new unverified account with its first challenge.
    ///
    /// Duplicate detection rides on the unique email index; emails are
    /// stored lowercase, so the check is case-insensitive.
    pub async fn insert(&self, user: &NewUser<'_>) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO users (name, email, password, role, phone, otp, otp_expiry, is_verified)
                VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
                RETURNING id"#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .bind(user.phone)
        .bind(&user.challenge.code)
        .bind(user.challenge.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ServerError::DuplicateEmail
            },
            err => err.into(),
        })?;

        Ok(id)
    }

    /// Find a user by `id`, without secret fields.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Id, false);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by `email`, without secret fields.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Email, false);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by `email`, including password hash and challenge.
    pub async fn find_by_email_with_secrets(
        &self,
        email: &str,
    ) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Email, true);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Overwrite the active challenge; any earlier code stops validating.
    pub async fn set_challenge(
        &self,
        id: Uuid,
        challenge: &Challenge,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE users SET otp = $2, otp_expiry = $3 WHERE id = $1"#,
        )
        .bind(id)
        .bind(&challenge.code)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Flip `is_verified` and consume the challenge in one conditional
    /// statement, so a submission racing a resend cannot be accepted
    /// against a code that is no longer the stored one.
    ///
    /// Returns whether a row was updated.
    pub async fn mark_verified(&self, id: Uuid, code: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE users
                SET is_verified = TRUE, otp = NULL, otp_expiry = NULL
                WHERE id = $1 AND NOT is_verified
                    AND otp = $2 AND otp_expiry > NOW()"#,
        )
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Store a new password hash and consume the challenge, re-checking
    /// code and expiry at this last step.
    ///
    /// Returns whether a row was updated.
    pub async fn update_password(
        &self,
        id: Uuid,
        code: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE users
                SET password = $3, otp = NULL, otp_expiry = NULL
                WHERE id = $1 AND otp = $2 AND otp_expiry > NOW()"#,
        )
        .bind(id)
        .bind(code)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Stamp a successful login.
    pub async fn update_last_login(&self, id: Uuid) -> Result<()> {
        sqlx::query(r#"UPDATE users SET last_login = NOW() WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Update editable profile fields; absent values keep their current
    /// content.
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>> {
        let query = format!(
            r#"UPDATE users
                SET name = COALESCE($2, name), phone = COALESCE($3, phone)
                WHERE id = $1
                RETURNING {PUBLIC_COLUMNS}"#,
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(name)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}
