//! `PostgreSQL` user queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use shopfloor_core::{Email, Phone, UserId};

use super::{PgStore, RepositoryError, UserStore, unique_violation};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, phone, created_at";

/// Row shape of `users` (without the hash).
#[derive(FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    phone: String,
    created_at: DateTime<Utc>,
}

/// Row shape of `users` including the hash, for the login path.
#[derive(FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            phone,
            created_at: row.created_at,
        })
    }
}

impl PgStore {
    async fn credentials_where(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE {column} = $1");
        let row = self
            .timed(async {
                sqlx::query_as::<_, CredentialRow>(&sql)
                    .bind(value)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(RepositoryError::from)
            })
            .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (name, email, phone, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );

        let row = self
            .timed(async {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(&user.name)
                    .bind(&user.email)
                    .bind(&user.phone)
                    .bind(&user.password_hash)
                    .fetch_one(self.pool())
                    .await
                    .map_err(|e| match unique_violation(&e) {
                        Some("users_phone_key") => {
                            RepositoryError::Conflict("phone already registered".to_owned())
                        }
                        Some(_) => RepositoryError::Conflict("email already registered".to_owned()),
                        None => RepositoryError::Database(e),
                    })
            })
            .await?;

        User::try_from(row)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = self
            .timed(async {
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(RepositoryError::from)
            })
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.credentials_where("email", email.as_str()).await
    }

    async fn credentials_by_phone(
        &self,
        phone: &Phone,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.credentials_where("phone", phone.as_str()).await
    }
}
