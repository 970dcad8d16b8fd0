/// Postgres-backed user store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::users::model::{normalise_email, Role, UserChanges, UserRecord};
use crate::users::store::UserStore;

type UserRow = (Uuid, String, String, String, Option<String>);

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_record(row: UserRow) -> Result<UserRecord, StoreError> {
    let (id, email, password_hash, full_name, role) = row;
    let role = match role {
        None => Role::default(),
        Some(role) => role.parse().map_err(|_| {
            tracing::error!(user_id = %id, role = %role, "Unknown role stored for user");
            StoreError::unavailable("user", "unknown role in user record")
        })?,
    };

    Ok(UserRecord {
        id,
        email,
        password_hash,
        full_name,
        role,
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, full_name, role FROM users WHERE email = $1",
        )
        .bind(normalise_email(email))
        .fetch_optional(&self.pool)
        .await?
        .map(into_record)
        .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, full_name, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(into_record)
        .transpose()
    }

    async fn create(&self, mut user: UserRecord) -> Result<UserRecord, StoreError> {
        user.email = normalise_email(&user.email);
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                updated_at = $6
            WHERE id = $1
            RETURNING id, email, password_hash, full_name, role
            "#,
        )
        .bind(id)
        .bind(changes.email.as_deref().map(normalise_email))
        .bind(changes.full_name)
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .map(into_record)
        .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
