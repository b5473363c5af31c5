use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::{
    errors::RepoError,
    repo_types::{App, User},
};

/// Storage operations the credential engine depends on. Each call is atomic
/// on its own; nothing here spans more than one statement.
#[async_trait]
pub trait CredentialRepo: Send + Sync {
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<i64, RepoError>;
    async fn get_user_by_email(&self, email: &str) -> Result<User, RepoError>;
    async fn get_app_by_id(&self, id: i64) -> Result<App, RepoError>;
    async fn get_app_by_name(&self, name: &str) -> Result<App, RepoError>;
    async fn insert_app(
        &self,
        name: &str,
        password_hash: &str,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<i64, RepoError>;
    /// Returns the number of rows touched.
    async fn update_app_secret_and_ttl(
        &self,
        id: i64,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<u64, RepoError>;
}

/// PostgreSQL-backed repository.
#[derive(Clone)]
pub struct PgRepo {
    db: PgPool,
}

impl PgRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialRepo for PgRepo {
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<i64, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn get_app_by_id(&self, id: i64) -> Result<App, RepoError> {
        sqlx::query_as::<_, App>(
            r#"
            SELECT id, name, password_hash, secret, ttl_hours
            FROM apps
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn get_app_by_name(&self, name: &str) -> Result<App, RepoError> {
        sqlx::query_as::<_, App>(
            r#"
            SELECT id, name, password_hash, secret, ttl_hours
            FROM apps
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn insert_app(
        &self,
        name: &str,
        password_hash: &str,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<i64, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO apps (name, password_hash, secret, ttl_hours)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(password_hash)
        .bind(secret)
        .bind(ttl_hours)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn update_app_secret_and_ttl(
        &self,
        id: i64,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<u64, RepoError> {
        let res = sqlx::query(
            r#"
            UPDATE apps
               SET secret = $1, ttl_hours = $2
             WHERE id = $3
            "#,
        )
        .bind(secret)
        .bind(ttl_hours)
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected())
    }
}
