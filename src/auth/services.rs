//! Credential use cases: user registration, login, and app upsert.

use std::{future::Future, sync::Arc, time::Duration};

use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    errors::{AuthError, RepoError},
    jwt,
    password::{hash_password, verify_dummy, verify_password},
    repo::CredentialRepo,
};

/// Lookup/create rounds before an app upsert gives up on a contended name.
const UPSERT_ATTEMPTS: usize = 3;

/// Longest session an app may configure: ten years.
pub const MAX_TTL_HOURS: i32 = 24 * 366 * 10;

#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn CredentialRepo>,
    storage_timeout: Duration,
}

enum Created {
    Id(i64),
    LostRace,
}

/// Argon2 work runs on the blocking pool so request tasks keep moving.
async fn hash_off_thread(op: &'static str, password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::internal(op, e))?
        .map_err(|e| {
            error!(error = %e, "failed to generate password hash");
            AuthError::internal(op, e)
        })
}

async fn verify_off_thread(
    op: &'static str,
    password: &str,
    hash: Option<&str>,
) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.map(str::to_owned);
    tokio::task::spawn_blocking(move || match hash {
        Some(h) => verify_password(&password, &h),
        None => verify_dummy(&password),
    })
    .await
    .map_err(|e| AuthError::internal(op, e))
}

impl AuthService {
    pub fn new(repo: Arc<dyn CredentialRepo>, storage_timeout: Duration) -> Self {
        Self {
            repo,
            storage_timeout,
        }
    }

    /// Runs one storage call under the configured deadline.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, RepoError> {
        tokio::time::timeout(self.storage_timeout, call)
            .await
            .unwrap_or_else(|elapsed| Err(RepoError::Internal(Box::new(elapsed))))
    }

    #[instrument(skip_all, fields(op = "auth.register_user", email = %email))]
    pub async fn register_user(&self, email: &str, password: &str) -> Result<i64, AuthError> {
        const OP: &str = "auth.register_user";
        info!("registering user");

        let hash = hash_off_thread(OP, password).await?;

        match self.bounded(self.repo.insert_user(email, &hash)).await {
            Ok(id) => {
                info!(user_id = id, "user registered");
                Ok(id)
            }
            Err(RepoError::UniqueViolation) => {
                warn!("user already exists");
                Err(AuthError::UserAlreadyExists { op: OP })
            }
            Err(e) => {
                error!(error = %e, "failed to save user");
                Err(AuthError::internal(OP, e))
            }
        }
    }

    #[instrument(skip_all, fields(op = "auth.login", email = %email, app_id = app_id))]
    pub async fn login(&self, email: &str, password: &str, app_id: i64) -> Result<String, AuthError> {
        const OP: &str = "auth.login";
        info!("attempting to login user");

        let user = match self.bounded(self.repo.get_user_by_email(email)).await {
            Ok(u) => u,
            Err(RepoError::NotFound) => {
                // Same Argon2 cost as a wrong password.
                verify_off_thread(OP, password, None).await?;
                warn!("user not found");
                return Err(AuthError::InvalidCredentials { op: OP });
            }
            Err(e) => {
                error!(error = %e, "failed to get user");
                return Err(AuthError::internal(OP, e));
            }
        };

        if !verify_off_thread(OP, password, Some(&user.password_hash)).await? {
            warn!(user_id = user.id, "invalid password");
            return Err(AuthError::InvalidCredentials { op: OP });
        }

        // A missing app is a caller/config problem, not a credential one.
        let app = self
            .bounded(self.repo.get_app_by_id(app_id))
            .await
            .map_err(|e| {
                error!(error = %e, "failed to get app");
                AuthError::internal(OP, e)
            })?;

        let token = jwt::issue(&user, &app, OffsetDateTime::now_utc()).map_err(|e| {
            error!(error = %e, "failed to generate token");
            AuthError::internal(OP, e)
        })?;

        info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    /// Creates the app `name`, or rotates its secret and TTL when it already
    /// exists and `password` matches. Losing a creation race to a concurrent
    /// caller sends this call back to the lookup branch.
    #[instrument(skip_all, fields(op = "auth.register_or_update_app", app_name = %name, ttl_hours = ttl_hours))]
    pub async fn register_or_update_app(
        &self,
        name: &str,
        password: &str,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<i64, AuthError> {
        const OP: &str = "auth.register_or_update_app";

        if !(1..=MAX_TTL_HOURS).contains(&ttl_hours) {
            warn!(max = MAX_TTL_HOURS, "ttl out of range");
            return Err(AuthError::InvalidArgument {
                op: OP,
                field: "ttl_hours",
            });
        }

        for attempt in 1..=UPSERT_ATTEMPTS {
            if let Some(id) = self.identify_app(OP, name, password).await? {
                return self.update_app(OP, id, secret, ttl_hours).await;
            }
            match self.create_app(OP, name, password, secret, ttl_hours).await? {
                Created::Id(id) => return Ok(id),
                Created::LostRace => {
                    info!(attempt, "app created concurrently; retrying lookup");
                }
            }
        }

        error!(attempts = UPSERT_ATTEMPTS, "app upsert kept conflicting");
        Err(AuthError::AppConflict {
            op: OP,
            name: name.to_string(),
        })
    }

    /// `Ok(None)` when no app has this name yet.
    async fn identify_app(
        &self,
        op: &'static str,
        name: &str,
        password: &str,
    ) -> Result<Option<i64>, AuthError> {
        let app = match self.bounded(self.repo.get_app_by_name(name)).await {
            Ok(a) => a,
            Err(RepoError::NotFound) => {
                info!("app not found");
                return Ok(None);
            }
            Err(e) => {
                error!(error = %e, "failed to get app");
                return Err(AuthError::internal(op, e));
            }
        };

        if !verify_off_thread(op, password, Some(&app.password_hash)).await? {
            warn!(app_id = app.id, "invalid app credentials");
            return Err(AuthError::InvalidCredentials { op });
        }
        Ok(Some(app.id))
    }

    async fn create_app(
        &self,
        op: &'static str,
        name: &str,
        password: &str,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<Created, AuthError> {
        let hash = hash_off_thread(op, password).await?;

        match self
            .bounded(self.repo.insert_app(name, &hash, secret, ttl_hours))
            .await
        {
            Ok(id) => {
                info!(app_id = id, "app registered");
                Ok(Created::Id(id))
            }
            Err(RepoError::UniqueViolation) => Ok(Created::LostRace),
            Err(e) => {
                error!(error = %e, "failed to save app");
                Err(AuthError::internal(op, e))
            }
        }
    }

    async fn update_app(
        &self,
        op: &'static str,
        id: i64,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<i64, AuthError> {
        let rows = self
            .bounded(self.repo.update_app_secret_and_ttl(id, secret, ttl_hours))
            .await
            .map_err(|e| {
                error!(error = %e, app_id = id, "failed to update app");
                AuthError::internal(op, e)
            })?;

        if rows == 0 {
            error!(app_id = id, "app vanished before update");
            return Err(AuthError::internal(op, RepoError::NotFound));
        }

        info!(app_id = id, "app updated");
        Ok(id)
    }
}
