//! In-process [`CredentialRepo`] used when no database is configured, and by
//! the test suites. Enforces the same uniqueness rules as the SQL schema.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::auth::{
    errors::RepoError,
    repo::CredentialRepo,
    repo_types::{App, User},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    apps: Vec<App>,
}

#[derive(Default)]
pub struct MemoryRepo {
    tables: Mutex<Tables>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        self.tables
            .lock()
            .map_err(|e| RepoError::Internal(e.to_string().into()))
    }

    #[cfg(test)]
    pub(crate) fn app_count(&self, name: &str) -> usize {
        self.tables
            .lock()
            .map(|t| t.apps.iter().filter(|a| a.name == name).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CredentialRepo for MemoryRepo {
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<i64, RepoError> {
        let mut t = self.lock()?;
        if t.users.iter().any(|u| u.email == email) {
            return Err(RepoError::UniqueViolation);
        }
        let id = t.users.len() as i64 + 1;
        t.users.push(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        });
        Ok(id)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, RepoError> {
        let t = self.lock()?;
        t.users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_app_by_id(&self, id: i64) -> Result<App, RepoError> {
        let t = self.lock()?;
        t.apps
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_app_by_name(&self, name: &str) -> Result<App, RepoError> {
        let t = self.lock()?;
        t.apps
            .iter()
            .find(|a| a.name == name)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn insert_app(
        &self,
        name: &str,
        password_hash: &str,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<i64, RepoError> {
        let mut t = self.lock()?;
        if t.apps.iter().any(|a| a.name == name) {
            return Err(RepoError::UniqueViolation);
        }
        let id = t.apps.len() as i64 + 1;
        t.apps.push(App {
            id,
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            secret: secret.to_string(),
            ttl_hours,
        });
        Ok(id)
    }

    async fn update_app_secret_and_ttl(
        &self,
        id: i64,
        secret: &str,
        ttl_hours: i32,
    ) -> Result<u64, RepoError> {
        let mut t = self.lock()?;
        match t.apps.iter_mut().find(|a| a.id == id) {
            Some(app) => {
                app.secret = secret.to_string();
                app.ttl_hours = ttl_hours;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
