//! Error kinds of the credential engine and its collaborators.

use axum::http::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a [`CredentialRepo`](super::repo::CredentialRepo).
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("storage failure: {0}")]
    Internal(#[source] BoxError),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepoError::UniqueViolation
            }
            other => RepoError::Internal(Box::new(other)),
        }
    }
}

/// Errors returned by [`AuthService`](super::services::AuthService).
///
/// Every variant carries the name of the operation that produced it.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password, or wrong app password.
    #[error("{op}: invalid credentials")]
    InvalidCredentials { op: &'static str },

    #[error("{op}: invalid argument `{field}`")]
    InvalidArgument {
        op: &'static str,
        field: &'static str,
    },

    #[error("{op}: user already exists")]
    UserAlreadyExists { op: &'static str },

    /// App creation kept colliding with concurrent writers and no usable row
    /// could be found afterwards.
    #[error("{op}: app {name:?} could not be registered")]
    AppConflict { op: &'static str, name: String },

    #[error("{op}: {source}")]
    Internal {
        op: &'static str,
        #[source]
        source: BoxError,
    },
}

impl AuthError {
    pub fn internal(op: &'static str, source: impl Into<BoxError>) -> Self {
        AuthError::Internal {
            op,
            source: source.into(),
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials { op }
            | AuthError::InvalidArgument { op, .. }
            | AuthError::UserAlreadyExists { op }
            | AuthError::AppConflict { op, .. }
            | AuthError::Internal { op, .. } => op,
        }
    }

    /// Status code the transport answers with for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials { .. } | AuthError::InvalidArgument { .. } => {
                StatusCode::BAD_REQUEST
            }
            AuthError::UserAlreadyExists { .. } | AuthError::AppConflict { .. } => {
                StatusCode::CONFLICT
            }
            AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
