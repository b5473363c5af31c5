use jsonwebtoken::{encode, EncodingKey, Header};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::auth::{
    claims::Claims,
    repo_types::{App, User},
};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("app {app_id} has an empty signing secret")]
    EmptySecret { app_id: i64 },
    #[error("app {app_id} ttl of {ttl_hours}h overflows the token expiry")]
    Expiry { app_id: i64, ttl_hours: i32 },
    #[error("jwt encode failed: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// Signs a session token for `user` with `app`'s secret, valid for the app's
/// TTL counted from `now`. Always HS256.
pub fn issue(user: &User, app: &App, now: OffsetDateTime) -> Result<String, TokenError> {
    if app.secret.is_empty() {
        return Err(TokenError::EmptySecret { app_id: app.id });
    }

    let exp = now
        .checked_add(TimeDuration::hours(i64::from(app.ttl_hours)))
        .ok_or(TokenError::Expiry {
            app_id: app.id,
            ttl_hours: app.ttl_hours,
        })?;
    let claims = Claims {
        uid: user.id,
        email: user.email.clone(),
        app_id: app.id,
        exp: exp.unix_timestamp(),
    };
    let key = EncodingKey::from_secret(app.secret.as_bytes());
    let token = encode(&Header::default(), &claims, &key)?;
    debug!(user_id = user.id, app_id = app.id, exp = claims.exp, "jwt signed");
    Ok(token)
}

#[cfg(test)]
pub(crate) fn decode_for_test(token: &str, secret: &str) -> jsonwebtoken::errors::Result<Claims> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    fn user() -> User {
        User {
            id: 42,
            email: "alice@example.com".into(),
            password_hash: "unused".into(),
        }
    }

    fn app(secret: &str, ttl_hours: i32) -> App {
        App {
            id: 3,
            name: "svc".into(),
            password_hash: "unused".into(),
            secret: secret.into(),
            ttl_hours,
        }
    }

    #[test]
    fn issued_token_carries_identity_claims() {
        let now = OffsetDateTime::now_utc();
        let token = issue(&user(), &app("dev-secret", 2), now).expect("sign");
        let claims = decode_for_test(&token, "dev-secret").expect("verify");
        assert_eq!(claims.uid, 42);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.app_id, 3);
        assert_eq!(claims.exp, now.unix_timestamp() + 2 * 3600);
    }

    #[test]
    fn token_only_verifies_with_the_app_secret() {
        let token = issue(&user(), &app("secret-a", 1), OffsetDateTime::now_utc()).unwrap();
        let err = decode_for_test(&token, "secret-b").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn token_uses_hs256() {
        let token = issue(&user(), &app("k", 1), OffsetDateTime::now_utc()).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, jsonwebtoken::Algorithm::HS256);
    }

    #[test]
    fn token_past_its_ttl_is_rejected_by_verifiers() {
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(3);
        let token = issue(&user(), &app("k", 1), issued).unwrap();
        let err = decode_for_test(&token, "k").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error_not_a_panic() {
        let err = issue(&user(), &app("k", i32::MAX), OffsetDateTime::now_utc()).unwrap_err();
        assert!(matches!(
            err,
            TokenError::Expiry {
                app_id: 3,
                ttl_hours: i32::MAX
            }
        ));
    }

    #[test]
    fn empty_secret_is_refused() {
        let err = issue(&user(), &app("", 1), OffsetDateTime::now_utc()).unwrap_err();
        assert!(matches!(err, TokenError::EmptySecret { app_id: 3 }));
    }
}
