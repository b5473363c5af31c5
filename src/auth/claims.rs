use serde::{Deserialize, Serialize};

/// JWT payload of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i64,      // user ID
    pub email: String, // user email
    pub app_id: i64,   // app whose secret signs the token
    pub exp: i64,      // expires at (unix timestamp)
}
