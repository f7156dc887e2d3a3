use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims carried by a chat user token.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    pub user_id: String,
    pub exp: i64, // expiry (unix timestamp)
    pub iat: i64, // issued at
}

/// Claims of the server-side token that authenticates REST calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerClaims {
    pub server: bool,
}

/// Create a signed token that lets `user_id` connect to the chat backend directly.
pub fn create_user_token(
    user_id: &str,
    secret: &str,
    expires_at: DateTime<Utc>,
    issued_at: DateTime<Utc>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = UserClaims {
        user_id: user_id.to_string(),
        exp: expires_at.timestamp(),
        iat: issued_at.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Create the server token sent in the `Authorization` header of every API call.
pub fn create_server_token(secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        &ServerClaims { server: true },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate a user token and return its claims.
pub fn validate_user_token(
    token: &str,
    secret: &str,
) -> Result<UserClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.required_spec_claims.clear();
    validation.required_spec_claims.insert("exp".to_string());

    let token_data = decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}
