use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

/// Claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Account ID
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    pub exp: usize, // Expiration timestamp
}

/// Sign a token with the shared secret. The service only verifies tokens in
/// production; signing exists for operators and tests.
pub fn sign(
    secret: &str,
    account_id: &str,
    name: Option<&str>,
    email: Option<&str>,
    role: &str,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(7))
        .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: account_id.to_owned(),
        name: name.map(str::to_owned),
        email: email.map(str::to_owned),
        role: role.to_owned(),
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a token.
pub fn verify(secret: &str, token: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
