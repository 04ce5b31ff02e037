//! Self-contained signed session tokens.
//!
//! A token is `base64url(claims JSON) . base64url(HMAC-SHA256(payload))`.
//! The `.` delimiter cannot appear in base64url output, so splitting is
//! unambiguous. Expiry is the only way a signed token dies; there is no
//! revocation.

use chrono::{serde::ts_milliseconds, DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use rocket::serde::json::serde_json;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::model::credentials::{Identity, Role};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_DELIMITER: char = '.';

/// Claims carried by a signed token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id.
    pub sub: String,
    pub role: Role,
    pub name: String,
    #[serde(rename = "exp", with = "ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    pub fn for_identity(identity: &Identity, ttl: Duration) -> Self {
        Self {
            sub: identity.id.clone(),
            role: identity.role,
            name: identity.name.clone(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Sign claims into a `payload.signature` token.
pub fn sign(claims: &Claims, secret: &[u8]) -> String {
    let json = serde_json::to_vec(claims).expect("claims serialization is infallible");
    let payload = BASE64URL_NOPAD.encode(&json);
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    let signature = BASE64URL_NOPAD.encode(&mac.finalize().into_bytes());
    format!("{payload}{TOKEN_DELIMITER}{signature}")
}

/// Verify a token's signature and expiry, returning its claims. Any
/// malformed input, signature mismatch, or passed expiry resolves to `None`.
pub fn verify(token: &str, secret: &[u8]) -> Option<Claims> {
    let (payload, signature) = token.split_once(TOKEN_DELIMITER)?;
    let signature = BASE64URL_NOPAD.decode(signature.as_bytes()).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    // Constant-time comparison.
    mac.verify_slice(&signature).ok()?;

    let json = BASE64URL_NOPAD.decode(payload.as_bytes()).ok()?;
    let claims: Claims = serde_json::from_slice(&json).ok()?;
    (!claims.expired()).then_some(claims)
}
