//! Signed session identifiers.
//!
//! The session cookie carries `<session_id>.<hmac_hex>`, where the
//! HMAC-SHA256 is computed over the session id with the server's session
//! secret. A cookie that fails verification is treated as absent.

use std::fmt;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use uuid::Uuid;

use super::SessionId;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "terrareview_session";

/// Length in bytes of generated secrets.
const SECRET_LEN: usize = 32;

/// Errors that can occur while verifying a session cookie.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session cookie format: {0}")]
    InvalidFormat(String),

    #[error("invalid session id in cookie: {0}")]
    InvalidSessionId(String),

    #[error("session cookie HMAC verification failed")]
    HmacMismatch,

    #[error("session secret must not be empty")]
    MissingSecret,
}

/// The HMAC key for session cookies.
#[derive(Clone)]
pub struct SessionKey {
    secret: Vec<u8>,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey").finish_non_exhaustive()
    }
}

impl SessionKey {
    pub fn new(secret: Vec<u8>) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::MissingSecret);
        }
        Ok(Self { secret })
    }

    /// Decode a hex-encoded secret (as written by `terrareview init`).
    pub fn from_hex(secret_hex: &str) -> Result<Self, SessionError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|e| {
            SessionError::InvalidFormat(format!("session secret is not valid hex: {e}"))
        })?;
        Self::new(secret)
    }

    /// A fresh random key.
    pub fn generate() -> Self {
        Self {
            secret: generate_secret_bytes().to_vec(),
        }
    }

    /// Produce the cookie value for `id`.
    pub fn sign(&self, id: SessionId) -> String {
        let mac = compute_hmac(&self.secret, id.to_string().as_bytes());
        format!("{id}.{}", hex::encode(mac))
    }

    /// Verify a cookie value and extract its session id.
    pub fn verify(&self, value: &str) -> Result<SessionId, SessionError> {
        let (id_str, mac_hex) = value.split_once('.').ok_or_else(|| {
            SessionError::InvalidFormat("expected '<session_id>.<hmac>'".to_string())
        })?;

        let id = Uuid::parse_str(id_str)
            .map_err(|e| SessionError::InvalidSessionId(e.to_string()))?;

        let provided_mac = hex::decode(mac_hex)
            .map_err(|e| SessionError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(id.to_string().as_bytes());
        mac.verify_slice(&provided_mac)
            .map_err(|_| SessionError::HmacMismatch)?;

        Ok(SessionId::from_uuid(id))
    }
}

/// 32 random bytes, hex-encoded (64 chars).
pub fn generate_secret_hex() -> String {
    hex::encode(generate_secret_bytes())
}

fn generate_secret_bytes() -> [u8; SECRET_LEN] {
    let mut bytes = [0u8; SECRET_LEN];
    rand::rng().fill(&mut bytes);
    bytes
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Find the session cookie's value in a `Cookie` request header.
pub fn find_session_cookie(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value)
    })
}

/// `Set-Cookie` header value for a signed session id.
pub fn set_cookie_header(signed: &str) -> String {
    format!("{SESSION_COOKIE}={signed}; Path=/; HttpOnly; SameSite=Lax")
}
