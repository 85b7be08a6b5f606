//! Account registration and login.
//!
//! Credentials are stored as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with
//! base64 salt and hash, so the iteration count can be raised without
//! invalidating existing accounts.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::info;

use crate::db::models::User;
use crate::db::Database;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
pub const DEFAULT_ITERATIONS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("stored credential is malformed")]
    MalformedCredential,
    #[error("username already exists")]
    UserExists,
    #[error("User not found")]
    UnknownUser,
    #[error("Invalid password")]
    InvalidPassword,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Password hashing seam used by [`register`] and [`login`].
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
    fn verify(&self, password: &str, credential: &str) -> Result<bool, AuthError>;
}

#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        Pbkdf2Hasher {
            iterations: iterations.max(1),
        }
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut key = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl CredentialHasher for Pbkdf2Hasher {
    fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = derive(password, &salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            BASE64.encode(salt),
            BASE64.encode(key)
        )
    }

    fn verify(&self, password: &str, credential: &str) -> Result<bool, AuthError> {
        let mut parts = credential.split('$');
        let (Some(SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(AuthError::MalformedCredential);
        };
        let iterations: u32 = iterations
            .parse()
            .map_err(|_| AuthError::MalformedCredential)?;
        let salt = BASE64
            .decode(salt)
            .map_err(|_| AuthError::MalformedCredential)?;
        let expected = BASE64
            .decode(hash)
            .map_err(|_| AuthError::MalformedCredential)?;
        if iterations == 0 {
            return Err(AuthError::MalformedCredential);
        }
        Ok(constant_time_eq(&derive(password, &salt, iterations), &expected))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Account {
            id: user.id,
            username: user.username,
        }
    }
}

fn validate(creds: &Credentials) -> Result<&str, AuthError> {
    let username = creds.username.trim();
    if username.is_empty() {
        return Err(AuthError::EmptyUsername);
    }
    if creds.password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    Ok(username)
}

/// Blocking: hashes the password and writes to SQLite.
pub fn register(
    db: &Database,
    hasher: &dyn CredentialHasher,
    creds: &Credentials,
) -> Result<Account, AuthError> {
    let username = validate(creds)?;
    let credential = hasher.hash(&creds.password);
    let user = db
        .create_user(username, &credential)?
        .ok_or(AuthError::UserExists)?;
    info!("Registered account {} (id {})", user.username, user.id);
    Ok(user.into())
}

/// Blocking: reads the account and re-derives the password hash.
pub fn login(
    db: &Database,
    hasher: &dyn CredentialHasher,
    creds: &Credentials,
) -> Result<Account, AuthError> {
    let username = validate(creds)?;
    let user = db.find_user(username)?.ok_or(AuthError::UnknownUser)?;
    if !hasher.verify(&creds.password, &user.password_hash)? {
        return Err(AuthError::InvalidPassword);
    }
    Ok(user.into())
}
