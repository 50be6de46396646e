//! Slow password hashing and verification.
//!
//! Accounts provisioned by the legacy site carry bcrypt hashes; newer rows
//! may carry Argon2id PHC strings. Verification picks the scheme from the
//! hash prefix. Both schemes are CPU-heavy, so every call runs on the
//! blocking thread pool.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("unrecognised password hash format")]
    UnknownFormat,

    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("argon2 error: {0}")]
    Argon2(String),

    #[error("password task failed: {0}")]
    Task(#[from] task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Bcrypt,
    Argon2,
}

/// Compare `password` against a stored bcrypt or Argon2 hash.
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored hash is
/// unusable.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();

    task::spawn_blocking(move || verify_blocking(&password, &stored_hash)).await?
}

fn verify_blocking(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    if stored_hash.starts_with("$2") {
        return Ok(bcrypt::verify(password, stored_hash)?);
    }

    if stored_hash.starts_with("$argon2") {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| PasswordError::Argon2(format!("invalid hash: {e}")))?;

        return match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Argon2(e.to_string())),
        };
    }

    Err(PasswordError::UnknownFormat)
}

/// Hash a password for storage in `users` or `gm_accounts`.
pub async fn hash_password(
    password: &str,
    algorithm: HashAlgorithm,
    config: &SecurityConfig,
) -> Result<String, PasswordError> {
    let password = password.to_string();
    let config = config.clone();

    task::spawn_blocking(move || match algorithm {
        HashAlgorithm::Bcrypt => Ok(bcrypt::hash(&password, config.bcrypt_cost)?),
        HashAlgorithm::Argon2 => hash_argon2(&password, &config),
    })
    .await?
}

fn hash_argon2(password: &str, config: &SecurityConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| PasswordError::Argon2(format!("invalid params: {e}")))?;

    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Argon2(e.to_string()))?;

    Ok(hash.to_string())
}
