//! Domain service for credential checks.
//!
//! Handles player and Game Master logins against the credential tables.

use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::password::PasswordError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown player or wrong password. Both cases share one message.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Unknown GM or wrong password. Both cases share one message.
    #[error("Invalid GM credentials")]
    InvalidGmCredentials,

    #[error("GM account is deactivated.")]
    AccountDeactivated,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl AuthError {
    /// Label for the `outcome` dimension of login metrics.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::InvalidCredentials | Self::InvalidGmCredentials => "rejected",
            Self::AccountDeactivated => "deactivated",
            Self::Store(_) | Self::Internal(_) => "error",
        }
    }
}

/// Successful player login.
#[derive(Debug, Clone, Serialize)]
pub struct UserLogin {
    pub username: String,
}

/// Successful GM login. Null columns are already replaced by defaults.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GmLogin {
    pub username: String,
    pub gm_level: i32,
    pub permissions: String,
    /// Value stored before this login stamped a new one.
    pub last_login: Option<String>,
}

/// Domain service trait for authentication.
///
/// Callers validate the shape of the input (presence, length, charset)
/// before calling; these methods go straight to the data layer.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies a player's credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a
    /// wrong password, [`AuthError::Store`] when the lookup fails.
    async fn user_login(&self, username: &str, password: &str) -> Result<UserLogin, AuthError>;

    /// Verifies a Game Master's credentials and stamps the login time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountDeactivated`] for an inactive account
    /// (without checking the password) and [`AuthError::InvalidGmCredentials`]
    /// for an unknown user or a wrong password.
    async fn gm_login(&self, username: &str, password: &str) -> Result<GmLogin, AuthError>;
}
