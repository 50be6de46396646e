//! Typed failures of the credential data layer.
//!
//! The HTTP layer picks a status per variant, so classification happens here
//! once, from the structured `DbErr`, instead of by matching message text.

use sea_orm::sqlx;
use sea_orm::{ConnAcquireErr, DbErr, RuntimeErr};
use thiserror::Error;

/// sqlite primary result codes that mean "the database refused access".
const SQLITE_PERM: i32 = 3;
const SQLITE_READONLY: i32 = 8;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_AUTH: i32 = 23;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database timeout: {0}")]
    Timeout(String),

    #[error("database permission error: {0}")]
    PermissionDenied(String),

    #[error("database query error: {0}")]
    Query(String),
}

impl StoreError {
    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Timeout(_) => "timeout",
            Self::PermissionDenied(_) => "permission",
            Self::Query(_) => "query",
        }
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();

        match &err {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => Self::Timeout(message),
            DbErr::ConnectionAcquire(_) => Self::Connection(message),
            DbErr::Conn(runtime) | DbErr::Exec(runtime) | DbErr::Query(runtime) => {
                classify_runtime(runtime, message)
            }
            _ => Self::Query(message),
        }
    }
}

fn classify_runtime(err: &RuntimeErr, message: String) -> StoreError {
    let RuntimeErr::SqlxError(sqlx_err) = err else {
        return StoreError::Query(message);
    };

    match sqlx_err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => {
            StoreError::Connection(message)
        }
        sqlx::Error::Database(db_err) => {
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);

            match primary {
                Some(SQLITE_PERM | SQLITE_READONLY | SQLITE_AUTH) => {
                    StoreError::PermissionDenied(message)
                }
                Some(SQLITE_CANTOPEN) => StoreError::Connection(message),
                _ => StoreError::Query(message),
            }
        }
        _ => StoreError::Query(message),
    }
}
