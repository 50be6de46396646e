//! Per-request access to credential rows.
//!
//! A login acquires one [`CredentialConnection`], performs its lookups (and
//! the GM last-login stamp) through it, and hands it back with
//! [`CredentialConnection::close`]. The service layer owns that lifecycle; the
//! traits exist so it can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait};

use super::repositories::gm::{GmCredential, GmRepository};
use super::repositories::user::{UserCredential, UserRepository};
use super::{Store, StoreError};

#[async_trait]
pub trait CredentialConnection: Send {
    async fn find_user(&mut self, username: &str) -> Result<Option<UserCredential>, StoreError>;

    async fn find_gm(&mut self, username: &str) -> Result<Option<GmCredential>, StoreError>;

    async fn stamp_gm_login(&mut self, username: &str, at: DateTime<Utc>)
    -> Result<(), StoreError>;

    /// Release the connection. Consumes it so it cannot be used afterwards.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn CredentialConnection>, StoreError>;
}

/// A pooled sqlite connection checked out for the duration of one login.
///
/// The checkout is held by a transaction; `close` commits it, which returns
/// the connection to the pool and persists the last-login stamp.
pub struct SeaOrmCredentialConnection {
    txn: DatabaseTransaction,
}

#[async_trait]
impl CredentialConnection for SeaOrmCredentialConnection {
    async fn find_user(&mut self, username: &str) -> Result<Option<UserCredential>, StoreError> {
        UserRepository::new(&self.txn)
            .find_by_username(username)
            .await
    }

    async fn find_gm(&mut self, username: &str) -> Result<Option<GmCredential>, StoreError> {
        GmRepository::new(&self.txn).find_by_username(username).await
    }

    async fn stamp_gm_login(
        &mut self,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let touched = GmRepository::new(&self.txn)
            .touch_last_login(username, at)
            .await?;

        if touched == 0 {
            return Err(StoreError::Query(format!(
                "no gm_accounts row for {username}"
            )));
        }

        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for Store {
    async fn acquire(&self) -> Result<Box<dyn CredentialConnection>, StoreError> {
        let txn = self.conn.begin().await?;
        Ok(Box::new(SeaOrmCredentialConnection { txn }))
    }
}
