use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::db::StoreError;
use crate::entities::users;

/// Stored credential for an ordinary player account.
#[derive(Debug, Clone)]
pub struct UserCredential {
    pub username: String,
    pub password_hash: String,
}

impl From<users::Model> for UserCredential {
    fn from(model: users::Model) -> Self {
        Self {
            username: model.username,
            password_hash: model.password_hash,
        }
    }
}

pub struct UserRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Exact-match lookup; usernames are unique so at most one row comes back.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(self.conn)
            .await?;

        Ok(user.map(UserCredential::from))
    }
}
