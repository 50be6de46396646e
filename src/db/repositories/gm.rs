use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::db::StoreError;
use crate::entities::gm_accounts;

/// Stored credential for a Game Master account.
#[derive(Debug, Clone)]
pub struct GmCredential {
    pub username: String,
    pub password_hash: String,
    pub gm_level: Option<i32>,
    pub permissions: Option<String>,
    pub is_active: bool,
    pub last_login: Option<String>,
}

impl From<gm_accounts::Model> for GmCredential {
    fn from(model: gm_accounts::Model) -> Self {
        Self {
            username: model.username,
            password_hash: model.password_hash,
            gm_level: model.gm_level,
            permissions: model.permissions,
            is_active: model.is_active,
            last_login: model.last_login,
        }
    }
}

pub struct GmRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> GmRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<GmCredential>, StoreError> {
        let gm = gm_accounts::Entity::find()
            .filter(gm_accounts::Column::Username.eq(username))
            .one(self.conn)
            .await?;

        Ok(gm.map(GmCredential::from))
    }

    /// Stamp `last_login`. Returns how many rows were touched.
    pub async fn touch_last_login(
        &self,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = gm_accounts::Entity::update_many()
            .col_expr(gm_accounts::Column::LastLogin, Expr::value(at.to_rfc3339()))
            .filter(gm_accounts::Column::Username.eq(username))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
