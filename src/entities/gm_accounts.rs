use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gm_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    pub password_hash: String,

    /// Privilege rank; higher ranks see more of the GM dashboard
    pub gm_level: Option<i32>,

    /// Opaque permission string (usually JSON) interpreted by the UI
    pub permissions: Option<String>,

    pub is_active: bool,

    /// RFC 3339 timestamp of the last successful login
    pub last_login: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
