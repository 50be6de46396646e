use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GmAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GmAccounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GmAccounts::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GmAccounts::PasswordHash)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GmAccounts::GmLevel).integer().null())
                    .col(ColumnDef::new(GmAccounts::Permissions).string().null())
                    .col(
                        ColumnDef::new(GmAccounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(GmAccounts::LastLogin).string().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GmAccounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GmAccounts {
    Table,
    Id,
    Username,
    PasswordHash,
    GmLevel,
    Permissions,
    IsActive,
    LastLogin,
}
