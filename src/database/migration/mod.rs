use sea_orm_migration::prelude::*;

pub use sea_orm_migration::MigratorTrait;

mod m20250812_100000_create_users_table;
mod m20250812_100100_create_provider_tokens_table;
mod m20250812_100200_create_revoked_sessions_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250812_100000_create_users_table::Migration),
            Box::new(m20250812_100100_create_provider_tokens_table::Migration),
            Box::new(m20250812_100200_create_revoked_sessions_table::Migration),
        ]
    }
}

/// Common table and column identifiers
#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Email,
    Username,
    FirstName,
    LastName,
    CreatedAt,
    UpdatedAt,
    LastLogin,
}

#[derive(Iden)]
pub enum ProviderTokens {
    Table,
    Id,
    UserId,
    AccessToken,
    RefreshToken,
    ExpiresAt,
    Scopes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum RevokedSessions {
    Table,
    Id,
    Jti,
    UserId,
    ExpiresAt,
    RevokedAt,
}
