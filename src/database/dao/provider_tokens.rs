use crate::database::entities::{ProviderTokenRecord, provider_tokens};
use crate::database::{DatabaseError, DatabaseResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sea_orm_migration::sea_query::OnConflict;

/// Provider tokens DAO for database operations
#[derive(Clone)]
pub struct ProviderTokensDao {
    db: DatabaseConnection,
}

impl ProviderTokensDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create or replace the token record for a user using native upsert
    pub async fn upsert(&self, record: &ProviderTokenRecord) -> DatabaseResult<()> {
        let active_model = provider_tokens::ActiveModel {
            id: ActiveValue::NotSet, // Let database auto-assign ID
            user_id: Set(record.user_id),
            access_token: Set(record.access_token.clone()),
            refresh_token: Set(record.refresh_token.clone()),
            expires_at: Set(record.expires_at),
            scopes: Set(record.scopes.clone()),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        };

        let on_conflict = OnConflict::column(provider_tokens::Column::UserId)
            .update_columns([
                provider_tokens::Column::AccessToken,
                provider_tokens::Column::RefreshToken,
                provider_tokens::Column::ExpiresAt,
                provider_tokens::Column::Scopes,
                provider_tokens::Column::UpdatedAt,
            ])
            .to_owned();

        provider_tokens::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(())
    }

    /// Find token record by user ID
    pub async fn find_by_user(&self, user_id: i32) -> DatabaseResult<Option<ProviderTokenRecord>> {
        let record = provider_tokens::Entity::find()
            .filter(provider_tokens::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(record)
    }

    /// Delete the token record for a user
    pub async fn delete_by_user(&self, user_id: i32) -> DatabaseResult<u64> {
        let result = provider_tokens::Entity::delete_many()
            .filter(provider_tokens::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
