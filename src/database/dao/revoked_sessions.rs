use crate::database::entities::revoked_sessions;
use crate::database::{DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TryInsertResult,
};
use sea_orm_migration::sea_query::OnConflict;

/// Revoked sessions DAO for database operations
#[derive(Clone)]
pub struct RevokedSessionsDao {
    db: DatabaseConnection,
}

impl RevokedSessionsDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Blacklist a session refresh token by its jti. Returns whether the
    /// jti was newly recorded; `false` means it was already on the list.
    /// The unique index arbitrates concurrent claims of the same jti.
    pub async fn revoke(
        &self,
        jti: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let active_model = revoked_sessions::ActiveModel {
            id: ActiveValue::NotSet,
            jti: Set(jti.to_string()),
            user_id: Set(user_id),
            expires_at: Set(expires_at),
            revoked_at: Set(Utc::now()),
        };

        let on_conflict = OnConflict::column(revoked_sessions::Column::Jti)
            .do_nothing()
            .to_owned();

        let result = revoked_sessions::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .do_nothing()
            .exec(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(matches!(result, TryInsertResult::Inserted(_)))
    }

    /// Check whether a jti has been blacklisted
    pub async fn is_revoked(&self, jti: &str) -> DatabaseResult<bool> {
        let count = revoked_sessions::Entity::find()
            .filter(revoked_sessions::Column::Jti.eq(jti))
            .count(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Clean up entries whose tokens have expired on their own
    pub async fn cleanup_expired(&self) -> DatabaseResult<u64> {
        let now = Utc::now();
        let result = revoked_sessions::Entity::delete_many()
            .filter(revoked_sessions::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
