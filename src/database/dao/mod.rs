pub mod provider_tokens;
pub mod revoked_sessions;
pub mod users;

pub use provider_tokens::ProviderTokensDao;
pub use revoked_sessions::RevokedSessionsDao;
pub use users::UsersDao;
