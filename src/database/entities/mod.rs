pub mod provider_tokens;
pub mod revoked_sessions;
pub mod users;

pub use provider_tokens::Entity as ProviderTokens;
pub use revoked_sessions::Entity as RevokedSessions;
pub use users::Entity as Users;

// Type aliases
pub type UserRecord = users::Model;
pub type ProviderTokenRecord = provider_tokens::Model;
pub type RevokedSessionRecord = revoked_sessions::Model;
