pub mod jwt;
pub mod middleware;
pub mod oauth;

pub use jwt::{JwtService, JwtServiceImpl, SessionClaims, TokenKind};
pub use middleware::{UserExtractor, session_auth_middleware};
