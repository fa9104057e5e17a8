//! Google authorization-code flow: state handling, provider client,
//! identity resolution, and the orchestrating service.

pub mod client;
pub mod identity;
pub mod service;
pub mod state;

pub use client::{GoogleOAuthClient, ProviderTokens};
pub use identity::{GoogleProfile, IdentityResolver};
pub use service::{CallbackRequest, CallbackResponse, LoginResponse, OAuthService, UserPayload};
pub use state::StateStore;
