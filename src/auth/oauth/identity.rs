use crate::database::DatabaseManager;
use crate::database::entities::UserRecord;
use crate::error::AppError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Claims returned by Google's userinfo endpoint. The `verified_email`
/// alias covers the legacy v2 endpoint shape.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "verified_email")]
    pub email_verified: bool,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl GoogleProfile {
    /// Split the profile into (first, last) name parts, falling back to
    /// the display name when structured fields are missing.
    fn name_parts(&self) -> (String, String) {
        let given = self.given_name.clone().filter(|s| !s.is_empty());
        let family = self.family_name.clone().filter(|s| !s.is_empty());

        if given.is_some() || family.is_some() {
            return (given.unwrap_or_default(), family.unwrap_or_default());
        }

        match self.name.as_deref() {
            Some(full) => match full.split_once(' ') {
                Some((first, rest)) => (first.to_string(), rest.to_string()),
                None => (full.to_string(), String::new()),
            },
            None => (String::new(), String::new()),
        }
    }
}

/// Maps a verified Google profile onto a local user account
pub struct IdentityResolver {
    http_client: reqwest::Client,
    userinfo_url: String,
    database: Arc<dyn DatabaseManager>,
}

impl IdentityResolver {
    pub fn new(
        http_client: reqwest::Client,
        userinfo_url: String,
        database: Arc<dyn DatabaseManager>,
    ) -> Self {
        Self {
            http_client,
            userinfo_url,
            database,
        }
    }

    /// Fetch the profile claims for a provider access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, AppError> {
        let response = self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("User info request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "User info endpoint returned an error");
            return Err(AppError::Identity(format!(
                "User info request failed with status: {}",
                status
            )));
        }

        response
            .json::<GoogleProfile>()
            .await
            .map_err(|e| AppError::Identity(format!("Invalid user info response: {}", e)))
    }

    /// Resolve a profile to a local user, creating the account on first
    /// login. Existing accounts are matched by email and never have
    /// their profile fields overwritten.
    pub async fn resolve(&self, profile: &GoogleProfile) -> Result<UserRecord, AppError> {
        let email = profile
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Identity("Provider returned no email".to_string()))?;

        if !profile.email_verified {
            return Err(AppError::Identity(format!(
                "Email {} is not verified with the provider",
                email
            )));
        }

        if let Some(existing) = self.database.users().find_by_email(email).await? {
            return Ok(existing);
        }

        let username = self.available_username(email).await?;
        let (first_name, last_name) = profile.name_parts();
        let user = self
            .database
            .users()
            .insert(&UserRecord::new(email, &username).with_names(&first_name, &last_name))
            .await?;

        info!(user_id = %user.id, email = %user.email, "Created account on first login");
        Ok(user)
    }

    /// Derive a free username from the email local part, suffixing on
    /// collision.
    async fn available_username(&self, email: &str) -> Result<String, AppError> {
        let base: String = email
            .split('@')
            .next()
            .unwrap_or(email)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        let base = if base.is_empty() {
            "user".to_string()
        } else {
            base
        };

        if self.database.users().find_by_username(&base).await?.is_none() {
            return Ok(base);
        }

        for _ in 0..5 {
            let suffix = Uuid::new_v4().simple().to_string();
            let candidate = format!("{}_{}", base, &suffix[..6]);
            if self
                .database
                .users()
                .find_by_username(&candidate)
                .await?
                .is_none()
            {
                return Ok(candidate);
            }
        }

        Err(AppError::Internal(format!(
            "Could not allocate a username for {}",
            email
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::DatabaseManagerImpl;

    async fn create_resolver() -> IdentityResolver {
        let mut config = Config::default();
        config.database.url = "sqlite::memory:".to_string();
        let db = DatabaseManagerImpl::new_from_config(&config).await.unwrap();
        db.migrate().await.unwrap();
        IdentityResolver::new(
            reqwest::Client::new(),
            "http://unused/userinfo".to_string(),
            Arc::new(db),
        )
    }

    fn verified_profile(email: &str) -> GoogleProfile {
        GoogleProfile {
            sub: Some("google-sub".to_string()),
            email: Some(email.to_string()),
            email_verified: true,
            given_name: Some("Grace".to_string()),
            family_name: Some("Hopper".to_string()),
            name: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_creates_account_on_first_login() {
        let resolver = create_resolver().await;

        let user = resolver
            .resolve(&verified_profile("grace@example.com"))
            .await
            .unwrap();

        assert_eq!(user.email, "grace@example.com");
        assert_eq!(user.username, "grace");
        assert_eq!(user.first_name, "Grace");
        assert_eq!(user.last_name, "Hopper");
    }

    #[tokio::test]
    async fn test_resolve_matches_existing_account_without_overwriting() {
        let resolver = create_resolver().await;

        let first = resolver
            .resolve(&verified_profile("grace@example.com"))
            .await
            .unwrap();

        // Same email with changed profile names must return the original
        // record untouched
        let mut changed = verified_profile("grace@example.com");
        changed.given_name = Some("Renamed".to_string());
        let second = resolver.resolve(&changed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.first_name, "Grace");
    }

    #[tokio::test]
    async fn test_resolve_rejects_unverified_email() {
        let resolver = create_resolver().await;

        let mut profile = verified_profile("shady@example.com");
        profile.email_verified = false;

        let result = resolver.resolve(&profile).await;
        assert!(matches!(result, Err(AppError::Identity(_))));
    }

    #[tokio::test]
    async fn test_resolve_rejects_missing_email() {
        let resolver = create_resolver().await;

        let mut profile = verified_profile("x@example.com");
        profile.email = None;

        let result = resolver.resolve(&profile).await;
        assert!(matches!(result, Err(AppError::Identity(_))));
    }

    #[tokio::test]
    async fn test_username_collision_gets_suffix() {
        let resolver = create_resolver().await;

        let first = resolver
            .resolve(&verified_profile("sam@one.example"))
            .await
            .unwrap();
        let second = resolver
            .resolve(&verified_profile("sam@two.example"))
            .await
            .unwrap();

        assert_eq!(first.username, "sam");
        assert_ne!(second.username, "sam");
        assert!(second.username.starts_with("sam_"));
    }

    #[test]
    fn test_name_parts_falls_back_to_display_name() {
        let profile = GoogleProfile {
            sub: None,
            email: Some("a@b.com".to_string()),
            email_verified: true,
            given_name: None,
            family_name: None,
            name: Some("Ada Augusta Byron".to_string()),
        };

        let (first, last) = profile.name_parts();
        assert_eq!(first, "Ada");
        assert_eq!(last, "Augusta Byron");
    }
}
