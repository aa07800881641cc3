//! Client for the hosted identity provider
//!
//! The provider owns accounts, passwords and sessions; this client only
//! exchanges credentials over its REST surface. Tokens are opaque: they
//! are carried in headers and cookies and never parsed locally. The
//! client is constructed once at startup and injected into the state,
//! never looked up through a global.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::env;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Identity provider call failure
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Provider rejected the request (bad credentials, duplicate signup, ...)
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Required provider credentials are missing
    #[error("{0}")]
    Config(String),

    /// Transport-level failure reaching the provider
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL of the provider's auth REST surface
    pub base_url: String,
    /// Publishable API key sent with every request
    pub anon_key: String,
    /// Privileged key for admin queries; optional, only the stats
    /// endpoint needs it
    pub service_role_key: Option<String>,
    /// Public URL of this site, used as the signup confirmation target
    pub site_url: String,
}

impl IdentityConfig {
    /// Create a new IdentityConfig from environment variables
    pub fn from_env() -> Result<Self, IdentityError> {
        let base_url = env::var("AUTH_BASE_URL")
            .map_err(|_| IdentityError::Config("AUTH_BASE_URL is not set".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let anon_key = env::var("AUTH_ANON_KEY")
            .map_err(|_| IdentityError::Config("AUTH_ANON_KEY is not set".to_string()))?;

        let service_role_key = env::var("AUTH_SERVICE_ROLE_KEY").ok();

        let site_url = env::var("SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            base_url,
            anon_key,
            service_role_key,
            site_url,
        })
    }
}

/// Resolved identity of the current user
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Token material issued by the provider
///
/// The refresh token rotates on every exchange; callers must re-attach
/// the fresh pair to the outgoing response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Identity,
}

/// HTTP client for the identity provider
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    config: IdentityConfig,
}

impl IdentityClient {
    /// Create a new identity client
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Public URL of this site (signup confirmation target)
    pub fn site_url(&self) -> &str {
        &self.config.site_url
    }

    /// Resolve the user behind an access token
    ///
    /// Returns `None` when the token is missing, expired or revoked;
    /// only transport and provider-side failures surface as errors.
    pub async fn current_user(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .http
            .get(format!("{}/user", self.config.base_url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(Some(response.json::<Identity>().await?));
        }

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => Ok(None),
            _ => Err(Self::rejection(response).await),
        }
    }

    /// Exchange email/password credentials for a token pair
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        let response = self
            .http
            .post(format!(
                "{}/token?grant_type=password",
                self.config.base_url
            ))
            .header("apikey", &self.config.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        info!("Signed in {}", email);
        Ok(response.json::<TokenPair>().await?)
    }

    /// Exchange a refresh token for a fresh token pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, IdentityError> {
        let response = self
            .http
            .post(format!(
                "{}/token?grant_type=refresh_token",
                self.config.base_url
            ))
            .header("apikey", &self.config.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        Ok(response.json::<TokenPair>().await?)
    }

    /// Register a new account
    ///
    /// The confirmation email links back to this site's login page.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), IdentityError> {
        let redirect_to = format!("{}/login", self.config.site_url);
        let response = self
            .http
            .post(format!("{}/signup", self.config.base_url))
            .query(&[("redirect_to", redirect_to.as_str())])
            .header("apikey", &self.config.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        info!("Signed up {}", email);
        Ok(())
    }

    /// Revoke the session behind an access token
    pub async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(format!("{}/logout", self.config.base_url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        Ok(())
    }

    /// Total number of registered users, via the admin surface
    ///
    /// Requires the service-role key; without it this is a
    /// configuration error, not an auth error.
    pub async fn admin_user_count(&self) -> Result<u64, IdentityError> {
        let service_key = self
            .config
            .service_role_key
            .as_deref()
            .ok_or_else(|| IdentityError::Config("Server auth config missing".to_string()))?;

        let response = self
            .http
            .get(format!("{}/admin/users", self.config.base_url))
            .query(&[("per_page", "1")])
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let status = response.status().as_u16();
        let total_header = response
            .headers()
            .get("x-total-count")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        total_count(status, total_header.as_deref())
    }

    async fn rejection(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                ["msg", "message", "error_description", "error"]
                    .iter()
                    .find_map(|key| body.get(key).and_then(|v| v.as_str()).map(String::from))
            })
            .unwrap_or_else(|| format!("Identity provider returned status {}", status));

        IdentityError::Rejected { status, message }
    }
}

/// Parse the total-count header of an admin user page
///
/// The page itself is capped to one row, so the header is the only
/// trustworthy source for the total; a missing or malformed value is
/// an error, never a count.
fn total_count(status: u16, header: Option<&str>) -> Result<u64, IdentityError> {
    header
        .and_then(|value| value.parse::<u64>().ok())
        .ok_or_else(|| IdentityError::Rejected {
            status,
            message: "Identity provider did not report a user count".to_string(),
        })
}
