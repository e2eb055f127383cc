//! Keycloak admin REST client.
//!
//! Authenticates as a service account (client-credentials grant) and caches
//! the access token until shortly before it expires.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hub_catalog_core::error::HubError;
use hub_catalog_core::ports::{IdentityProvider, Result};
use hub_catalog_core::types::UserRepresentation;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

/// Refresh this long before the provider's stated expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Base URL including any context path, e.g. `http://keycloak:8080/auth`.
    pub auth_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    60
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct KeycloakClient {
    http: Client,
    config: KeycloakConfig,
    token: Mutex<Option<CachedToken>>,
}

fn provider_error(context: &str, e: impl std::fmt::Display) -> HubError {
    HubError::IdentityProvider(format!("{context}: {e}"))
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Url::parse(&config.auth_url)
            .with_context(|| format!("KEYCLOAK_AUTH_URL is not a URL: {}", config.auth_url))?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    fn base(&self) -> Result<Url> {
        let trimmed = self.config.auth_url.trim_end_matches('/');
        Url::parse(&format!("{trimmed}/")).map_err(|e| provider_error("invalid auth url", e))
    }

    fn token_url(&self) -> Result<Url> {
        self.base()?
            .join(&format!(
                "realms/{}/protocol/openid-connect/token",
                self.config.realm
            ))
            .map_err(|e| provider_error("invalid token url", e))
    }

    fn users_url(&self) -> Result<Url> {
        self.base()?
            .join(&format!("admin/realms/{}/users", self.config.realm))
            .map_err(|e| provider_error("invalid users url", e))
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!(realm = %self.config.realm, "requesting service account token");
        let response = self
            .http
            .post(self.token_url()?)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| provider_error("token request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::IdentityProvider(format!(
                "token request rejected with {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| provider_error("malformed token response", e))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// GET the users endpoint with `params`. A 404 from Keycloak is an empty list.
    async fn fetch_users(&self, params: &[(&str, &str)]) -> Result<Vec<UserRepresentation>> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.users_url()?)
            .bearer_auth(token)
            .query(params)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| provider_error("user lookup failed", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if status == StatusCode::UNAUTHORIZED {
            // revoked before expiry
            *self.token.lock().await = None;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::IdentityProvider(format!(
                "user lookup rejected with {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| provider_error("malformed user list", e))
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    async fn search_users(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<UserRepresentation>> {
        let pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let users = self.fetch_users(&pairs).await?;
        tracing::debug!(count = users.len(), "keycloak user search");
        Ok(users)
    }

    async fn get_user(&self, username: &str) -> Result<Option<UserRepresentation>> {
        let users = self
            .fetch_users(&[("username", username), ("exact", "true")])
            .await?;
        Ok(pick_exact(users, username))
    }
}

/// Older Keycloak versions ignore `exact`, so filter again locally.
fn pick_exact(users: Vec<UserRepresentation>, username: &str) -> Option<UserRepresentation> {
    users
        .into_iter()
        .find(|u| u.username.eq_ignore_ascii_case(username))
}
