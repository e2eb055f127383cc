//! Server configuration read from the environment (and `.env` via dotenvy).

use anyhow::{Context, Result};

use crate::identity::KeycloakConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub pool_size: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub group_detail_base_url: Option<String>,
    pub cors_allow_origin: Option<String>,
    pub keycloak: KeycloakConfig,
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let pool_size = match get("HUB_DATABASE_POOL_SIZE") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("HUB_DATABASE_POOL_SIZE is not a number: {raw}"))?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            database_url: require("HUB_DATABASE_URL")?,
            pool_size,
            bind_addr: get("HUB_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret: require("HUB_JWT_SECRET")?,
            group_detail_base_url: get("HUB_GROUP_DETAIL_BASE_URL"),
            cors_allow_origin: get("HUB_CORS_ALLOW_ORIGIN"),
            keycloak: KeycloakConfig {
                auth_url: require("KEYCLOAK_AUTH_URL")?,
                realm: require("KEYCLOAK_REALM")?,
                client_id: require("KEYCLOAK_CLIENT_ID")?,
                client_secret: require("KEYCLOAK_CLIENT_SECRET")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("HUB_DATABASE_URL", "postgres://localhost/hub"),
        ("HUB_JWT_SECRET", "secret"),
        ("KEYCLOAK_AUTH_URL", "http://keycloak:8080/auth"),
        ("KEYCLOAK_REALM", "entando"),
        ("KEYCLOAK_CLIENT_ID", "hub"),
        ("KEYCLOAK_CLIENT_SECRET", "shh"),
    ];

    #[test]
    fn defaults_apply() {
        let config = ServerConfig::from_lookup(env(REQUIRED)).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8081");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.group_detail_base_url, None);
        assert_eq!(config.keycloak.realm, "entando");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let partial: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "HUB_JWT_SECRET")
            .collect();
        let err = ServerConfig::from_lookup(env(&partial)).unwrap_err();
        assert!(err.to_string().contains("HUB_JWT_SECRET"));
    }

    #[test]
    fn bad_pool_size_is_an_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HUB_DATABASE_POOL_SIZE", "lots"));
        assert!(ServerConfig::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn blank_optional_is_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HUB_GROUP_DETAIL_BASE_URL", "  "));
        pairs.push(("HUB_BIND_ADDR", "127.0.0.1:9000"));
        let config = ServerConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.group_detail_base_url, None);
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }
}
