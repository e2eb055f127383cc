//! hub-catalog-server: standalone REST server for the Entando Hub catalog.
//!
//! Configuration comes from the environment (and `.env`), see [`ServerConfig`].

use std::sync::Arc;

use anyhow::{Context, Result};
use hub_catalog_core::{HubServices, HubSettings};
use hub_catalog_postgres::{connect, pg_stores, run_migrations, DatabaseConfig};
use hub_catalog_server::config::ServerConfig;
use hub_catalog_server::identity::KeycloakClient;
use hub_catalog_server::middleware::jwt::JwtConfig;
use hub_catalog_server::router::build_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hub_catalog_server=debug,tower_http=debug".into()),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    let config = ServerConfig::from_env()?;

    let pool = connect(&DatabaseConfig::new(
        config.database_url.clone(),
        config.pool_size,
    ))
    .await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let identity = Arc::new(KeycloakClient::new(config.keycloak.clone())?);
    let services = HubServices::new(
        pg_stores(pool),
        identity,
        HubSettings {
            group_detail_base_url: config.group_detail_base_url.clone(),
        },
    );

    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(services, jwt_config, config.cors_allow_origin.as_deref());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("hub-catalog-server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
