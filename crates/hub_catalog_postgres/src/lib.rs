//! PostgreSQL adapter for the Entando Hub catalog.

pub mod pool;
mod rows;
pub mod store;

use std::sync::Arc;

use hub_catalog_core::ports::Stores;
use sqlx::PgPool;

pub use pool::{connect, mask_database_url, run_migrations, DatabaseConfig};
pub use store::*;

/// Wire every store port to its Postgres adapter over one pool.
pub fn pg_stores(pool: PgPool) -> Stores {
    Stores {
        organisations: Arc::new(PgOrganisationStore::new(pool.clone())),
        catalogs: Arc::new(PgCatalogStore::new(pool.clone())),
        categories: Arc::new(PgCategoryStore::new(pool.clone())),
        bundle_groups: Arc::new(PgBundleGroupStore::new(pool.clone())),
        versions: Arc::new(PgBundleGroupVersionStore::new(pool.clone())),
        bundles: Arc::new(PgBundleStore::new(pool.clone())),
        portal_users: Arc::new(PgPortalUserStore::new(pool)),
    }
}
