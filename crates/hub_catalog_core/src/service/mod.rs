//! Hub services.
//!
//! Each service holds the ports it needs via `Arc<dyn ...>` so the same rules
//! run against PostgreSQL or the in-memory store.

mod bundle_groups;
mod bundles;
mod catalogs;
mod categories;
mod organisations;
mod users;
mod versions;

use std::sync::Arc;

pub use bundle_groups::BundleGroupService;
pub use bundles::BundleService;
pub use catalogs::CatalogService;
pub use categories::CategoryService;
pub use organisations::OrganisationService;
pub use users::PortalUserService;
pub use versions::BundleGroupVersionService;

use crate::ports::{IdentityProvider, Stores};

/// Settings that shape service output rather than storage.
#[derive(Debug, Clone, Default)]
pub struct HubSettings {
    /// Prefix of the public bundle group detail page, e.g. `https://hub.example.com/`.
    pub group_detail_base_url: Option<String>,
}

/// Every service, wired once at startup and shared by the handlers.
#[derive(Clone)]
pub struct HubServices {
    pub catalogs: Arc<CatalogService>,
    pub versions: Arc<BundleGroupVersionService>,
    pub bundles: Arc<BundleService>,
    pub bundle_groups: Arc<BundleGroupService>,
    pub organisations: Arc<OrganisationService>,
    pub categories: Arc<CategoryService>,
    pub users: Arc<PortalUserService>,
}

impl HubServices {
    pub fn new(stores: Stores, identity: Arc<dyn IdentityProvider>, settings: HubSettings) -> Self {
        Self {
            catalogs: Arc::new(CatalogService::new(&stores)),
            versions: Arc::new(BundleGroupVersionService::new(
                stores.clone(),
                settings.group_detail_base_url,
            )),
            bundles: Arc::new(BundleService::new(stores.clone())),
            bundle_groups: Arc::new(BundleGroupService::new(stores.clone())),
            organisations: Arc::new(OrganisationService::new(&stores)),
            categories: Arc::new(CategoryService::new(&stores)),
            users: Arc::new(PortalUserService::new(&stores, identity)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use crate::memory::MemoryStore;
    use crate::ports::*;
    use crate::types::*;

    pub fn stores() -> Stores {
        Stores::from_single(Arc::new(MemoryStore::new()))
    }

    pub async fn organisation(stores: &Stores, name: &str) -> Organisation {
        stores
            .organisations
            .save(
                None,
                &OrganisationInput {
                    name: name.into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn group(
        stores: &Stores,
        name: &str,
        organisation_id: Option<i64>,
        catalog_id: Option<i64>,
        public_catalog: bool,
        category_ids: Vec<i64>,
    ) -> BundleGroup {
        stores
            .bundle_groups
            .insert(&BundleGroupInput {
                name: name.into(),
                organisation_id,
                catalog_id,
                public_catalog,
                category_ids,
            })
            .await
            .unwrap()
    }

    pub fn draft(bundle_group_id: i64, version: &str, status: VersionStatus) -> VersionDraft {
        VersionDraft {
            id: None,
            bundle_group_id,
            version: version.into(),
            status,
            description: Some(format!("{version} description")),
            description_image: None,
            documentation_url: None,
            created_at: None,
        }
    }

    pub async fn bundle(stores: &Stores, name: &str, version_ids: Vec<i64>) -> Bundle {
        stores
            .bundles
            .save(
                None,
                &BundleInput {
                    name: name.into(),
                    bundle_group_version_ids: version_ids,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap()
    }
}
