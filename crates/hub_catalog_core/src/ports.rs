//! Port traits implemented by the storage and identity adapters.
//!
//! Every method that changes more than one table runs in a single
//! transaction on the adapter side.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HubError;
use crate::paging::{Page, PageRequest};
use crate::types::*;

pub type Result<T> = std::result::Result<T, HubError>;

#[async_trait]
pub trait OrganisationStore: Send + Sync {
    /// All organisations ordered by name.
    async fn list_sorted_by_name(&self) -> Result<Vec<Organisation>>;
    async fn find(&self, id: i64) -> Result<Option<Organisation>>;
    /// Inserts (`id == None`) or updates an organisation and moves the listed
    /// bundle groups to it. Unknown group ids fail the whole write.
    async fn save(
        &self,
        id: Option<i64>,
        input: &OrganisationInput,
    ) -> Result<Option<Organisation>>;
    /// Returns false when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Catalog>>;
    /// Catalogs of the organisations the portal user `username` belongs to.
    async fn list_for_username(&self, username: &str) -> Result<Vec<Catalog>>;
    async fn find(&self, id: i64) -> Result<Option<Catalog>>;
    async fn exists_for_organisation(&self, organisation_id: i64) -> Result<bool>;
    async fn insert(&self, organisation_id: i64, name: &str) -> Result<Catalog>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Category>>;
    async fn find(&self, id: i64) -> Result<Option<Category>>;
    async fn insert(&self, input: &CategoryInput) -> Result<Category>;
    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>>;
    /// Detaches the category from bundle groups, then deletes it.
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait BundleGroupStore: Send + Sync {
    async fn list(&self, organisation_id: Option<i64>) -> Result<Vec<BundleGroup>>;
    async fn find(&self, id: i64) -> Result<Option<BundleGroup>>;
    /// Distinct groups of `organisation_id` (any when `None`) having at least
    /// one of `category_ids` (any when empty).
    async fn find_by_organisation_and_categories(
        &self,
        organisation_id: Option<i64>,
        category_ids: &[i64],
    ) -> Result<Vec<BundleGroup>>;
    async fn insert(&self, input: &BundleGroupInput) -> Result<BundleGroup>;
    async fn update(&self, id: i64, input: &BundleGroupInput) -> Result<Option<BundleGroup>>;
    /// Removes the group together with its versions and their bundle links.
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait BundleGroupVersionStore: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<BundleGroupVersion>>;
    /// Versions of any of `bundle_group_ids` whose status is in `statuses`,
    /// newest `last_updated` first.
    async fn find_by_groups_and_statuses(
        &self,
        bundle_group_ids: &[i64],
        statuses: &[VersionStatus],
        page: PageRequest,
    ) -> Result<Page<BundleGroupVersion>>;
    async fn find_by_group_and_status(
        &self,
        bundle_group_id: i64,
        status: VersionStatus,
    ) -> Result<Vec<BundleGroupVersion>>;
    async fn find_by_group_and_version(
        &self,
        bundle_group_id: i64,
        version: &str,
    ) -> Result<Vec<BundleGroupVersion>>;
    /// All versions of a group, oldest first.
    async fn list_by_group(&self, bundle_group_id: i64) -> Result<Vec<BundleGroupVersion>>;
    async fn count_by_group(&self, bundle_group_id: i64) -> Result<i64>;
    async fn count_by_group_and_statuses(
        &self,
        bundle_group_id: i64,
        statuses: &[VersionStatus],
    ) -> Result<i64>;
    /// Archive, save, and relink as one transaction.
    async fn apply(&self, write: VersionWrite) -> Result<BundleGroupVersion>;
    /// Detaches the version's bundles, then deletes it.
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait BundleStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Bundle>>;
    /// Bundles linked to any of `version_ids`, ordered by id.
    async fn list_by_versions(&self, version_ids: &[i64]) -> Result<Vec<Bundle>>;
    async fn find(&self, id: i64) -> Result<Option<Bundle>>;
    async fn ids_for_version(&self, version_id: i64) -> Result<Vec<i64>>;
    /// Inserts (`id == None`) or updates a bundle and replaces its version links.
    async fn save(&self, id: Option<i64>, input: &BundleInput) -> Result<Option<Bundle>>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait PortalUserStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<PortalUser>>;
    async fn list_by_organisation(&self, organisation_id: i64) -> Result<Vec<PortalUser>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<PortalUser>>;
    /// Creates the portal user if needed, refreshes its email and links it to
    /// the organisation.
    async fn upsert_with_organisation(
        &self,
        username: &str,
        email: Option<&str>,
        organisation_id: i64,
    ) -> Result<PortalUser>;
    async fn remove_organisation(&self, username: &str, organisation_id: i64) -> Result<bool>;
    async fn delete(&self, username: &str) -> Result<bool>;
}

/// External identity provider (Keycloak).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn search_users(&self, params: &BTreeMap<String, String>)
        -> Result<Vec<UserRepresentation>>;
    async fn get_user(&self, username: &str) -> Result<Option<UserRepresentation>>;
}

/// All store ports, shared behind `Arc`.
#[derive(Clone)]
pub struct Stores {
    pub organisations: Arc<dyn OrganisationStore>,
    pub catalogs: Arc<dyn CatalogStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub bundle_groups: Arc<dyn BundleGroupStore>,
    pub versions: Arc<dyn BundleGroupVersionStore>,
    pub bundles: Arc<dyn BundleStore>,
    pub portal_users: Arc<dyn PortalUserStore>,
}

impl Stores {
    /// Wire every port to one adapter that implements them all.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: OrganisationStore
            + CatalogStore
            + CategoryStore
            + BundleGroupStore
            + BundleGroupVersionStore
            + BundleStore
            + PortalUserStore
            + 'static,
    {
        Self {
            organisations: store.clone(),
            catalogs: store.clone(),
            categories: store.clone(),
            bundle_groups: store.clone(),
            versions: store.clone(),
            bundles: store.clone(),
            portal_users: store,
        }
    }
}
