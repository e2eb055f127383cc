use std::collections::BTreeSet;

use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::error::HubError;
use crate::paging::PageRequest;
use crate::ports::{Result, Stores};
use crate::principal::Principal;
use crate::types::{Bundle, BundleGroup, BundleInput, VersionStatus};

const BUNDLE_NOT_FOUND: &str = "Bundle not found";
const CATALOG_NOT_FOUND: &str = "Catalog not found";

/// Bundle CRUD and the visibility rules of bundle listings.
pub struct BundleService {
    stores: Stores,
}

impl BundleService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Bundles the caller may see, optionally narrowed to one bundle group
    /// version and/or one catalog. Ordered by bundle id.
    pub async fn get_bundles(
        &self,
        principal: &Principal,
        bundle_group_version_id: Option<i64>,
        catalog_id: Option<i64>,
    ) -> Result<Vec<Bundle>> {
        let catalog = match catalog_id {
            Some(id) => Some(
                self.stores
                    .catalogs
                    .find(id)
                    .await?
                    .ok_or_else(|| HubError::not_found(CATALOG_NOT_FOUND))?,
            ),
            None => None,
        };
        let version = match bundle_group_version_id {
            Some(id) => Some(
                self.stores
                    .versions
                    .find(id)
                    .await?
                    .ok_or_else(|| HubError::not_found("Bundle group version not found"))?,
            ),
            None => None,
        };

        if let (Some(catalog), Some(version)) = (&catalog, &version) {
            let group = self.stores.bundle_groups.find(version.bundle_group_id).await?;
            if group.and_then(|g| g.catalog_id) != Some(catalog.id) {
                return Err(HubError::not_found(
                    "Bundle group version not found in catalog",
                ));
            }
        }

        let member_catalogs = self.member_catalogs(principal).await?;

        if let Some(catalog) = &catalog {
            if !principal.is_authenticated() {
                return Err(HubError::Forbidden(
                    "catalog filter requires authentication".into(),
                ));
            }
            if !principal.is_admin() && !member_catalogs.contains(&catalog.id) {
                return Err(HubError::not_found(CATALOG_NOT_FOUND));
            }
        }

        let visible: Vec<BundleGroup> = self
            .stores
            .bundle_groups
            .list(None)
            .await?
            .into_iter()
            .filter(|group| match &catalog {
                Some(catalog) => group.catalog_id == Some(catalog.id),
                None => group_visible(principal, group, &member_catalogs),
            })
            .collect();
        let visible_ids: Vec<i64> = visible.iter().map(|g| g.id).collect();

        let version_ids: Vec<i64> = match version {
            Some(version) if visible_ids.contains(&version.bundle_group_id) => vec![version.id],
            Some(version) => {
                debug!(
                    version_id = version.id,
                    user = %principal.username,
                    "bundle group version not visible"
                );
                return Ok(Vec::new());
            }
            None => {
                let all: Vec<VersionStatus> = VersionStatus::iter().collect();
                self.stores
                    .versions
                    .find_by_groups_and_statuses(&visible_ids, &all, PageRequest::unpaged())
                    .await?
                    .items
                    .into_iter()
                    .map(|v| v.id)
                    .collect()
            }
        };
        if version_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut bundles = self.stores.bundles.list_by_versions(&version_ids).await?;
        bundles.sort_by_key(|b| b.id);
        Ok(bundles)
    }

    pub async fn get_bundle(&self, id: i64) -> Result<Bundle> {
        self.stores
            .bundles
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(BUNDLE_NOT_FOUND))
    }

    /// One bundle, subject to the same rules as [`Self::get_bundles`]: admins
    /// see every bundle, anyone else only bundles linked to a version of a
    /// group they can see. A hidden bundle is reported as not found.
    pub async fn get_visible_bundle(&self, principal: &Principal, id: i64) -> Result<Bundle> {
        let bundle = self.get_bundle(id).await?;
        if principal.is_admin() {
            return Ok(bundle);
        }
        let member_catalogs = self.member_catalogs(principal).await?;
        for version_id in &bundle.bundle_group_version_ids {
            let Some(version) = self.stores.versions.find(*version_id).await? else {
                continue;
            };
            let group = self.stores.bundle_groups.find(version.bundle_group_id).await?;
            if group.is_some_and(|g| group_visible(principal, &g, &member_catalogs)) {
                return Ok(bundle);
            }
        }
        debug!(bundle_id = id, user = %principal.username, "bundle not visible");
        Err(HubError::not_found(BUNDLE_NOT_FOUND))
    }

    /// Catalog ids of the organisations the caller belongs to.
    async fn member_catalogs(&self, principal: &Principal) -> Result<BTreeSet<i64>> {
        if !principal.is_authenticated() {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .stores
            .catalogs
            .list_for_username(&principal.username)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect())
    }

    /// Create (`id == None`) or update a bundle and its version links.
    pub async fn save_bundle(&self, id: Option<i64>, input: &BundleInput) -> Result<Bundle> {
        if input.name.trim().is_empty() {
            return Err(HubError::InvalidInput("bundle name is required".into()));
        }
        let bundle = self
            .stores
            .bundles
            .save(id, input)
            .await?
            .ok_or_else(|| HubError::not_found(BUNDLE_NOT_FOUND))?;
        info!(bundle_id = bundle.id, name = %bundle.name, "bundle saved");
        Ok(bundle)
    }

    pub async fn delete_bundle(&self, id: i64) -> Result<Bundle> {
        let bundle = self.get_bundle(id).await?;
        self.stores.bundles.delete(id).await?;
        info!(bundle_id = id, "bundle deleted");
        Ok(bundle)
    }
}

fn group_visible(
    principal: &Principal,
    group: &BundleGroup,
    member_catalogs: &BTreeSet<i64>,
) -> bool {
    principal.is_admin()
        || group.public_catalog
        || group
            .catalog_id
            .is_some_and(|id| member_catalogs.contains(&id))
}
