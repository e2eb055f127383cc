use chrono::Utc;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::error::HubError;
use crate::paging::{Page, PageRequest, PagedContent};
use crate::ports::{Result, Stores};
use crate::proto::BundleGroupVersionView;
use crate::types::{BundleGroupVersion, VersionDraft, VersionStatus, VersionWrite};

const VERSION_NOT_FOUND: &str = "Bundle group version not found";

/// Publishing rules and listings for bundle group versions.
pub struct BundleGroupVersionService {
    stores: Stores,
    group_detail_base_url: Option<String>,
}

fn effective_statuses(statuses: &[VersionStatus]) -> Vec<VersionStatus> {
    if statuses.is_empty() {
        VersionStatus::iter().collect()
    } else {
        statuses.to_vec()
    }
}

impl BundleGroupVersionService {
    pub fn new(stores: Stores, group_detail_base_url: Option<String>) -> Self {
        Self {
            stores,
            group_detail_base_url,
        }
    }

    pub async fn get_bundle_group_version(&self, id: i64) -> Result<Option<BundleGroupVersion>> {
        self.stores.versions.find(id).await
    }

    /// Persist `draft`, archiving the group's other published versions when it
    /// is published, and replace its bundle links when `children` is given.
    pub async fn create_bundle_group_version(
        &self,
        draft: VersionDraft,
        children: Option<Vec<i64>>,
    ) -> Result<BundleGroupVersion> {
        self.write(draft, children, false).await
    }

    /// New version of an existing group.
    ///
    /// The group must exist, the label must be unused within the group, and
    /// the group may hold at most one open version beforehand. The store
    /// checks all three under a per-group lock.
    pub async fn add_version(
        &self,
        mut draft: VersionDraft,
        children: Option<Vec<i64>>,
    ) -> Result<BundleGroupVersion> {
        draft.id = None;
        draft.created_at = None;
        self.write(draft, children, true).await
    }

    /// Overwrite an existing version; its id, group and creation time are kept.
    pub async fn update_version(
        &self,
        id: i64,
        mut draft: VersionDraft,
        children: Option<Vec<i64>>,
    ) -> Result<BundleGroupVersion> {
        let existing = self
            .stores
            .versions
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(VERSION_NOT_FOUND))?;
        draft.id = Some(existing.id);
        draft.bundle_group_id = existing.bundle_group_id;
        draft.created_at = Some(existing.created_at);
        self.write(draft, children, false).await
    }

    async fn write(
        &self,
        draft: VersionDraft,
        children: Option<Vec<i64>>,
        new_version: bool,
    ) -> Result<BundleGroupVersion> {
        debug!(
            bundle_group_id = draft.bundle_group_id,
            version = %draft.version,
            new_version,
            "writing bundle group version"
        );
        let saved = self
            .stores
            .versions
            .apply(VersionWrite {
                draft,
                last_updated: Utc::now(),
                new_version,
                children,
            })
            .await?;
        info!(
            version_id = saved.id,
            bundle_group_id = saved.bundle_group_id,
            status = %saved.status,
            "bundle group version saved"
        );
        Ok(saved)
    }

    /// Versions of the groups matching `organisation_id` and `category_ids`,
    /// paged newest first, each page sorted by group name.
    pub async fn get_bundle_group_versions(
        &self,
        page: PageRequest,
        organisation_id: Option<i64>,
        category_ids: &[i64],
        statuses: &[VersionStatus],
    ) -> Result<PagedContent<BundleGroupVersionView>> {
        let group_ids: Vec<i64> = self
            .stores
            .bundle_groups
            .find_by_organisation_and_categories(organisation_id, category_ids)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        let page = self
            .stores
            .versions
            .find_by_groups_and_statuses(&group_ids, &effective_statuses(statuses), page)
            .await?;
        let mut views = self.to_views(&page.items).await?;
        views.sort_by_key(|v| v.name.to_lowercase());
        Ok(PagedContent::new(views, &page))
    }

    /// Versions of one group: everything not archived first, then by name.
    ///
    /// The metadata describes the returned slice only, as one unpaged page.
    pub async fn get_bundle_group_versions_of_group(
        &self,
        page: PageRequest,
        statuses: &[VersionStatus],
        bundle_group_id: i64,
    ) -> Result<PagedContent<BundleGroupVersionView>> {
        if self
            .stores
            .bundle_groups
            .find(bundle_group_id)
            .await?
            .is_none()
        {
            return Err(HubError::not_found("Bundle group not found"));
        }
        let fetched = self
            .stores
            .versions
            .find_by_groups_and_statuses(&[bundle_group_id], &effective_statuses(statuses), page)
            .await?;
        let (mut ordered, archived): (Vec<_>, Vec<_>) = fetched
            .items
            .into_iter()
            .partition(|v| v.status != VersionStatus::Archive);
        ordered.extend(archived);
        let reordered = Page::slice(ordered, PageRequest::unpaged());

        let mut views = self.to_views(&reordered.items).await?;
        views.sort_by_key(|v| v.name.to_lowercase());
        Ok(PagedContent::new(views, &reordered))
    }

    pub async fn get_bundle_group_version_view(&self, id: i64) -> Result<BundleGroupVersionView> {
        let version = self
            .stores
            .versions
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(VERSION_NOT_FOUND))?;
        self.to_view(&version).await
    }

    /// A group stays editable while it has at most one version.
    pub async fn is_bundle_group_editable(&self, bundle_group_id: i64) -> Result<bool> {
        Ok(self.stores.versions.count_by_group(bundle_group_id).await? <= 1)
    }

    pub async fn can_add_new_version(&self, version: &BundleGroupVersion) -> Result<bool> {
        let open = self
            .stores
            .versions
            .count_by_group_and_statuses(version.bundle_group_id, &VersionStatus::OPEN)
            .await?;
        Ok(open <= 1)
    }

    /// Detach and delete `version` when present. Returns whether anything was deleted.
    pub async fn delete_bundle_group_version(
        &self,
        version: Option<BundleGroupVersion>,
    ) -> Result<bool> {
        match version {
            Some(version) => {
                let deleted = self.stores.versions.delete(version.id).await?;
                info!(version_id = version.id, "bundle group version deleted");
                Ok(deleted)
            }
            None => Ok(false),
        }
    }

    pub async fn delete_bundle_group_version_by_id(&self, id: i64) -> Result<()> {
        let version = self
            .stores
            .versions
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(VERSION_NOT_FOUND))?;
        self.delete_bundle_group_version(Some(version)).await?;
        Ok(())
    }

    fn bundle_group_url(&self, version_id: i64) -> String {
        match &self.group_detail_base_url {
            Some(base) => format!("{base}bundlegroupversion/{version_id}"),
            None => String::new(),
        }
    }

    async fn to_views(
        &self,
        versions: &[BundleGroupVersion],
    ) -> Result<Vec<BundleGroupVersionView>> {
        let mut views = Vec::with_capacity(versions.len());
        for version in versions {
            views.push(self.to_view(version).await?);
        }
        Ok(views)
    }

    async fn to_view(&self, version: &BundleGroupVersion) -> Result<BundleGroupVersionView> {
        let group = self.stores.bundle_groups.find(version.bundle_group_id).await?;
        let organisation = match group.as_ref().and_then(|g| g.organisation_id) {
            Some(id) => self.stores.organisations.find(id).await?,
            None => None,
        };
        let children = self
            .stores
            .bundles
            .ids_for_version(version.id)
            .await?
            .iter()
            .map(i64::to_string)
            .collect();
        let all_versions = self
            .stores
            .versions
            .list_by_group(version.bundle_group_id)
            .await?
            .into_iter()
            .map(|v| v.version)
            .collect();

        Ok(BundleGroupVersionView {
            bundle_group_version_id: version.id,
            bundle_group_id: version.bundle_group_id,
            name: group.as_ref().map(|g| g.name.clone()).unwrap_or_default(),
            description: version.description.clone(),
            description_image: version.description_image.clone(),
            documentation_url: version.documentation_url.clone(),
            version: version.version.clone(),
            status: version.status,
            organisation_id: organisation.as_ref().map(|o| o.id),
            organisation_name: organisation.map(|o| o.name),
            created_at: version.created_at,
            last_update: version.last_updated,
            categories: group
                .map(|g| g.category_ids.iter().map(i64::to_string).collect())
                .unwrap_or_default(),
            children,
            all_versions,
            is_editable: self.is_bundle_group_editable(version.bundle_group_id).await?,
            can_add_new_version: self.can_add_new_version(version).await?,
            bundle_group_url: self.bundle_group_url(version.id),
        })
    }
}
