//! In-memory implementations of every port.
//!
//! Mirrors the referential behaviour of the PostgreSQL schema (cascades,
//! `SET NULL` on delete, one catalog per organisation) so service tests and
//! router tests run without a database.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::HubError;
use crate::paging::{Page, PageRequest};
use crate::ports::*;
use crate::types::*;

#[derive(Default)]
struct State {
    next_id: i64,
    organisations: BTreeMap<i64, Organisation>,
    catalogs: BTreeMap<i64, Catalog>,
    categories: BTreeMap<i64, Category>,
    bundle_groups: BTreeMap<i64, BundleGroup>,
    versions: BTreeMap<i64, BundleGroupVersion>,
    bundles: BTreeMap<i64, Bundle>,
    /// (bundle id, bundle group version id)
    links: BTreeSet<(i64, i64)>,
    portal_users: BTreeMap<i64, PortalUser>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_links(&self, bundle: &Bundle) -> Bundle {
        let mut bundle = bundle.clone();
        bundle.bundle_group_version_ids = self
            .links
            .iter()
            .filter(|(b, _)| *b == bundle.id)
            .map(|(_, v)| *v)
            .collect();
        bundle
    }

    fn unlink_version(&mut self, version_id: i64) {
        self.links.retain(|(_, v)| *v != version_id);
    }

    fn link_bundle_to_versions(&mut self, bundle_id: i64, version_ids: &[i64]) -> Result<()> {
        for version_id in version_ids {
            if !self.versions.contains_key(version_id) {
                return Err(HubError::not_found(format!(
                    "Bundle group version {version_id} not found"
                )));
            }
        }
        self.links.retain(|(b, _)| *b != bundle_id);
        for version_id in version_ids {
            self.links.insert((bundle_id, *version_id));
        }
        Ok(())
    }

    fn portal_user_by_name(&mut self, username: &str) -> Option<&mut PortalUser> {
        self.portal_users
            .values_mut()
            .find(|u| u.username == username)
    }
}

/// Process-local store; cheap to construct per test.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganisationStore for MemoryStore {
    async fn list_sorted_by_name(&self) -> Result<Vec<Organisation>> {
        let state = self.state.read().await;
        let mut all: Vec<_> = state.organisations.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn find(&self, id: i64) -> Result<Option<Organisation>> {
        Ok(self.state.read().await.organisations.get(&id).cloned())
    }

    async fn save(
        &self,
        id: Option<i64>,
        input: &OrganisationInput,
    ) -> Result<Option<Organisation>> {
        let mut state = self.state.write().await;
        let group_ids = input.bundle_groups.as_deref().unwrap_or_default();
        if let Some(missing) = group_ids
            .iter()
            .find(|g| !state.bundle_groups.contains_key(*g))
        {
            return Err(HubError::not_found(format!("Bundle group {missing} not found")));
        }
        let id = match id {
            Some(id) if !state.organisations.contains_key(&id) => return Ok(None),
            Some(id) => id,
            None => state.next_id(),
        };
        let organisation = Organisation {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
        };
        state.organisations.insert(id, organisation.clone());
        for group_id in group_ids {
            if let Some(group) = state.bundle_groups.get_mut(group_id) {
                group.organisation_id = Some(id);
            }
        }
        Ok(Some(organisation))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.organisations.remove(&id).is_none() {
            return Ok(false);
        }
        let dropped: Vec<i64> = state
            .catalogs
            .values()
            .filter(|c| c.organisation_id == id)
            .map(|c| c.id)
            .collect();
        state.catalogs.retain(|_, c| c.organisation_id != id);
        for group in state.bundle_groups.values_mut() {
            if group.organisation_id == Some(id) {
                group.organisation_id = None;
            }
            if group.catalog_id.is_some_and(|c| dropped.contains(&c)) {
                group.catalog_id = None;
            }
        }
        for user in state.portal_users.values_mut() {
            user.organisation_ids.retain(|o| *o != id);
        }
        Ok(true)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Catalog>> {
        Ok(self.state.read().await.catalogs.values().cloned().collect())
    }

    async fn list_for_username(&self, username: &str) -> Result<Vec<Catalog>> {
        let state = self.state.read().await;
        let organisations: BTreeSet<i64> = state
            .portal_users
            .values()
            .filter(|u| u.username == username)
            .flat_map(|u| u.organisation_ids.iter().copied())
            .collect();
        Ok(state
            .catalogs
            .values()
            .filter(|c| organisations.contains(&c.organisation_id))
            .cloned()
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Catalog>> {
        Ok(self.state.read().await.catalogs.get(&id).cloned())
    }

    async fn exists_for_organisation(&self, organisation_id: i64) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .catalogs
            .values()
            .any(|c| c.organisation_id == organisation_id))
    }

    async fn insert(&self, organisation_id: i64, name: &str) -> Result<Catalog> {
        let mut state = self.state.write().await;
        if state
            .catalogs
            .values()
            .any(|c| c.organisation_id == organisation_id)
        {
            return Err(HubError::conflict("Catalog already exists"));
        }
        let catalog = Catalog {
            id: state.next_id(),
            organisation_id,
            name: name.to_string(),
        };
        state.catalogs.insert(catalog.id, catalog.clone());
        Ok(catalog)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.catalogs.remove(&id).is_none() {
            return Ok(false);
        }
        for group in state.bundle_groups.values_mut() {
            if group.catalog_id == Some(id) {
                group.catalog_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Category>> {
        Ok(self.state.read().await.categories.values().cloned().collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn insert(&self, input: &CategoryInput) -> Result<Category> {
        let mut state = self.state.write().await;
        let category = Category {
            id: state.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>> {
        let mut state = self.state.write().await;
        Ok(state.categories.get_mut(&id).map(|category| {
            category.name = input.name.clone();
            category.description = input.description.clone();
            category.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for group in state.bundle_groups.values_mut() {
            group.category_ids.retain(|c| *c != id);
        }
        Ok(true)
    }
}

fn normalised_categories(ids: &[i64]) -> Vec<i64> {
    let set: BTreeSet<i64> = ids.iter().copied().collect();
    set.into_iter().collect()
}

#[async_trait]
impl BundleGroupStore for MemoryStore {
    async fn list(&self, organisation_id: Option<i64>) -> Result<Vec<BundleGroup>> {
        let state = self.state.read().await;
        Ok(state
            .bundle_groups
            .values()
            .filter(|g| organisation_id.is_none() || g.organisation_id == organisation_id)
            .cloned()
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<BundleGroup>> {
        Ok(self.state.read().await.bundle_groups.get(&id).cloned())
    }

    async fn find_by_organisation_and_categories(
        &self,
        organisation_id: Option<i64>,
        category_ids: &[i64],
    ) -> Result<Vec<BundleGroup>> {
        let state = self.state.read().await;
        Ok(state
            .bundle_groups
            .values()
            .filter(|g| organisation_id.is_none() || g.organisation_id == organisation_id)
            .filter(|g| {
                category_ids.is_empty() || g.category_ids.iter().any(|c| category_ids.contains(c))
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, input: &BundleGroupInput) -> Result<BundleGroup> {
        let mut state = self.state.write().await;
        let group = BundleGroup {
            id: state.next_id(),
            name: input.name.clone(),
            organisation_id: input.organisation_id,
            catalog_id: input.catalog_id,
            public_catalog: input.public_catalog,
            category_ids: normalised_categories(&input.category_ids),
        };
        state.bundle_groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update(&self, id: i64, input: &BundleGroupInput) -> Result<Option<BundleGroup>> {
        let mut state = self.state.write().await;
        Ok(state.bundle_groups.get_mut(&id).map(|group| {
            group.name = input.name.clone();
            group.organisation_id = input.organisation_id;
            group.catalog_id = input.catalog_id;
            group.public_catalog = input.public_catalog;
            group.category_ids = normalised_categories(&input.category_ids);
            group.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.bundle_groups.remove(&id).is_none() {
            return Ok(false);
        }
        let versions: Vec<i64> = state
            .versions
            .values()
            .filter(|v| v.bundle_group_id == id)
            .map(|v| v.id)
            .collect();
        for version_id in versions {
            state.unlink_version(version_id);
            state.versions.remove(&version_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl BundleGroupVersionStore for MemoryStore {
    async fn find(&self, id: i64) -> Result<Option<BundleGroupVersion>> {
        Ok(self.state.read().await.versions.get(&id).cloned())
    }

    async fn find_by_groups_and_statuses(
        &self,
        bundle_group_ids: &[i64],
        statuses: &[VersionStatus],
        page: PageRequest,
    ) -> Result<Page<BundleGroupVersion>> {
        let state = self.state.read().await;
        let mut matching: Vec<_> = state
            .versions
            .values()
            .filter(|v| bundle_group_ids.contains(&v.bundle_group_id))
            .filter(|v| statuses.contains(&v.status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(Page::slice(matching, page))
    }

    async fn find_by_group_and_status(
        &self,
        bundle_group_id: i64,
        status: VersionStatus,
    ) -> Result<Vec<BundleGroupVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .values()
            .filter(|v| v.bundle_group_id == bundle_group_id && v.status == status)
            .cloned()
            .collect())
    }

    async fn find_by_group_and_version(
        &self,
        bundle_group_id: i64,
        version: &str,
    ) -> Result<Vec<BundleGroupVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .values()
            .filter(|v| v.bundle_group_id == bundle_group_id && v.version == version)
            .cloned()
            .collect())
    }

    async fn list_by_group(&self, bundle_group_id: i64) -> Result<Vec<BundleGroupVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .values()
            .filter(|v| v.bundle_group_id == bundle_group_id)
            .cloned()
            .collect())
    }

    async fn count_by_group(&self, bundle_group_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .values()
            .filter(|v| v.bundle_group_id == bundle_group_id)
            .count() as i64)
    }

    async fn count_by_group_and_statuses(
        &self,
        bundle_group_id: i64,
        statuses: &[VersionStatus],
    ) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .values()
            .filter(|v| v.bundle_group_id == bundle_group_id && statuses.contains(&v.status))
            .count() as i64)
    }

    async fn apply(&self, write: VersionWrite) -> Result<BundleGroupVersion> {
        let mut state = self.state.write().await;
        let VersionWrite {
            draft,
            last_updated,
            new_version,
            children,
        } = write;

        if !state.bundle_groups.contains_key(&draft.bundle_group_id) {
            return Err(HubError::not_found("Bundle group not found"));
        }
        if let Some(children) = &children {
            if let Some(missing) = children.iter().find(|id| !state.bundles.contains_key(*id)) {
                return Err(HubError::not_found(format!("Bundle {missing} not found")));
            }
        }
        if let Some(id) = draft.id {
            if !state.versions.contains_key(&id) {
                return Err(HubError::not_found("Bundle group version not found"));
            }
        }
        let siblings: Vec<&BundleGroupVersion> = state
            .versions
            .values()
            .filter(|v| v.bundle_group_id == draft.bundle_group_id && Some(v.id) != draft.id)
            .collect();
        if siblings.iter().any(|v| v.version == draft.version) {
            return Err(HubError::conflict(format!(
                "Version {} already exists",
                draft.version
            )));
        }
        let open = siblings
            .iter()
            .filter(|v| VersionStatus::OPEN.contains(&v.status))
            .count();
        if new_version && open > 1 {
            return Err(HubError::conflict(
                "Bundle group already has a published and an unpublished version",
            ));
        }

        if draft.status == VersionStatus::Published {
            for previous in state.versions.values_mut() {
                if previous.bundle_group_id == draft.bundle_group_id
                    && previous.status == VersionStatus::Published
                    && Some(previous.id) != draft.id
                {
                    previous.status = VersionStatus::Archive;
                }
            }
        }

        let id = match draft.id {
            Some(id) => id,
            None => state.next_id(),
        };
        let created_at = state
            .versions
            .get(&id)
            .map(|v| v.created_at)
            .or(draft.created_at)
            .unwrap_or(last_updated);
        let saved = BundleGroupVersion {
            id,
            bundle_group_id: draft.bundle_group_id,
            version: draft.version,
            status: draft.status,
            description: draft.description,
            description_image: draft.description_image,
            documentation_url: draft.documentation_url,
            created_at,
            last_updated,
        };
        state.versions.insert(id, saved.clone());

        if let Some(children) = children {
            state.unlink_version(id);
            for bundle_id in children {
                state.links.insert((bundle_id, id));
            }
        }
        Ok(saved)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        state.unlink_version(id);
        Ok(state.versions.remove(&id).is_some())
    }
}

#[async_trait]
impl BundleStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Bundle>> {
        let state = self.state.read().await;
        Ok(state.bundles.values().map(|b| state.with_links(b)).collect())
    }

    async fn list_by_versions(&self, version_ids: &[i64]) -> Result<Vec<Bundle>> {
        let state = self.state.read().await;
        let wanted: BTreeSet<i64> = state
            .links
            .iter()
            .filter(|(_, v)| version_ids.contains(v))
            .map(|(b, _)| *b)
            .collect();
        Ok(wanted
            .iter()
            .filter_map(|id| state.bundles.get(id))
            .map(|b| state.with_links(b))
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Bundle>> {
        let state = self.state.read().await;
        Ok(state.bundles.get(&id).map(|b| state.with_links(b)))
    }

    async fn ids_for_version(&self, version_id: i64) -> Result<Vec<i64>> {
        let state = self.state.read().await;
        Ok(state
            .links
            .iter()
            .filter(|(_, v)| *v == version_id)
            .map(|(b, _)| *b)
            .collect())
    }

    async fn save(&self, id: Option<i64>, input: &BundleInput) -> Result<Option<Bundle>> {
        let mut state = self.state.write().await;
        let id = match id {
            Some(id) if !state.bundles.contains_key(&id) => return Ok(None),
            Some(id) => id,
            None => state.next_id(),
        };
        let bundle = Bundle {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            git_repo_address: input.git_repo_address.clone(),
            git_src_repo_address: input.git_src_repo_address.clone(),
            dependencies: input.dependencies.clone(),
            descriptor_version: input.descriptor_version,
            bundle_group_version_ids: Vec::new(),
        };
        state.link_bundle_to_versions(id, &input.bundle_group_version_ids)?;
        state.bundles.insert(id, bundle.clone());
        Ok(Some(state.with_links(&bundle)))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        state.links.retain(|(b, _)| *b != id);
        Ok(state.bundles.remove(&id).is_some())
    }
}

#[async_trait]
impl PortalUserStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<PortalUser>> {
        Ok(self.state.read().await.portal_users.values().cloned().collect())
    }

    async fn list_by_organisation(&self, organisation_id: i64) -> Result<Vec<PortalUser>> {
        let state = self.state.read().await;
        Ok(state
            .portal_users
            .values()
            .filter(|u| u.organisation_ids.contains(&organisation_id))
            .cloned()
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<PortalUser>> {
        let state = self.state.read().await;
        Ok(state
            .portal_users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn upsert_with_organisation(
        &self,
        username: &str,
        email: Option<&str>,
        organisation_id: i64,
    ) -> Result<PortalUser> {
        let mut state = self.state.write().await;
        if !state.organisations.contains_key(&organisation_id) {
            return Err(HubError::not_found("Organisation not found"));
        }
        if state.portal_user_by_name(username).is_none() {
            let id = state.next_id();
            state.portal_users.insert(
                id,
                PortalUser {
                    id,
                    username: username.to_string(),
                    email: None,
                    organisation_ids: Vec::new(),
                },
            );
        }
        let user = state
            .portal_user_by_name(username)
            .ok_or_else(|| HubError::Internal(anyhow::anyhow!("portal user vanished")))?;
        user.email = email.map(str::to_string);
        if !user.organisation_ids.contains(&organisation_id) {
            user.organisation_ids.push(organisation_id);
            user.organisation_ids.sort_unstable();
        }
        Ok(user.clone())
    }

    async fn remove_organisation(&self, username: &str, organisation_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.portal_user_by_name(username) {
            Some(user) => {
                let before = user.organisation_ids.len();
                user.organisation_ids.retain(|o| *o != organisation_id);
                user.organisation_ids.len() != before
            }
            None => false,
        })
    }

    async fn delete(&self, username: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.portal_users.len();
        state.portal_users.retain(|_, u| u.username != username);
        Ok(state.portal_users.len() != before)
    }
}

/// Identity provider backed by a fixed user list.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<BTreeMap<String, UserRepresentation>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRepresentation>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.username.clone(), u)).collect()),
        }
    }

    pub async fn add(&self, user: UserRepresentation) {
        self.users.write().await.insert(user.username.clone(), user);
    }
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(&needle.to_lowercase()))
}

#[async_trait]
impl IdentityProvider for MemoryDirectory {
    async fn search_users(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<UserRepresentation>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| {
                params.iter().all(|(key, value)| match key.as_str() {
                    "username" => contains_ci(Some(&u.username), value),
                    "email" => contains_ci(u.email.as_deref(), value),
                    "firstName" => contains_ci(u.first_name.as_deref(), value),
                    "lastName" => contains_ci(u.last_name.as_deref(), value),
                    "search" => {
                        contains_ci(Some(&u.username), value)
                            || contains_ci(u.email.as_deref(), value)
                            || contains_ci(u.first_name.as_deref(), value)
                            || contains_ci(u.last_name.as_deref(), value)
                    }
                    _ => true,
                })
            })
            .cloned()
            .collect())
    }

    async fn get_user(&self, username: &str) -> Result<Option<UserRepresentation>> {
        Ok(self.users.read().await.get(username).cloned())
    }
}
