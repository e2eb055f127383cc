use tracing::info;

use crate::error::HubError;
use crate::ports::{Result, Stores};
use crate::proto::BundleGroupDto;
use crate::types::{BundleGroup, BundleGroupInput};

const BUNDLE_GROUP_NOT_FOUND: &str = "Bundle group not found";

pub struct BundleGroupService {
    stores: Stores,
}

impl BundleGroupService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn get_bundle_groups(
        &self,
        organisation_id: Option<i64>,
    ) -> Result<Vec<BundleGroupDto>> {
        let groups = self.stores.bundle_groups.list(organisation_id).await?;
        let mut dtos = Vec::with_capacity(groups.len());
        for group in groups {
            dtos.push(self.to_dto(group).await?);
        }
        Ok(dtos)
    }

    pub async fn get_bundle_group(&self, id: i64) -> Result<BundleGroupDto> {
        let group = self.find(id).await?;
        self.to_dto(group).await
    }

    pub async fn create_bundle_group(&self, input: &BundleGroupInput) -> Result<BundleGroupDto> {
        self.validate(input).await?;
        let group = self.stores.bundle_groups.insert(input).await?;
        info!(bundle_group_id = group.id, name = %group.name, "bundle group created");
        self.to_dto(group).await
    }

    pub async fn update_bundle_group(
        &self,
        id: i64,
        input: &BundleGroupInput,
    ) -> Result<BundleGroupDto> {
        self.find(id).await?;
        self.validate(input).await?;
        let group = self
            .stores
            .bundle_groups
            .update(id, input)
            .await?
            .ok_or_else(|| HubError::not_found(BUNDLE_GROUP_NOT_FOUND))?;
        info!(bundle_group_id = id, "bundle group updated");
        self.to_dto(group).await
    }

    /// Deletes the group with all of its versions.
    pub async fn delete_bundle_group(&self, id: i64) -> Result<()> {
        if !self.stores.bundle_groups.delete(id).await? {
            return Err(HubError::not_found(BUNDLE_GROUP_NOT_FOUND));
        }
        info!(bundle_group_id = id, "bundle group deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<BundleGroup> {
        self.stores
            .bundle_groups
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(BUNDLE_GROUP_NOT_FOUND))
    }

    async fn validate(&self, input: &BundleGroupInput) -> Result<()> {
        if input.name.trim().is_empty() {
            return Err(HubError::InvalidInput("bundle group name is required".into()));
        }
        if let Some(id) = input.organisation_id {
            if self.stores.organisations.find(id).await?.is_none() {
                return Err(HubError::not_found("Organisation not found"));
            }
        }
        if let Some(id) = input.catalog_id {
            if self.stores.catalogs.find(id).await?.is_none() {
                return Err(HubError::not_found("Catalog not found"));
            }
        }
        for id in &input.category_ids {
            if self.stores.categories.find(*id).await?.is_none() {
                return Err(HubError::not_found(format!("Category {id} not found")));
            }
        }
        Ok(())
    }

    async fn to_dto(&self, group: BundleGroup) -> Result<BundleGroupDto> {
        let version_ids = self
            .stores
            .versions
            .list_by_group(group.id)
            .await?
            .into_iter()
            .map(|v| v.id)
            .collect();
        Ok(BundleGroupDto::new(group, version_ids))
    }
}
