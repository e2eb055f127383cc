use std::sync::Arc;

use tracing::info;

use crate::error::HubError;
use crate::ports::{CatalogStore, OrganisationStore, Result, Stores};
use crate::types::Catalog;

const CATALOG_NOT_FOUND: &str = "Catalog not found";

pub struct CatalogService {
    catalogs: Arc<dyn CatalogStore>,
    organisations: Arc<dyn OrganisationStore>,
}

impl CatalogService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            catalogs: stores.catalogs.clone(),
            organisations: stores.organisations.clone(),
        }
    }

    /// Admins see every catalog, anyone else only the catalogs of their organisations.
    pub async fn get_catalogs(&self, username: &str, is_admin: bool) -> Result<Vec<Catalog>> {
        if is_admin {
            self.catalogs.list_all().await
        } else {
            self.catalogs.list_for_username(username).await
        }
    }

    pub async fn get_catalog_by_id(
        &self,
        username: &str,
        id: i64,
        is_admin: bool,
    ) -> Result<Catalog> {
        let catalog = if is_admin {
            self.catalogs.find(id).await?
        } else {
            self.catalogs
                .list_for_username(username)
                .await?
                .into_iter()
                .find(|c| c.id == id)
        };
        catalog.ok_or_else(|| HubError::not_found(CATALOG_NOT_FOUND))
    }

    pub async fn create_catalog(&self, organisation_id: i64) -> Result<Catalog> {
        let organisation = self
            .organisations
            .find(organisation_id)
            .await?
            .ok_or_else(|| HubError::not_found("Organisation not found"))?;
        if self.catalogs.exists_for_organisation(organisation_id).await? {
            return Err(HubError::conflict("Catalog already exists"));
        }
        let catalog = self
            .catalogs
            .insert(
                organisation_id,
                &format!("{} private catalog", organisation.name),
            )
            .await?;
        info!(catalog_id = catalog.id, organisation_id, "catalog created");
        Ok(catalog)
    }

    pub async fn delete_catalog(&self, id: i64) -> Result<Catalog> {
        let catalog = self
            .catalogs
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(CATALOG_NOT_FOUND))?;
        self.catalogs.delete(id).await?;
        info!(catalog_id = id, "catalog deleted");
        Ok(catalog)
    }
}
