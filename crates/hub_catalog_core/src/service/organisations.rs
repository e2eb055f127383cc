use std::sync::Arc;

use tracing::info;

use crate::error::HubError;
use crate::ports::{OrganisationStore, Result, Stores};
use crate::types::{Organisation, OrganisationInput};

const ORGANISATION_NOT_FOUND: &str = "Organisation not found";

pub struct OrganisationService {
    organisations: Arc<dyn OrganisationStore>,
}

impl OrganisationService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            organisations: stores.organisations.clone(),
        }
    }

    pub async fn get_organisations(&self) -> Result<Vec<Organisation>> {
        self.organisations.list_sorted_by_name().await
    }

    pub async fn get_organisation(&self, id: i64) -> Result<Organisation> {
        self.organisations
            .find(id)
            .await?
            .ok_or_else(|| HubError::not_found(ORGANISATION_NOT_FOUND))
    }

    pub async fn create_organisation(&self, input: &OrganisationInput) -> Result<Organisation> {
        validate(input)?;
        let organisation = self
            .organisations
            .save(None, input)
            .await?
            .ok_or_else(|| HubError::not_found(ORGANISATION_NOT_FOUND))?;
        info!(organisation_id = organisation.id, name = %organisation.name, "organisation created");
        Ok(organisation)
    }

    pub async fn update_organisation(
        &self,
        id: i64,
        input: &OrganisationInput,
    ) -> Result<Organisation> {
        validate(input)?;
        let organisation = self
            .organisations
            .save(Some(id), input)
            .await?
            .ok_or_else(|| HubError::not_found(ORGANISATION_NOT_FOUND))?;
        info!(organisation_id = id, "organisation updated");
        Ok(organisation)
    }

    pub async fn delete_organisation(&self, id: i64) -> Result<()> {
        if !self.organisations.delete(id).await? {
            return Err(HubError::not_found(ORGANISATION_NOT_FOUND));
        }
        info!(organisation_id = id, "organisation deleted");
        Ok(())
    }
}

fn validate(input: &OrganisationInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(HubError::InvalidInput("organisation name is required".into()));
    }
    Ok(())
}
