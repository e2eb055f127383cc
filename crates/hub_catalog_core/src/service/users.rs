use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::HubError;
use crate::ports::{IdentityProvider, OrganisationStore, PortalUserStore, Result, Stores};
use crate::types::UserRepresentation;

/// Organisation membership of identity-provider users.
pub struct PortalUserService {
    portal_users: Arc<dyn PortalUserStore>,
    organisations: Arc<dyn OrganisationStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl PortalUserService {
    pub fn new(stores: &Stores, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            portal_users: stores.portal_users.clone(),
            organisations: stores.organisations.clone(),
            identity,
        }
    }

    pub async fn search_users(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<UserRepresentation>> {
        self.identity.search_users(params).await
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<UserRepresentation>> {
        self.identity.get_user(username).await
    }

    /// Members of `organisation_id` (every portal user when `None`) as the
    /// identity provider knows them.
    pub async fn get_users_by_organisation(
        &self,
        organisation_id: Option<i64>,
    ) -> Result<Vec<UserRepresentation>> {
        let portal_users = match organisation_id {
            Some(id) => {
                self.organisations
                    .find(id)
                    .await?
                    .ok_or_else(|| HubError::not_found("Organisation not found"))?;
                self.portal_users.list_by_organisation(id).await?
            }
            None => self.portal_users.list_all().await?,
        };

        let mut users = Vec::with_capacity(portal_users.len());
        for portal_user in portal_users {
            match self.identity.get_user(&portal_user.username).await? {
                Some(user) => users.push(user),
                None => warn!(
                    username = %portal_user.username,
                    "portal user unknown to identity provider"
                ),
            }
        }
        Ok(users)
    }

    /// Returns false when the identity provider does not know `username`.
    pub async fn add_user_to_organisation(
        &self,
        username: &str,
        organisation_id: i64,
    ) -> Result<bool> {
        self.organisations
            .find(organisation_id)
            .await?
            .ok_or_else(|| HubError::not_found("Organisation not found"))?;
        let Some(user) = self.identity.get_user(username).await? else {
            warn!(username, "cannot add unknown user to organisation");
            return Ok(false);
        };
        self.portal_users
            .upsert_with_organisation(username, user.email.as_deref(), organisation_id)
            .await?;
        info!(username, organisation_id, "user added to organisation");
        Ok(true)
    }

    pub async fn remove_user_from_organisation(
        &self,
        username: &str,
        organisation_id: i64,
    ) -> Result<bool> {
        let removed = self
            .portal_users
            .remove_organisation(username, organisation_id)
            .await?;
        if removed {
            info!(username, organisation_id, "user removed from organisation");
        }
        Ok(removed)
    }

    pub async fn remove_user(&self, username: &str) -> Result<bool> {
        let removed = self.portal_users.delete(username).await?;
        if removed {
            info!(username, "portal user removed");
        }
        Ok(removed)
    }
}
