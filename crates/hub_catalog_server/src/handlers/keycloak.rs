//! Pass-through lookups against the identity provider (admin only).

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use hub_catalog_core::error::HubError;
use hub_catalog_core::principal::Principal;
use hub_catalog_core::proto::RestUserRepresentation;
use hub_catalog_core::HubServices;

use crate::error::AppError;

/// Every query parameter is forwarded as a Keycloak search parameter.
pub async fn search_users(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<RestUserRepresentation>>, AppError> {
    principal.require_admin()?;
    let users = services.users.search_users(&params).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn get_user(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(username): Path<String>,
) -> Result<Json<RestUserRepresentation>, AppError> {
    principal.require_admin()?;
    let user = services
        .users
        .get_user(&username)
        .await?
        .ok_or_else(|| HubError::not_found(format!("User {username} not found")))?;
    Ok(Json(user.into()))
}
