//! Portal user handlers. Mutations answer `{ "result": bool }`.
//!
//! GET    /api/users?organisationId=
//! POST   /api/users/:organisationId               body `{ "username": ... }`
//! DELETE /api/users/:organisationId/user/:username
//! DELETE /api/users/:username

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use hub_catalog_core::error::HubError;
use hub_catalog_core::principal::{roles, Principal};
use hub_catalog_core::proto::{RestUserRepresentation, ResultResponse, UserOrganisationRequest};
use hub_catalog_core::HubServices;
use serde::Deserialize;

use crate::error::AppError;

const USER_ADMINS: &[&str] = &[roles::ADMIN, roles::MANAGER];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    pub organisation_id: Option<i64>,
}

fn organisation_id(raw: &str) -> Result<i64, HubError> {
    raw.parse()
        .map_err(|_| HubError::InvalidInput(format!("invalid organisationId: {raw}")))
}

pub async fn list_users(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<RestUserRepresentation>>, AppError> {
    principal.require_any_role(USER_ADMINS)?;
    let users = services
        .users
        .get_users_by_organisation(query.organisation_id)
        .await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// `POST /api/users/:organisationId`; the segment is an organisation id.
pub async fn add_user_to_organisation(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(key): Path<String>,
    Json(request): Json<UserOrganisationRequest>,
) -> Result<Json<ResultResponse>, AppError> {
    principal.require_any_role(USER_ADMINS)?;
    let organisation_id = organisation_id(&key)?;
    tracing::debug!(username = %request.username, organisation_id, "add user to organisation");
    let result = services
        .users
        .add_user_to_organisation(&request.username, organisation_id)
        .await?;
    Ok(Json(ResultResponse { result }))
}

/// `DELETE /api/users/:username`; the segment is a username.
pub async fn delete_user(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(key): Path<String>,
) -> Result<Json<ResultResponse>, AppError> {
    principal.require_admin()?;
    let result = services.users.remove_user(&key).await?;
    Ok(Json(ResultResponse { result }))
}

pub async fn remove_user_from_organisation(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path((organisation, username)): Path<(String, String)>,
) -> Result<Json<ResultResponse>, AppError> {
    principal.require_any_role(USER_ADMINS)?;
    let result = services
        .users
        .remove_user_from_organisation(&username, organisation_id(&organisation)?)
        .await?;
    Ok(Json(ResultResponse { result }))
}
