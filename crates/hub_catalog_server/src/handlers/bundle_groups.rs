//! Bundle group handlers.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use hub_catalog_core::principal::{roles, Principal};
use hub_catalog_core::proto::BundleGroupDto;
use hub_catalog_core::types::BundleGroupInput;
use hub_catalog_core::HubServices;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGroupQuery {
    pub organisation_id: Option<i64>,
}

pub async fn list_bundle_groups(
    Extension(services): Extension<HubServices>,
    Query(query): Query<BundleGroupQuery>,
) -> Result<Json<Vec<BundleGroupDto>>, AppError> {
    Ok(Json(
        services
            .bundle_groups
            .get_bundle_groups(query.organisation_id)
            .await?,
    ))
}

pub async fn get_bundle_group(
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<BundleGroupDto>, AppError> {
    Ok(Json(services.bundle_groups.get_bundle_group(id).await?))
}

pub async fn create_bundle_group(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Json(input): Json<BundleGroupInput>,
) -> Result<(StatusCode, Json<BundleGroupDto>), AppError> {
    principal.require_any_role(&[roles::ADMIN, roles::MANAGER, roles::AUTHOR])?;
    let group = services.bundle_groups.create_bundle_group(&input).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_bundle_group(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
    Json(input): Json<BundleGroupInput>,
) -> Result<Json<BundleGroupDto>, AppError> {
    principal.require_any_role(&[roles::ADMIN, roles::MANAGER, roles::AUTHOR])?;
    Ok(Json(
        services.bundle_groups.update_bundle_group(id, &input).await?,
    ))
}

pub async fn delete_bundle_group(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    principal.require_any_role(&[roles::ADMIN, roles::MANAGER])?;
    services.bundle_groups.delete_bundle_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
