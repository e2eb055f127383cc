//! Bundle handlers.
//!
//! GET    /api/bundles?bundleGroupVersionId=&catalogId=
//! GET    /api/bundles/:id
//! POST   /api/bundles, /api/bundles/:id
//! DELETE /api/bundles/:id

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use hub_catalog_core::principal::{roles, Principal};
use hub_catalog_core::proto::BundleDto;
use hub_catalog_core::types::BundleInput;
use hub_catalog_core::HubServices;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleQuery {
    pub bundle_group_version_id: Option<i64>,
    pub catalog_id: Option<i64>,
}

pub async fn list_bundles(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Query(query): Query<BundleQuery>,
) -> Result<Json<Vec<BundleDto>>, AppError> {
    tracing::debug!(
        username = %principal.username,
        version = ?query.bundle_group_version_id,
        catalog = ?query.catalog_id,
        "list bundles"
    );
    let bundles = services
        .bundles
        .get_bundles(&principal, query.bundle_group_version_id, query.catalog_id)
        .await?;
    Ok(Json(bundles.into_iter().map(BundleDto::from).collect()))
}

pub async fn get_bundle(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<BundleDto>, AppError> {
    let bundle = services.bundles.get_visible_bundle(&principal, id).await?;
    Ok(Json(bundle.into()))
}

pub async fn create_bundle(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Json(input): Json<BundleInput>,
) -> Result<(StatusCode, Json<BundleDto>), AppError> {
    principal.require_any_role(&[roles::ADMIN, roles::MANAGER, roles::AUTHOR])?;
    let bundle = services.bundles.save_bundle(None, &input).await?;
    Ok((StatusCode::CREATED, Json(bundle.into())))
}

pub async fn update_bundle(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
    Json(input): Json<BundleInput>,
) -> Result<Json<BundleDto>, AppError> {
    principal.require_any_role(&[roles::ADMIN, roles::MANAGER, roles::AUTHOR])?;
    let bundle = services.bundles.save_bundle(Some(id), &input).await?;
    Ok(Json(bundle.into()))
}

pub async fn delete_bundle(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<BundleDto>, AppError> {
    principal.require_any_role(&[roles::ADMIN, roles::MANAGER])?;
    Ok(Json(services.bundles.delete_bundle(id).await?.into()))
}
