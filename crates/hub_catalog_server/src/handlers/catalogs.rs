//! Catalog handlers.
//!
//! Non-admin callers only see the catalogs of their own organisations.
//!
//! GET    /api/catalogs, /api/catalogs/:id
//! POST   /api/catalogs?organisationId=
//! DELETE /api/catalogs/:id

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use hub_catalog_core::principal::Principal;
use hub_catalog_core::proto::CatalogDto;
use hub_catalog_core::HubServices;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogQuery {
    pub organisation_id: i64,
}

pub async fn list_catalogs(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
) -> Result<Json<Vec<CatalogDto>>, AppError> {
    principal.require_authenticated()?;
    let catalogs = services
        .catalogs
        .get_catalogs(&principal.username, principal.is_admin())
        .await?;
    Ok(Json(catalogs.into_iter().map(CatalogDto::from).collect()))
}

pub async fn get_catalog(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogDto>, AppError> {
    principal.require_authenticated()?;
    let catalog = services
        .catalogs
        .get_catalog_by_id(&principal.username, id, principal.is_admin())
        .await?;
    Ok(Json(catalog.into()))
}

pub async fn create_catalog(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Query(query): Query<CreateCatalogQuery>,
) -> Result<(StatusCode, Json<CatalogDto>), AppError> {
    principal.require_admin()?;
    let catalog = services.catalogs.create_catalog(query.organisation_id).await?;
    Ok((StatusCode::CREATED, Json(catalog.into())))
}

pub async fn delete_catalog(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogDto>, AppError> {
    principal.require_admin()?;
    let catalog = services.catalogs.delete_catalog(id).await?;
    Ok(Json(catalog.into()))
}
