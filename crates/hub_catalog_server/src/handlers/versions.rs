//! Bundle group version handlers.
//!
//! GET    /api/bundlegroupversions/filtered?page=&pageSize=&organisationId=&categoryIds=&statuses=
//! GET    /api/bundlegroupversions/versions/:bundleGroupId?page=&pageSize=&statuses=
//! GET    /api/bundlegroupversions/:id
//! POST   /api/bundlegroupversions, /api/bundlegroupversions/:id
//! DELETE /api/bundlegroupversions/:id

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use hub_catalog_core::paging::{PageRequest, PagedContent};
use hub_catalog_core::principal::{roles, Principal};
use hub_catalog_core::proto::{BundleGroupVersionRequest, BundleGroupVersionView};
use hub_catalog_core::types::VersionStatus;
use hub_catalog_core::HubServices;
use serde::Deserialize;

use super::parse_list;
use crate::error::AppError;

const WRITERS: &[&str] = &[roles::ADMIN, roles::MANAGER, roles::AUTHOR];

/// `pageSize` of 0 (the default) returns everything in one page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionListQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    pub organisation_id: Option<i64>,
    pub category_ids: Option<String>,
    pub statuses: Option<String>,
}

impl VersionListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    fn statuses(&self) -> Result<Vec<VersionStatus>, AppError> {
        Ok(parse_list(self.statuses.as_deref(), "statuses")?)
    }
}

pub async fn list_filtered(
    Extension(services): Extension<HubServices>,
    Query(query): Query<VersionListQuery>,
) -> Result<Json<PagedContent<BundleGroupVersionView>>, AppError> {
    let category_ids: Vec<i64> = parse_list(query.category_ids.as_deref(), "categoryIds")?;
    let content = services
        .versions
        .get_bundle_group_versions(
            query.page_request(),
            query.organisation_id,
            &category_ids,
            &query.statuses()?,
        )
        .await?;
    Ok(Json(content))
}

pub async fn list_for_group(
    Extension(services): Extension<HubServices>,
    Path(bundle_group_id): Path<i64>,
    Query(query): Query<VersionListQuery>,
) -> Result<Json<PagedContent<BundleGroupVersionView>>, AppError> {
    let content = services
        .versions
        .get_bundle_group_versions_of_group(
            query.page_request(),
            &query.statuses()?,
            bundle_group_id,
        )
        .await?;
    Ok(Json(content))
}

pub async fn get_version(
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<BundleGroupVersionView>, AppError> {
    Ok(Json(services.versions.get_bundle_group_version_view(id).await?))
}

pub async fn create_version(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Json(request): Json<BundleGroupVersionRequest>,
) -> Result<(StatusCode, Json<BundleGroupVersionView>), AppError> {
    principal.require_any_role(WRITERS)?;
    let (draft, children) = request.into_draft(None);
    let saved = services.versions.add_version(draft, children).await?;
    let view = services.versions.get_bundle_group_version_view(saved.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_version(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
    Json(request): Json<BundleGroupVersionRequest>,
) -> Result<Json<BundleGroupVersionView>, AppError> {
    principal.require_any_role(WRITERS)?;
    let (draft, children) = request.into_draft(Some(id));
    let saved = services.versions.update_version(id, draft, children).await?;
    Ok(Json(services.versions.get_bundle_group_version_view(saved.id).await?))
}

pub async fn delete_version(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    principal.require_any_role(&[roles::ADMIN, roles::MANAGER])?;
    services.versions.delete_bundle_group_version_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
