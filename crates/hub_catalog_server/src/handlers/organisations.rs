use axum::{extract::Path, http::StatusCode, Extension, Json};
use hub_catalog_core::principal::Principal;
use hub_catalog_core::types::{Organisation, OrganisationInput};
use hub_catalog_core::HubServices;

use crate::error::AppError;

pub async fn list_organisations(
    Extension(services): Extension<HubServices>,
) -> Result<Json<Vec<Organisation>>, AppError> {
    Ok(Json(services.organisations.get_organisations().await?))
}

pub async fn get_organisation(
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<Organisation>, AppError> {
    Ok(Json(services.organisations.get_organisation(id).await?))
}

pub async fn create_organisation(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Json(input): Json<OrganisationInput>,
) -> Result<(StatusCode, Json<Organisation>), AppError> {
    principal.require_admin()?;
    let organisation = services.organisations.create_organisation(&input).await?;
    Ok((StatusCode::CREATED, Json(organisation)))
}

pub async fn update_organisation(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
    Json(input): Json<OrganisationInput>,
) -> Result<Json<Organisation>, AppError> {
    principal.require_admin()?;
    Ok(Json(
        services.organisations.update_organisation(id, &input).await?,
    ))
}

pub async fn delete_organisation(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    principal.require_admin()?;
    services.organisations.delete_organisation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
