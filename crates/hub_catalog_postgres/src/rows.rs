//! Row types decoded by `sqlx::query_as` and their conversions to core types.

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use hub_catalog_core::error::HubError;
use hub_catalog_core::types::*;

/// Map a sqlx failure onto the domain error.
///
/// Unique violations become `Conflict`, foreign key violations `NotFound`.
pub(crate) fn db_error(e: sqlx::Error) -> HubError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some("23505") => return HubError::Conflict(db.message().to_string()),
            Some("23503") => {
                return HubError::NotFound(format!("referenced record not found: {}", db.message()))
            }
            _ => {}
        }
    }
    HubError::Internal(anyhow!(e))
}

#[derive(Debug, FromRow)]
pub(crate) struct OrganisationRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl From<OrganisationRow> for Organisation {
    fn from(r: OrganisationRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CatalogRow {
    pub id: i64,
    pub name: String,
    pub organisation_id: i64,
}

impl From<CatalogRow> for Catalog {
    fn from(r: CatalogRow) -> Self {
        Self {
            id: r.id,
            organisation_id: r.organisation_id,
            name: r.name,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct BundleGroupRow {
    pub id: i64,
    pub name: String,
    pub organisation_id: Option<i64>,
    pub catalog_id: Option<i64>,
    pub public_catalog: bool,
    pub category_ids: Vec<i64>,
}

impl From<BundleGroupRow> for BundleGroup {
    fn from(r: BundleGroupRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            organisation_id: r.organisation_id,
            catalog_id: r.catalog_id,
            public_catalog: r.public_catalog,
            category_ids: r.category_ids,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct VersionRow {
    pub id: i64,
    pub bundle_group_id: i64,
    pub version: String,
    pub status: String,
    pub description: Option<String>,
    pub description_image: Option<String>,
    pub documentation_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl TryFrom<VersionRow> for BundleGroupVersion {
    type Error = HubError;

    fn try_from(r: VersionRow) -> Result<Self, Self::Error> {
        let status = VersionStatus::from_str(&r.status)
            .map_err(|_| HubError::Internal(anyhow!("unknown version status {:?}", r.status)))?;
        Ok(Self {
            id: r.id,
            bundle_group_id: r.bundle_group_id,
            version: r.version,
            status,
            description: r.description,
            description_image: r.description_image,
            documentation_url: r.documentation_url,
            created_at: r.created_at,
            last_updated: r.last_updated,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct BundleRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub git_repo_address: Option<String>,
    pub git_src_repo_address: Option<String>,
    pub dependencies: Vec<String>,
    pub descriptor_version: String,
    pub bundle_group_version_ids: Vec<i64>,
}

impl TryFrom<BundleRow> for Bundle {
    type Error = HubError;

    fn try_from(r: BundleRow) -> Result<Self, Self::Error> {
        let descriptor_version = DescriptorVersion::from_str(&r.descriptor_version).map_err(|_| {
            HubError::Internal(anyhow!(
                "unknown descriptor version {:?}",
                r.descriptor_version
            ))
        })?;
        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            git_repo_address: r.git_repo_address,
            git_src_repo_address: r.git_src_repo_address,
            dependencies: r.dependencies,
            descriptor_version,
            bundle_group_version_ids: r.bundle_group_version_ids,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PortalUserRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub organisation_ids: Vec<i64>,
}

impl From<PortalUserRow> for PortalUser {
    fn from(r: PortalUserRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
            organisation_ids: r.organisation_ids,
        }
    }
}

/// Convert every row, failing on the first bad one.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, HubError>
where
    T: TryFrom<R, Error = HubError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version_row(status: &str) -> VersionRow {
        VersionRow {
            id: 1,
            bundle_group_id: 2,
            version: "1.0".into(),
            status: status.into(),
            description: None,
            description_image: None,
            documentation_url: None,
            created_at: Utc::now(),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn version_row_parses_status() {
        let v = BundleGroupVersion::try_from(version_row("NOT_PUBLISHED")).unwrap();
        assert_eq!(v.status, VersionStatus::NotPublished);
    }

    #[test]
    fn version_row_rejects_unknown_status() {
        let err = BundleGroupVersion::try_from(version_row("DRAFT")).unwrap_err();
        assert!(matches!(err, HubError::Internal(_)));
    }

    #[test]
    fn non_database_errors_are_internal() {
        assert!(matches!(db_error(sqlx::Error::RowNotFound), HubError::Internal(_)));
    }
}
