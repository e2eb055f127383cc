//! Request and response shapes shared by the services and the HTTP layer.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Bundle, BundleGroup, BundleGroupVersion, Catalog, DescriptorVersion, UserRepresentation,
    VersionDraft, VersionStatus,
};

// ── Catalogs ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDto {
    pub id: i64,
    pub name: String,
    pub organisation_id: i64,
}

impl From<Catalog> for CatalogDto {
    fn from(catalog: Catalog) -> Self {
        Self {
            id: catalog.id,
            name: catalog.name,
            organisation_id: catalog.organisation_id,
        }
    }
}

// ── Bundle group versions ─────────────────────────────────────

/// A bundle group version enriched with its group, organisation and bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGroupVersionView {
    pub bundle_group_version_id: i64,
    pub bundle_group_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub description_image: Option<String>,
    pub documentation_url: Option<String>,
    pub version: String,
    pub status: VersionStatus,
    pub organisation_id: Option<i64>,
    pub organisation_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub categories: Vec<String>,
    pub children: Vec<String>,
    pub all_versions: Vec<String>,
    pub is_editable: bool,
    pub can_add_new_version: bool,
    pub bundle_group_url: String,
}

/// Body of `POST /api/bundlegroupversions[/:id]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGroupVersionRequest {
    pub bundle_group_id: i64,
    pub version: String,
    #[serde(default = "default_status")]
    pub status: VersionStatus,
    pub description: Option<String>,
    pub description_image: Option<String>,
    pub documentation_url: Option<String>,
    /// Bundle ids; when present the version's bundle links are replaced.
    pub children: Option<Vec<i64>>,
}

fn default_status() -> VersionStatus {
    VersionStatus::NotPublished
}

impl BundleGroupVersionRequest {
    pub fn into_draft(self, id: Option<i64>) -> (VersionDraft, Option<Vec<i64>>) {
        let draft = VersionDraft {
            id,
            bundle_group_id: self.bundle_group_id,
            version: self.version,
            status: self.status,
            description: self.description,
            description_image: self.description_image,
            documentation_url: self.documentation_url,
            created_at: None,
        };
        (draft, self.children)
    }
}

// ── Bundle groups ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGroupDto {
    pub bundle_group_id: i64,
    pub name: String,
    pub organisation_id: Option<i64>,
    pub catalog_id: Option<i64>,
    pub public_catalog: bool,
    pub categories: Vec<String>,
    pub version_ids: Vec<i64>,
}

impl BundleGroupDto {
    pub fn new(group: BundleGroup, version_ids: Vec<i64>) -> Self {
        Self {
            bundle_group_id: group.id,
            name: group.name,
            organisation_id: group.organisation_id,
            catalog_id: group.catalog_id,
            public_catalog: group.public_catalog,
            categories: group.category_ids.iter().map(i64::to_string).collect(),
            version_ids,
        }
    }
}

// ── Bundles ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDto {
    pub bundle_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub git_repo_address: Option<String>,
    pub git_src_repo_address: Option<String>,
    pub dependencies: Vec<String>,
    pub descriptor_version: DescriptorVersion,
    pub bundle_group_versions: Vec<String>,
}

impl From<Bundle> for BundleDto {
    fn from(bundle: Bundle) -> Self {
        Self {
            bundle_id: bundle.id,
            name: bundle.name,
            description: bundle.description,
            git_repo_address: bundle.git_repo_address,
            git_src_repo_address: bundle.git_src_repo_address,
            dependencies: bundle.dependencies,
            descriptor_version: bundle.descriptor_version,
            bundle_group_versions: bundle
                .bundle_group_version_ids
                .iter()
                .map(i64::to_string)
                .collect(),
        }
    }
}

// ── Users ─────────────────────────────────────────────────────

/// Identity-provider user as returned to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestUserRepresentation {
    pub id: String,
    pub created: Option<DateTime<Utc>>,
    pub username: String,
    pub enabled: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl From<UserRepresentation> for RestUserRepresentation {
    fn from(user: UserRepresentation) -> Self {
        Self {
            id: user.id,
            created: Utc.timestamp_millis_opt(user.created_timestamp).single(),
            username: user.username,
            enabled: user.enabled,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOrganisationRequest {
    pub username: String,
}

/// `{ "result": bool }` answer of user-management mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultResponse {
    pub result: bool,
}
