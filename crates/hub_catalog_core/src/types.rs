//! Domain records as stored and returned by the store ports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organisation {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationInput {
    pub name: String,
    pub description: Option<String>,
    /// Bundle groups to re-assign to this organisation.
    #[serde(default)]
    pub bundle_groups: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub id: i64,
    pub organisation_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGroup {
    pub id: i64,
    pub name: String,
    pub organisation_id: Option<i64>,
    pub catalog_id: Option<i64>,
    /// Visible outside the owning organisation's catalog.
    pub public_catalog: bool,
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGroupInput {
    pub name: String,
    pub organisation_id: Option<i64>,
    pub catalog_id: Option<i64>,
    #[serde(default = "default_public")]
    pub public_catalog: bool,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

fn default_public() -> bool {
    true
}

/// Lifecycle stage of a bundle group version.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    NotPublished,
    Published,
    Archive,
}

impl VersionStatus {
    /// Statuses that count as an open version of a bundle group.
    pub const OPEN: [VersionStatus; 2] = [VersionStatus::NotPublished, VersionStatus::Published];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleGroupVersion {
    pub id: i64,
    pub bundle_group_id: i64,
    pub version: String,
    pub status: VersionStatus,
    pub description: Option<String>,
    pub description_image: Option<String>,
    pub documentation_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Version fields supplied by a caller; `id` is set when updating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDraft {
    pub id: Option<i64>,
    pub bundle_group_id: i64,
    pub version: String,
    pub status: VersionStatus,
    pub description: Option<String>,
    pub description_image: Option<String>,
    pub documentation_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One atomic version write, serialised per bundle group.
///
/// Inside the write the store rejects a label already used by another version
/// of the group, archives the group's other PUBLISHED versions when the draft
/// is published, upserts the draft and optionally relinks bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionWrite {
    pub draft: VersionDraft,
    pub last_updated: DateTime<Utc>,
    /// A new version of an existing group: refused when the group already has
    /// more than one open version.
    pub new_version: bool,
    /// When present, the version's bundle links are replaced by these bundle ids.
    pub children: Option<Vec<i64>>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DescriptorVersion {
    #[default]
    V1,
    V5,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub git_repo_address: Option<String>,
    pub git_src_repo_address: Option<String>,
    pub dependencies: Vec<String>,
    pub descriptor_version: DescriptorVersion,
    pub bundle_group_version_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInput {
    pub name: String,
    pub description: Option<String>,
    pub git_repo_address: Option<String>,
    pub git_src_repo_address: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub descriptor_version: DescriptorVersion,
    #[serde(default)]
    pub bundle_group_version_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub organisation_ids: Vec<i64>,
}

/// A user as known to the identity provider (Keycloak admin API shape).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    pub id: String,
    #[serde(default)]
    pub created_timestamp: i64,
    pub username: String,
    #[serde(default)]
    pub enabled: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}
