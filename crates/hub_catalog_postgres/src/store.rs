//! Postgres implementations of all hub_catalog_core store ports.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query_as, not sqlx::query!) so building needs no live database.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use hub_catalog_core::error::HubError;
use hub_catalog_core::paging::{Page, PageRequest};
use hub_catalog_core::ports::*;
use hub_catalog_core::types::*;

use crate::rows::*;

fn distinct(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn status_names(statuses: &[VersionStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_ref().to_string()).collect()
}

// ── PgOrganisationStore ───────────────────────────────────────

pub struct PgOrganisationStore {
    pool: PgPool,
}

impl PgOrganisationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganisationStore for PgOrganisationStore {
    async fn list_sorted_by_name(&self) -> Result<Vec<Organisation>> {
        let rows = sqlx::query_as::<_, OrganisationRow>(
            "SELECT id, name, description FROM organisation ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Organisation>> {
        let row = sqlx::query_as::<_, OrganisationRow>(
            "SELECT id, name, description FROM organisation WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn save(
        &self,
        id: Option<i64>,
        input: &OrganisationInput,
    ) -> Result<Option<Organisation>> {
        let group_ids = distinct(input.bundle_groups.as_deref().unwrap_or_default());
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        if !group_ids.is_empty() {
            let found: Vec<i64> = sqlx::query_scalar(
                "SELECT id FROM bundle_group WHERE id = ANY($1) FOR UPDATE",
            )
            .bind(&group_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error)?;
            if let Some(missing) = group_ids.iter().find(|id| !found.contains(*id)) {
                return Err(HubError::not_found(format!("Bundle group {missing} not found")));
            }
        }

        let row = match id {
            Some(id) => sqlx::query_as::<_, OrganisationRow>(
                r#"
                UPDATE organisation SET name = $2, description = $3
                WHERE id = $1
                RETURNING id, name, description
                "#,
            )
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?,
            None => Some(
                sqlx::query_as::<_, OrganisationRow>(
                    r#"
                    INSERT INTO organisation (name, description)
                    VALUES ($1, $2)
                    RETURNING id, name, description
                    "#,
                )
                .bind(&input.name)
                .bind(&input.description)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?,
            ),
        };
        let Some(row) = row else {
            return Ok(None);
        };

        if !group_ids.is_empty() {
            sqlx::query("UPDATE bundle_group SET organisation_id = $1 WHERE id = ANY($2)")
                .bind(row.id)
                .bind(&group_ids)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;
        Ok(Some(row.into()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM organisation WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgCatalogStore ────────────────────────────────────────────

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_all(&self) -> Result<Vec<Catalog>> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            "SELECT id, name, organisation_id FROM catalog ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_username(&self, username: &str) -> Result<Vec<Catalog>> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            r#"
            SELECT DISTINCT c.id, c.name, c.organisation_id
            FROM catalog c
            JOIN portal_user_organisation puo ON puo.organisation_id = c.organisation_id
            JOIN portal_user u ON u.id = puo.portal_user_id
            WHERE u.username = $1
            ORDER BY c.id
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Catalog>> {
        let row = sqlx::query_as::<_, CatalogRow>(
            "SELECT id, name, organisation_id FROM catalog WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn exists_for_organisation(&self, organisation_id: i64) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM catalog WHERE organisation_id = $1)",
        )
        .bind(organisation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn insert(&self, organisation_id: i64, name: &str) -> Result<Catalog> {
        let row = sqlx::query_as::<_, CatalogRow>(
            r#"
            INSERT INTO catalog (name, organisation_id)
            VALUES ($1, $2)
            RETURNING id, name, organisation_id
            "#,
        )
        .bind(name)
        .bind(organisation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error(e) {
            HubError::Conflict(_) => HubError::conflict("Catalog already exists"),
            HubError::NotFound(_) => HubError::not_found("Organisation not found"),
            other => other,
        })?;
        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM catalog WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgCategoryStore ───────────────────────────────────────────

pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description FROM category ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description FROM category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn insert(&self, input: &CategoryInput) -> Result<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO category (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            UPDATE category SET name = $2, description = $3
            WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // bundle_group_category rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgBundleGroupStore ────────────────────────────────────────

const BUNDLE_GROUP_SELECT: &str = r#"
    SELECT g.id, g.name, g.organisation_id, g.catalog_id, g.public_catalog,
           ARRAY(SELECT c.category_id FROM bundle_group_category c
                 WHERE c.bundle_group_id = g.id ORDER BY c.category_id) AS category_ids
    FROM bundle_group g
"#;

async fn fetch_bundle_group<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<BundleGroup>> {
    let sql = format!("{BUNDLE_GROUP_SELECT} WHERE g.id = $1");
    let row = sqlx::query_as::<_, BundleGroupRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(db_error)?;
    Ok(row.map(Into::into))
}

pub struct PgBundleGroupStore {
    pool: PgPool,
}

impl PgBundleGroupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BundleGroupStore for PgBundleGroupStore {
    async fn list(&self, organisation_id: Option<i64>) -> Result<Vec<BundleGroup>> {
        let sql = format!(
            "{BUNDLE_GROUP_SELECT} \
             WHERE ($1::BIGINT IS NULL OR g.organisation_id = $1) ORDER BY g.id"
        );
        let rows = sqlx::query_as::<_, BundleGroupRow>(&sql)
            .bind(organisation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<BundleGroup>> {
        fetch_bundle_group(&self.pool, id).await
    }

    async fn find_by_organisation_and_categories(
        &self,
        organisation_id: Option<i64>,
        category_ids: &[i64],
    ) -> Result<Vec<BundleGroup>> {
        let sql = format!(
            r#"{BUNDLE_GROUP_SELECT}
            WHERE ($1::BIGINT IS NULL OR g.organisation_id = $1)
              AND (cardinality($2::BIGINT[]) = 0 OR EXISTS (
                    SELECT 1 FROM bundle_group_category c
                    WHERE c.bundle_group_id = g.id AND c.category_id = ANY($2)))
            ORDER BY g.id"#
        );
        let rows = sqlx::query_as::<_, BundleGroupRow>(&sql)
            .bind(organisation_id)
            .bind(category_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, input: &BundleGroupInput) -> Result<BundleGroup> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO bundle_group (name, organisation_id, catalog_id, public_catalog)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(input.organisation_id)
        .bind(input.catalog_id)
        .bind(input.public_catalog)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query(
            "INSERT INTO bundle_group_category (bundle_group_id, category_id) \
             SELECT $1, unnest($2::BIGINT[])",
        )
        .bind(id)
        .bind(distinct(&input.category_ids))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let group = fetch_bundle_group(&mut *tx, id)
            .await?
            .ok_or_else(|| HubError::Internal(anyhow::anyhow!("bundle group {id} vanished")))?;
        tx.commit().await.map_err(db_error)?;
        Ok(group)
    }

    async fn update(&self, id: i64, input: &BundleGroupInput) -> Result<Option<BundleGroup>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let updated = sqlx::query(
            r#"
            UPDATE bundle_group
            SET name = $2, organisation_id = $3, catalog_id = $4, public_catalog = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.organisation_id)
        .bind(input.catalog_id)
        .bind(input.public_catalog)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM bundle_group_category WHERE bundle_group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query(
            "INSERT INTO bundle_group_category (bundle_group_id, category_id) \
             SELECT $1, unnest($2::BIGINT[])",
        )
        .bind(id)
        .bind(distinct(&input.category_ids))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let group = fetch_bundle_group(&mut *tx, id).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(group)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // versions and their bundle links cascade
        let result = sqlx::query("DELETE FROM bundle_group WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgBundleGroupVersionStore ─────────────────────────────────

const VERSION_COLUMNS: &str = "id, bundle_group_id, version, status, description, \
     description_image, documentation_url, created_at, last_updated";

pub struct PgBundleGroupVersionStore {
    pool: PgPool,
}

impl PgBundleGroupVersionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        clause: &str,
        group_id: i64,
        arg: &str,
    ) -> Result<Vec<BundleGroupVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM bundle_group_version \
             WHERE bundle_group_id = $1 AND {clause} = $2 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, VersionRow>(&sql)
            .bind(group_id)
            .bind(arg)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }
}

#[async_trait]
impl BundleGroupVersionStore for PgBundleGroupVersionStore {
    async fn find(&self, id: i64) -> Result<Option<BundleGroupVersion>> {
        let sql = format!("SELECT {VERSION_COLUMNS} FROM bundle_group_version WHERE id = $1");
        let row = sqlx::query_as::<_, VersionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_groups_and_statuses(
        &self,
        bundle_group_ids: &[i64],
        statuses: &[VersionStatus],
        page: PageRequest,
    ) -> Result<Page<BundleGroupVersion>> {
        let statuses = status_names(statuses);
        let total: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM bundle_group_version \
             WHERE bundle_group_id = ANY($1) AND status = ANY($2)",
        )
        .bind(bundle_group_ids)
        .bind(&statuses)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        // LIMIT NULL means no limit
        let limit = (!page.is_unpaged()).then(|| i64::from(page.page_size));
        let offset = if page.is_unpaged() { 0 } else { page.offset() as i64 };
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM bundle_group_version \
             WHERE bundle_group_id = ANY($1) AND status = ANY($2) \
             ORDER BY last_updated DESC, id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, VersionRow>(&sql)
            .bind(bundle_group_ids)
            .bind(&statuses)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(Page {
            items: convert_all(rows)?,
            request: page,
            total_items: total.max(0) as u64,
        })
    }

    async fn find_by_group_and_status(
        &self,
        bundle_group_id: i64,
        status: VersionStatus,
    ) -> Result<Vec<BundleGroupVersion>> {
        self.fetch_where("status", bundle_group_id, status.as_ref()).await
    }

    async fn find_by_group_and_version(
        &self,
        bundle_group_id: i64,
        version: &str,
    ) -> Result<Vec<BundleGroupVersion>> {
        self.fetch_where("version", bundle_group_id, version).await
    }

    async fn list_by_group(&self, bundle_group_id: i64) -> Result<Vec<BundleGroupVersion>> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM bundle_group_version \
             WHERE bundle_group_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, VersionRow>(&sql)
            .bind(bundle_group_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }

    async fn count_by_group(&self, bundle_group_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT count(*) FROM bundle_group_version WHERE bundle_group_id = $1")
            .bind(bundle_group_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn count_by_group_and_statuses(
        &self,
        bundle_group_id: i64,
        statuses: &[VersionStatus],
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT count(*) FROM bundle_group_version \
             WHERE bundle_group_id = $1 AND status = ANY($2)",
        )
        .bind(bundle_group_id)
        .bind(status_names(statuses))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn apply(&self, write: VersionWrite) -> Result<BundleGroupVersion> {
        let VersionWrite {
            draft,
            last_updated,
            new_version,
            children,
        } = write;
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // writers of the same group queue here until this transaction ends
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM bundle_group WHERE id = $1 FOR UPDATE")
                .bind(draft.bundle_group_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
        if locked.is_none() {
            return Err(HubError::not_found("Bundle group not found"));
        }

        if let Some(children) = &children {
            let wanted = distinct(children);
            let found: i64 = sqlx::query_scalar("SELECT count(*) FROM bundle WHERE id = ANY($1)")
                .bind(&wanted)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;
            if found != wanted.len() as i64 {
                return Err(HubError::not_found("Bundle not found"));
            }
        }

        let label_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bundle_group_version \
             WHERE bundle_group_id = $1 AND version = $2 AND id IS DISTINCT FROM $3)",
        )
        .bind(draft.bundle_group_id)
        .bind(&draft.version)
        .bind(draft.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        if label_taken {
            return Err(HubError::conflict(format!(
                "Version {} already exists",
                draft.version
            )));
        }

        if new_version {
            let open: i64 = sqlx::query_scalar(
                "SELECT count(*) FROM bundle_group_version \
                 WHERE bundle_group_id = $1 AND status = ANY($2)",
            )
            .bind(draft.bundle_group_id)
            .bind(status_names(&VersionStatus::OPEN))
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
            if open > 1 {
                return Err(HubError::conflict(
                    "Bundle group already has a published and an unpublished version",
                ));
            }
        }

        if draft.status == VersionStatus::Published {
            let archived = sqlx::query(
                "UPDATE bundle_group_version SET status = 'ARCHIVE' \
                 WHERE bundle_group_id = $1 AND status = 'PUBLISHED' AND id IS DISTINCT FROM $2",
            )
            .bind(draft.bundle_group_id)
            .bind(draft.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            if archived.rows_affected() > 0 {
                tracing::debug!(
                    bundle_group_id = draft.bundle_group_id,
                    archived = archived.rows_affected(),
                    "archived published versions"
                );
            }
        }

        let row = match draft.id {
            Some(id) => {
                let sql = format!(
                    r#"
                    UPDATE bundle_group_version
                    SET bundle_group_id = $2, version = $3, status = $4, description = $5,
                        description_image = $6, documentation_url = $7,
                        created_at = COALESCE($8, created_at), last_updated = $9
                    WHERE id = $1
                    RETURNING {VERSION_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, VersionRow>(&sql)
                    .bind(id)
                    .bind(draft.bundle_group_id)
                    .bind(&draft.version)
                    .bind(draft.status.as_ref())
                    .bind(&draft.description)
                    .bind(&draft.description_image)
                    .bind(&draft.documentation_url)
                    .bind(draft.created_at)
                    .bind(last_updated)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_error)?
                    .ok_or_else(|| HubError::not_found("Bundle group version not found"))?
            }
            None => {
                let sql = format!(
                    r#"
                    INSERT INTO bundle_group_version
                        (bundle_group_id, version, status, description, description_image,
                         documentation_url, created_at, last_updated)
                    VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, $8), $8)
                    RETURNING {VERSION_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, VersionRow>(&sql)
                    .bind(draft.bundle_group_id)
                    .bind(&draft.version)
                    .bind(draft.status.as_ref())
                    .bind(&draft.description)
                    .bind(&draft.description_image)
                    .bind(&draft.documentation_url)
                    .bind(draft.created_at)
                    .bind(last_updated)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_error)?
            }
        };
        let saved = BundleGroupVersion::try_from(row)?;

        if let Some(children) = children {
            sqlx::query("DELETE FROM bundle_version_link WHERE bundle_group_version_id = $1")
                .bind(saved.id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            sqlx::query(
                "INSERT INTO bundle_version_link (bundle_id, bundle_group_version_id) \
                 SELECT unnest($1::BIGINT[]), $2",
            )
            .bind(distinct(&children))
            .bind(saved.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(saved)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // bundle_version_link rows cascade
        let result = sqlx::query("DELETE FROM bundle_group_version WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgBundleStore ─────────────────────────────────────────────

const BUNDLE_SELECT: &str = r#"
    SELECT b.id, b.name, b.description, b.git_repo_address, b.git_src_repo_address,
           b.dependencies, b.descriptor_version,
           ARRAY(SELECT l.bundle_group_version_id FROM bundle_version_link l
                 WHERE l.bundle_id = b.id
                 ORDER BY l.bundle_group_version_id) AS bundle_group_version_ids
    FROM bundle b
"#;

async fn fetch_bundle<'e, E: PgExecutor<'e>>(executor: E, id: i64) -> Result<Option<Bundle>> {
    let sql = format!("{BUNDLE_SELECT} WHERE b.id = $1");
    let row = sqlx::query_as::<_, BundleRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(db_error)?;
    row.map(TryInto::try_into).transpose()
}

pub struct PgBundleStore {
    pool: PgPool,
}

impl PgBundleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BundleStore for PgBundleStore {
    async fn list_all(&self) -> Result<Vec<Bundle>> {
        let sql = format!("{BUNDLE_SELECT} ORDER BY b.id");
        let rows = sqlx::query_as::<_, BundleRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }

    async fn list_by_versions(&self, version_ids: &[i64]) -> Result<Vec<Bundle>> {
        let sql = format!(
            r#"{BUNDLE_SELECT}
            WHERE EXISTS (SELECT 1 FROM bundle_version_link l
                          WHERE l.bundle_id = b.id AND l.bundle_group_version_id = ANY($1))
            ORDER BY b.id"#
        );
        let rows = sqlx::query_as::<_, BundleRow>(&sql)
            .bind(version_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        convert_all(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<Bundle>> {
        fetch_bundle(&self.pool, id).await
    }

    async fn ids_for_version(&self, version_id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar(
            "SELECT bundle_id FROM bundle_version_link \
             WHERE bundle_group_version_id = $1 ORDER BY bundle_id",
        )
        .bind(version_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn save(&self, id: Option<i64>, input: &BundleInput) -> Result<Option<Bundle>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let saved_id = match id {
            Some(id) => sqlx::query_scalar::<_, i64>(
                r#"
                UPDATE bundle
                SET name = $2, description = $3, git_repo_address = $4,
                    git_src_repo_address = $5, dependencies = $6, descriptor_version = $7
                WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.git_repo_address)
            .bind(&input.git_src_repo_address)
            .bind(&input.dependencies)
            .bind(input.descriptor_version.as_ref())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?,
            None => Some(
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO bundle
                        (name, description, git_repo_address, git_src_repo_address,
                         dependencies, descriptor_version)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING id
                    "#,
                )
                .bind(&input.name)
                .bind(&input.description)
                .bind(&input.git_repo_address)
                .bind(&input.git_src_repo_address)
                .bind(&input.dependencies)
                .bind(input.descriptor_version.as_ref())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?,
            ),
        };
        let Some(saved_id) = saved_id else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM bundle_version_link WHERE bundle_id = $1")
            .bind(saved_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query(
            "INSERT INTO bundle_version_link (bundle_id, bundle_group_version_id) \
             SELECT $1, unnest($2::BIGINT[])",
        )
        .bind(saved_id)
        .bind(distinct(&input.bundle_group_version_ids))
        .execute(&mut *tx)
        .await
        .map_err(|e| match db_error(e) {
            HubError::NotFound(_) => HubError::not_found("Bundle group version not found"),
            other => other,
        })?;

        let bundle = fetch_bundle(&mut *tx, saved_id).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(bundle)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bundle WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgPortalUserStore ─────────────────────────────────────────

const PORTAL_USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email,
           ARRAY(SELECT o.organisation_id FROM portal_user_organisation o
                 WHERE o.portal_user_id = u.id ORDER BY o.organisation_id) AS organisation_ids
    FROM portal_user u
"#;

pub struct PgPortalUserStore {
    pool: PgPool,
}

impl PgPortalUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortalUserStore for PgPortalUserStore {
    async fn list_all(&self) -> Result<Vec<PortalUser>> {
        let sql = format!("{PORTAL_USER_SELECT} ORDER BY u.id");
        let rows = sqlx::query_as::<_, PortalUserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_organisation(&self, organisation_id: i64) -> Result<Vec<PortalUser>> {
        let sql = format!(
            r#"{PORTAL_USER_SELECT}
            WHERE EXISTS (SELECT 1 FROM portal_user_organisation o
                          WHERE o.portal_user_id = u.id AND o.organisation_id = $1)
            ORDER BY u.id"#
        );
        let rows = sqlx::query_as::<_, PortalUserRow>(&sql)
            .bind(organisation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<PortalUser>> {
        let sql = format!("{PORTAL_USER_SELECT} WHERE u.username = $1");
        let row = sqlx::query_as::<_, PortalUserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn upsert_with_organisation(
        &self,
        username: &str,
        email: Option<&str>,
        organisation_id: i64,
    ) -> Result<PortalUser> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO portal_user (username, email)
            VALUES ($1, $2)
            ON CONFLICT (username) DO UPDATE SET email = EXCLUDED.email
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO portal_user_organisation (portal_user_id, organisation_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(organisation_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match db_error(e) {
            HubError::NotFound(_) => HubError::not_found("Organisation not found"),
            other => other,
        })?;

        let sql = format!("{PORTAL_USER_SELECT} WHERE u.id = $1");
        let row = sqlx::query_as::<_, PortalUserRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }

    async fn remove_organisation(&self, username: &str, organisation_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM portal_user_organisation puo
            USING portal_user u
            WHERE u.id = puo.portal_user_id AND u.username = $1 AND puo.organisation_id = $2
            "#,
        )
        .bind(username)
        .bind(organisation_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM portal_user WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
