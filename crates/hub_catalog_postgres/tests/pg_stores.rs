//! Store adapter tests against a live PostgreSQL.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p hub_catalog_postgres -- --ignored`.

use chrono::Utc;
use hub_catalog_core::error::HubError;
use hub_catalog_core::paging::PageRequest;
use hub_catalog_core::ports::Stores;
use hub_catalog_core::types::*;
use hub_catalog_postgres::{connect, pg_stores, run_migrations, DatabaseConfig};

async fn stores() -> Stores {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = connect(&DatabaseConfig::new(url, 4)).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pg_stores(pool)
}

fn unique(name: &str) -> String {
    format!("{name}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn organisation(stores: &Stores, name: &str) -> Organisation {
    stores
        .organisations
        .save(
            None,
            &OrganisationInput {
                name: unique(name),
                description: None,
                bundle_groups: None,
            },
        )
        .await
        .unwrap()
        .unwrap()
}

async fn group(stores: &Stores, organisation_id: i64, category_ids: Vec<i64>) -> BundleGroup {
    stores
        .bundle_groups
        .insert(&BundleGroupInput {
            name: unique("group"),
            organisation_id: Some(organisation_id),
            catalog_id: None,
            public_catalog: true,
            category_ids,
        })
        .await
        .unwrap()
}

fn write(bundle_group_id: i64, version: &str, status: VersionStatus) -> VersionWrite {
    VersionWrite {
        draft: VersionDraft {
            id: None,
            bundle_group_id,
            version: version.into(),
            status,
            description: None,
            description_image: None,
            documentation_url: None,
            created_at: None,
        },
        last_updated: Utc::now(),
        new_version: false,
        children: None,
    }
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn catalog_is_unique_per_organisation() {
    let stores = stores().await;
    let org = organisation(&stores, "acme").await;

    stores.catalogs.insert(org.id, "Acme private catalog").await.unwrap();
    let err = stores
        .catalogs
        .insert(org.id, "Acme private catalog")
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Conflict(ref m) if m == "Catalog already exists"));
    assert!(stores.catalogs.exists_for_organisation(org.id).await.unwrap());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn catalogs_follow_portal_user_membership() {
    let stores = stores().await;
    let org = organisation(&stores, "acme").await;
    let catalog = stores.catalogs.insert(org.id, "c").await.unwrap();
    let username = unique("alice");

    assert!(stores.catalogs.list_for_username(&username).await.unwrap().is_empty());
    let user = stores
        .portal_users
        .upsert_with_organisation(&username, Some("alice@acme.test"), org.id)
        .await
        .unwrap();
    assert_eq!(user.organisation_ids, vec![org.id]);
    assert_eq!(
        stores.catalogs.list_for_username(&username).await.unwrap(),
        vec![catalog]
    );

    assert!(stores
        .portal_users
        .remove_organisation(&username, org.id)
        .await
        .unwrap());
    assert!(stores.portal_users.delete(&username).await.unwrap());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn apply_archives_and_relinks_in_one_transaction() {
    let stores = stores().await;
    let org = organisation(&stores, "acme").await;
    let g = group(&stores, org.id, vec![]).await;

    let v1 = stores
        .versions
        .apply(write(g.id, "1.0", VersionStatus::Published))
        .await
        .unwrap();
    let bundle = stores
        .bundles
        .save(
            None,
            &BundleInput {
                name: unique("bundle"),
                dependencies: vec!["a".into()],
                descriptor_version: DescriptorVersion::V5,
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    let mut w = write(g.id, "2.0", VersionStatus::Published);
    w.children = Some(vec![bundle.id]);
    let v2 = stores.versions.apply(w).await.unwrap();

    let v1 = stores.versions.find(v1.id).await.unwrap().unwrap();
    assert_eq!(v1.status, VersionStatus::Archive);
    assert_eq!(stores.bundles.ids_for_version(v2.id).await.unwrap(), vec![bundle.id]);
    let bundle = stores.bundles.find(bundle.id).await.unwrap().unwrap();
    assert_eq!(bundle.bundle_group_version_ids, vec![v2.id]);
    assert_eq!(bundle.descriptor_version, DescriptorVersion::V5);

    // the label is taken within the group
    let err = stores
        .versions
        .apply(write(g.id, "2.0", VersionStatus::NotPublished))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Conflict(_)));

    // unknown child rolls back the whole write
    let mut bad = write(g.id, "4.0", VersionStatus::NotPublished);
    bad.children = Some(vec![i64::MAX]);
    assert!(matches!(
        stores.versions.apply(bad).await.unwrap_err(),
        HubError::NotFound(_)
    ));
    assert!(stores
        .versions
        .find_by_group_and_version(g.id, "4.0")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn paged_versions_newest_first() {
    let stores = stores().await;
    let org = organisation(&stores, "acme").await;
    let cat = stores
        .categories
        .insert(&CategoryInput {
            name: unique("cat"),
            description: None,
        })
        .await
        .unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let g = group(&stores, org.id, vec![cat.id]).await;
        ids.push(g.id);
        stores
            .versions
            .apply(write(g.id, "1.0", VersionStatus::NotPublished))
            .await
            .unwrap();
    }

    let groups = stores
        .bundle_groups
        .find_by_organisation_and_categories(Some(org.id), &[cat.id])
        .await
        .unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].category_ids, vec![cat.id]);

    let page = stores
        .versions
        .find_by_groups_and_statuses(&ids, &[VersionStatus::NotPublished], PageRequest::new(0, 2))
        .await
        .unwrap();
    assert_eq!(page.total_items, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].bundle_group_id, ids[2]);

    let all = stores
        .versions
        .find_by_groups_and_statuses(&ids, &[VersionStatus::NotPublished], PageRequest::unpaged())
        .await
        .unwrap();
    assert_eq!(all.items.len(), 3);

    // deleting a category detaches it from its groups
    assert!(stores.categories.delete(cat.id).await.unwrap());
    let g = stores.bundle_groups.find(ids[0]).await.unwrap().unwrap();
    assert!(g.category_ids.is_empty());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn deleting_group_cascades_to_versions_and_links() {
    let stores = stores().await;
    let org = organisation(&stores, "acme").await;
    let g = group(&stores, org.id, vec![]).await;
    let v = stores
        .versions
        .apply(write(g.id, "1.0", VersionStatus::NotPublished))
        .await
        .unwrap();
    let bundle = stores
        .bundles
        .save(
            None,
            &BundleInput {
                name: unique("bundle"),
                bundle_group_version_ids: vec![v.id],
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert!(stores.bundle_groups.delete(g.id).await.unwrap());
    assert!(stores.versions.find(v.id).await.unwrap().is_none());
    let bundle = stores.bundles.find(bundle.id).await.unwrap().unwrap();
    assert!(bundle.bundle_group_version_ids.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore] // requires DATABASE_URL
async fn concurrent_new_versions_are_serialised_per_group() {
    let stores = stores().await;
    let org = organisation(&stores, "acme").await;
    let g = group(&stores, org.id, vec![]).await;
    stores
        .versions
        .apply(write(g.id, "1.0", VersionStatus::Published))
        .await
        .unwrap();

    let new = |label: &str| {
        let mut w = write(g.id, label, VersionStatus::NotPublished);
        w.new_version = true;
        w
    };
    let (a, b) = tokio::join!(
        stores.versions.apply(new("1.1")),
        stores.versions.apply(new("1.2")),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert!(matches!(a.err().or(b.err()), Some(HubError::Conflict(_))));
    let open = stores
        .versions
        .count_by_group_and_statuses(g.id, &VersionStatus::OPEN)
        .await
        .unwrap();
    assert_eq!(open, 2);

    let err = stores.versions.apply(new("1.3")).await.unwrap_err();
    assert!(matches!(err, HubError::Conflict(_)));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn organisation_save_with_unknown_group_writes_nothing() {
    let stores = stores().await;
    let name = unique("ghost");
    let input = OrganisationInput {
        name: name.clone(),
        description: None,
        bundle_groups: Some(vec![i64::MAX]),
    };
    let err = stores.organisations.save(None, &input).await.unwrap_err();
    assert!(matches!(err, HubError::NotFound(_)));
    let all = stores.organisations.list_sorted_by_name().await.unwrap();
    assert!(all.iter().all(|o| o.name != name));

    let org = organisation(&stores, "acme").await;
    let g = group(&stores, org.id, vec![]).await;
    let other = organisation(&stores, "globex").await;
    let moved = OrganisationInput {
        name: unique("globex-renamed"),
        description: None,
        bundle_groups: Some(vec![g.id, i64::MAX]),
    };
    assert!(stores.organisations.save(Some(other.id), &moved).await.is_err());
    let other_now = stores.organisations.find(other.id).await.unwrap().unwrap();
    assert_eq!(other_now.name, other.name);
    let g = stores.bundle_groups.find(g.id).await.unwrap().unwrap();
    assert_eq!(g.organisation_id, Some(org.id));

    let moved = OrganisationInput {
        bundle_groups: Some(vec![g.id]),
        ..moved
    };
    let saved = stores
        .organisations
        .save(Some(other.id), &moved)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.name, moved.name);
    let g = stores.bundle_groups.find(g.id).await.unwrap().unwrap();
    assert_eq!(g.organisation_id, Some(other.id));
}
