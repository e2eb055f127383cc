//! HTTP contract tests for the hub catalog server.
//!
//! The router runs over the in-memory store and user directory, so these need
//! no database or Keycloak.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http_body_util::BodyExt;
use hub_catalog_core::memory::{MemoryDirectory, MemoryStore};
use hub_catalog_core::ports::Stores;
use hub_catalog_core::principal::{roles, JwtClaims, RoleClaim};
use hub_catalog_core::types::UserRepresentation;
use hub_catalog_core::{HubServices, HubSettings};
use hub_catalog_server::middleware::jwt::JwtConfig;
use hub_catalog_server::router::build_router;
use hyper::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Test JWT helpers ───────────────────────────────────────────

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

fn make_jwt(username: &str, realm_roles: &[&str]) -> String {
    let claims = JwtClaims {
        sub: Some(format!("id-{username}")),
        preferred_username: Some(username.into()),
        realm_access: Some(RoleClaim {
            roles: realm_roles.iter().map(|r| r.to_string()).collect(),
        }),
        resource_access: None,
        exp: Some(jsonwebtoken::get_current_timestamp() + 600),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("failed to encode test JWT")
}

fn admin() -> String {
    make_jwt("hub-admin", &[roles::ADMIN])
}

fn manager(username: &str) -> String {
    make_jwt(username, &[roles::MANAGER])
}

fn author(username: &str) -> String {
    make_jwt(username, &[roles::AUTHOR])
}

// ── Test app builder ───────────────────────────────────────────

fn directory_user(username: &str) -> UserRepresentation {
    UserRepresentation {
        id: format!("kc-{username}"),
        created_timestamp: 1_650_000_000_000,
        username: username.into(),
        enabled: true,
        first_name: None,
        last_name: None,
        email: Some(format!("{username}@acme.test")),
    }
}

struct TestApp {
    router: Router,
    stores: Stores,
}

fn build_test_app() -> TestApp {
    let stores = Stores::from_single(Arc::new(MemoryStore::new()));
    let directory = Arc::new(MemoryDirectory::with_users([
        directory_user("alice"),
        directory_user("carol"),
    ]));
    let services = HubServices::new(
        stores.clone(),
        directory,
        HubSettings {
            group_detail_base_url: Some("https://hub.example.com/".into()),
        },
    );
    TestApp {
        router: build_router(services, JwtConfig::from_secret(TEST_JWT_SECRET), None),
        stores,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn organisation(&self, name: &str) -> i64 {
        let (status, body) = self
            .call("POST", "/api/organisation", Some(&admin()), Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn catalog(&self, organisation_id: i64) -> i64 {
        let (status, body) = self
            .call(
                "POST",
                &format!("/api/catalogs?organisationId={organisation_id}"),
                Some(&admin()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn group(&self, body: Value) -> i64 {
        let (status, body) = self
            .call("POST", "/api/bundlegroups", Some(&author("ann")), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["bundleGroupId"].as_i64().unwrap()
    }

    async fn version(&self, group_id: i64, label: &str, status: &str) -> Value {
        let (code, body) = self
            .call(
                "POST",
                "/api/bundlegroupversions",
                Some(&author("ann")),
                Some(json!({ "bundleGroupId": group_id, "version": label, "status": status })),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED, "{body}");
        body
    }

    async fn bundle(&self, name: &str, version_id: i64) -> i64 {
        let (status, body) = self
            .call(
                "POST",
                "/api/bundles",
                Some(&author("ann")),
                Some(json!({ "name": name, "bundleGroupVersionIds": [version_id] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["bundleId"].as_i64().unwrap()
    }

    async fn join(&self, username: &str, organisation_id: i64) {
        self.stores
            .portal_users
            .upsert_with_organisation(username, None, organisation_id)
            .await
            .unwrap();
    }
}

fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap().to_string())
        .collect()
}

// ── Health & auth ──────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let app = build_test_app();
    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn catalogs_require_a_valid_token() {
    let app = build_test_app();
    let (status, _) = app.call("GET", "/api/catalogs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call("GET", "/api/catalogs", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

// ── Catalogs ───────────────────────────────────────────────────

#[tokio::test]
async fn catalog_lifecycle() {
    let app = build_test_app();
    let acme = app.organisation("Acme").await;

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/catalogs?organisationId={acme}"),
            Some(&author("ann")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let catalog = app.catalog(acme).await;
    let (status, body) = app
        .call(
            "POST",
            &format!("/api/catalogs?organisationId={acme}"),
            Some(&admin()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Catalog already exists");

    let (status, body) = app
        .call("POST", "/api/catalogs?organisationId=9999", Some(&admin()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Organisation not found");

    // membership decides what non-admins see
    app.join("alice", acme).await;
    let (_, body) = app.call("GET", "/api/catalogs", Some(&author("alice")), None).await;
    assert_eq!(body[0]["name"], "Acme private catalog");
    assert_eq!(body[0]["organisationId"], acme);
    let (_, body) = app.call("GET", "/api/catalogs", Some(&author("bob")), None).await;
    assert_eq!(body, json!([]));
    let (status, _) = app
        .call("GET", &format!("/api/catalogs/{catalog}"), Some(&author("bob")), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call("GET", &format!("/api/catalogs/{catalog}"), Some(&admin()), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call("DELETE", &format!("/api/catalogs/{catalog}"), Some(&admin()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], catalog);
    let (status, _) = app
        .call("DELETE", &format!("/api/catalogs/{catalog}"), Some(&admin()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Bundle visibility ──────────────────────────────────────────

#[tokio::test]
async fn bundle_visibility_matrix() {
    let app = build_test_app();
    let acme = app.organisation("Acme").await;
    let catalog = app.catalog(acme).await;
    app.join("alice", acme).await;

    let public = app
        .group(json!({ "name": "Public", "organisationId": acme }))
        .await;
    let private = app
        .group(json!({
            "name": "Private",
            "organisationId": acme,
            "catalogId": catalog,
            "publicCatalog": false
        }))
        .await;
    let public_v = app.version(public, "1.0", "PUBLISHED").await;
    let private_v = app.version(private, "1.0", "PUBLISHED").await;
    let open_id = app
        .bundle("open-bundle", public_v["bundleGroupVersionId"].as_i64().unwrap())
        .await;
    let secret_id = app
        .bundle("secret-bundle", private_v["bundleGroupVersionId"].as_i64().unwrap())
        .await;

    let (status, body) = app.call("GET", "/api/bundles", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["open-bundle"]);

    let (_, body) = app.call("GET", "/api/bundles", Some(&author("bob")), None).await;
    assert_eq!(names(&body), vec!["open-bundle"]);

    let (_, body) = app
        .call("GET", "/api/bundles", Some(&author("alice")), None)
        .await;
    assert_eq!(names(&body), vec!["open-bundle", "secret-bundle"]);

    let (_, body) = app.call("GET", "/api/bundles", Some(&admin()), None).await;
    assert_eq!(names(&body), vec!["open-bundle", "secret-bundle"]);

    // catalog filter
    let uri = format!("/api/bundles?catalogId={catalog}");
    let (status, _) = app.call("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("GET", &uri, Some(&author("bob")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.call("GET", &uri, Some(&author("alice")), None).await;
    assert_eq!(names(&body), vec!["secret-bundle"]);

    // an invisible version filter is empty, not an error
    let uri = format!(
        "/api/bundles?bundleGroupVersionId={}",
        private_v["bundleGroupVersionId"]
    );
    let (status, body) = app.call("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = app
        .call("GET", "/api/bundles?catalogId=9999", Some(&admin()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // single bundle lookups hide what the listing hides
    let (status, body) = app
        .call("GET", &format!("/api/bundles/{open_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "open-bundle");
    let secret = format!("/api/bundles/{secret_id}");
    let (status, _) = app.call("GET", &secret, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call("GET", &secret, Some(&author("bob")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.call("GET", &secret, Some(&author("alice")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "secret-bundle");
}

// ── Versions ───────────────────────────────────────────────────

#[tokio::test]
async fn publishing_archives_the_previous_version() {
    let app = build_test_app();
    let acme = app.organisation("Acme").await;
    let group = app
        .group(json!({ "name": "Widgets", "organisationId": acme }))
        .await;

    let v1 = app.version(group, "1.0", "PUBLISHED").await;
    assert_eq!(v1["isEditable"], true);
    assert_eq!(v1["organisationName"], "Acme");
    let v1_id = v1["bundleGroupVersionId"].as_i64().unwrap();
    assert_eq!(
        v1["bundleGroupUrl"],
        format!("https://hub.example.com/bundlegroupversion/{v1_id}")
    );

    let v2 = app.version(group, "2.0", "PUBLISHED").await;
    assert_eq!(v2["status"], "PUBLISHED");
    assert_eq!(v2["isEditable"], false);
    assert_eq!(v2["allVersions"].as_array().unwrap().len(), 2);

    let (_, v1) = app
        .call("GET", &format!("/api/bundlegroupversions/{v1_id}"), None, None)
        .await;
    assert_eq!(v1["status"], "ARCHIVE");

    let (status, body) = app
        .call(
            "POST",
            "/api/bundlegroupversions",
            Some(&author("ann")),
            Some(json!({ "bundleGroupId": group, "version": "2.0" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let v3 = app.version(group, "3.0-rc", "NOT_PUBLISHED").await;
    assert_eq!(v3["canAddNewVersion"], false);
    let (status, _) = app
        .call(
            "POST",
            "/api/bundlegroupversions",
            Some(&author("ann")),
            Some(json!({ "bundleGroupId": group, "version": "4.0" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // per-group listing: open versions first, archived last
    let (status, body) = app
        .call(
            "GET",
            &format!("/api/bundlegroupversions/versions/{group}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = body["payload"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses.last(), Some(&"ARCHIVE"));
    assert_eq!(body["metadata"]["totalItems"], 3);

    let (_, body) = app
        .call(
            "GET",
            &format!("/api/bundlegroupversions/versions/{group}?statuses=PUBLISHED"),
            None,
            None,
        )
        .await;
    assert_eq!(body["payload"][0]["version"], "2.0");
}

#[tokio::test]
async fn version_writes_need_roles() {
    let app = build_test_app();
    let acme = app.organisation("Acme").await;
    let group = app
        .group(json!({ "name": "Widgets", "organisationId": acme }))
        .await;
    let body = json!({ "bundleGroupId": group, "version": "1.0" });

    let (status, _) = app
        .call("POST", "/api/bundlegroupversions", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .call(
            "POST",
            "/api/bundlegroupversions",
            Some(&make_jwt("eve", &[])),
            Some(body),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let v = app.version(group, "1.0", "NOT_PUBLISHED").await;
    let uri = format!("/api/bundlegroupversions/{}", v["bundleGroupVersionId"]);
    let (status, _) = app.call("DELETE", &uri, Some(&author("ann")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("DELETE", &uri, Some(&manager("max")), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.call("DELETE", &uri, Some(&manager("max")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn filtered_versions_are_paged() {
    let app = build_test_app();
    let acme = app.organisation("Acme").await;
    let (_, category) = app
        .call(
            "POST",
            "/api/category",
            Some(&admin()),
            Some(json!({ "name": "Solutions" })),
        )
        .await;
    let category = category["id"].as_i64().unwrap();

    for name in ["gamma", "Alpha", "beta"] {
        let group = app
            .group(json!({ "name": name, "organisationId": acme, "categoryIds": [category] }))
            .await;
        app.version(group, "1.0", "PUBLISHED").await;
    }
    let other = app.group(json!({ "name": "Uncategorised" })).await;
    app.version(other, "1.0", "NOT_PUBLISHED").await;

    let (status, body) = app
        .call(
            "GET",
            &format!("/api/bundlegroupversions/filtered?page=0&pageSize=2&categoryIds={category}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["metadata"],
        json!({ "page": 0, "pageSize": 2, "lastPage": 2, "totalItems": 3 })
    );
    assert_eq!(body["payload"][0]["categories"], json!([category.to_string()]));

    let (_, body) = app
        .call("GET", "/api/bundlegroupversions/filtered", None, None)
        .await;
    assert_eq!(body["metadata"]["totalItems"], 4);
    let names: Vec<&str> = body["payload"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alpha", "beta", "gamma", "Uncategorised"]);

    let (_, body) = app
        .call(
            "GET",
            "/api/bundlegroupversions/filtered?statuses=NOT_PUBLISHED",
            None,
            None,
        )
        .await;
    assert_eq!(body["payload"][0]["name"], "Uncategorised");

    let (status, body) = app
        .call(
            "GET",
            "/api/bundlegroupversions/filtered?statuses=LIVE",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("LIVE"));
}

// ── Users ──────────────────────────────────────────────────────

#[tokio::test]
async fn organisation_membership_answers_result() {
    let app = build_test_app();
    let acme = app.organisation("Acme").await;
    let max = manager("max");

    let (status, body) = app
        .call(
            "POST",
            &format!("/api/users/{acme}"),
            Some(&max),
            Some(json!({ "username": "alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": true }));

    let (_, body) = app
        .call(
            "POST",
            &format!("/api/users/{acme}"),
            Some(&max),
            Some(json!({ "username": "nobody" })),
        )
        .await;
    assert_eq!(body, json!({ "result": false }));

    let (status, body) = app
        .call("GET", &format!("/api/users?organisationId={acme}"), Some(&max), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["username"], "alice");
    assert_eq!(body[0]["email"], "alice@acme.test");

    let (status, _) = app
        .call("GET", "/api/users", Some(&author("ann")), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app
        .call(
            "DELETE",
            &format!("/api/users/{acme}/user/alice"),
            Some(&max),
            None,
        )
        .await;
    assert_eq!(body, json!({ "result": true }));

    // deleting the portal user itself is admin only
    let (status, _) = app.call("DELETE", "/api/users/alice", Some(&max), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app
        .call("DELETE", "/api/users/alice", Some(&admin()), None)
        .await;
    assert_eq!(body, json!({ "result": true }));
    let (_, body) = app
        .call("DELETE", "/api/users/alice", Some(&admin()), None)
        .await;
    assert_eq!(body, json!({ "result": false }));

    let (status, _) = app
        .call(
            "POST",
            "/api/users/not-a-number",
            Some(&max),
            Some(json!({ "username": "alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn keycloak_lookup_is_admin_only() {
    let app = build_test_app();

    let (status, body) = app
        .call("GET", "/api/keycloack/users?username=ALI", Some(&admin()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "kc-alice");
    assert!(body[0]["created"].is_string());

    let (_, body) = app
        .call("GET", "/api/keycloack/users/carol", Some(&admin()), None)
        .await;
    assert_eq!(body["username"], "carol");

    let (status, _) = app
        .call("GET", "/api/keycloack/users/nobody", Some(&admin()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call("GET", "/api/keycloack/users", Some(&manager("max")), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
