//! Router construction for the hub catalog server.

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_mw,
    routing::{delete, get, post},
    Extension, Router,
};
use hub_catalog_core::HubServices;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origin = match allow_origin.filter(|o| *o != "*").map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "ignoring unparsable CORS origin, allowing any");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(origin)
}

/// Build the full axum router with all routes and middleware.
pub fn build_router(
    services: HubServices,
    jwt_config: JwtConfig,
    cors_allow_origin: Option<&str>,
) -> Router {
    // Every /api route gets a Principal; handlers decide what it may do.
    let api = Router::new()
        .route(
            "/bundles",
            get(handlers::bundles::list_bundles).post(handlers::bundles::create_bundle),
        )
        .route(
            "/bundles/:id",
            get(handlers::bundles::get_bundle)
                .post(handlers::bundles::update_bundle)
                .delete(handlers::bundles::delete_bundle),
        )
        .route(
            "/catalogs",
            get(handlers::catalogs::list_catalogs).post(handlers::catalogs::create_catalog),
        )
        .route(
            "/catalogs/:id",
            get(handlers::catalogs::get_catalog).delete(handlers::catalogs::delete_catalog),
        )
        // Bundle group versions
        .route("/bundlegroupversions", post(handlers::versions::create_version))
        .route(
            "/bundlegroupversions/filtered",
            get(handlers::versions::list_filtered),
        )
        .route(
            "/bundlegroupversions/versions/:bundle_group_id",
            get(handlers::versions::list_for_group),
        )
        .route(
            "/bundlegroupversions/:id",
            get(handlers::versions::get_version)
                .post(handlers::versions::update_version)
                .delete(handlers::versions::delete_version),
        )
        .route(
            "/bundlegroups",
            get(handlers::bundle_groups::list_bundle_groups)
                .post(handlers::bundle_groups::create_bundle_group),
        )
        .route(
            "/bundlegroups/:id",
            get(handlers::bundle_groups::get_bundle_group)
                .post(handlers::bundle_groups::update_bundle_group)
                .delete(handlers::bundle_groups::delete_bundle_group),
        )
        .route(
            "/organisation",
            get(handlers::organisations::list_organisations)
                .post(handlers::organisations::create_organisation),
        )
        .route(
            "/organisation/:id",
            get(handlers::organisations::get_organisation)
                .post(handlers::organisations::update_organisation)
                .delete(handlers::organisations::delete_organisation),
        )
        .route(
            "/category",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/category/:id",
            get(handlers::categories::get_category)
                .post(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        // :key is an organisation id, except for DELETE /users/:key where it is a username
        .route("/users", get(handlers::users::list_users))
        .route(
            "/users/:key",
            post(handlers::users::add_user_to_organisation).delete(handlers::users::delete_user),
        )
        .route(
            "/users/:key/user/:username",
            delete(handlers::users::remove_user_from_organisation),
        )
        .route("/keycloack/users", get(handlers::keycloak::search_users))
        .route("/keycloack/users/:username", get(handlers::keycloak::get_user))
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .layer(Extension(services))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_allow_origin))
}
