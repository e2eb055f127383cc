//! hub_catalog_server: REST surface of the Entando Hub catalog.

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod router;
