//! Entando Hub catalog core.
//!
//! Domain types, the store and identity ports, and the services that carry
//! the catalog rules (bundle group version publishing, bundle visibility,
//! organisation membership). No database or HTTP code lives here; see
//! `hub_catalog_postgres` and `hub_catalog_server`.

pub mod error;
pub mod memory;
pub mod paging;
pub mod ports;
pub mod principal;
pub mod proto;
pub mod service;
pub mod types;

pub use error::HubError;
pub use principal::Principal;
pub use service::{HubServices, HubSettings};
