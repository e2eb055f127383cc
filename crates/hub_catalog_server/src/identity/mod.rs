//! Identity provider adapters.

mod keycloak;

pub use keycloak::{KeycloakClient, KeycloakConfig};
