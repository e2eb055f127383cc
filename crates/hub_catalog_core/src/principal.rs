use std::collections::HashMap;

use crate::error::HubError;

/// Hub realm roles.
pub mod roles {
    pub const ADMIN: &str = "eh-admin";
    pub const MANAGER: &str = "eh-manager";
    pub const AUTHOR: &str = "eh-author";
}

/// The caller of a service operation.
///
/// Handlers receive one per request from the JWT middleware. A request without
/// a bearer token runs as [`Principal::anonymous`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<String>,
    authenticated: bool,
}

impl Principal {
    /// Construct from validated JWT claims at the server boundary.
    /// Core logic never reads raw tokens.
    pub fn from_jwt_claims(claims: &JwtClaims) -> Result<Self, HubError> {
        let username = claims
            .preferred_username
            .clone()
            .or_else(|| claims.sub.clone())
            .ok_or_else(|| HubError::Unauthenticated("missing sub claim".into()))?;

        let mut roles: Vec<String> = claims
            .realm_access
            .iter()
            .flat_map(|access| access.roles.iter().cloned())
            .chain(
                claims
                    .resource_access
                    .iter()
                    .flat_map(|clients| clients.values())
                    .flat_map(|access| access.roles.iter().cloned()),
            )
            .collect();
        roles.sort();
        roles.dedup();

        Ok(Self {
            username,
            roles,
            authenticated: true,
        })
    }

    /// Construct an authenticated principal explicitly (tests, tooling).
    pub fn authenticated(username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            username: username.into(),
            roles,
            authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            username: "anonymous".to_string(),
            roles: Vec::new(),
            authenticated: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.authenticated && self.has_role(roles::ADMIN)
    }

    pub fn require_authenticated(&self) -> Result<(), HubError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(HubError::Unauthenticated("bearer token required".into()))
        }
    }

    /// Passes when the caller is authenticated and holds at least one of `allowed`.
    pub fn require_any_role(&self, allowed: &[&str]) -> Result<(), HubError> {
        self.require_authenticated()?;
        if allowed.iter().any(|role| self.has_role(role)) {
            Ok(())
        } else {
            Err(HubError::Forbidden(format!(
                "{} lacks any of the roles {}",
                self.username,
                allowed.join(", ")
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), HubError> {
        self.require_any_role(&[roles::ADMIN])
    }
}

/// Role list as carried in `realm_access` / `resource_access.<client>`.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct RoleClaim {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// JWT claims shape issued by Keycloak.
/// Deserialised by the server JWT middleware.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RoleClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_access: Option<HashMap<String, RoleClaim>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}
