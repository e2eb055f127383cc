//! Bearer token authentication.
//!
//! Every `/api` request gets a [`Principal`] extension: the token's subject
//! when a valid `Authorization: Bearer` header is present, the anonymous
//! principal when there is no header. A malformed or invalid token is a 401.

use std::sync::Arc;

use axum::{
    extract::{Extension, Request},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use hub_catalog_core::error::HubError;
use hub_catalog_core::principal::{JwtClaims, Principal};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::error::AppError;

/// Key and validation rules for incoming tokens.
#[derive(Clone)]
pub struct JwtConfig {
    key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtConfig {
    /// HS256 with a shared secret. Audience is not checked.
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(validation),
        }
    }

    pub fn principal_from_token(&self, token: &str) -> Result<Principal, HubError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            HubError::Unauthenticated("invalid bearer token".into())
        })?;
        Principal::from_jwt_claims(&data.claims)
    }
}

pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let principal = match req.headers().get(header::AUTHORIZATION) {
        None => Principal::anonymous(),
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim);
            match token.map(|t| config.principal_from_token(t)) {
                Some(Ok(principal)) => principal,
                Some(Err(e)) => return AppError(e).into_response(),
                None => {
                    return AppError(HubError::Unauthenticated(
                        "expected a Bearer token".into(),
                    ))
                    .into_response()
                }
            }
        }
    };
    req.extensions_mut().insert(principal);
    next.run(req).await
}
