use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("identity provider: {0}")]
    IdentityProvider(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HubError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Forbidden(_) => 403,
            Self::Unauthenticated(_) => 401,
            Self::InvalidInput(_) => 400,
            Self::IdentityProvider(_) => 502,
            Self::Internal(_) => 500,
        }
    }
}
