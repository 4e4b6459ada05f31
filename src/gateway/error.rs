// src/gateway/error.rs

use thiserror::Error;

use crate::elab::ElabError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requester id is not a known local account, or the login failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("eLabFTW: {0}")]
    Upstream(#[from] ElabError),

    #[error("local store: {0}")]
    Store(#[from] StoreError),
}

impl GatewayError {
    /// HTTP-style status code for callers that report one.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Unauthorized(_) => 401,
            GatewayError::Forbidden(_) => 403,
            GatewayError::NotFound(_) => 404,
            GatewayError::BadRequest(_) => 400,
            GatewayError::Upstream(e) if e.is_not_found() => 404,
            GatewayError::Upstream(_) => 400,
            GatewayError::Store(_) => 500,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(GatewayError::Unauthorized(s!("x")).status(), 401);
        assert_eq!(GatewayError::Forbidden(s!("x")).status(), 403);
        let upstream = ElabError::Api { method: s!("GET"), path: s!("experiments/9"), status: 404, detail: s!("") };
        assert_eq!(GatewayError::from(upstream).status(), 404);
        assert_eq!(GatewayError::from(ElabError::MissingId).status(), 400);
        assert_eq!(GatewayError::from(StoreError::EmptyName).status(), 500);
    }
}
