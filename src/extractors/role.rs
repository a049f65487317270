//! Extract the caller's role, resolved upstream and forwarded in a header.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const CALLER_ROLE_HEADER: &str = "X-Caller-Role";

/// Optional caller role from `X-Caller-Role`. Blank values count as missing.
#[derive(Clone, Debug)]
pub struct CallerRole(pub Option<String>);

impl CallerRole {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerRole
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(CallerRole(value))
    }
}
