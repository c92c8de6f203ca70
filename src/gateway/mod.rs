//! Typed access to the backend.
//!
//! The four calls are stateless: no retries, no caching. Front ends and
//! workflows only see [`Backend`], so tests can swap the HTTP client for an
//! in-memory fake.

mod http;
#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpGateway;

use crate::error::GatewayError;
use crate::model::{
    Credential, GeneratedItem, GeneratedPost, GenerationRequest, IdentityProfile, ShareRequest,
};
use async_trait::async_trait;

#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /users/me` with the bearer credential.
    async fn fetch_profile(&self, cred: &Credential) -> Result<IdentityProfile, GatewayError>;

    /// `GET /posts`, in whatever order the server returns.
    async fn list_posts(&self) -> Result<Vec<GeneratedItem>, GatewayError>;

    /// `POST /generate-post`.
    async fn generate(&self, req: &GenerationRequest) -> Result<GeneratedPost, GatewayError>;

    /// `POST /posts/share` with the bearer credential.
    async fn share(&self, cred: &Credential, req: &ShareRequest) -> Result<(), GatewayError>;
}
