use super::Backend;
use crate::error::GatewayError;
use crate::model::{
    ClientConfig, Credential, GeneratedItem, GeneratedPost, GenerationRequest, IdentityProfile,
    ShareErrorBody, ShareRequest,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

/// reqwest-backed client for the backend HTTP API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid backend base URL: {}", cfg.base_url))?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Where the user starts the third-party login; the backend redirects back
    /// to the client with `?token=...` once the code exchange is done.
    pub fn login_url(&self) -> String {
        self.endpoint("/auth/linkedin")
    }
}

#[async_trait]
impl Backend for HttpGateway {
    async fn fetch_profile(&self, cred: &Credential) -> Result<IdentityProfile, GatewayError> {
        let resp = self
            .http
            .get(self.endpoint("/users/me"))
            .bearer_auth(cred.as_str())
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "profile request did not complete");
                GatewayError::Auth { status: None }
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Auth {
                status: Some(status.as_u16()),
            });
        }
        resp.json::<IdentityProfile>().await.map_err(|e| {
            debug!(error = %e, "profile body did not decode");
            GatewayError::Auth {
                status: Some(status.as_u16()),
            }
        })
    }

    async fn list_posts(&self) -> Result<Vec<GeneratedItem>, GatewayError> {
        let resp = self
            .http
            .get(self.endpoint("/posts"))
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "history request did not complete");
                GatewayError::Fetch { status: None }
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Fetch {
                status: Some(status.as_u16()),
            });
        }
        resp.json::<Vec<GeneratedItem>>().await.map_err(|e| {
            debug!(error = %e, "history body did not decode");
            GatewayError::Fetch {
                status: Some(status.as_u16()),
            }
        })
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<GeneratedPost, GatewayError> {
        let resp = self
            .http
            .post(self.endpoint("/generate-post"))
            .json(req)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "generate request did not complete");
                GatewayError::Generation { status: None }
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Generation {
                status: Some(status.as_u16()),
            });
        }
        resp.json::<GeneratedPost>().await.map_err(|e| {
            debug!(error = %e, "generate body did not decode");
            GatewayError::Generation {
                status: Some(status.as_u16()),
            }
        })
    }

    async fn share(&self, cred: &Credential, req: &ShareRequest) -> Result<(), GatewayError> {
        let resp = self
            .http
            .post(self.endpoint("/posts/share"))
            .bearer_auth(cred.as_str())
            .json(req)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "share request did not complete");
                GatewayError::Share { detail: None }
            })?;
        if resp.status().is_success() {
            return Ok(());
        }
        // The error body is optional; anything unreadable falls back to the generic message.
        let detail = resp
            .json::<ShareErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail_text());
        Err(GatewayError::Share { detail })
    }
}
