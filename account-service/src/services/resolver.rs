//! Bank account resolution through Paystack.
//!
//! Given a bank code and account number, the provider returns the holder's
//! name of record. One GET per call, no caching and no retry: a failed
//! resolution goes straight back to the caller.

use crate::config::PaystackConfig;
use crate::services::context::RequestContext;
use crate::services::metrics::RESOLVER_REQUEST_DURATION;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use thiserror::Error;

/// Why a resolution attempt failed.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolution provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("resolve bank account failed: status code {0}")]
    Status(u16),

    #[error("undecodable provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("provider response carried no account data: {0}")]
    MissingData(String),
}

/// Account details returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolvedAccount {
    pub account_name: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub bank_id: Option<i64>,
}

/// Paystack response envelope.
#[derive(Debug, Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<ResolvedAccount>,
}

/// Looks up the holder name of record for a bank account.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        bank_code: &str,
        account_number: &str,
    ) -> Result<ResolvedAccount, ResolveError>;
}

/// Paystack client for the `/bank/resolve` endpoint.
#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    config: PaystackConfig,
}

impl PaystackClient {
    /// Create a new Paystack client.
    ///
    /// No request timeout is set here; the transport layer bounds total
    /// request latency.
    pub fn new(config: PaystackConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Paystack is configured (secret key is set).
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    fn resolve_url(&self) -> String {
        format!(
            "{}/bank/resolve",
            self.config.api_base_url.trim_end_matches('/')
        )
    }

    async fn fetch(
        &self,
        ctx: &RequestContext,
        bank_code: &str,
        account_number: &str,
    ) -> Result<ResolvedAccount, ResolveError> {
        let response = self
            .client
            .traced_get(&self.resolve_url())
            .query(&[("account_number", account_number), ("bank_code", bank_code)])
            .bearer_auth(self.config.secret_key.expose_secret())
            .send_with_request_id(Some(ctx.request_id()))
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Paystack resolve response");

        // Anything but 200 is a failed resolution, including other 2xx codes.
        if status != StatusCode::OK {
            tracing::warn!(status = %status, "Paystack bank account resolution rejected");
            return Err(ResolveError::Status(status.as_u16()));
        }

        let envelope: ResolveResponse = serde_json::from_str(&body)?;

        match envelope.data {
            Some(account) => {
                if !envelope.status {
                    tracing::warn!(message = %envelope.message, "Paystack returned data with a false status");
                }
                Ok(account)
            }
            None => Err(ResolveError::MissingData(envelope.message)),
        }
    }
}

#[async_trait]
impl AccountResolver for PaystackClient {
    #[tracing::instrument(
        name = "paystack.resolve",
        skip(self, ctx),
        fields(request_id = ctx.request_id(), bank_code = %bank_code, account_number = %account_number)
    )]
    async fn resolve(
        &self,
        ctx: &RequestContext,
        bank_code: &str,
        account_number: &str,
    ) -> Result<ResolvedAccount, ResolveError> {
        let timer = std::time::Instant::now();
        let result = self.fetch(ctx, bank_code, account_number).await;

        let label = if result.is_ok() { "ok" } else { "error" };
        RESOLVER_REQUEST_DURATION
            .with_label_values(&[label])
            .observe(timer.elapsed().as_secs_f64());

        if let Err(e) = &result {
            tracing::error!(error = %e, "Bank account resolution failed");
        }

        result
    }
}
