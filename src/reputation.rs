//! Social reputation score lookup over HTTP.
//!
//! Reputation is an enrichment field: any failure is logged and degrades the
//! score to zero instead of failing the token.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::U256;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::ReputationUnavailable;

#[async_trait]
pub trait ReputationSource: Send + Sync {
    /// Score for `handle`, zero when it cannot be determined.
    async fn fetch_score(&self, handle: &str) -> U256;
}

pub struct ReputationClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl ReputationClient {
    pub fn new(base_url: Url, api_key: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build reputation HTTP client")?;
        if api_key.is_none() {
            warn!("No reputation API key configured; requests go out unauthenticated");
        }
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn request_score(&self, handle: &str) -> Result<U256> {
        let mut req = self
            .client
            .get(self.base_url.clone())
            .query(&[("username", handle)]);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }

        let resp = req.send().await.context("Failed to request reputation API")?;
        if !resp.status().is_success() {
            bail!("reputation API returned status: {}", resp.status());
        }

        let body: Value = resp
            .json()
            .await
            .context("Failed to parse reputation API response")?;
        parse_score(&body)
    }
}

#[async_trait]
impl ReputationSource for ReputationClient {
    async fn fetch_score(&self, handle: &str) -> U256 {
        if handle.is_empty() {
            debug!("Token has no social handle, reputation defaults to 0");
            return U256::ZERO;
        }

        match self.request_score(handle).await {
            Ok(score) => score,
            Err(e) => {
                let err = ReputationUnavailable {
                    handle: handle.to_string(),
                    reason: format!("{e:#}"),
                };
                warn!("{}; using 0", err);
                U256::ZERO
            }
        }
    }
}

/// Reads `score` from an API body. Accepts JSON numbers and numeric strings;
/// fractions are truncated toward zero, negatives are rejected.
pub fn parse_score(body: &Value) -> Result<U256> {
    let raw = match body.get("score") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => bail!("score is not numeric: {other}"),
        None => bail!("response has no score field"),
    };

    let score = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|e| anyhow!("invalid score {raw}: {e}"))?;
    if score.is_sign_negative() && !score.is_zero() {
        bail!("negative score {score}");
    }

    score
        .trunc()
        .to_u128()
        .map(U256::from)
        .ok_or_else(|| anyhow!("score {score} out of range"))
}
