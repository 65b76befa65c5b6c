//! Open5e monster lookup proxy.
//!
//! The scene only needs a statblock's size and hit points, but records are
//! passed through untouched so the browser sees exactly what Open5e serves.

#[cfg(test)]
#[path = "monsters_test.rs"]
mod tests;

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

const REQUEST_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;
const SEARCH_LIMIT: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum MonsterError {
    #[error("invalid monster slug: {0}")]
    InvalidSlug(String),
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

pub struct Open5eClient {
    http: reqwest::Client,
    base_url: String,
}

impl Open5eClient {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, MonsterError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| MonsterError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// One monster record by slug. `None` when Open5e has no such monster.
    ///
    /// # Errors
    ///
    /// Fails on a malformed slug, a transport error or a non-404 upstream
    /// error status.
    pub async fn monster(&self, slug: &str) -> Result<Option<Value>, MonsterError> {
        if !is_valid_slug(slug) {
            return Err(MonsterError::InvalidSlug(slug.to_owned()));
        }
        let url = format!("{}/monsters/{slug}/", self.base_url);
        let resp = self.http.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status().inspect_err(|e| warn!(%slug, error = %e, "open5e: lookup failed"))?;
        Ok(Some(resp.json().await?))
    }

    /// Search by name; the raw Open5e page is returned.
    ///
    /// # Errors
    ///
    /// Fails on a transport error or an upstream error status.
    pub async fn search(&self, query: &str) -> Result<Value, MonsterError> {
        let url = format!("{}/monsters/", self.base_url);
        let limit = SEARCH_LIMIT.to_string();
        let resp = self
            .http
            .get(&url)
            .query(&[("search", query), ("limit", limit.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Open5e slugs are lowercase words joined by dashes.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 128
        && slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}
