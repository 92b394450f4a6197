//! HTTP remote source client

use async_trait::async_trait;
use serde::Deserialize;
use taxsync_common::{sanitize_slug, Error, Result};
use tracing::debug;

use super::RemoteSource;
use crate::models::{AttributeRecord, TermRecord};

/// Connection settings for the remote catalog API
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the remote API, e.g. `https://catalog.example/api/v1`
    pub base_url: String,
    /// Bearer token; empty disables the Authorization header
    pub token: String,
    pub timeout_secs: u64,
    /// Requests per second against the remote API
    pub rate_limit_per_sec: u32,
}

#[derive(Debug, Deserialize)]
struct AttributeDto {
    id: i64,
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    order_by: Option<String>,
    #[serde(default)]
    has_archives: bool,
}

#[derive(Debug, Deserialize)]
struct TermDto {
    id: i64,
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    meta: std::collections::BTreeMap<String, String>,
}

/// reqwest-backed remote source with bearer auth and rate limiting
pub struct HttpRemoteSource {
    client: reqwest::Client,
    config: RemoteConfig,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpRemoteSource {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let quota = governor::Quota::per_second(
            std::num::NonZeroU32::new(config.rate_limit_per_sec.max(1))
                .ok_or_else(|| Error::Config("Rate limit must be non-zero".to_string()))?,
        );
        let rate_limiter = governor::RateLimiter::direct(quota);

        let client = reqwest::Client::builder()
            .user_agent(concat!("taxsync/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        if self.config.base_url.is_empty() {
            return Err(Error::Config(
                "remote_base_url is not configured".to_string(),
            ));
        }

        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "Remote fetch");

        let mut request = self.client.get(&url);
        if !self.config.token.is_empty() {
            request = request.bearer_auth(&self.config.token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("Remote rejected credentials ({})", status)));
        }
        if !status.is_success() {
            return Err(Error::Network(format!("Remote returned {} for {}", status, url)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Parse(format!("Malformed response from {}: {}", url, e)))
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_attributes(&self) -> Result<Vec<AttributeRecord>> {
        let dtos: Vec<AttributeDto> = self.get_json("attributes").await?;

        dtos.into_iter().map(validate_attribute).collect()
    }

    async fn fetch_terms(&self, attribute_id: i64) -> Result<Vec<TermRecord>> {
        let dtos: Vec<TermDto> = self
            .get_json(&format!("attributes/{}/terms", attribute_id))
            .await?;

        dtos.into_iter()
            .map(|dto| validate_term(dto, attribute_id))
            .collect()
    }
}

/// Validate a raw attribute at the fetch boundary: required fields must be
/// present, the slug defaults from the name.
fn validate_attribute(dto: AttributeDto) -> Result<AttributeRecord> {
    if dto.name.trim().is_empty() {
        return Err(Error::Parse(format!("Attribute {} has an empty name", dto.id)));
    }

    let slug = if dto.slug.trim().is_empty() {
        sanitize_slug(&dto.name)
    } else {
        sanitize_slug(&dto.slug)
    };

    Ok(AttributeRecord {
        id: dto.id,
        name: dto.name,
        slug,
        kind: dto.kind.unwrap_or_else(|| "select".to_string()),
        order_by: dto.order_by.unwrap_or_else(|| "menu_order".to_string()),
        has_archives: dto.has_archives,
    })
}

fn validate_term(dto: TermDto, attribute_id: i64) -> Result<TermRecord> {
    if dto.name.trim().is_empty() {
        return Err(Error::Parse(format!(
            "Term {} under attribute {} has an empty name",
            dto.id, attribute_id
        )));
    }

    let slug = if dto.slug.trim().is_empty() {
        sanitize_slug(&dto.name)
    } else {
        dto.slug
    };

    let mut record = TermRecord {
        id: dto.id,
        attribute_id,
        name: dto.name,
        slug,
        description: dto.description,
        meta: dto.meta,
    };
    record.retain_tracked_meta();

    Ok(record)
}
