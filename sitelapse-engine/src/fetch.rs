//! Upstream asset API client
//!
//! Fetches the raw delivery payload and the published weekly progress
//! table. Transport failures never propagate as hard errors: the caller
//! always receives a valid (possibly empty) result plus an error
//! descriptor, so the viewer degrades to an empty scene instead of
//! crashing. Only configuration errors (missing business id / base URL)
//! are fatal for a fetch.

use crate::normalize::{self, AssetItem};
use serde::Serialize;
use sitelapse_common::config::ProjectConfig;
use sitelapse_common::time::format_day;
use sitelapse_common::{Error, Result};
use std::time::Duration;

/// Asset types requested from the upstream API, in its own vocabulary
const ASSET_TYPES: &str = "images,images360,3dtile";

/// Header carrying the upstream API key
const API_KEY_HEADER: &str = "ax-api-key";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport error descriptor surfaced alongside empty-but-valid results
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamError {
    /// HTTP status, when the server answered at all
    pub status: Option<u16>,
    pub message: String,
    pub is_timeout: bool,
}

impl UpstreamError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        Self {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
            is_timeout: e.is_timeout(),
        }
    }
}

/// Outcome of an asset fetch: always a usable item list
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<AssetItem>,
    /// Present when the upstream call failed and `items` is empty because
    /// of it (not because the project genuinely has no deliveries)
    pub error: Option<UpstreamError>,
}

/// Outcome of a progress-table fetch
#[derive(Debug, Default)]
pub struct TableFetchOutcome {
    pub table: Option<String>,
    pub error: Option<UpstreamError>,
}

/// Client for the upstream asset API
pub struct AssetApiClient {
    http: reqwest::Client,
}

impl AssetApiClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("http client: {}", e)))?;
        Ok(Self { http })
    }

    /// Fetch and normalize the project's deliveries.
    ///
    /// Fails fast on configuration errors; degrades to an empty outcome
    /// with an error descriptor on transport errors.
    pub async fn fetch_assets(&self, config: &ProjectConfig) -> Result<FetchOutcome> {
        config.validate_for_fetch()?;

        let url = format!("{}/asset", config.api_base_url.trim_end_matches('/'));
        let mut query: Vec<(&str, String)> = vec![
            ("project", config.business_id.clone()),
            ("types", ASSET_TYPES.to_string()),
            ("from", format_day(config.start_date)),
            ("to", format_day(config.end_date)),
        ];
        if let Some(polygon) = &config.polygon_geojson {
            query.push(("polygon", polygon.to_string()));
        }

        let mut request = self.http.get(&url).query(&query);
        if let Some(key) = &config.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        tracing::debug!(project = %config.business_id, %url, "querying asset API");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let descriptor = UpstreamError::from_reqwest(e);
                tracing::warn!(
                    is_timeout = descriptor.is_timeout,
                    "asset fetch failed: {}",
                    descriptor.message
                );
                return Ok(FetchOutcome {
                    items: Vec::new(),
                    error: Some(descriptor),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "asset API returned error");
            return Ok(FetchOutcome {
                items: Vec::new(),
                error: Some(UpstreamError {
                    status: Some(status.as_u16()),
                    message,
                    is_timeout: false,
                }),
            });
        }

        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                return Ok(FetchOutcome {
                    items: Vec::new(),
                    error: Some(UpstreamError::from_reqwest(e)),
                });
            }
        };

        let items = normalize::normalize(&payload);
        tracing::info!(count = items.len(), "fetched and normalized assets");
        Ok(FetchOutcome { items, error: None })
    }

    /// Fetch the published weekly progress table as raw delimited text
    pub async fn fetch_progress_table(&self, url: &str) -> TableFetchOutcome {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return TableFetchOutcome {
                    table: None,
                    error: Some(UpstreamError::from_reqwest(e)),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return TableFetchOutcome {
                table: None,
                error: Some(UpstreamError {
                    status: Some(status.as_u16()),
                    message: format!("progress table fetch returned {}", status),
                    is_timeout: false,
                }),
            };
        }

        match response.text().await {
            Ok(table) => TableFetchOutcome {
                table: Some(table),
                error: None,
            },
            Err(e) => TableFetchOutcome {
                table: None,
                error: Some(UpstreamError::from_reqwest(e)),
            },
        }
    }
}
