use reqwest::{header::AUTHORIZATION, Url};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ProviderConfig;
use crate::shared::AppError;

/// Minimal client for the hosted tabular REST API (`{project}/rest/v1`)
pub struct PostgrestClient {
    client: reqwest::Client,
    rest_base: Url,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, AppError> {
        let rest_base = Url::parse(&format!("{}/rest/v1/", config.url.trim_end_matches('/')))
            .map_err(|e| AppError::Config(format!("invalid provider URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rest_base,
            api_key: config.api_key.clone(),
        })
    }

    /// URL for `GET {table}?select={columns}`
    pub fn select_url(&self, table: &str, columns: &str) -> Result<Url, AppError> {
        if !is_valid_table_name(table) {
            return Err(AppError::NotFound(format!("Unknown table '{}'", table)));
        }

        let mut url = self
            .rest_base
            .join(table)
            .map_err(|e| AppError::Config(e.to_string()))?;
        url.query_pairs_mut().append_pair("select", columns);
        Ok(url)
    }

    /// Reads rows from a table. Row-level security applies to `bearer`;
    /// without one the request runs with the public key's role.
    #[instrument(skip(self, bearer))]
    pub async fn select(
        &self,
        table: &str,
        columns: &str,
        bearer: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        let url = self.select_url(table, columns)?;
        let bearer = bearer.unwrap_or(&self.api_key);

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Data API request failed");
                AppError::Upstream(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Data API rejected request");
            return Err(AppError::Upstream(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("unreadable rows: {}", e)))?;

        debug!(rows = rows.len(), "Rows fetched");
        Ok(rows)
    }
}

fn is_valid_table_name(table: &str) -> bool {
    !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
