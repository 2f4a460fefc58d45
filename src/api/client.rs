//! HTTP client for the backend REST API

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::UpstreamApi;
use crate::config::ApiConfig;
use crate::date_range::format_instant;
use crate::error::{Result, SyncError};
use crate::models::{DashboardSummary, HealthStatus, Job};

/// REST client rooted at the API base URL (e.g. `http://host:8080/api/v1`)
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Check backend health
    pub async fn health_check(&self) -> Result<HealthStatus> {
        self.get(self.health_url()?, &[]).await
    }

    /// Health lives at the server root, outside the API base path
    fn health_url(&self) -> Result<Url> {
        Ok(self.base_url.join("/health")?)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}{}", base, path))?)
    }

    async fn request<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.get(self.endpoint(path)?, query).await
    }

    #[instrument(skip(self, query), fields(endpoint = %url.path()))]
    async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!("API request failed: {}", e);
                SyncError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = SyncError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            };
            warn!("API request failed: {}", err);
            return Err(err);
        }

        Ok(response.json::<T>().await?)
    }
}

fn range_query(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![("from", format_instant(from)), ("to", format_instant(to))]
}

#[async_trait]
impl UpstreamApi for ApiClient {
    async fn get_jobs(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Job>> {
        self.request("/jobs", &range_query(from, to)).await
    }

    async fn get_job(
        &self,
        id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Job> {
        let mut query = range_query(from, to);
        query.push(("limit", limit.to_string()));
        self.request(&format!("/jobs/{}", id), &query).await
    }

    async fn get_dashboard_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DashboardSummary> {
        self.request("/dashboard/summary", &range_query(from, to)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: Url::parse(base).unwrap(),
            request_timeout: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let api = client("http://localhost:8080/api/v1");
        assert_eq!(
            api.endpoint("/jobs/4").unwrap().as_str(),
            "http://localhost:8080/api/v1/jobs/4"
        );

        let trailing = client("http://localhost:8080/api/v1/");
        assert_eq!(
            trailing.endpoint("/dashboard/summary").unwrap().as_str(),
            "http://localhost:8080/api/v1/dashboard/summary"
        );
    }

    #[test]
    fn test_health_url_resolves_against_origin() {
        let api = client("http://localhost:8080/api/v1");
        assert_eq!(api.health_url().unwrap().as_str(), "http://localhost:8080/health");

        let trailing = client("https://monitor.example.com/api/v1/");
        assert_eq!(
            trailing.health_url().unwrap().as_str(),
            "https://monitor.example.com/health"
        );
    }

    #[test]
    fn test_range_query_uses_instant_format() {
        let from: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let to: DateTime<Utc> = "2024-01-08T00:00:00Z".parse().unwrap();

        assert_eq!(
            range_query(from, to),
            vec![
                ("from", "2024-01-01T00:00:00.000Z".to_string()),
                ("to", "2024-01-08T00:00:00.000Z".to_string()),
            ]
        );
    }
}
