//! reqwest-backed Quality API client

use super::QualityApi;
use crate::config::WorkerConfig;
use crate::error::{ApiError, FetchError, SubmitError};
use crate::protocol::{AnalysisResult, PalletData};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Header carrying the static API key on every request
pub const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client for the Quality API
///
/// No retries and no backoff. A timeout applies only when configured.
pub struct HttpQualityApi {
    base_url: Url,
    api_key: String,
    client: Client,
}

impl HttpQualityApi {
    pub fn new(
        base_url: Url,
        api_key: String,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self, crate::error::WorkerError> {
        let base_url = config.api_base_url()?;
        Self::new(
            base_url,
            config.quality_api.api_key.clone(),
            config.api_timeout(),
        )
        .map_err(|e| {
            crate::config::ConfigError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
                .into()
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base_url}/pallets/{pallet_id}/{leaf}` with the pallet id encoded as one path segment
    pub fn pallet_url(&self, pallet_id: &str, leaf: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                pallet_id: pallet_id.to_string(),
            })?
            .pop_if_empty()
            .extend(["pallets", pallet_id, leaf]);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<PalletData, ApiError> {
        let url_text = url.to_string();
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url_text.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url_text,
                status,
            });
        }

        response
            .json::<PalletData>()
            .await
            .map_err(|source| ApiError::InvalidBody {
                url: url_text,
                source,
            })
    }

    async fn post_json(&self, url: Url, body: &AnalysisResult) -> Result<(), ApiError> {
        let url_text = url.to_string();
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url_text.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url_text,
                status,
            });
        }

        debug!(url = %url_text, status = %status, "Results accepted");
        Ok(())
    }
}

#[async_trait]
impl QualityApi for HttpQualityApi {
    async fn fetch_pallet_data(&self, pallet_id: &str) -> Result<PalletData, FetchError> {
        let fetch_error = |source| FetchError {
            pallet_id: pallet_id.to_string(),
            source,
        };

        let url = self.pallet_url(pallet_id, "data").map_err(fetch_error)?;
        debug!(%url, "Fetching pallet data");
        self.get_json(url).await.map_err(fetch_error)
    }

    async fn submit_results(
        &self,
        pallet_id: &str,
        results: &AnalysisResult,
    ) -> Result<(), SubmitError> {
        let submit_error = |source| SubmitError {
            pallet_id: pallet_id.to_string(),
            source,
        };

        let url = self.pallet_url(pallet_id, "results").map_err(submit_error)?;
        debug!(%url, "Submitting analysis results");
        self.post_json(url, results).await.map_err(submit_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpQualityApi {
        HttpQualityApi::new(Url::parse(base).unwrap(), "test-key".to_string(), None).unwrap()
    }

    #[test]
    fn test_pallet_url_keeps_base_path() {
        let api = client("https://east.arvistcloud.net/api/v1");
        assert_eq!(
            api.pallet_url("P1", "data").unwrap().as_str(),
            "https://east.arvistcloud.net/api/v1/pallets/P1/data"
        );
        assert_eq!(
            api.pallet_url("P1", "results").unwrap().as_str(),
            "https://east.arvistcloud.net/api/v1/pallets/P1/results"
        );
    }

    #[test]
    fn test_pallet_url_tolerates_trailing_slash() {
        let api = client("http://localhost:8080/api/v1/");
        assert_eq!(
            api.pallet_url("P1", "data").unwrap().as_str(),
            "http://localhost:8080/api/v1/pallets/P1/data"
        );
    }

    #[test]
    fn test_pallet_url_on_bare_host() {
        let api = client("http://127.0.0.1:9000");
        assert_eq!(
            api.pallet_url("P7", "data").unwrap().path(),
            "/pallets/P7/data"
        );
    }

    #[test]
    fn test_pallet_id_is_one_path_segment() {
        let api = client("http://localhost/api");
        let url = api.pallet_url("a/b c", "data").unwrap();
        assert_eq!(url.path(), "/api/pallets/a%2Fb%20c/data");
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let mut config = WorkerConfig::default();
        config.quality_api.base_url = "mailto:ops@example.com".to_string();
        assert!(HttpQualityApi::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_uses_configured_base() {
        let api = HttpQualityApi::from_config(&WorkerConfig::default()).unwrap();
        assert_eq!(
            api.base_url().as_str(),
            "https://east.arvistcloud.net/api/v1"
        );
    }
}
