//! Mock implementations for testing
//!
//! Provides a mock Quality API and a mock broker session so the pallet
//! pipeline and the listener can be exercised without a network.

use crate::api::QualityApi;
use crate::error::{ApiError, FetchError, SubmitError};
use crate::protocol::messages::{AnalysisResult, PalletData};
use crate::transport::mqtt::MqttError;
use crate::transport::BrokerSession;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FailureMode {
    #[default]
    None,
    Fetch,
    Submit,
    Panic,
}

/// Mock Quality API recording every call
#[derive(Debug, Default)]
pub struct MockQualityApi {
    data: Value,
    failure: FailureMode,
    fetch_calls: Arc<Mutex<Vec<String>>>,
    submit_attempts: Arc<Mutex<Vec<String>>>,
    submissions: Arc<Mutex<Vec<(String, AnalysisResult)>>>,
}

impl MockQualityApi {
    /// Answers every fetch with `data` and accepts every submission
    pub fn with_data(data: Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Fetch answers HTTP 404
    pub fn failing_fetch() -> Self {
        Self {
            failure: FailureMode::Fetch,
            ..Default::default()
        }
    }

    /// Fetch succeeds, submit answers HTTP 500
    pub fn failing_submit() -> Self {
        Self {
            failure: FailureMode::Submit,
            ..Default::default()
        }
    }

    /// Fetch panics
    pub fn panicking() -> Self {
        Self {
            failure: FailureMode::Panic,
            ..Default::default()
        }
    }

    pub async fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.lock().await.clone()
    }

    /// Pallet ids for which a submit was attempted, accepted or not
    pub async fn submit_attempts(&self) -> Vec<String> {
        self.submit_attempts.lock().await.clone()
    }

    /// Accepted submissions
    pub async fn submissions(&self) -> Vec<(String, AnalysisResult)> {
        self.submissions.lock().await.clone()
    }

    fn url(pallet_id: &str, leaf: &str) -> String {
        format!("mock://quality-api/pallets/{pallet_id}/{leaf}")
    }
}

#[async_trait]
impl QualityApi for MockQualityApi {
    async fn fetch_pallet_data(&self, pallet_id: &str) -> Result<PalletData, FetchError> {
        if self.failure == FailureMode::Panic {
            panic!("mock quality api panicked fetching {pallet_id}");
        }

        self.fetch_calls.lock().await.push(pallet_id.to_string());

        if self.failure == FailureMode::Fetch {
            return Err(FetchError {
                pallet_id: pallet_id.to_string(),
                source: ApiError::Status {
                    url: Self::url(pallet_id, "data"),
                    status: StatusCode::NOT_FOUND,
                },
            });
        }

        Ok(PalletData::from(self.data.clone()))
    }

    async fn submit_results(
        &self,
        pallet_id: &str,
        results: &AnalysisResult,
    ) -> Result<(), SubmitError> {
        self.submit_attempts.lock().await.push(pallet_id.to_string());

        if self.failure == FailureMode::Submit {
            return Err(SubmitError {
                pallet_id: pallet_id.to_string(),
                source: ApiError::Status {
                    url: Self::url(pallet_id, "results"),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                },
            });
        }

        self.submissions
            .lock()
            .await
            .push((pallet_id.to_string(), results.clone()));
        Ok(())
    }
}

/// Mock broker session
#[derive(Debug, Default)]
pub struct MockBrokerSession {
    pub subscriptions: Arc<Mutex<Vec<String>>>,
    pub disconnect_count: Arc<Mutex<usize>>,
    pub should_fail: bool,
}

impl MockBrokerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().await.clone()
    }

    pub async fn disconnects(&self) -> usize {
        *self.disconnect_count.lock().await
    }
}

#[async_trait]
impl BrokerSession for MockBrokerSession {
    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        if self.should_fail {
            return Err(MqttError::SubscriptionFailed {
                topic: topic.to_string(),
                source: "mock subscribe failure".into(),
            });
        }
        self.subscriptions.lock().await.push(topic.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        if self.should_fail {
            return Err(MqttError::DisconnectFailed(
                "mock disconnect failure".into(),
            ));
        }
        *self.disconnect_count.lock().await += 1;
        Ok(())
    }
}
