//! Analysis stage
//!
//! [`Analyzer`] is where a real inspection model plugs in. [`StubAnalyzer`]
//! stands in for it: it waits a fixed time and returns a canned result.

use crate::config::WorkerConfig;
use crate::protocol::{AnalysisResult, DetectedProduct, PalletData, QualityCheck, QualityStatus};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Turns fetched pallet data into a result payload
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, data: &PalletData) -> AnalysisResult;
}

/// Placeholder analyzer with a fixed delay and a hardcoded result
///
/// # Examples
/// ```
/// use pallet_worker::analysis::{Analyzer, StubAnalyzer};
/// use pallet_worker::protocol::PalletData;
///
/// # tokio_test::block_on(async {
/// let analyzer = StubAnalyzer::instant();
/// let result = analyzer.analyze(&PalletData::from(serde_json::json!({}))).await;
/// assert_eq!(result, analyzer.fixed_result());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct StubAnalyzer {
    delay: Duration,
    model_version: String,
}

impl StubAnalyzer {
    pub fn new(delay: Duration, model_version: impl Into<String>) -> Self {
        Self {
            delay,
            model_version: model_version.into(),
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.analysis_delay(), config.analysis.model_version.clone())
    }

    /// No delay; for tests
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, "1.2.3")
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The canned result returned for every pallet
    pub fn fixed_result(&self) -> AnalysisResult {
        AnalysisResult {
            custom_model_version: self.model_version.clone(),
            detected_products: vec![
                DetectedProduct {
                    name: "Industrial Widget A".to_string(),
                    quantity: 15,
                    confidence: 0.95,
                },
                DetectedProduct {
                    name: "Industrial Widget B".to_string(),
                    quantity: 10,
                    confidence: 0.89,
                },
            ],
            quality_check: QualityCheck {
                status: QualityStatus::Pass,
                anomalies_detected: 0,
            },
        }
    }
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(&self, _data: &PalletData) -> AnalysisResult {
        info!("Running custom model and analysis...");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        info!("Analysis complete.");
        self.fixed_result()
    }
}
