//! Pallet processing pipeline: fetch, analyze, submit
//!
//! Failures are logged and end the pipeline for that pallet. Nothing is
//! retried and nothing propagates to the caller.

use crate::analysis::Analyzer;
use crate::api::QualityApi;
use crate::error::sanitize_error_message;
use std::sync::Arc;
use tracing::{error, info};

/// How a single pallet run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Results were accepted by the Quality API
    Submitted,
    /// Data could not be fetched; nothing was submitted
    FetchFailed,
    /// Data was fetched and analyzed but the results were rejected or lost
    SubmitFailed,
}

/// Orchestrates one pallet through the Quality API and the analyzer
pub struct PalletProcessor {
    api: Arc<dyn QualityApi>,
    analyzer: Arc<dyn Analyzer>,
}

impl PalletProcessor {
    pub fn new(api: Arc<dyn QualityApi>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { api, analyzer }
    }

    /// Run the full pipeline for `pallet_id`
    pub async fn process(&self, pallet_id: &str) -> ProcessOutcome {
        info!("Processing pallet with ID: {}", pallet_id);

        let pallet_data = match self.api.fetch_pallet_data(pallet_id).await {
            Ok(data) => {
                info!("Successfully fetched data for pallet {}", pallet_id);
                data
            }
            Err(e) => {
                error!(
                    error_kind = "fetch",
                    status = ?e.source.status(),
                    "{}",
                    sanitize_error_message(&e.to_string())
                );
                return ProcessOutcome::FetchFailed;
            }
        };

        let results = self.analyzer.analyze(&pallet_data).await;

        match self.api.submit_results(pallet_id, &results).await {
            Ok(()) => {
                info!("Successfully submitted results for pallet {}", pallet_id);
                ProcessOutcome::Submitted
            }
            Err(e) => {
                error!(
                    error_kind = "submit",
                    status = ?e.source.status(),
                    "{}",
                    sanitize_error_message(&e.to_string())
                );
                ProcessOutcome::SubmitFailed
            }
        }
    }
}
