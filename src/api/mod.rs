//! Quality API access
//!
//! [`QualityApi`] is the seam the pallet processor depends on;
//! [`HttpQualityApi`] is the reqwest-backed implementation.

pub mod client;

pub use client::HttpQualityApi;

use crate::error::{FetchError, SubmitError};
use crate::protocol::{AnalysisResult, PalletData};
use async_trait::async_trait;

/// Operations the worker performs against the Quality API
#[async_trait]
pub trait QualityApi: Send + Sync {
    /// `GET {base_url}/pallets/{pallet_id}/data`
    async fn fetch_pallet_data(&self, pallet_id: &str) -> Result<PalletData, FetchError>;

    /// `POST {base_url}/pallets/{pallet_id}/results` with `results` as the JSON body
    async fn submit_results(
        &self,
        pallet_id: &str,
        results: &AnalysisResult,
    ) -> Result<(), SubmitError>;
}
