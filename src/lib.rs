//! Pallet quality worker
//!
//! Listens for new-pallet events on an MQTT broker, fetches each pallet's
//! data from the Quality API, runs an analysis over it and submits the
//! result back over HTTP.
//!
//! # Overview
//!
//! - [`protocol`]: topics, inbound events and API payloads
//! - [`transport`]: the broker connection and message dispatch
//! - [`api`]: the Quality API client
//! - [`analysis`]: the analyzer seam and its stub implementation
//! - [`worker`]: the per-pallet pipeline and the worker lifecycle
//!
//! # Quick Start
//!
//! ```rust
//! use pallet_worker::analysis::StubAnalyzer;
//! use pallet_worker::protocol::QualityStatus;
//!
//! let result = StubAnalyzer::instant().fixed_result();
//! assert_eq!(result.quality_check.status, QualityStatus::Pass);
//!
//! let json = serde_json::to_value(&result).unwrap();
//! assert_eq!(json["quality_check"]["status"], "PASS");
//! ```

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod testing;
pub mod transport;
pub mod worker;

pub use config::{ConfigError, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use protocol::*;
pub use worker::{PalletProcessor, ProcessOutcome, WorkerLifecycle};
