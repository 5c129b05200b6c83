//! Pallet worker: processing pipeline and lifecycle

pub mod lifecycle;
pub mod processor;

pub use lifecycle::{forward_shutdown_signal, WorkerLifecycle};
pub use processor::{PalletProcessor, ProcessOutcome};
