//! Testing utilities and mock implementations
//!
//! Mocks for the Quality API and the broker session, plus an in-memory log
//! capture, so the worker can be tested without a broker or HTTP server.

pub mod log_capture;
pub mod mocks;

pub use log_capture::LogCapture;
pub use mocks::*;
