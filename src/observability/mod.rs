//! Observability: structured logging setup and span macros

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat, LogSettings};

pub use logging::{mqtt_span, pallet_span};
