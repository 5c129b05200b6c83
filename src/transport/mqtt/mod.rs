//! MQTT transport for the pallet worker
//!
//! Pure pieces are kept apart from the I/O:
//!
//! - [`connection`] - broker options and connect-class errors
//! - [`state`] - listener state machine
//! - [`message_handler`] - event routing and pallet message decoding
//! - [`listener`] - reactions to routed events, generic over the session
//! - [`client`] - the rumqttc event loop
//!
//! # Usage
//!
//! ```rust,no_run
//! use pallet_worker::transport::mqtt::MqttClient;
//! # use pallet_worker::transport::mqtt::PalletMessageHandler;
//! # use pallet_worker::config::WorkerConfig;
//! # use std::sync::Arc;
//!
//! # async fn example(handler: Arc<PalletMessageHandler>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkerConfig::from_env()?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let mut client = MqttClient::new(&config, handler)?;
//! client.run(shutdown_rx).await?;
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod listener;
pub mod message_handler;
pub mod state;

pub use client::MqttClient;
pub use connection::{configure_mqtt_options, MqttError};
pub use listener::PalletListener;
pub use message_handler::{
    DecodeError, EventRoute, MessageDisposition, MessageHandler, PalletMessageHandler,
};
pub use state::{ListenerEvent, ListenerState};
