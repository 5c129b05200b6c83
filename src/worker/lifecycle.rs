//! Worker lifecycle: wire components from configuration and run until shutdown

use super::processor::PalletProcessor;
use crate::analysis::{Analyzer, StubAnalyzer};
use crate::api::{HttpQualityApi, QualityApi};
use crate::config::{ConfigError, WorkerConfig};
use crate::error::{WorkerError, WorkerResult};
use crate::protocol::{TopicBuilder, NEW_PALLET_TOPIC};
use crate::transport::mqtt::{ListenerState, MqttClient, PalletMessageHandler};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};

/// Owns the broker client and the pallet pipeline behind it
pub struct WorkerLifecycle {
    plugin_id: String,
    results_topic: String,
    client: MqttClient,
}

impl WorkerLifecycle {
    /// Build the HTTP Quality API client and stub analyzer from `config`
    pub fn new(config: &WorkerConfig) -> WorkerResult<Self> {
        let api = Arc::new(HttpQualityApi::from_config(config)?);
        let analyzer = Arc::new(StubAnalyzer::from_config(config));
        Self::with_components(config, api, analyzer)
    }

    /// Build with injected Quality API and analyzer
    ///
    /// Broker options that cannot be built are reported as
    /// [`WorkerError::Config`]; no connection is attempted here.
    pub fn with_components(
        config: &WorkerConfig,
        api: Arc<dyn QualityApi>,
        analyzer: Arc<dyn Analyzer>,
    ) -> WorkerResult<Self> {
        let processor = Arc::new(PalletProcessor::new(api, analyzer));
        let handler = Arc::new(PalletMessageHandler::new(processor));
        let client = MqttClient::new(config, handler)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            plugin_id: config.plugin.id.clone(),
            results_topic: TopicBuilder::build_results_topic(&config.plugin.id),
            client,
        })
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Reserved for result publication; nothing is published here yet
    pub fn results_topic(&self) -> &str {
        &self.results_topic
    }

    pub fn state(&self) -> ListenerState {
        self.client.state()
    }

    /// Listen for pallet events until `shutdown_rx` flips to `true`
    ///
    /// The broker connection is always closed before returning. A failure to
    /// reach the broker is logged and returned as [`WorkerError::Connect`].
    pub async fn run(&mut self, shutdown_rx: watch::Receiver<bool>) -> WorkerResult<()> {
        info!(plugin_id = %self.plugin_id, "Starting pallet worker");
        info!(
            results_topic = %self.results_topic,
            "Results topic reserved, results are submitted over HTTP"
        );

        let result = self
            .client
            .run(shutdown_rx)
            .instrument(crate::mqtt_span!(topic = NEW_PALLET_TOPIC))
            .await;
        if let Err(e) = &result {
            error!("{}", e);
        }

        self.client.disconnect().await;
        info!("Pallet worker stopped");

        result.map_err(WorkerError::from)
    }
}

/// Flip `shutdown_tx` once `signal` resolves to `true`
///
/// `false` means no shutdown signal can ever arrive. The sender is then held
/// for good so the worker keeps running instead of seeing a closed channel.
pub async fn forward_shutdown_signal<F>(signal: F, shutdown_tx: watch::Sender<bool>)
where
    F: Future<Output = bool>,
{
    if signal.await {
        let _ = shutdown_tx.send(true);
        return;
    }

    warn!("No shutdown signal can be received, the worker must be stopped externally");
    std::future::pending::<()>().await;
    drop(shutdown_tx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockQualityApi;
    use serde_json::json;
    use std::time::Duration;

    fn lifecycle(config: &WorkerConfig) -> WorkerLifecycle {
        WorkerLifecycle::with_components(
            config,
            Arc::new(MockQualityApi::with_data(json!({}))),
            Arc::new(StubAnalyzer::instant()),
        )
        .unwrap()
    }

    #[test]
    fn test_results_topic_uses_plugin_id() {
        let mut config = WorkerConfig::default();
        config.plugin.id = "line-7".to_string();

        let worker = lifecycle(&config);
        assert_eq!(worker.plugin_id(), "line-7");
        assert_eq!(worker.results_topic(), "quality/plugins/line-7/results");
        assert_eq!(worker.state(), ListenerState::Disconnected);
    }

    #[test]
    fn test_blank_client_id_is_a_config_error() {
        let mut config = WorkerConfig::default();
        config.mqtt.client_id = Some(String::new());

        let result = WorkerLifecycle::new(&config);
        assert!(matches!(result, Err(WorkerError::Config(_))));
    }

    #[tokio::test]
    async fn test_forward_shutdown_signal_sends_on_signal() {
        let (tx, rx) = watch::channel(false);

        forward_shutdown_signal(async { true }, tx).await;

        assert!(*rx.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_signal_keeps_worker_running() {
        let (tx, rx) = watch::channel(false);
        let forwarder = tokio::spawn(forward_shutdown_signal(async { false }, tx));

        tokio::time::sleep(Duration::from_secs(3600)).await;

        assert!(!forwarder.is_finished());
        assert_eq!(rx.has_changed().ok(), Some(false));
        assert!(!*rx.borrow());
        forwarder.abort();
    }

    #[test]
    fn test_new_builds_http_client_from_defaults() {
        assert!(WorkerLifecycle::new(&WorkerConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_broker_returns_connect_error() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = WorkerConfig::default();
        config.mqtt.host = "127.0.0.1".to_string();
        config.mqtt.port = port;

        let mut worker = lifecycle(&config);
        let (_tx, rx) = watch::channel(false);

        let result = worker.run(rx).await;
        assert!(matches!(result, Err(WorkerError::Connect(_))));
        assert_eq!(worker.state(), ListenerState::Disconnected);
    }
}
