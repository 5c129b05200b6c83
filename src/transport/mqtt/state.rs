//! Listener connection state machine
//!
//! `Disconnected -> Connecting -> Connected -> Dispatching -> Connected`,
//! ending in `Disconnected` on shutdown or a fatal connect failure.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Connected,
    /// A message is being handled; no other message is taken meanwhile
    Dispatching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    ConnectStarted,
    ConnAckReceived,
    /// Broker answered CONNACK with a non-zero code; the transport retries
    ConnectRefused(u8),
    /// The connection could not be established at all
    ConnectFailed,
    /// An established connection dropped; the transport reconnects
    ConnectionLost,
    DispatchStarted,
    DispatchFinished,
    Shutdown,
}

/// Next state after `event` (pure function)
pub fn next_state(current: ListenerState, event: &ListenerEvent) -> ListenerState {
    let next = match (current, event) {
        (_, ListenerEvent::Shutdown) | (_, ListenerEvent::ConnectFailed) => {
            ListenerState::Disconnected
        }
        (_, ListenerEvent::ConnectStarted) => ListenerState::Connecting,
        (_, ListenerEvent::ConnAckReceived) => ListenerState::Connected,
        (_, ListenerEvent::ConnectRefused(_)) | (_, ListenerEvent::ConnectionLost) => {
            ListenerState::Connecting
        }
        (ListenerState::Connected, ListenerEvent::DispatchStarted) => ListenerState::Dispatching,
        (ListenerState::Dispatching, ListenerEvent::DispatchFinished) => ListenerState::Connected,
        (state, _) => state,
    };

    if next != current {
        debug!(target: "mqtt_transport", from = ?current, to = ?next, event = ?event, "Listener state change");
    }
    next
}
