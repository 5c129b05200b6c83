//! New-pallet event injection utility
//!
//! Publishes a new-pallet event to a broker so a running worker picks it up.
//!
//! ## Usage
//!
//! ```bash
//! # Announce pallet P-1001
//! inject-pallet --pallet-id P-1001
//!
//! # Send a raw payload, e.g. to watch the worker reject it
//! inject-pallet --payload '{"pallet_id": null}'
//!
//! # Authenticated broker
//! inject-pallet --pallet-id P-1001 --host mqtt-host --username user --password pass
//! ```

use clap::Parser;
use pallet_worker::protocol::{PalletEvent, NEW_PALLET_TOPIC};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use tokio::time::{timeout, Duration};
use uuid::Uuid;

const ACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(
    name = "inject-pallet",
    about = "Publish a new-pallet event for a running pallet worker"
)]
struct Args {
    /// Pallet id to announce
    #[arg(long, conflicts_with = "payload", required_unless_present = "payload")]
    pallet_id: Option<String>,

    /// Raw payload to publish instead of a generated event
    #[arg(long)]
    payload: Option<String>,

    #[arg(long, env = "MQTT_BROKER_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "MQTT_BROKER_PORT", default_value = "1883")]
    port: u16,

    #[arg(long, env = "MQTT_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "MQTT_PASSWORD", default_value = "")]
    password: String,
}

impl Args {
    fn payload(&self) -> Result<String, serde_json::Error> {
        match (&self.payload, &self.pallet_id) {
            (Some(raw), _) => Ok(raw.clone()),
            (None, Some(id)) => serde_json::to_string(&PalletEvent::new(id.clone())),
            (None, None) => Ok(String::new()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let payload = args.payload()?;

    let client_id = format!("inject-pallet-{}", Uuid::new_v4().simple());
    let mut options = MqttOptions::new(client_id, args.host.clone(), args.port);
    options.set_keep_alive(Duration::from_secs(30));
    if let Some(username) = args.username.as_ref().filter(|u| !u.is_empty()) {
        options.set_credentials(username.clone(), args.password.clone());
    }

    let (client, mut event_loop) = AsyncClient::new(options, 10);

    println!("Connecting to MQTT broker {}:{}...", args.host, args.port);
    timeout(ACK_TIMEOUT, async {
        loop {
            if let Event::Incoming(Packet::ConnAck(_)) = event_loop.poll().await? {
                return Ok::<_, rumqttc::ConnectionError>(());
            }
        }
    })
    .await??;

    client
        .publish(NEW_PALLET_TOPIC, QoS::AtLeastOnce, false, payload.clone())
        .await?;

    timeout(ACK_TIMEOUT, async {
        loop {
            if let Event::Incoming(Packet::PubAck(_)) = event_loop.poll().await? {
                return Ok::<_, rumqttc::ConnectionError>(());
            }
        }
    })
    .await??;
    println!("Published to {NEW_PALLET_TOPIC}: {payload}");

    client.disconnect().await?;
    let _ = timeout(Duration::from_secs(1), async {
        loop {
            match event_loop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;

    Ok(())
}
