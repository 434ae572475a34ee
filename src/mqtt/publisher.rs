use std::time::Duration;

use confab_config::MqttConfig;
use confab_error::{AppError, AppResult};
use confab_types::Message;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, error, info, warn};

use super::types::{direct_topic, group_topic, FanoutPayload};

/// Best-effort publisher of persisted messages to the MQTT broker.
///
/// The publisher never decides whether a request succeeds: messages are
/// already committed to Postgres before anything is handed to it, and callers
/// log publish failures instead of propagating them.
pub struct FanoutPublisher {
    client: Option<AsyncClient>,
    enabled: bool,
}

impl FanoutPublisher {
    /// Build the publisher from configuration.
    ///
    /// Returns the event loop that drives the broker connection; the caller
    /// hands it to [`spawn_event_loop`]. With `MQTT_ENABLED=false` no client
    /// is created and every publish is a no-op.
    pub fn connect(config: &MqttConfig) -> (Self, Option<EventLoop>) {
        if !config.enabled {
            info!("MQTT fan-out disabled (MQTT_ENABLED=false)");
            return (
                Self {
                    client: None,
                    enabled: false,
                },
                None,
            );
        }

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        info!(
            broker = %config.host,
            port = config.port,
            client_id = %config.client_id,
            "Connecting MQTT fan-out publisher"
        );

        let (client, event_loop) = AsyncClient::new(options, 64);
        (
            Self {
                client: Some(client),
                enabled: true,
            },
            Some(event_loop),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Publish a direct message to the receiver's user topic.
    pub async fn publish_direct(&self, message: &Message) -> AppResult<()> {
        let receiver_id = message
            .target
            .receiver_id()
            .ok_or_else(|| AppError::publish("direct fan-out needs a receiver target"))?;

        self.publish(direct_topic(receiver_id), FanoutPayload::from(message))
            .await
    }

    /// Publish a group message to the group's topic.
    pub async fn publish_group(&self, message: &Message) -> AppResult<()> {
        let group_id = message
            .target
            .group_id()
            .ok_or_else(|| AppError::publish("group fan-out needs a group target"))?;

        self.publish(group_topic(group_id), FanoutPayload::from(message))
            .await
    }

    async fn publish(&self, topic: String, payload: FanoutPayload) -> AppResult<()> {
        let Some(client) = &self.client else {
            return Ok(());
        };

        let bytes = serde_json::to_vec(&payload)
            .map_err(|err| AppError::publish(format!("payload serialization failed: {}", err)))?;

        client
            .publish(&topic, QoS::AtLeastOnce, false, bytes)
            .await
            .map_err(|err| AppError::publish(format!("publish to {} failed: {}", topic, err)))?;

        debug!(topic = %topic, message_id = %payload.id, "Message handed to MQTT fan-out");
        Ok(())
    }

    /// Ask the broker for a clean disconnect. Called on shutdown.
    pub async fn disconnect(&self) {
        if let Some(client) = &self.client {
            if let Err(err) = client.disconnect().await {
                warn!(error = %err, "MQTT disconnect failed");
            }
        }
    }
}

/// Drive the broker connection until the process exits.
///
/// rumqttc requires its event loop to be polled for publishes to make
/// progress. Connection errors are logged and retried after a short pause;
/// the request queue keeps buffering in the meantime.
pub fn spawn_event_loop(mut event_loop: EventLoop) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker");
                }
                Ok(_) => {}
                Err(err) => {
                    error!(error = %err, "MQTT connection error, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    })
}
