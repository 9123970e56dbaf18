//! MQTT bus adapter
//!
//! `MqttBus` publishes dashboard metrics; `TriggerListener` owns the event
//! loop. The listener never runs the pipeline itself: inbound trigger
//! messages are handed to the `TriggerDispatcher`, so keep-alive traffic keeps
//! flowing while a run is polling for its snapshot.

use crate::config::BrokerSettings;
use crate::error::{PipelineError, PipelineResult};
use crate::workflow::{DispatchOutcome, Trigger, TriggerDispatcher};
use async_trait::async_trait;
use chrono::Utc;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Request queue depth between the client handle and the event loop
const REQUEST_CAPACITY: usize = 64;

/// Wait before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Outbound side of the bus
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> PipelineResult<()>;
}

/// Broker-backed bus
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Create the client handle and its (not yet polled) event loop
    pub fn connect(settings: &BrokerSettings) -> (Self, EventLoop) {
        let client_id = format!("mvsense-{}", Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, settings.host.clone(), settings.port);
        options.set_keep_alive(settings.keep_alive);

        info!(
            host = %settings.host,
            port = settings.port,
            keep_alive_secs = settings.keep_alive.as_secs(),
            "Connecting to MQTT broker"
        );

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        (Self { client }, eventloop)
    }

    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Queue a clean disconnect behind any pending publishes
    pub async fn disconnect(&self) -> PipelineResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| PipelineError::Publish(e.to_string()))
    }
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn publish(&self, topic: &str, payload: String) -> PipelineResult<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| PipelineError::Publish(format!("{}: {}", topic, e)))
    }
}

/// What the listener made of one event loop notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerStep {
    Connected { subscribed: bool },
    Dispatched(DispatchOutcome),
    Disconnected,
    Ignored,
}

/// Drives the MQTT event loop and turns trigger messages into dispatches
pub struct TriggerListener {
    eventloop: EventLoop,
    client: AsyncClient,
    subscription: Option<(String, TriggerDispatcher)>,
}

impl TriggerListener {
    /// Listener that only keeps the connection alive (no subscription)
    pub fn new(eventloop: EventLoop, client: AsyncClient) -> Self {
        Self {
            eventloop,
            client,
            subscription: None,
        }
    }

    /// Subscribe to `topic` on every connect and dispatch its messages
    pub fn with_trigger(mut self, topic: String, dispatcher: TriggerDispatcher) -> Self {
        self.subscription = Some((topic, dispatcher));
        self
    }

    /// Poll until cancelled or until our own disconnect has been sent
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Trigger listener cancelled");
                    break;
                }
                event = self.eventloop.poll() => event,
            };

            match event {
                Ok(event) => {
                    if self.handle_event(&event) == ListenerStep::Disconnected {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "MQTT connection error, reconnecting");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }

    fn handle_event(&self, event: &Event) -> ListenerStep {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                info!("Connected to MQTT broker");
                ListenerStep::Connected {
                    subscribed: self.subscribe(),
                }
            }
            Event::Incoming(Packet::Publish(message)) => match self.dispatch(&message.topic) {
                Some(outcome) => ListenerStep::Dispatched(outcome),
                None => ListenerStep::Ignored,
            },
            Event::Outgoing(Outgoing::Disconnect) => {
                info!("Disconnected from MQTT broker");
                ListenerStep::Disconnected
            }
            _ => ListenerStep::Ignored,
        }
    }

    fn subscribe(&self) -> bool {
        let Some((topic, _)) = &self.subscription else {
            return false;
        };

        // Subscriptions are not persisted by the broker for a clean session,
        // so this runs on every ConnAck.
        match self.client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
            Ok(()) => {
                info!(topic = %topic, "Subscribed to trigger topic");
                true
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to subscribe to trigger topic");
                false
            }
        }
    }

    /// Hand a message on the trigger topic to the worker; other topics are ignored
    fn dispatch(&self, topic: &str) -> Option<DispatchOutcome> {
        let (trigger_topic, dispatcher) = self.subscription.as_ref()?;
        if topic != trigger_topic.as_str() {
            return None;
        }

        let outcome = dispatcher.dispatch(Trigger {
            topic: topic.to_string(),
            received_at: Utc::now(),
        });
        match outcome {
            DispatchOutcome::Queued => debug!("Trigger queued"),
            DispatchOutcome::Coalesced => {
                debug!("Trigger dropped, a run is already pending")
            }
            DispatchOutcome::Closed => warn!("Trigger dropped, pipeline worker has stopped"),
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, ConnectReturnCode, Publish};

    const TRIGGER_TOPIC: &str = "/merakimv/Q2GV-0001/0";

    fn listener() -> TriggerListener {
        let options = MqttOptions::new("mvsense-test", "localhost", 1883);
        let (client, eventloop) = AsyncClient::new(options, 10);
        TriggerListener::new(eventloop, client)
    }

    fn conn_ack() -> Event {
        Event::Incoming(Packet::ConnAck(ConnAck::new(ConnectReturnCode::Success, false)))
    }

    fn message(topic: &str) -> Event {
        Event::Incoming(Packet::Publish(Publish::new(
            topic,
            QoS::AtMostOnce,
            r#"{"ts": 1700000000000, "counts": {"person": 1}}"#,
        )))
    }

    #[tokio::test]
    async fn test_connack_subscribes_to_trigger_topic() {
        let (dispatcher, _rx) = TriggerDispatcher::channel();
        let listener = listener().with_trigger(TRIGGER_TOPIC.to_string(), dispatcher);

        // Every reconnect subscribes again
        assert_eq!(
            listener.handle_event(&conn_ack()),
            ListenerStep::Connected { subscribed: true }
        );
        assert_eq!(
            listener.handle_event(&conn_ack()),
            ListenerStep::Connected { subscribed: true }
        );
    }

    #[tokio::test]
    async fn test_connack_without_trigger_does_not_subscribe() {
        assert_eq!(
            listener().handle_event(&conn_ack()),
            ListenerStep::Connected { subscribed: false }
        );
    }

    #[tokio::test]
    async fn test_message_on_other_topic_is_ignored() {
        let (dispatcher, mut rx) = TriggerDispatcher::channel();
        let listener = listener().with_trigger(TRIGGER_TOPIC.to_string(), dispatcher);

        assert_eq!(
            listener.handle_event(&message("/merakimv/Q2GV-OTHER/0")),
            ListenerStep::Ignored
        );
        assert_eq!(
            listener.handle_event(&message("/merakimv/Q2GV-0001/raw_detections")),
            ListenerStep::Ignored
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_trigger_message_is_dispatched() {
        let (dispatcher, mut rx) = TriggerDispatcher::channel();
        let listener = listener().with_trigger(TRIGGER_TOPIC.to_string(), dispatcher);

        assert_eq!(
            listener.handle_event(&message(TRIGGER_TOPIC)),
            ListenerStep::Dispatched(DispatchOutcome::Queued)
        );
        assert_eq!(
            listener.handle_event(&message(TRIGGER_TOPIC)),
            ListenerStep::Dispatched(DispatchOutcome::Coalesced)
        );

        let trigger = rx.try_recv().unwrap();
        assert_eq!(trigger.topic, TRIGGER_TOPIC);
    }

    #[tokio::test]
    async fn test_messages_ignored_without_trigger() {
        assert_eq!(
            listener().handle_event(&message(TRIGGER_TOPIC)),
            ListenerStep::Ignored
        );
    }

    #[tokio::test]
    async fn test_own_disconnect_stops_listener() {
        assert_eq!(
            listener().handle_event(&Event::Outgoing(Outgoing::Disconnect)),
            ListenerStep::Disconnected
        );
    }
}
