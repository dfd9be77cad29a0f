//! MQTT broker client
//!
//! Drives the `rumqttc` event loop on its own task. Subscriptions are issued
//! when the broker acknowledges the connection. Each publish is decoded by the
//! [`TopicRouter`] and handed to the inference worker without waiting: if the
//! worker queue is full the message is dropped.
//!
//! There is no reconnect policy. The first connection error ends the task,
//! and the HTTP server keeps serving whatever the Result Store holds.

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::MqttSettings;
use crate::state::BridgeState;
use crate::topics::TopicRouter;
use crate::worker::MessageSender;

/// Capacity of the client's outgoing request channel
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Broker client: event loop plus the routing it needs
pub struct BrokerClient {
    client: AsyncClient,
    eventloop: EventLoop,
    router: TopicRouter,
    sender: MessageSender,
    state: Arc<BridgeState>,
}

impl BrokerClient {
    pub fn new(
        settings: &MqttSettings,
        router: TopicRouter,
        sender: MessageSender,
        state: Arc<BridgeState>,
    ) -> Self {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(settings.keep_alive);
        options.set_max_packet_size(settings.max_packet_bytes, settings.max_packet_bytes);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        info!(
            host = %settings.host,
            port = settings.port,
            client_id = %settings.client_id,
            "MQTT client configured"
        );

        Self {
            client,
            eventloop,
            router,
            sender,
            state,
        }
    }

    /// Run the event loop until the connection fails.
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("Connected to MQTT broker");
                        self.state.set_broker_connected(true);
                        self.subscribe();
                    } else {
                        error!(code = ?ack.code, "MQTT broker refused connection");
                        self.state.set_broker_connected(false);
                        return;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => self.dispatch(publish),
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!(pkid = ack.pkid, codes = ?ack.return_codes, "Subscription acknowledged");
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "MQTT connection error, broker client stopping");
                    self.state.set_broker_connected(false);
                    return;
                }
            }
        }
    }

    fn subscribe(&self) {
        for topic in self.router.subscriptions() {
            match self.client.try_subscribe(topic, QoS::AtMostOnce) {
                Ok(()) => info!(topic, "Subscribed"),
                Err(e) => error!(topic, error = %e, "Subscribe request failed"),
            }
        }
    }

    /// Decode a publish and enqueue it for the worker.
    fn dispatch(&self, publish: Publish) {
        let message = match self.router.route(&publish.topic, publish.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(topic = %publish.topic, error = %e, "Discarding broker message");
                crate::metrics::record_payload_error();
                return;
            }
        };

        let topic = message.topic();
        crate::metrics::record_message_received(topic);

        match self.sender.try_send(message) {
            Ok(()) => debug!(%topic, "Message queued for inference"),
            Err(TrySendError::Full(_)) => {
                warn!(%topic, "Inference queue full, dropping message");
                crate::metrics::record_message_dropped(topic);
            }
            Err(TrySendError::Closed(_)) => {
                error!(%topic, "Inference worker is gone, dropping message");
                crate::metrics::record_message_dropped(topic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::{InboundMessage, Orientation};
    use bytes::Bytes;
    use std::time::Duration;

    fn settings() -> MqttSettings {
        MqttSettings {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: "test-client".to_string(),
            keep_alive: Duration::from_secs(30),
            max_packet_bytes: 1024 * 1024,
            picture_topic: "PICTURE".to_string(),
            orientation_topic: "bssm/seonguk/project".to_string(),
        }
    }

    fn client_with_queue(
        capacity: usize,
    ) -> (BrokerClient, tokio::sync::mpsc::Receiver<InboundMessage>) {
        let (tx, rx) = crate::worker::queue(capacity);
        let client = BrokerClient::new(
            &settings(),
            TopicRouter::default(),
            tx,
            Arc::new(BridgeState::new()),
        );
        (client, rx)
    }

    fn publish(topic: &str, payload: &'static [u8]) -> Publish {
        Publish::new(topic, QoS::AtMostOnce, payload)
    }

    #[tokio::test]
    async fn test_dispatch_enqueues_typed_messages() {
        let (client, mut rx) = client_with_queue(4);

        client.dispatch(publish("bssm/seonguk/project", b"1,2,3"));
        client.dispatch(publish("PICTURE", b"\xFF\xD8"));

        assert_eq!(
            rx.recv().await,
            Some(InboundMessage::Orientation(Orientation::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(
            rx.recv().await,
            Some(InboundMessage::Picture(Bytes::from_static(b"\xFF\xD8")))
        );
    }

    #[tokio::test]
    async fn test_dispatch_discards_malformed() {
        let (client, mut rx) = client_with_queue(4);

        client.dispatch(publish("bssm/seonguk/project", b"1,2"));
        client.dispatch(publish("bssm/seonguk/project", b"a,b,c"));
        client.dispatch(publish("unknown/topic", b"1,2,3"));

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_drops_when_queue_full() {
        let (client, mut rx) = client_with_queue(1);

        client.dispatch(publish("bssm/seonguk/project", b"1,1,1"));
        client.dispatch(publish("bssm/seonguk/project", b"2,2,2"));

        assert_eq!(
            rx.recv().await,
            Some(InboundMessage::Orientation(Orientation::new(1.0, 1.0, 1.0)))
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_connection_error() {
        // Reserve a port, then release it so the broker connection is refused.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let state = Arc::new(BridgeState::new());
        state.set_broker_connected(true);
        let (tx, _rx) = crate::worker::queue(1);
        let client = BrokerClient::new(
            &MqttSettings {
                port,
                ..settings()
            },
            TopicRouter::default(),
            tx,
            state.clone(),
        );

        tokio::time::timeout(Duration::from_secs(5), client.run())
            .await
            .expect("broker client should stop after the first connection error");

        assert!(!state.is_broker_connected());
    }
}
