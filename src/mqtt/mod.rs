use crate::config::AppConfig;
use crate::error::TransportError;
use crate::mqtt::router::TopicRouter;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub mod router;

/// One persistent broker connection per process. The connected flag is
/// mutated only by this client's own event handling; everyone else observes
/// it through `is_connected`.
pub struct MqttClient {
    client: AsyncClient,
    connected: AtomicBool,
    namespace: String,
}

/// Topic patterns the client subscribes to on every successful connect.
fn system_topics(namespace: &str) -> [String; 5] {
    [
        format!("{}/+/alerts/+", namespace),
        format!("{}/+/location", namespace),
        format!("{}/+/status", namespace),
        format!("{}/devices/+/status", namespace),
        format!("{}/system/+", namespace),
    ]
}

fn qos_from_level(level: u8) -> Result<QoS, TransportError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(TransportError::InvalidQos(other)),
    }
}

/// Connects to the broker and spawns the event loop for the lifetime of the
/// process. Waits at most `mqtt_connect_timeout_secs` for the first CONNACK:
/// a broker outage at boot does not block startup, the loop keeps retrying
/// in the background with a fixed backoff.
pub async fn start(config: &AppConfig, router: TopicRouter) -> anyhow::Result<Arc<MqttClient>> {
    let client_id = format!("panicbutton-{}", Uuid::new_v4());
    let mut mqttoptions = MqttOptions::new(client_id, &config.mqtt_broker, config.mqtt_port);
    mqttoptions.set_keep_alive(Duration::from_secs(60));
    if !config.mqtt_username.is_empty() {
        mqttoptions.set_credentials(&config.mqtt_username, &config.mqtt_password);
    }

    let (client, eventloop) = AsyncClient::new(mqttoptions, 100);
    let me = Arc::new(MqttClient {
        client,
        connected: AtomicBool::new(false),
        namespace: config.mqtt_namespace.clone(),
    });

    let first_connect = Arc::new(Notify::new());
    let backoff = Duration::from_secs(config.mqtt_reconnect_backoff_secs);
    tokio::spawn(run_event_loop(
        me.clone(),
        eventloop,
        router,
        first_connect.clone(),
        backoff,
    ));

    let connect_timeout = Duration::from_secs(config.mqtt_connect_timeout_secs);
    if tokio::time::timeout(connect_timeout, first_connect.notified())
        .await
        .is_err()
    {
        warn!(
            "No MQTT connection after {}s, continuing startup; client keeps retrying every {}s",
            connect_timeout.as_secs(),
            backoff.as_secs()
        );
    }

    Ok(me)
}

async fn run_event_loop(
    me: Arc<MqttClient>,
    mut eventloop: EventLoop,
    router: TopicRouter,
    first_connect: Arc<Notify>,
    backoff: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(event) => me.handle_event(event, &router, &first_connect).await,
            Err(e) => {
                me.mark_disconnected(&e);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

impl MqttClient {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn handle_event(&self, event: Event, router: &TopicRouter, first_connect: &Notify) {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                self.connected.store(true, Ordering::SeqCst);
                info!("Connected to MQTT broker");
                first_connect.notify_one();
                self.subscribe_system_topics().await;
            }
            Event::Incoming(Packet::Publish(publish)) => {
                router.route(&publish.topic, &publish.payload);
            }
            Event::Incoming(Packet::SubAck(_)) => {
                debug!("Subscription confirmed");
            }
            Event::Incoming(Packet::Disconnect) => {
                self.connected.store(false, Ordering::SeqCst);
                warn!("MQTT broker closed the connection");
            }
            _ => {}
        }
    }

    fn mark_disconnected(&self, reason: &dyn Display) {
        self.connected.store(false, Ordering::SeqCst);
        error!("MQTT connection error: {}", reason);
    }

    async fn subscribe_system_topics(&self) {
        for topic in system_topics(&self.namespace) {
            match self.client.subscribe(&topic, QoS::AtLeastOnce).await {
                Ok(()) => info!("Subscribed to {}", topic),
                // Non-fatal: the connection stays usable without the topic.
                Err(e) => error!("Failed to subscribe to {}: {}", topic, e),
            }
        }
    }

    fn checked_topic<'a>(&self, topic: &'a str) -> Result<&'a str, TransportError> {
        if topic.trim().is_empty() {
            return Err(TransportError::MalformedTopic(topic.to_string()));
        }
        Ok(topic)
    }

    pub async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: u8,
        retain: bool,
    ) -> Result<(), TransportError> {
        let topic = self.checked_topic(topic)?;
        let qos = qos_from_level(qos)?;
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.client
            .publish(topic, qos, retain, payload.as_bytes().to_vec())
            .await?;
        debug!("Published {} bytes to {}", payload.len(), topic);
        Ok(())
    }

    pub async fn subscribe(&self, topic: &str, qos: u8) -> Result<(), TransportError> {
        let topic = self.checked_topic(topic)?;
        let qos = qos_from_level(qos)?;
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.client.subscribe(topic, qos).await?;
        info!("Subscribed to {}", topic);
        Ok(())
    }

    pub async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        let topic = self.checked_topic(topic)?;
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.client.unsubscribe(topic).await?;
        info!("Unsubscribed from {}", topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, ConnectReturnCode};

    fn detached_client() -> (MqttClient, EventLoop) {
        let mqttoptions = MqttOptions::new("test-client", "127.0.0.1", 1883);
        let (client, eventloop) = AsyncClient::new(mqttoptions, 10);
        (
            MqttClient {
                client,
                connected: AtomicBool::new(false),
                namespace: "panicbutton".to_string(),
            },
            eventloop,
        )
    }

    fn connack() -> Event {
        Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        }))
    }

    #[test]
    fn starts_disconnected() {
        let (client, _eventloop) = detached_client();
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn connack_and_close_flip_the_connected_flag() {
        let (client, _eventloop) = detached_client();
        let router = TopicRouter::new("panicbutton");
        let notify = Notify::new();

        client.handle_event(connack(), &router, &notify).await;
        assert!(client.is_connected());

        client
            .handle_event(Event::Incoming(Packet::Disconnect), &router, &notify)
            .await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn connection_error_marks_disconnected_without_panicking() {
        let (client, _eventloop) = detached_client();
        let router = TopicRouter::new("panicbutton");
        let notify = Notify::new();

        client.handle_event(connack(), &router, &notify).await;
        client.mark_disconnected(&"simulated connection reset");
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn operations_while_disconnected_are_rejected() {
        let (client, _eventloop) = detached_client();

        let err = client
            .publish("panicbutton/1/location", "{}", 1, false)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));

        let err = client.subscribe("panicbutton/system/+", 1).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));

        let err = client.unsubscribe("panicbutton/system/+").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn invalid_qos_and_empty_topic_are_rejected() {
        let (client, _eventloop) = detached_client();
        let router = TopicRouter::new("panicbutton");
        let notify = Notify::new();
        client.handle_event(connack(), &router, &notify).await;

        let err = client.publish("a/topic", "x", 3, false).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidQos(3)));

        let err = client.publish("   ", "x", 0, false).await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedTopic(_)));
    }

    #[test]
    fn system_topic_set_covers_all_classes() {
        let topics = system_topics("panicbutton");
        assert!(topics.contains(&"panicbutton/+/alerts/+".to_string()));
        assert!(topics.contains(&"panicbutton/+/location".to_string()));
        assert!(topics.contains(&"panicbutton/+/status".to_string()));
        assert!(topics.contains(&"panicbutton/devices/+/status".to_string()));
        assert!(topics.contains(&"panicbutton/system/+".to_string()));
    }
}
