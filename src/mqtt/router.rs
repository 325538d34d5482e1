use serde_json::Value;
use tracing::{debug, info, warn};

/// Message classes recognized on the broker, one per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    Alert,
    Location,
    Status,
    Device,
    System,
}

type Predicate = fn(topic: &str, namespace: &str) -> bool;

// Evaluated top-down; first match wins. New topic classes are added here
// instead of growing a conditional chain.
const ROUTES: &[(MessageClass, Predicate)] = &[
    (MessageClass::Alert, |t, _| t.contains("/alerts/")),
    (MessageClass::Location, |t, _| t.contains("/location")),
    (MessageClass::Status, |t, _| t.contains("/status")),
    (MessageClass::Device, |t, ns| {
        t.strip_prefix(ns).is_some_and(|rest| rest.starts_with("/devices/"))
    }),
    (MessageClass::System, |t, ns| {
        t.strip_prefix(ns).is_some_and(|rest| rest.starts_with("/system/"))
    }),
];

/// Classifies inbound messages by topic shape and hands them to per-class
/// handlers. Stateless; invoked inline from the event loop so messages are
/// handled in delivery order. Handlers only observe and log; anything that
/// mutates persisted state lives behind its own collaborator.
pub struct TopicRouter {
    namespace: String,
}

impl TopicRouter {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }

    pub fn classify(&self, topic: &str) -> Option<MessageClass> {
        ROUTES
            .iter()
            .find(|(_, matches)| matches(topic, &self.namespace))
            .map(|(class, _)| *class)
    }

    pub fn route(&self, topic: &str, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        // A JSON parse failure is not an error, the payload is just opaque.
        match serde_json::from_str::<Value>(&text) {
            Ok(json) => debug!("Message on {}: {}", topic, json),
            Err(_) => debug!("Message on {}: {:?}", topic, text),
        }

        match self.classify(topic) {
            Some(MessageClass::Alert) => self.handle_alert(topic),
            Some(MessageClass::Location) => self.handle_location(topic),
            Some(MessageClass::Status) => self.handle_status(topic),
            Some(MessageClass::Device) => self.handle_device(topic),
            Some(MessageClass::System) => self.handle_system(topic),
            None => warn!("Unrouted message on {}, dropping", topic),
        }
    }

    fn handle_alert(&self, topic: &str) {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() >= 4 {
            info!("Alert of type '{}' from user {}", parts[3], parts[1]);
        } else if parts.len() >= 2 {
            info!("Alert from user {}", parts[1]);
        }
    }

    fn handle_location(&self, topic: &str) {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() >= 2 {
            info!("Location update for user {}", parts[1]);
        }
    }

    fn handle_status(&self, topic: &str) {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() >= 2 {
            info!("Status update for user {}", parts[1]);
        }
    }

    fn handle_device(&self, topic: &str) {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() >= 3 {
            info!("Device message from device {}", parts[2]);
        }
    }

    fn handle_system(&self, topic: &str) {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() >= 3 {
            info!("System message: {}", parts[2]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> TopicRouter {
        TopicRouter::new("panicbutton")
    }

    #[test]
    fn classifies_user_topics() {
        let r = router();
        assert_eq!(
            r.classify("panicbutton/42/alerts/panic"),
            Some(MessageClass::Alert)
        );
        assert_eq!(
            r.classify("panicbutton/42/location"),
            Some(MessageClass::Location)
        );
        assert_eq!(
            r.classify("panicbutton/42/status"),
            Some(MessageClass::Status)
        );
    }

    #[test]
    fn classifies_namespace_topics() {
        let r = router();
        assert_eq!(
            r.classify("panicbutton/system/heartbeat"),
            Some(MessageClass::System)
        );
        assert_eq!(
            r.classify("panicbutton/devices/d7/config"),
            Some(MessageClass::Device)
        );
    }

    #[test]
    fn device_status_topics_hit_the_status_handler_first() {
        // `/status` is checked before the devices prefix, so a device status
        // message is handled as a status update.
        let r = router();
        assert_eq!(
            r.classify("panicbutton/devices/d7/status"),
            Some(MessageClass::Status)
        );
    }

    #[test]
    fn unknown_topics_are_unrouted() {
        let r = router();
        assert_eq!(r.classify("unrelated/topic"), None);
        assert_eq!(r.classify("otherns/system/heartbeat"), None);
    }

    #[test]
    fn routing_never_panics_on_malformed_payloads() {
        let r = router();
        r.route("panicbutton/42/alerts/panic", br#"{"lat": 1.0}"#);
        r.route("panicbutton/42/location", b"not json at all");
        r.route("panicbutton/system/heartbeat", &[0xff, 0xfe, 0x00]);
        r.route("unrelated/topic", b"{}");
        r.route("panicbutton", b"short topic");
    }
}
