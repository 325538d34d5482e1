use thiserror::Error;

/// Hard failures of the notification dispatch pipeline. Per-recipient
/// delivery failures are aggregated in `DispatchResult`, never raised here.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing prerequisite for alert {alert_id}: {missing}")]
    PrerequisiteMissing { alert_id: i64, missing: &'static str },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("mqtt client not connected")]
    NotConnected,
    #[error("malformed topic: {0:?}")]
    MalformedTopic(String),
    #[error("invalid qos level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),
    #[error("mqtt request failed: {0}")]
    Client(#[from] rumqttc::ClientError),
}

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("sms gateway not configured")]
    NotConfigured,
    #[error("provider rejected message (status {status}): {error_text}")]
    Provider { status: String, error_text: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
