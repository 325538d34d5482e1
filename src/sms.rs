use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::SmsError;

const VONAGE_SMS_URL: &str = "https://rest.nexmo.com/sms/json";

#[derive(Debug, Clone)]
pub struct SmsReceipt {
    pub provider_message_id: String,
}

/// Outbound SMS boundary. Treated as fallible and slow; the dispatcher makes
/// one best-effort attempt per recipient and aggregates the outcomes.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError>;
}

/// Vonage SMS API client. Credentials come from the environment; when any of
/// them is missing the gateway reports `NotConfigured` on every send and the
/// service keeps running without SMS delivery.
pub struct VonageSms {
    client: Client,
    api_key: String,
    api_secret: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct VonageResponse {
    messages: Vec<VonageMessage>,
}

#[derive(Debug, Deserialize)]
struct VonageMessage {
    status: String,
    #[serde(rename = "message-id")]
    message_id: Option<String>,
    #[serde(rename = "error-text")]
    error_text: Option<String>,
}

impl VonageSms {
    pub fn from_config(config: &AppConfig) -> Self {
        if config.vonage_api_key.is_empty()
            || config.vonage_api_secret.is_empty()
            || config.vonage_from_number.is_empty()
        {
            warn!("Missing Vonage credentials, SMS alerts will not be sent");
        }
        Self {
            client: Client::new(),
            api_key: config.vonage_api_key.clone(),
            api_secret: config.vonage_api_secret.clone(),
            from_number: config.vonage_from_number.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty() && !self.from_number.is_empty()
    }
}

#[async_trait]
impl SmsGateway for VonageSms {
    async fn send_text(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        if !self.is_configured() {
            return Err(SmsError::NotConfigured);
        }

        let params = [
            ("api_key", self.api_key.as_str()),
            ("api_secret", self.api_secret.as_str()),
            ("from", self.from_number.as_str()),
            ("to", to),
            ("text", body),
        ];

        let response: VonageResponse = self
            .client
            .post(VONAGE_SMS_URL)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.messages.first() {
            Some(msg) if msg.status == "0" => {
                let id = msg.message_id.clone().unwrap_or_default();
                debug!("SMS accepted by provider, message id {}", id);
                Ok(SmsReceipt {
                    provider_message_id: id,
                })
            }
            Some(msg) => Err(SmsError::Provider {
                status: msg.status.clone(),
                error_text: msg
                    .error_text
                    .clone()
                    .unwrap_or_else(|| "no error text available".to_string()),
            }),
            None => Err(SmsError::Provider {
                status: "unknown".to_string(),
                error_text: "empty provider response".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_success_response() {
        let raw = r#"{
            "message-count": "1",
            "messages": [{
                "to": "5215512345678",
                "message-id": "0A0000000123ABCD1",
                "status": "0",
                "remaining-balance": "3.14",
                "message-price": "0.03330000",
                "network": "33420"
            }]
        }"#;
        let parsed: VonageResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.messages[0].status, "0");
        assert_eq!(
            parsed.messages[0].message_id.as_deref(),
            Some("0A0000000123ABCD1")
        );
    }

    #[test]
    fn parses_provider_error_response() {
        let raw = r#"{
            "message-count": "1",
            "messages": [{
                "status": "2",
                "error-text": "Missing to param"
            }]
        }"#;
        let parsed: VonageResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.messages[0].status, "2");
        assert_eq!(
            parsed.messages[0].error_text.as_deref(),
            Some("Missing to param")
        );
    }
}
