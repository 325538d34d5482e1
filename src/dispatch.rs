use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::db::store::AlertStore;
use crate::error::DispatchError;
use crate::formatter::sanitize_for_sms;
use crate::models::alert::{Alert, AlertInput};
use crate::models::alert_type::AlertType;
use crate::models::emergency_contact::EmergencyContact;
use crate::models::user::User;
use crate::sms::SmsGateway;

// Per-field budgets keep the rendered body inside a single SMS segment.
const NAME_BUDGET: usize = 20;
const TYPE_BUDGET: usize = 15;
const DESCRIPTION_BUDGET: usize = 70;
const MAX_CONCURRENT_SENDS: usize = 4;

// The real-time view URL is not generated yet.
const REAL_TIME_VIEW_PLACEHOLDER: &str = "(link aqui)";

/// Aggregate per-recipient outcomes of one dispatch. `attempted` counts
/// contacts with a usable phone number; `skipped` the ones without.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DispatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Terminal delivery state for a single recipient. No automatic retry: a
/// future alert triggers an entirely new dispatch.
#[derive(Debug)]
enum DeliveryOutcome {
    Sent { provider_message_id: String },
    Skipped,
    Failed(String),
}

/// The rendered body plus per-contact outcomes. Owned by one dispatch
/// invocation and discarded after logging.
#[derive(Debug)]
struct NotificationMessage {
    body: String,
    outcomes: Vec<(String, DeliveryOutcome)>,
}

fn prerequisite(alert_id: i64, missing: &'static str) -> DispatchError {
    DispatchError::PrerequisiteMissing { alert_id, missing }
}

/// Notifies every active emergency contact of the alert's user, one SMS
/// attempt per contact. A single recipient's failure never aborts delivery
/// to the rest; only missing prerequisites (alert type, device type, user,
/// contact set) surface as errors, and the stored alert is left intact
/// either way.
pub async fn dispatch_alert(
    store: &dyn AlertStore,
    gateway: &dyn SmsGateway,
    alert: &Alert,
) -> Result<DispatchResult, DispatchError> {
    let user_id = alert.user_id.ok_or_else(|| prerequisite(alert.id, "user"))?;
    let alert_type_id = alert
        .alert_type_id
        .ok_or_else(|| prerequisite(alert.id, "alert type"))?;
    let device_type_id = alert
        .dive_type_id
        .ok_or_else(|| prerequisite(alert.id, "device type"))?;

    let alert_type = store
        .find_alert_type(alert_type_id)
        .await?
        .ok_or_else(|| prerequisite(alert.id, "alert type"))?;
    let device_type = store
        .find_device_type(device_type_id)
        .await?
        .ok_or_else(|| prerequisite(alert.id, "device type"))?;
    let user = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| prerequisite(alert.id, "user"))?;
    let contacts = store.find_active_contacts_by_user(user_id).await?;
    if contacts.is_empty() {
        return Err(prerequisite(alert.id, "emergency contacts"));
    }

    let body = render_message(&user, &alert_type, alert);
    info!(
        "Dispatching alert {} for user {} ({} contacts, device type {})",
        alert.id,
        user_id,
        contacts.len(),
        device_type.name.as_deref().unwrap_or("unknown"),
    );

    let outcomes: Vec<(String, DeliveryOutcome)> = stream::iter(contacts)
        .map(|contact| deliver(gateway, contact, &body))
        .buffer_unordered(MAX_CONCURRENT_SENDS)
        .collect()
        .await;

    let message = NotificationMessage { body, outcomes };
    debug!(
        "SMS body ({} chars):\n{}",
        message.body.len(),
        message.body
    );
    let mut result = DispatchResult::default();
    for (contact, outcome) in &message.outcomes {
        match outcome {
            DeliveryOutcome::Sent { provider_message_id } => {
                result.attempted += 1;
                result.succeeded += 1;
                info!("SMS to {} accepted, message id {}", contact, provider_message_id);
            }
            DeliveryOutcome::Failed(reason) => {
                result.attempted += 1;
                result.failed += 1;
                error!("SMS to {} failed: {}", contact, reason);
            }
            DeliveryOutcome::Skipped => result.skipped += 1,
        }
    }
    info!(
        "Alert {} dispatch done: {} attempted, {} succeeded, {} failed, {} skipped",
        alert.id, result.attempted, result.succeeded, result.failed, result.skipped
    );
    Ok(result)
}

/// Creates the alert record, then runs notification dispatch as a best-effort
/// post-step. Creation success is independent of notification success: a
/// failed dispatch is reported back but the record is never rolled back.
pub async fn create_and_dispatch(
    store: &dyn AlertStore,
    gateway: &dyn SmsGateway,
    input: &AlertInput,
) -> anyhow::Result<(Alert, Result<DispatchResult, DispatchError>)> {
    let alert = store.create_alert(input).await?;
    let dispatched = dispatch_alert(store, gateway, &alert).await;
    if let Err(err) = &dispatched {
        warn!("Alert {} stored but not dispatched: {}", alert.id, err);
    }
    Ok((alert, dispatched))
}

async fn deliver(
    gateway: &dyn SmsGateway,
    contact: EmergencyContact,
    body: &str,
) -> (String, DeliveryOutcome) {
    let name = contact.display_name();
    let phone = contact.phone_number.as_deref().unwrap_or("").trim();
    if phone.is_empty() {
        warn!("Contact {} has no usable phone number, skipping SMS", name);
        return (name, DeliveryOutcome::Skipped);
    }

    info!("Attempting to send SMS alert to {} ({})", name, phone);
    match gateway.send_text(phone, body).await {
        Ok(receipt) => (
            name,
            DeliveryOutcome::Sent {
                provider_message_id: receipt.provider_message_id,
            },
        ),
        Err(err) => (name, DeliveryOutcome::Failed(err.to_string())),
    }
}

fn render_message(user: &User, alert_type: &AlertType, alert: &Alert) -> String {
    let name = sanitize_for_sms(&user.full_name(), NAME_BUDGET);
    let kind = sanitize_for_sms(alert_type.name.as_deref().unwrap_or(""), TYPE_BUDGET);
    let info = sanitize_for_sms(
        alert_type.description.as_deref().unwrap_or(""),
        DESCRIPTION_BUDGET,
    );
    format!(
        "ALERTA!\n{}\nTipo: {}\nInfo: {}\nUbicacion: {},{}\nVer: {}\n",
        name,
        kind,
        info,
        alert.location_lat.unwrap_or_default(),
        alert.location_lng.unwrap_or_default(),
        REAL_TIME_VIEW_PLACEHOLDER,
    )
}
