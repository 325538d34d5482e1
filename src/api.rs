use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::store::AlertStore;
use crate::dispatch::{self, DispatchResult};
use crate::error::TransportError;
use crate::models::alert::{Alert, AlertInput};
use crate::mqtt::MqttClient;
use crate::sms::SmsGateway;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AlertStore>,
    pub gateway: Arc<dyn SmsGateway>,
    pub mqtt: Arc<MqttClient>,
}

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    BrokerUnavailable,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BrokerUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MQTT client not connected".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Store error: {}", err);
        ApiError::Internal("internal error".to_string())
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => ApiError::BrokerUnavailable,
            TransportError::MalformedTopic(_) | TransportError::InvalidQos(_) => {
                ApiError::BadRequest(err.to_string())
            }
            TransportError::Client(e) => ApiError::Internal(e.to_string()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/alerts", post(create_alert).get(list_alerts))
        .route(
            "/alerts/{id}",
            get(get_alert).patch(update_alert).delete(remove_alert),
        )
        .route("/alerts/{id}/toggle", patch(toggle_alert))
        .route("/users/{id}/alerts", get(list_user_alerts))
        .route("/mqtt/status", get(mqtt_status))
        .route("/mqtt/publish", post(mqtt_publish))
        .route("/mqtt/subscribe", post(mqtt_subscribe))
        .route("/mqtt/unsubscribe", delete(mqtt_unsubscribe).post(mqtt_unsubscribe))
        .with_state(state)
}

pub async fn serve(listen_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("HTTP API listening on {}", listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct CreateAlertResponse {
    alert: Alert,
    dispatch: Option<DispatchResult>,
    dispatch_error: Option<String>,
}

/// Creation always succeeds when the insert does; the notification fan-out
/// runs afterwards and its outcome (or precondition failure) is reported in
/// the response instead of failing the request.
async fn create_alert(
    State(state): State<AppState>,
    Json(input): Json<AlertInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (alert, dispatched) =
        dispatch::create_and_dispatch(state.store.as_ref(), state.gateway.as_ref(), &input)
            .await?;
    let (dispatch, dispatch_error) = match dispatched {
        Ok(result) => (Some(result), None),
        Err(err) => (None, Some(err.to_string())),
    };
    Ok((
        StatusCode::CREATED,
        Json(CreateAlertResponse {
            alert,
            dispatch,
            dispatch_error,
        }),
    ))
}

async fn list_alerts(State(state): State<AppState>) -> Result<Json<Vec<Alert>>, ApiError> {
    let alerts = state.store.find_all_active().await?;
    Ok(Json(alerts))
}

async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state
        .store
        .find_active(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Alert with ID {} not found", id)))?;
    Ok(Json(alert))
}

async fn list_user_alerts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let alerts = state.store.find_active_by_user(id).await?;
    if alerts.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No active alerts found for user ID {}",
            id
        )));
    }
    Ok(Json(alerts))
}

async fn update_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AlertInput>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state
        .store
        .update_alert(id, &input)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Alert with ID {} not found", id)))?;
    Ok(Json(alert))
}

async fn toggle_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state
        .store
        .toggle_active(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Alert with ID {} not found", id)))?;
    Ok(Json(alert))
}

async fn remove_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state
        .store
        .delete_alert(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Alert with ID {} not found", id)))?;
    Ok(Json(alert))
}

fn default_publish_qos() -> u8 {
    0
}

fn default_subscribe_qos() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    topic: String,
    payload: String,
    #[serde(default = "default_publish_qos")]
    qos: u8,
    #[serde(default)]
    retain: bool,
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    topic: String,
    #[serde(default = "default_subscribe_qos")]
    qos: u8,
}

#[derive(Debug, Deserialize)]
struct UnsubscribeRequest {
    topic: String,
}

async fn mqtt_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "connected": state.mqtt.is_connected() }))
}

async fn mqtt_publish(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .mqtt
        .publish(&req.topic, &req.payload, req.qos, req.retain)
        .await?;
    Ok(Json(json!({ "published": true, "topic": req.topic })))
}

async fn mqtt_subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.mqtt.subscribe(&req.topic, req.qos).await?;
    Ok(Json(json!({ "subscribed": true, "topic": req.topic })))
}

async fn mqtt_unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.mqtt.unsubscribe(&req.topic).await?;
    Ok(Json(json!({ "unsubscribed": true, "topic": req.topic })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_request_defaults() {
        let req: PublishRequest =
            serde_json::from_str(r#"{"topic": "panicbutton/1/location", "payload": "{}"}"#)
                .unwrap();
        assert_eq!(req.qos, 0);
        assert!(!req.retain);

        let req: PublishRequest = serde_json::from_str(
            r#"{"topic": "t", "payload": "p", "qos": 2, "retain": true}"#,
        )
        .unwrap();
        assert_eq!(req.qos, 2);
        assert!(req.retain);
    }

    #[test]
    fn subscribe_request_defaults_to_qos_1() {
        let req: SubscribeRequest =
            serde_json::from_str(r#"{"topic": "panicbutton/system/+"}"#).unwrap();
        assert_eq!(req.qos, 1);
    }
}
