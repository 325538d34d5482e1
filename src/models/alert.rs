use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: i64,
    pub user_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub alert_type_id: Option<i64>,
    // Column name kept from the production schema.
    pub dive_type_id: Option<i64>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub created_at: NaiveDateTime,
    pub message_sent: Option<bool>,
    pub active: Option<bool>,
    pub call_made: Option<bool>,
}

/// Fields accepted when creating or updating an alert. `active` defaults to
/// true on insert; unset fields are left untouched on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertInput {
    pub user_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub alert_type_id: Option<i64>,
    pub dive_type_id: Option<i64>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub message_sent: Option<bool>,
    pub active: Option<bool>,
    pub call_made: Option<bool>,
}
