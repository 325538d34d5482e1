use anyhow::Result;
use async_trait::async_trait;

use crate::db::{queries, DbPool};
use crate::models::alert::{Alert, AlertInput};
use crate::models::alert_type::AlertType;
use crate::models::device_type::DeviceType;
use crate::models::emergency_contact::EmergencyContact;
use crate::models::user::User;

/// Persistence boundary for the dispatch pipeline. All lookups are by
/// primary key; absence is a normal outcome (`Ok(None)` / empty vec).
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn create_alert(&self, input: &AlertInput) -> Result<Alert>;
    async fn find_alert_type(&self, id: i64) -> Result<Option<AlertType>>;
    async fn find_device_type(&self, id: i64) -> Result<Option<DeviceType>>;
    async fn find_user(&self, id: i64) -> Result<Option<User>>;
    async fn find_active_contacts_by_user(&self, user_id: i64) -> Result<Vec<EmergencyContact>>;

    async fn find_all_active(&self) -> Result<Vec<Alert>>;
    async fn find_active_by_user(&self, user_id: i64) -> Result<Vec<Alert>>;
    async fn find_active(&self, id: i64) -> Result<Option<Alert>>;
    async fn update_alert(&self, id: i64, input: &AlertInput) -> Result<Option<Alert>>;
    async fn toggle_active(&self, id: i64) -> Result<Option<Alert>>;
    async fn delete_alert(&self, id: i64) -> Result<Option<Alert>>;
}

pub struct PgAlertStore {
    pool: DbPool,
}

impl PgAlertStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn create_alert(&self, input: &AlertInput) -> Result<Alert> {
        let alert = sqlx::query_as::<_, Alert>(queries::INSERT_ALERT)
            .bind(input.user_id)
            .bind(input.contact_id)
            .bind(input.alert_type_id)
            .bind(input.dive_type_id)
            .bind(input.location_lat)
            .bind(input.location_lng)
            .bind(input.message_sent)
            .bind(input.active)
            .bind(input.call_made)
            .fetch_one(&self.pool)
            .await?;
        Ok(alert)
    }

    async fn find_alert_type(&self, id: i64) -> Result<Option<AlertType>> {
        let row = sqlx::query_as::<_, AlertType>(queries::SELECT_ALERT_TYPE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_device_type(&self, id: i64) -> Result<Option<DeviceType>> {
        let row = sqlx::query_as::<_, DeviceType>(queries::SELECT_DEVICE_TYPE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(queries::SELECT_USER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_active_contacts_by_user(&self, user_id: i64) -> Result<Vec<EmergencyContact>> {
        let rows = sqlx::query_as::<_, EmergencyContact>(queries::SELECT_ACTIVE_CONTACTS_BY_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_all_active(&self) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, Alert>(queries::SELECT_ACTIVE_ALERTS)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_active_by_user(&self, user_id: i64) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, Alert>(queries::SELECT_ACTIVE_ALERTS_BY_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_active(&self, id: i64) -> Result<Option<Alert>> {
        let row = sqlx::query_as::<_, Alert>(queries::SELECT_ACTIVE_ALERT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_alert(&self, id: i64, input: &AlertInput) -> Result<Option<Alert>> {
        // Updates only target alerts that are still active.
        let existing = self.find_active(id).await?;
        if existing.is_none() {
            return Ok(None);
        }
        let row = sqlx::query_as::<_, Alert>(queries::UPDATE_ALERT)
            .bind(id)
            .bind(input.user_id)
            .bind(input.contact_id)
            .bind(input.alert_type_id)
            .bind(input.dive_type_id)
            .bind(input.location_lat)
            .bind(input.location_lng)
            .bind(input.message_sent)
            .bind(input.active)
            .bind(input.call_made)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn toggle_active(&self, id: i64) -> Result<Option<Alert>> {
        let row = sqlx::query_as::<_, Alert>(queries::TOGGLE_ALERT_ACTIVE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_alert(&self, id: i64) -> Result<Option<Alert>> {
        let row = sqlx::query_as::<_, Alert>(queries::DELETE_ALERT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
