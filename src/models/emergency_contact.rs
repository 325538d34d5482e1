use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Belongs to exactly one user. Only rows with `active = true` are eligible
/// notification targets.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmergencyContact {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub relationship: Option<String>,
    pub active: Option<bool>,
}

impl EmergencyContact {
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}
