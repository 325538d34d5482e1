use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertType {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub name: Option<String>,
    pub description: Option<String>,
}
