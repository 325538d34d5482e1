pub mod alert;
pub mod alert_type;
pub mod device_type;
pub mod emergency_contact;
pub mod user;
