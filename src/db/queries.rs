pub const INSERT_ALERT: &str = r#"
INSERT INTO alerts (user_id, contact_id, alert_type_id, dive_type_id, location_lat, location_lng, message_sent, active, call_made)
VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, false), COALESCE($8, true), COALESCE($9, false))
RETURNING *;
"#;

pub const SELECT_ALERT_TYPE: &str = r#"
SELECT * FROM alert_types WHERE id = $1;
"#;

pub const SELECT_DEVICE_TYPE: &str = r#"
SELECT * FROM device_types WHERE id = $1;
"#;

pub const SELECT_USER: &str = r#"
SELECT * FROM users WHERE id = $1;
"#;

pub const SELECT_ACTIVE_CONTACTS_BY_USER: &str = r#"
SELECT * FROM emergency_contacts WHERE user_id = $1 AND active = true;
"#;

pub const SELECT_ACTIVE_ALERTS: &str = r#"
SELECT * FROM alerts WHERE active = true ORDER BY created_at DESC;
"#;

pub const SELECT_ACTIVE_ALERTS_BY_USER: &str = r#"
SELECT * FROM alerts WHERE user_id = $1 AND active = true ORDER BY created_at DESC;
"#;

pub const SELECT_ACTIVE_ALERT: &str = r#"
SELECT * FROM alerts WHERE id = $1 AND active = true;
"#;

pub const UPDATE_ALERT: &str = r#"
UPDATE alerts
SET user_id = COALESCE($2, user_id),
    contact_id = COALESCE($3, contact_id),
    alert_type_id = COALESCE($4, alert_type_id),
    dive_type_id = COALESCE($5, dive_type_id),
    location_lat = COALESCE($6, location_lat),
    location_lng = COALESCE($7, location_lng),
    message_sent = COALESCE($8, message_sent),
    active = COALESCE($9, active),
    call_made = COALESCE($10, call_made)
WHERE id = $1
RETURNING *;
"#;

pub const TOGGLE_ALERT_ACTIVE: &str = r#"
UPDATE alerts SET active = NOT COALESCE(active, false) WHERE id = $1 RETURNING *;
"#;

pub const DELETE_ALERT: &str = r#"
DELETE FROM alerts WHERE id = $1 RETURNING *;
"#;
