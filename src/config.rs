use anyhow::Result;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub mqtt_namespace: String,
    pub mqtt_connect_timeout_secs: u64,
    pub mqtt_reconnect_backoff_secs: u64,
    pub vonage_api_key: String,
    pub vonage_api_secret: String,
    pub vonage_from_number: String,
    pub http_listen_addr: String,
    pub database_url: String,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let mqtt_broker = env::var("MQTT_BROKER_HOST").unwrap_or_else(|_| "localhost".to_string());
        let mqtt_port = env::var("MQTT_BROKER_PORT")
            .unwrap_or_else(|_| "1883".to_string())
            .parse()
            .unwrap_or(1883);
        let mqtt_username = env::var("MQTT_USERNAME").unwrap_or_default();
        let mqtt_password = env::var("MQTT_PASSWORD").unwrap_or_default();
        let mqtt_namespace =
            env::var("MQTT_NAMESPACE").unwrap_or_else(|_| "panicbutton".to_string());
        let mqtt_connect_timeout_secs = env::var("MQTT_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let mqtt_reconnect_backoff_secs = env::var("MQTT_RECONNECT_BACKOFF_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let vonage_api_key = env::var("VONAGE_API_KEY").unwrap_or_default();
        let vonage_api_secret = env::var("VONAGE_API_SECRET").unwrap_or_default();
        let vonage_from_number = env::var("VONAGE_FROM_NUMBER").unwrap_or_default();

        let http_listen_addr =
            env::var("HTTP_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "panicbutton".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "panicbutton".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "panicbutton".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            mqtt_broker,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_namespace,
            mqtt_connect_timeout_secs,
            mqtt_reconnect_backoff_secs,
            vonage_api_key,
            vonage_api_secret,
            vonage_from_number,
            http_listen_addr,
            database_url,
            log_level,
        })
    }
}
