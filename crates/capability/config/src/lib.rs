//! 桥接服务运行配置加载。

use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("conflicting env: {0} and {1} are mutually exclusive")]
    Conflict(String, String),
}

/// InfluxDB 认证方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAuth {
    None,
    Token(String),
    /// 已 base64 编码的 `user:password`。
    Basic(String),
}

/// 双向 TLS 材料路径（三者齐全才启用 TLS）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub ca_cert: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

/// 桥接服务运行配置。
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub influx_url: String,
    pub influx_auth: StoreAuth,
    pub influx_org: String,
    pub influx_bucket: String,
    pub influx_timeout_seconds: u64,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_topic: String,
    pub mqtt_qos: u8,
    pub mqtt_client_id: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_tls: Option<TlsPaths>,
    pub timezone: Tz,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
    pub retry_jitter: bool,
    pub stats_interval_seconds: u64,
}

impl BridgeConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let influx_url = env::var("BRIDGE_INFLUX_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8086".to_string());
        let influx_auth = match (
            read_optional("BRIDGE_INFLUX_TOKEN"),
            read_optional("BRIDGE_INFLUX_BASIC_AUTH"),
        ) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Conflict(
                    "BRIDGE_INFLUX_TOKEN".to_string(),
                    "BRIDGE_INFLUX_BASIC_AUTH".to_string(),
                ));
            }
            (Some(token), None) => StoreAuth::Token(token),
            (None, Some(basic)) => StoreAuth::Basic(basic),
            (None, None) => StoreAuth::None,
        };
        let influx_org = env::var("BRIDGE_INFLUX_ORG").unwrap_or_else(|_| "-".to_string());
        let influx_bucket =
            env::var("BRIDGE_INFLUX_BUCKET").unwrap_or_else(|_| "mqtt/autogen".to_string());
        let influx_timeout_seconds = read_u64_with_default("BRIDGE_INFLUX_TIMEOUT_SECONDS", 10)?;
        if influx_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "BRIDGE_INFLUX_TIMEOUT_SECONDS".to_string(),
                "0".to_string(),
            ));
        }
        let mqtt_host = env::var("BRIDGE_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("BRIDGE_MQTT_PORT", 1883)?;
        let mqtt_topic = env::var("BRIDGE_MQTT_TOPIC").unwrap_or_else(|_| "tele/#".to_string());
        let mqtt_qos = read_u8_with_default("BRIDGE_MQTT_QOS", 0)?;
        if mqtt_qos > 2 {
            return Err(ConfigError::Invalid(
                "BRIDGE_MQTT_QOS".to_string(),
                mqtt_qos.to_string(),
            ));
        }
        let mqtt_client_id = env::var("BRIDGE_MQTT_CLIENT_ID")
            .unwrap_or_else(|_| "MQTTInfluxDBBridge".to_string());
        let mqtt_username = read_optional("BRIDGE_MQTT_USERNAME");
        let mqtt_password = read_optional("BRIDGE_MQTT_PASSWORD");
        let mqtt_tls = match (
            read_optional("BRIDGE_MQTT_CA_CRT"),
            read_optional("BRIDGE_MQTT_CLIENT_CRT"),
            read_optional("BRIDGE_MQTT_CLIENT_KEY"),
        ) {
            (Some(ca_cert), Some(client_cert), Some(client_key)) => Some(TlsPaths {
                ca_cert: PathBuf::from(ca_cert),
                client_cert: PathBuf::from(client_cert),
                client_key: PathBuf::from(client_key),
            }),
            _ => None,
        };
        let timezone = read_timezone_with_default("BRIDGE_TIMEZONE", chrono_tz::Europe::Warsaw)?;
        let retry_initial_ms = read_u64_with_default("BRIDGE_RETRY_INITIAL_MS", 1000)?;
        if retry_initial_ms == 0 {
            return Err(ConfigError::Invalid(
                "BRIDGE_RETRY_INITIAL_MS".to_string(),
                "0".to_string(),
            ));
        }
        let retry_max_ms = read_u64_with_default("BRIDGE_RETRY_MAX_MS", 60_000)?;
        if retry_max_ms < retry_initial_ms {
            return Err(ConfigError::Invalid(
                "BRIDGE_RETRY_MAX_MS".to_string(),
                retry_max_ms.to_string(),
            ));
        }
        let retry_jitter = read_bool_with_default("BRIDGE_RETRY_JITTER", true);
        let stats_interval_seconds = read_u64_with_default("BRIDGE_STATS_INTERVAL_SECONDS", 60)?;

        Ok(Self {
            influx_url,
            influx_auth,
            influx_org,
            influx_bucket,
            influx_timeout_seconds,
            mqtt_host,
            mqtt_port,
            mqtt_topic,
            mqtt_qos,
            mqtt_client_id,
            mqtt_username,
            mqtt_password,
            mqtt_tls,
            timezone,
            retry_initial_ms,
            retry_max_ms,
            retry_jitter,
            stats_interval_seconds,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_timezone_with_default(key: &str, default: Tz) -> Result<Tz, ConfigError> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(default),
        Ok(value) => value
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        Err(_) => Ok(default),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
