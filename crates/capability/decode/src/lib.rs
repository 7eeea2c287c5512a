//! 设备报文解码：topic + payload → 0 或 1 个 Point。
//!
//! 路由表按优先级顺序匹配 topic，命中后交给对应设备类的 schema 解析；
//! 未命中任何规则的 topic 直接忽略（不是错误）。

mod schema;
mod timestamp;

use chrono_tz::Tz;
use domain::{Point, PointError};
use schema::Schema;

/// 解码错误（已命中设备类，但报文不合法）。
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid json: {0}")]
    InvalidJson(String),
    #[error("payload root is not an object")]
    NotAnObject,
    #[error("missing required key: {0}")]
    MissingKey(String),
    #[error("invalid value for {key}: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid topic {topic}: {reason}")]
    InvalidTopic { topic: String, reason: &'static str },
    #[error(transparent)]
    Point(#[from] PointError),
}

/// topic 匹配规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRule {
    Exact(&'static str),
    Suffix(&'static str),
    Prefix(&'static str),
}

impl TopicRule {
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicRule::Exact(expected) => topic == *expected,
            TopicRule::Suffix(suffix) => topic.ends_with(suffix),
            TopicRule::Prefix(prefix) => topic.starts_with(prefix),
        }
    }
}

/// 设备类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// 锅炉控制器（整包标量字段）
    BoilerState,
    /// Tasmota 插座状态
    PlugState,
    /// Tasmota 插座电能
    PlugSensor,
    /// 温湿度传感器
    AmbientSensor,
}

impl DeviceClass {
    fn schema(&self) -> &'static Schema {
        match self {
            DeviceClass::BoilerState => &schema::BOILER_STATE,
            DeviceClass::PlugState => &schema::PLUG_STATE,
            DeviceClass::PlugSensor => &schema::PLUG_SENSOR,
            DeviceClass::AmbientSensor => &schema::AMBIENT_SENSOR,
        }
    }
}

/// 路由表（顺序即优先级）。
///
/// `tele/ecoal/STATE` 同时以 `STATE` 结尾，精确规则必须排在后缀规则之前；
/// `tele/temp.../SENSOR` 同时匹配前缀规则，后缀规则优先。
pub const ROUTES: &[(TopicRule, DeviceClass)] = &[
    (TopicRule::Exact("tele/ecoal/STATE"), DeviceClass::BoilerState),
    (TopicRule::Suffix("STATE"), DeviceClass::PlugState),
    (TopicRule::Suffix("SENSOR"), DeviceClass::PlugSensor),
    (TopicRule::Prefix("tele/temp"), DeviceClass::AmbientSensor),
];

/// 报文解码器。
#[derive(Debug, Clone)]
pub struct Decoder {
    timezone: Tz,
}

impl Decoder {
    /// `timezone` 用于本地化不带偏移量的时间字符串。
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// 按路由表为 topic 选择设备类。
    pub fn route(&self, topic: &str) -> Option<DeviceClass> {
        ROUTES
            .iter()
            .find(|(rule, _)| rule.matches(topic))
            .map(|(_, class)| *class)
    }

    /// 解码单条消息；topic 未命中时返回 `Ok(None)`。
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<Option<Point>, DecodeError> {
        let Some(class) = self.route(topic) else {
            return Ok(None);
        };
        class
            .schema()
            .parse(topic, payload, self.timezone)
            .map(Some)
    }
}
