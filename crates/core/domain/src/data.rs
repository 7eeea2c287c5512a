use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// 传输层投递的原始消息（仅在投递上下文中短暂存在，不落库）。
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }
}

/// 字段值的数据类型。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I64(i64),
    F64(f64),
    Bool(bool),
    String(String),
}

/// 测量名（封闭集合，由设备类决定）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measurement {
    /// Tasmota 智能插座状态报文（`tele/+/+/STATE`）。
    SmartPlugState,
    /// Tasmota 智能插座电能报文（`tele/+/+/SENSOR`）。
    SmartPlugSensor,
    /// 小米温湿度传感器（`tele/temp...`）。
    AmbientSensor,
    /// 锅炉控制器状态（`tele/ecoal/STATE`）。
    BoilerState,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::SmartPlugState => "smartplugstate",
            Measurement::SmartPlugSensor => "smartplugsensor",
            Measurement::AmbientSensor => "mitemperature",
            Measurement::BoilerState => "ecoal",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point 构造错误。
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PointError {
    #[error("point {0} has no fields")]
    NoFields(Measurement),
}

/// 规范化后的时序点。
///
/// 构造后不可变：至少一个字段、一个时间戳，tag/field 键唯一（后写覆盖先写）。
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: Measurement,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: DateTime<Utc>,
}

impl Point {
    pub fn builder(measurement: Measurement, timestamp: DateTime<Utc>) -> PointBuilder {
        PointBuilder {
            measurement,
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn measurement(&self) -> Measurement {
        self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Point 构建器。
#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: Measurement,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: DateTime<Utc>,
}

impl PointBuilder {
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Result<Point, PointError> {
        if self.fields.is_empty() {
            return Err(PointError::NoFields(self.measurement));
        }
        Ok(Point {
            measurement: self.measurement,
            tags: self.tags,
            fields: self.fields,
            timestamp: self.timestamp,
        })
    }
}
