//! 设备类 schema 定义与通用解析。
//!
//! 每个设备类由一张静态表描述：测量名、时间戳键、tag 规则与字段规则。
//! 字段名为源键名的小写蛇形形式。

use crate::DecodeError;
use crate::timestamp::parse_timestamp;
use chrono_tz::Tz;
use domain::{FieldValue, Measurement, Point};
use serde_json::{Map, Value};

/// 字段接受的 JSON 值类型。
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldKind {
    /// 整数 → I64，其余数字 → F64
    Number,
    Text,
}

/// 字段映射规则。
#[derive(Debug)]
pub(crate) enum FieldRule {
    /// 按路径取值并按声明类型写入字段。
    Copy {
        path: &'static [&'static str],
        name: &'static str,
        kind: FieldKind,
    },
    /// 派生布尔字段：路径上的字符串等于 `literal` 时为 true。
    Equals {
        path: &'static [&'static str],
        name: &'static str,
        literal: &'static str,
    },
}

/// 字段集合。
#[derive(Debug)]
pub(crate) enum FieldSet {
    Mapped(&'static [FieldRule]),
    /// 根对象中除 `except` 外的全部标量键（null / 数组 / 对象忽略）。
    AllScalars { except: &'static [&'static str] },
}

/// 从 topic 派生的 tag 规则。
#[derive(Debug)]
pub(crate) enum TagRule {
    /// 第 `index` 段（从 0 起）按整数规范化。
    SegmentInt { index: usize, name: &'static str },
    /// 最后一段原样使用。
    LastSegment { name: &'static str },
}

#[derive(Debug)]
pub(crate) struct Schema {
    pub measurement: Measurement,
    pub timestamp_key: &'static str,
    pub tags: &'static [TagRule],
    pub fields: FieldSet,
}

const fn copy(path: &'static [&'static str], name: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule::Copy { path, name, kind }
}

static PLUG_STATE_FIELDS: [FieldRule; 12] = [
    copy(&["UptimeSec"], "uptime_sec", FieldKind::Number),
    copy(&["Heap"], "heap", FieldKind::Number),
    copy(&["SleepMode"], "sleep_mode", FieldKind::Text),
    copy(&["Sleep"], "sleep", FieldKind::Number),
    copy(&["LoadAvg"], "loadavg", FieldKind::Number),
    copy(&["MqttCount"], "mqtt_count", FieldKind::Number),
    copy(&["POWER"], "power", FieldKind::Text),
    FieldRule::Equals {
        path: &["POWER"],
        name: "is_on",
        literal: "ON",
    },
    copy(&["Wifi", "Channel"], "wifi_channel", FieldKind::Number),
    copy(&["Wifi", "RSSI"], "wifi_rssi", FieldKind::Number),
    copy(&["Wifi", "Signal"], "wifi_signal", FieldKind::Number),
    copy(&["Wifi", "LinkCount"], "wifi_link_count", FieldKind::Number),
];

static PLUG_SENSOR_FIELDS: [FieldRule; 11] = [
    copy(&["ENERGY", "TotalStartTime"], "total_start_time", FieldKind::Text),
    copy(&["ENERGY", "Total"], "total", FieldKind::Number),
    copy(&["ENERGY", "Yesterday"], "yesterday", FieldKind::Number),
    copy(&["ENERGY", "Today"], "today", FieldKind::Number),
    copy(&["ENERGY", "Period"], "period", FieldKind::Number),
    copy(&["ENERGY", "Power"], "power", FieldKind::Number),
    copy(&["ENERGY", "ApparentPower"], "apparent_power", FieldKind::Number),
    copy(&["ENERGY", "ReactivePower"], "reactive_power", FieldKind::Number),
    copy(&["ENERGY", "Factor"], "factor", FieldKind::Number),
    copy(&["ENERGY", "Voltage"], "voltage", FieldKind::Number),
    copy(&["ENERGY", "Current"], "current", FieldKind::Number),
];

static AMBIENT_SENSOR_FIELDS: [FieldRule; 4] = [
    copy(&["temperature"], "temperature", FieldKind::Number),
    copy(&["humidity"], "humidity", FieldKind::Number),
    copy(&["batt_voltage"], "batt_voltage", FieldKind::Number),
    copy(&["batt_level"], "batt_level", FieldKind::Number),
];

pub(crate) static BOILER_STATE: Schema = Schema {
    measurement: Measurement::BoilerState,
    timestamp_key: "timestamp",
    tags: &[],
    fields: FieldSet::AllScalars {
        except: &["timestamp"],
    },
};

pub(crate) static PLUG_STATE: Schema = Schema {
    measurement: Measurement::SmartPlugState,
    timestamp_key: "Time",
    tags: &[TagRule::SegmentInt {
        index: 2,
        name: "spid",
    }],
    fields: FieldSet::Mapped(&PLUG_STATE_FIELDS),
};

pub(crate) static PLUG_SENSOR: Schema = Schema {
    measurement: Measurement::SmartPlugSensor,
    timestamp_key: "Time",
    tags: &[TagRule::SegmentInt {
        index: 2,
        name: "spid",
    }],
    fields: FieldSet::Mapped(&PLUG_SENSOR_FIELDS),
};

pub(crate) static AMBIENT_SENSOR: Schema = Schema {
    measurement: Measurement::AmbientSensor,
    timestamp_key: "timestamp",
    tags: &[TagRule::LastSegment { name: "room" }],
    fields: FieldSet::Mapped(&AMBIENT_SENSOR_FIELDS),
};

impl Schema {
    /// 按 schema 把报文解析为 Point。
    pub(crate) fn parse(&self, topic: &str, payload: &[u8], timezone: Tz) -> Result<Point, DecodeError> {
        let root: Value = serde_json::from_slice(payload)
            .map_err(|err| DecodeError::InvalidJson(err.to_string()))?;
        let root = root.as_object().ok_or(DecodeError::NotAnObject)?;

        let raw_ts = root
            .get(self.timestamp_key)
            .ok_or_else(|| DecodeError::MissingKey(self.timestamp_key.to_string()))?;
        let mut builder = Point::builder(self.measurement, parse_timestamp(raw_ts, timezone)?);

        for rule in self.tags {
            let (name, value) = tag_from_topic(rule, topic)?;
            builder = builder.tag(name, value);
        }

        match &self.fields {
            FieldSet::Mapped(rules) => {
                for rule in rules.iter() {
                    let (name, value) = field_from_rule(rule, root)?;
                    builder = builder.field(name, value);
                }
            }
            FieldSet::AllScalars { except } => {
                for (key, value) in root {
                    if except.iter().any(|skip| *skip == key.as_str()) {
                        continue;
                    }
                    if let Some(value) = scalar_value(value) {
                        if !is_line_safe(key) {
                            return Err(DecodeError::InvalidValue {
                                key: key.clone(),
                                expected: "non-empty single-line key",
                            });
                        }
                        builder = builder.field(key.to_lowercase(), value);
                    }
                }
            }
        }

        Ok(builder.build()?)
    }
}

fn tag_from_topic(rule: &TagRule, topic: &str) -> Result<(&'static str, String), DecodeError> {
    match rule {
        TagRule::SegmentInt { index, name } => {
            let segment = topic.split('/').nth(*index).ok_or_else(|| DecodeError::InvalidTopic {
                topic: topic.to_string(),
                reason: "missing device id segment",
            })?;
            let id = segment
                .parse::<i64>()
                .map_err(|_| DecodeError::InvalidTopic {
                    topic: topic.to_string(),
                    reason: "device id is not an integer",
                })?;
            Ok((*name, id.to_string()))
        }
        TagRule::LastSegment { name } => {
            let segment = topic
                .rsplit('/')
                .next()
                .filter(|segment| is_line_safe(segment))
                .ok_or_else(|| DecodeError::InvalidTopic {
                    topic: topic.to_string(),
                    reason: "empty or multi-line device name segment",
                })?;
            Ok((*name, segment.to_string()))
        }
    }
}

fn field_from_rule(
    rule: &FieldRule,
    root: &Map<String, Value>,
) -> Result<(&'static str, FieldValue), DecodeError> {
    match rule {
        FieldRule::Copy { path, name, kind } => {
            let value = lookup(root, path)?;
            let converted = match (kind, value) {
                (FieldKind::Number, Value::Number(number)) => number_value(number),
                (FieldKind::Text, Value::String(text)) => Some(FieldValue::String(text.clone())),
                _ => None,
            };
            let converted = converted.ok_or_else(|| DecodeError::InvalidValue {
                key: path.join("."),
                expected: kind_name(*kind),
            })?;
            Ok((*name, converted))
        }
        FieldRule::Equals {
            path,
            name,
            literal,
        } => {
            let text = lookup(root, path)?
                .as_str()
                .ok_or_else(|| DecodeError::InvalidValue {
                    key: path.join("."),
                    expected: "string",
                })?;
            Ok((*name, FieldValue::Bool(text == *literal)))
        }
    }
}

fn lookup<'a>(root: &'a Map<String, Value>, path: &[&str]) -> Result<&'a Value, DecodeError> {
    let mut current = root;
    for (depth, key) in path.iter().enumerate() {
        let value = current
            .get(*key)
            .ok_or_else(|| DecodeError::MissingKey(path[..=depth].join(".")))?;
        if depth + 1 == path.len() {
            return Ok(value);
        }
        current = value.as_object().ok_or_else(|| DecodeError::InvalidValue {
            key: path[..=depth].join("."),
            expected: "object",
        })?;
    }
    Err(DecodeError::MissingKey(String::new()))
}

/// 可作为 tag 值或字段键写入存储：非空且不含换行。
fn is_line_safe(text: &str) -> bool {
    !text.is_empty() && !text.contains(['\n', '\r'])
}

fn number_value(number: &serde_json::Number) -> Option<FieldValue> {
    match number.as_i64() {
        Some(value) => Some(FieldValue::I64(value)),
        None => number.as_f64().map(FieldValue::F64),
    }
}

fn scalar_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Number(number) => number_value(number),
        Value::String(text) => Some(FieldValue::String(text.clone())),
        Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Number => "number",
        FieldKind::Text => "string",
    }
}
