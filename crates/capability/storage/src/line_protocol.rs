//! InfluxDB line protocol 编码。
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ms
//! ```
//!
//! tag 与字段按键名排序输出；时间戳精度为毫秒（写入请求带 `precision=ms`）。

use domain::{FieldValue, Point};

/// 编码单个点。
pub fn encode_point(point: &Point) -> String {
    let mut line = escape_measurement(point.measurement().as_str());

    for (key, value) in point.tags() {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    for (index, (key, value)) in point.fields().iter().enumerate() {
        if index > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&encode_field_value(value));
    }

    line.push(' ');
    line.push_str(&point.timestamp().timestamp_millis().to_string());
    line
}

/// 编码多个点（换行分隔）。
pub fn encode_points(points: &[Point]) -> String {
    points
        .iter()
        .map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::F64(v) => v.to_string(),
        FieldValue::I64(v) => format!("{}i", v),
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::String(v) => format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}

/// 测量名：转义反斜杠、逗号与空格。
fn escape_measurement(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(' ', "\\ ")
}

/// tag 键、tag 值与字段键：转义反斜杠、逗号、等号与空格。
fn escape_key(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
