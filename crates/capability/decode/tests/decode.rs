use bridge_decode::{DecodeError, Decoder, DeviceClass};
use chrono::{DateTime, Utc};
use domain::{FieldValue, Measurement};

const PLUG_STATE: &str = r#"{
    "Time": "2024-04-21T05:15:00",
    "Uptime": "0T01:02:03",
    "UptimeSec": 3723,
    "Heap": 26,
    "SleepMode": "Dynamic",
    "Sleep": 50,
    "LoadAvg": 19,
    "MqttCount": 1,
    "POWER": "ON",
    "Wifi": {"AP": 1, "SSId": "home", "Channel": 6, "RSSI": 84, "Signal": -58, "LinkCount": 1, "Downtime": "0T00:00:03"}
}"#;

const PLUG_SENSOR: &str = r#"{
    "Time": "2024-04-21T05:15:00",
    "ENERGY": {
        "TotalStartTime": "2023-01-01T00:00:00",
        "Total": 123.456,
        "Yesterday": 1.2,
        "Today": 0.8,
        "Period": 3,
        "Power": 42,
        "ApparentPower": 50,
        "ReactivePower": 27,
        "Factor": 0.84,
        "Voltage": 231,
        "Current": 0.217
    }
}"#;

fn decoder() -> Decoder {
    Decoder::new(chrono_tz::Europe::Warsaw)
}

fn utc(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .expect("rfc3339")
        .with_timezone(&Utc)
}

#[test]
fn state_payload_decodes_to_state_point() {
    let point = decoder()
        .decode("tele/smartplug/7/STATE", PLUG_STATE.as_bytes())
        .expect("decode")
        .expect("point");

    assert_eq!(point.measurement(), Measurement::SmartPlugState);
    assert_eq!(point.tag("spid"), Some("7"));
    assert_eq!(point.timestamp(), utc("2024-04-21T03:15:00Z"));
    assert_eq!(point.fields().len(), 12);
    assert_eq!(point.field("uptime_sec"), Some(&FieldValue::I64(3723)));
    assert_eq!(point.field("sleep_mode"), Some(&FieldValue::String("Dynamic".to_string())));
    assert_eq!(point.field("power"), Some(&FieldValue::String("ON".to_string())));
    assert_eq!(point.field("is_on"), Some(&FieldValue::Bool(true)));
    assert_eq!(point.field("wifi_signal"), Some(&FieldValue::I64(-58)));
    assert_eq!(point.field("wifi_link_count"), Some(&FieldValue::I64(1)));
    // 未映射的键不进入字段
    assert!(point.field("uptime").is_none());
}

#[test]
fn is_on_mirrors_power_state_string() {
    let payload = PLUG_STATE.replace(r#""POWER": "ON""#, r#""POWER": "OFF""#);
    let point = decoder()
        .decode("tele/smartplug/3/STATE", payload.as_bytes())
        .expect("decode")
        .expect("point");
    assert_eq!(point.field("power"), Some(&FieldValue::String("OFF".to_string())));
    assert_eq!(point.field("is_on"), Some(&FieldValue::Bool(false)));
}

#[test]
fn sensor_payload_decodes_energy_fields() {
    let point = decoder()
        .decode("tele/plug/07/SENSOR", PLUG_SENSOR.as_bytes())
        .expect("decode")
        .expect("point");

    assert_eq!(point.measurement(), Measurement::SmartPlugSensor);
    assert_eq!(point.tag("spid"), Some("7"));
    assert_eq!(point.fields().len(), 11);
    assert_eq!(point.field("total"), Some(&FieldValue::F64(123.456)));
    assert_eq!(point.field("power"), Some(&FieldValue::I64(42)));
    assert_eq!(point.field("apparent_power"), Some(&FieldValue::I64(50)));
    assert_eq!(point.field("current"), Some(&FieldValue::F64(0.217)));
    assert_eq!(
        point.field("total_start_time"),
        Some(&FieldValue::String("2023-01-01T00:00:00".to_string()))
    );
}

#[test]
fn ambient_sensor_is_tagged_by_room() {
    let payload = br#"{"timestamp": 1713669300, "temperature": 21.4, "humidity": 48, "batt_voltage": 2.98, "batt_level": 87, "rssi": -70}"#;
    let point = decoder()
        .decode("tele/temp/livingroom", payload)
        .expect("decode")
        .expect("point");

    assert_eq!(point.measurement(), Measurement::AmbientSensor);
    assert_eq!(point.tag("room"), Some("livingroom"));
    assert_eq!(point.timestamp(), utc("2024-04-21T03:15:00Z"));
    assert_eq!(point.fields().len(), 4);
    assert_eq!(point.field("temperature"), Some(&FieldValue::F64(21.4)));
    assert_eq!(point.field("humidity"), Some(&FieldValue::I64(48)));
}

#[test]
fn boiler_state_takes_all_scalar_keys() {
    let payload = br#"{"timestamp": 1713669300, "FeederTemp": 62.5, "Mode": "auto", "Pump": true, "alarms": [], "extra": null}"#;
    let point = decoder()
        .decode("tele/ecoal/STATE", payload)
        .expect("decode")
        .expect("point");

    assert_eq!(point.measurement(), Measurement::BoilerState);
    assert!(point.tags().is_empty());
    assert_eq!(point.fields().len(), 3);
    assert_eq!(point.field("feedertemp"), Some(&FieldValue::F64(62.5)));
    assert_eq!(point.field("mode"), Some(&FieldValue::String("auto".to_string())));
    assert_eq!(point.field("pump"), Some(&FieldValue::Bool(true)));
    assert!(point.field("timestamp").is_none());
}

#[test]
fn boiler_state_without_scalars_is_rejected() {
    let err = decoder()
        .decode("tele/ecoal/STATE", br#"{"timestamp": 1713669300}"#)
        .expect_err("no fields");
    assert!(matches!(err, DecodeError::Point(_)));
}

#[test]
fn routes_follow_priority_order() {
    let decoder = decoder();
    assert_eq!(decoder.timezone(), chrono_tz::Europe::Warsaw);
    assert_eq!(decoder.route("tele/ecoal/STATE"), Some(DeviceClass::BoilerState));
    assert_eq!(decoder.route("tele/smartplug/1/STATE"), Some(DeviceClass::PlugState));
    assert_eq!(decoder.route("tele/temp/1/SENSOR"), Some(DeviceClass::PlugSensor));
    assert_eq!(decoder.route("tele/temp/kitchen"), Some(DeviceClass::AmbientSensor));
    assert_eq!(decoder.route("tele/smartplug/1/LWT"), None);
}

#[test]
fn unmatched_topic_yields_nothing() {
    let decoder = decoder();
    let payloads: [&[u8]; 4] = [b"not json", br#"{"Time": 1}"#, PLUG_STATE.as_bytes(), b""];
    for payload in payloads {
        let decoded = decoder.decode("foo/bar", payload).expect("unmatched is not an error");
        assert!(decoded.is_none());
    }
}

#[test]
fn missing_required_key_is_decode_error() {
    let payload = PLUG_SENSOR.replace(r#""Voltage": 231,"#, "");
    let err = decoder()
        .decode("tele/plug/7/SENSOR", payload.as_bytes())
        .expect_err("missing voltage");
    assert!(matches!(err, DecodeError::MissingKey(ref key) if key == "ENERGY.Voltage"));

    let err = decoder()
        .decode("tele/plug/7/SENSOR", br#"{"Time": "2024-04-21T05:15:00"}"#)
        .expect_err("missing energy");
    assert!(matches!(err, DecodeError::MissingKey(ref key) if key == "ENERGY"));
}

#[test]
fn malformed_payloads_are_decode_errors() {
    let decoder = decoder();
    assert!(matches!(
        decoder.decode("tele/plug/7/STATE", b"{not json"),
        Err(DecodeError::InvalidJson(_))
    ));
    assert!(matches!(
        decoder.decode("tele/plug/7/STATE", b"[1, 2, 3]"),
        Err(DecodeError::NotAnObject)
    ));
    let payload = PLUG_STATE.replace(r#""Heap": 26"#, r#""Heap": "26""#);
    assert!(matches!(
        decoder.decode("tele/plug/7/STATE", payload.as_bytes()),
        Err(DecodeError::InvalidValue { ref key, .. }) if key == "Heap"
    ));
    let payload = PLUG_STATE.replace(r#""POWER": "ON""#, r#""POWER": 1"#);
    assert!(matches!(
        decoder.decode("tele/plug/7/STATE", payload.as_bytes()),
        Err(DecodeError::InvalidValue { ref key, .. }) if key == "POWER"
    ));
}

#[test]
fn non_numeric_device_id_is_decode_error() {
    let err = decoder()
        .decode("tele/kitchen/STATE", PLUG_STATE.as_bytes())
        .expect_err("bad id");
    assert!(matches!(err, DecodeError::InvalidTopic { .. }));
}

#[test]
fn epoch_and_iso_timestamps_normalize_to_same_instant() {
    let decoder = decoder();
    let topic = "tele/temp/bedroom";
    let epoch = br#"{"timestamp": 1713669300, "temperature": 20.0, "humidity": 40, "batt_voltage": 3.0, "batt_level": 90}"#;
    let offset = br#"{"timestamp": "2024-04-21T05:15:00+02:00", "temperature": 20.0, "humidity": 40, "batt_voltage": 3.0, "batt_level": 90}"#;
    let local = br#"{"timestamp": "2024-04-21T05:15:00", "temperature": 20.0, "humidity": 40, "batt_voltage": 3.0, "batt_level": 90}"#;

    let from_epoch = decoder.decode(topic, epoch).expect("epoch").expect("point");
    let from_offset = decoder.decode(topic, offset).expect("offset").expect("point");
    let from_local = decoder.decode(topic, local).expect("local").expect("point");

    assert_eq!(from_epoch.timestamp(), from_offset.timestamp());
    assert_eq!(from_epoch.timestamp(), from_local.timestamp());
    assert_eq!(from_epoch, from_offset);
}

#[test]
fn decoding_is_deterministic() {
    let decoder = decoder();
    let first = decoder
        .decode("tele/smartplug/7/STATE", PLUG_STATE.as_bytes())
        .expect("decode");
    let second = decoder
        .decode("tele/smartplug/7/STATE", PLUG_STATE.as_bytes())
        .expect("decode");
    assert_eq!(first, second);
}

#[test]
fn unstorable_timestamp_is_decode_error() {
    let payload = br#"{"timestamp": 99999999999, "temperature": 20.0, "humidity": 40, "batt_voltage": 3.0, "batt_level": 1}"#;
    let err = decoder()
        .decode("tele/temp/kitchen", payload)
        .expect_err("year 5138");
    assert!(matches!(err, DecodeError::InvalidTimestamp(_)));
}

#[test]
fn boiler_state_with_empty_key_is_decode_error() {
    let err = decoder()
        .decode("tele/ecoal/STATE", br#"{"timestamp": 1713669300, "": 5, "mode": "auto"}"#)
        .expect_err("empty key");
    assert!(matches!(err, DecodeError::InvalidValue { ref key, .. } if key.is_empty()));

    let err = decoder()
        .decode("tele/ecoal/STATE", br#"{"timestamp": 1713669300, "a\nb": 5}"#)
        .expect_err("multi-line key");
    assert!(matches!(err, DecodeError::InvalidValue { .. }));
}

#[test]
fn multi_line_room_is_decode_error() {
    let payload = br#"{"timestamp": 1713669300, "temperature": 20.0, "humidity": 40, "batt_voltage": 3.0, "batt_level": 90}"#;
    let err = decoder()
        .decode("tele/temp/kit\nchen", payload)
        .expect_err("newline in room");
    assert!(matches!(err, DecodeError::InvalidTopic { .. }));
}
