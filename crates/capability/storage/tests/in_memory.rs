use bridge_storage::{InMemorySink, PointSink};
use chrono::{TimeZone, Utc};
use domain::{FieldValue, Measurement, Point};

#[tokio::test]
async fn in_memory_keeps_write_order() {
    let sink = InMemorySink::new();
    assert!(sink.is_empty());
    for minute in 0..3 {
        let point = Point::builder(
            Measurement::SmartPlugSensor,
            Utc.with_ymd_and_hms(2024, 4, 21, 3, minute, 0).unwrap(),
        )
        .tag("spid", "7")
        .field("power", FieldValue::I64(minute as i64))
        .build()
        .expect("point");
        sink.write_point(&point).await.expect("write");
    }
    sink.write_points(&[]).await.expect("empty batch");

    let points = sink.points();
    assert_eq!(sink.len(), 3);
    let powers: Vec<_> = points
        .iter()
        .map(|point| point.field("power").cloned())
        .collect();
    assert_eq!(
        powers,
        vec![
            Some(FieldValue::I64(0)),
            Some(FieldValue::I64(1)),
            Some(FieldValue::I64(2)),
        ]
    );
}
