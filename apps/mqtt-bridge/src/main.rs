//! MQTT → InfluxDB 桥接服务入口。

mod bridge;

use bridge::{
    BridgeContext, DeliveryHandler, backoff_policy, influx_config, mqtt_source_config,
    read_tls_material, spawn_stats_logger,
};
use bridge_config::BridgeConfig;
use bridge_decode::Decoder;
use bridge_ingest::{MqttSource, Source};
use bridge_pipeline::{PersistenceWriter, ingestion_queue};
use bridge_storage::InfluxSink;
use bridge_telemetry::{BridgeMetrics, init_tracing};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = BridgeConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // TLS 材料与主机解析失败均视为启动错误
    let tls = match config.mqtt_tls.as_ref() {
        Some(paths) => Some(read_tls_material(paths).inspect_err(|err| {
            error!(target: "bridge.app", error = %err, "tls_material_unreadable");
        })?),
        None => None,
    };
    let resolved = tokio::net::lookup_host((config.mqtt_host.as_str(), config.mqtt_port))
        .await?
        .next()
        .ok_or_else(|| format!("mqtt host {} did not resolve", config.mqtt_host))?;
    let sink = Arc::new(InfluxSink::new(influx_config(&config))?);
    let decoder = Decoder::new(config.timezone);
    info!(
        target: "bridge.app",
        host = %config.mqtt_host,
        resolved = %resolved,
        influx_url = %config.influx_url,
        bucket = sink.bucket(),
        timezone = decoder.timezone().name(),
        "bridge_starting"
    );

    let metrics = Arc::new(BridgeMetrics::new());
    let (producer, consumer) = ingestion_queue();

    // 写入上下文：独立任务
    let writer = PersistenceWriter::new(consumer, sink, backoff_policy(&config), metrics.clone())
        .spawn();
    let stats = spawn_stats_logger(
        metrics.clone(),
        producer.clone(),
        Duration::from_secs(config.stats_interval_seconds),
    );

    // 投递上下文：MQTT 事件循环
    let context = Arc::new(BridgeContext::new(
        decoder,
        producer.clone(),
        metrics,
    ));
    let handler = Arc::new(DeliveryHandler::new(context));
    let source = MqttSource::new(mqtt_source_config(&config, tls));

    tokio::select! {
        result = source.run(handler) => {
            if let Err(err) = result {
                error!(target: "bridge.app", error = %err, "source_stopped");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
        }
    }

    // 队列中尚未写入的点随进程退出丢失
    info!(target: "bridge.app", queued = producer.len(), "bridge_shutdown");
    writer.abort();
    if let Some(stats) = stats {
        stats.abort();
    }
    Ok(())
}
