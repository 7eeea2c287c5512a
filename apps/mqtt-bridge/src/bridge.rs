//! 桥接链路装配模块
//!
//! 投递上下文：MQTT 报文 → 解码 → 入队；写入上下文由 pipeline 的写入任务负责。
//! 两个上下文之间只共享摄取队列，运行期状态集中在 `BridgeContext` 中。

use bridge_config::{BridgeConfig, StoreAuth};
use bridge_decode::Decoder;
use bridge_ingest::{IngestError, MqttSourceConfig, RawMessageHandler, TlsMaterial};
use bridge_pipeline::{BackoffPolicy, QueueProducer};
use bridge_storage::{InfluxAuth, InfluxConfig};
use bridge_telemetry::BridgeMetrics;
use domain::RawMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 运行期上下文（启动时构建一次）。
pub struct BridgeContext {
    pub decoder: Decoder,
    pub queue: QueueProducer,
    pub metrics: Arc<BridgeMetrics>,
}

impl BridgeContext {
    pub fn new(decoder: Decoder, queue: QueueProducer, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            decoder,
            queue,
            metrics,
        }
    }
}

/// 投递处理器
///
/// 对每条报文：计数 → 解码 → 入队。解码失败只记录并丢弃，不向采集源返回错误；
/// 仅当写入任务已退出（队列关闭）时返回错误。
pub struct DeliveryHandler {
    context: Arc<BridgeContext>,
}

impl DeliveryHandler {
    pub fn new(context: Arc<BridgeContext>) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl RawMessageHandler for DeliveryHandler {
    async fn handle(&self, message: RawMessage) -> Result<(), IngestError> {
        let context = &self.context;
        context.metrics.record_message_received();

        let point = match context.decoder.decode(&message.topic, &message.payload) {
            Ok(Some(point)) => point,
            Ok(None) => {
                context.metrics.record_dropped_unmatched();
                debug!(target: "bridge.ingest", topic = %message.topic, "topic_unmatched");
                return Ok(());
            }
            Err(err) => {
                context.metrics.record_dropped_invalid();
                warn!(
                    target: "bridge.ingest",
                    topic = %message.topic,
                    payload_size = message.payload.len(),
                    error = %err,
                    "decode_failed"
                );
                return Ok(());
            }
        };

        context.metrics.record_point_decoded();
        let measurement = point.measurement();
        if let Err(err) = context.queue.push(point) {
            context.metrics.record_dropped_queue_closed();
            warn!(
                target: "bridge.ingest",
                topic = %message.topic,
                measurement = %measurement,
                error = %err,
                "point_enqueue_failed"
            );
            return Err(IngestError::Handler(err.to_string()));
        }
        debug!(
            target: "bridge.ingest",
            topic = %message.topic,
            measurement = %measurement,
            queued = context.queue.len(),
            "point_queued"
        );
        Ok(())
    }
}

/// 周期输出计数器快照与队列积压；`interval` 为 0 时不启动。
pub fn spawn_stats_logger(
    metrics: Arc<BridgeMetrics>,
    queue: QueueProducer,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // 首次 tick 立即返回
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = metrics.snapshot();
            info!(
                target: "bridge.stats",
                messages_received = snapshot.messages_received,
                points_decoded = snapshot.points_decoded,
                dropped_unmatched = snapshot.dropped_unmatched,
                dropped_invalid = snapshot.dropped_invalid,
                dropped_queue_closed = snapshot.dropped_queue_closed,
                write_success = snapshot.write_success,
                write_retries = snapshot.write_retries,
                avg_write_latency_ms = ?snapshot.avg_write_latency_ms(),
                queue_depth = queue.len(),
                "bridge_stats"
            );
        }
    }))
}

pub fn influx_config(config: &BridgeConfig) -> InfluxConfig {
    let auth = match &config.influx_auth {
        StoreAuth::None => InfluxAuth::None,
        StoreAuth::Token(token) => InfluxAuth::Token(token.clone()),
        StoreAuth::Basic(credential) => InfluxAuth::Basic(credential.clone()),
    };
    InfluxConfig {
        url: config.influx_url.clone(),
        org: config.influx_org.clone(),
        bucket: config.influx_bucket.clone(),
        auth,
        timeout: Duration::from_secs(config.influx_timeout_seconds),
    }
}

pub fn mqtt_source_config(config: &BridgeConfig, tls: Option<TlsMaterial>) -> MqttSourceConfig {
    MqttSourceConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        client_id: config.mqtt_client_id.clone(),
        topic_filter: config.mqtt_topic.clone(),
        qos: config.mqtt_qos,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        tls,
    }
}

pub fn backoff_policy(config: &BridgeConfig) -> BackoffPolicy {
    BackoffPolicy::new(
        Duration::from_millis(config.retry_initial_ms),
        Duration::from_millis(config.retry_max_ms),
        config.retry_jitter,
    )
}

/// 读取 TLS 材料文件。
pub fn read_tls_material(
    paths: &bridge_config::TlsPaths,
) -> Result<TlsMaterial, std::io::Error> {
    Ok(TlsMaterial {
        ca_cert: std::fs::read(&paths.ca_cert)?,
        client_cert: std::fs::read(&paths.client_cert)?,
        client_key: std::fs::read(&paths.client_key)?,
    })
}
