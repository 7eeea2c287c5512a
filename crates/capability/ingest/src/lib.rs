use async_trait::async_trait;
use domain::RawMessage;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, Publish, QoS, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("handler error: {0}")]
    Handler(String),
}

/// RawMessage 处理器。
#[async_trait]
pub trait RawMessageHandler: Send + Sync {
    async fn handle(&self, message: RawMessage) -> Result<(), IngestError>;
}

/// 采集源抽象。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(&self, handler: Arc<dyn RawMessageHandler>) -> Result<(), IngestError>;
}

/// 双向 TLS 材料（PEM 内容）。
#[derive(Clone)]
pub struct TlsMaterial {
    pub ca_cert: Vec<u8>,
    pub client_cert: Vec<u8>,
    pub client_key: Vec<u8>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca_cert", &self.ca_cert.len())
            .field("client_cert", &self.client_cert.len())
            .field("client_key", &"<redacted>")
            .finish()
    }
}

/// MQTT 采集源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic_filter: String,
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<TlsMaterial>,
}

/// MQTT 采集源。
///
/// 每次收到 ConnAck 都重新订阅，断线后由 rumqttc 在下一次 poll 时重连。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        if let Some(username) = self.config.username.as_ref() {
            let password = self.config.password.clone().unwrap_or_default();
            options.set_credentials(username.clone(), password);
        }
        if let Some(tls) = self.config.tls.as_ref() {
            options.set_transport(Transport::tls(
                tls.ca_cert.clone(),
                Some((tls.client_cert.clone(), tls.client_key.clone())),
                None,
            ));
        }
        options
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(&self, handler: Arc<dyn RawMessageHandler>) -> Result<(), IngestError> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);
        let qos = qos_from_u8(self.config.qos);
        info!(
            target: "bridge.ingest",
            host = %self.config.host,
            port = self.config.port,
            tls = self.config.tls.is_some(),
            "mqtt_connecting"
        );

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // 事件循环内不能 await 请求通道，使用 try_subscribe
                    match client.try_subscribe(self.config.topic_filter.clone(), qos) {
                        Ok(()) => info!(
                            target: "bridge.ingest",
                            topic = %self.config.topic_filter,
                            "mqtt_subscribed"
                        ),
                        Err(err) => warn!(
                            target: "bridge.ingest",
                            topic = %self.config.topic_filter,
                            error = %err,
                            "mqtt_subscribe_failed"
                        ),
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = message_from_publish(&publish);
                    debug!(
                        target: "bridge.ingest",
                        topic = %message.topic,
                        bytes = message.payload.len(),
                        "mqtt_message"
                    );
                    if let Err(err) = handler.handle(message).await {
                        warn!(
                            target: "bridge.ingest",
                            topic = %publish.topic,
                            error = %err,
                            "raw_message_handler_failed"
                        );
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "bridge.ingest", error = %err, "mqtt_eventloop_error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

fn message_from_publish(publish: &Publish) -> RawMessage {
    RawMessage::new(publish.topic.clone(), publish.payload.to_vec())
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}
