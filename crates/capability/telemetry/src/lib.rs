//! 日志初始化与桥接链路计数器。

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub points_decoded: u64,
    pub dropped_unmatched: u64,
    pub dropped_invalid: u64,
    pub dropped_queue_closed: u64,
    pub write_success: u64,
    pub write_retries: u64,
    pub write_latency_ms_total: u64,
    pub write_latency_ms_count: u64,
}

impl MetricsSnapshot {
    /// 平均写入耗时（毫秒，仅统计最终成功的那次请求）。
    pub fn avg_write_latency_ms(&self) -> Option<u64> {
        self.write_latency_ms_total
            .checked_div(self.write_latency_ms_count)
    }
}

/// 桥接链路计数器。
///
/// 由启动流程创建一次，以 `Arc` 注入投递处理器与写入器。
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    messages_received: AtomicU64,
    points_decoded: AtomicU64,
    dropped_unmatched: AtomicU64,
    dropped_invalid: AtomicU64,
    dropped_queue_closed: AtomicU64,
    write_success: AtomicU64,
    write_retries: AtomicU64,
    write_latency_ms_total: AtomicU64,
    write_latency_ms_count: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            points_decoded: self.points_decoded.load(Ordering::Relaxed),
            dropped_unmatched: self.dropped_unmatched.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            dropped_queue_closed: self.dropped_queue_closed.load(Ordering::Relaxed),
            write_success: self.write_success.load(Ordering::Relaxed),
            write_retries: self.write_retries.load(Ordering::Relaxed),
            write_latency_ms_total: self.write_latency_ms_total.load(Ordering::Relaxed),
            write_latency_ms_count: self.write_latency_ms_count.load(Ordering::Relaxed),
        }
    }

    /// 记录收到的 MQTT 消息次数。
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录解码成功（已入队）的点数。
    pub fn record_point_decoded(&self) {
        self.points_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录 topic 未匹配任何设备类的次数。
    pub fn record_dropped_unmatched(&self) {
        self.dropped_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录解码失败丢弃次数。
    pub fn record_dropped_invalid(&self) {
        self.dropped_invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录写入器已退出导致的丢弃次数。
    pub fn record_dropped_queue_closed(&self) {
        self.dropped_queue_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录写入成功次数。
    pub fn record_write_success(&self) {
        self.write_success.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录写入重试次数。
    pub fn record_write_retry(&self) {
        self.write_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录单点写入耗时（毫秒）。
    pub fn record_write_latency_ms(&self, latency_ms: u64) {
        self.write_latency_ms_total
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.write_latency_ms_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
