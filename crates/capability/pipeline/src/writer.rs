//! 持久化写入任务
//!
//! 单一长驻任务：逐个出队并写入；失败时按退避无限重试同一个点，
//! 同一时刻最多一次写入在途，因此写入顺序等于出队顺序。

use crate::backoff::BackoffPolicy;
use crate::queue::QueueConsumer;
use bridge_storage::PointSink;
use bridge_telemetry::BridgeMetrics;
use domain::Point;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 单点写入状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Pending,
    Writing { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    Done { attempts: u32 },
}

/// 单点写入最多保留的重试延迟条数（之后的延迟都已达到上限）。
pub const MAX_RECORDED_DELAYS: usize = 32;

/// 单点写入结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// 写入尝试次数（含最终成功的一次）
    pub attempts: u32,
    /// 前 `MAX_RECORDED_DELAYS` 次重试前等待的时长
    pub retry_delays: Vec<Duration>,
}

impl Delivery {
    pub fn recovered(&self) -> bool {
        self.attempts > 1
    }
}

pub struct PersistenceWriter {
    consumer: QueueConsumer,
    sink: Arc<dyn PointSink>,
    backoff: BackoffPolicy,
    metrics: Arc<BridgeMetrics>,
}

impl PersistenceWriter {
    pub fn new(
        consumer: QueueConsumer,
        sink: Arc<dyn PointSink>,
        backoff: BackoffPolicy,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            consumer,
            sink,
            backoff,
            metrics,
        }
    }

    /// 在独立任务中运行写入循环。
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// 写入循环；队列关闭且排空后返回。
    pub async fn run(mut self) {
        info!(target: "bridge.writer", "writer_started");
        while let Some(point) = self.consumer.pop().await {
            let delivery = self.deliver(&point).await;
            if delivery.recovered() {
                info!(
                    target: "bridge.writer",
                    measurement = %point.measurement(),
                    attempts = delivery.attempts,
                    backlog = self.consumer.len(),
                    "write_recovered"
                );
            }
        }
        info!(target: "bridge.writer", "writer_stopped");
    }

    /// 写入单个点，直到成功为止。
    pub async fn deliver(&self, point: &Point) -> Delivery {
        let mut retry_delays = Vec::new();
        let mut state = WriteState::Pending;
        loop {
            state = match state {
                WriteState::Pending => WriteState::Writing { attempt: 0 },
                WriteState::Writing { attempt } => {
                    let started = Instant::now();
                    match self.sink.write_point(point).await {
                        Ok(()) => {
                            let latency_ms =
                                u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                            self.metrics.record_write_latency_ms(latency_ms);
                            self.metrics.record_write_success();
                            WriteState::Done {
                                attempts: attempt + 1,
                            }
                        }
                        Err(err) => {
                            let delay = self.backoff.delay_for(attempt);
                            self.metrics.record_write_retry();
                            if err.is_transient() {
                                warn!(
                                    target: "bridge.writer",
                                    measurement = %point.measurement(),
                                    attempt,
                                    delay_ms = delay.as_millis() as u64,
                                    error = %err,
                                    "write_failed"
                                );
                            } else {
                                error!(
                                    target: "bridge.writer",
                                    measurement = %point.measurement(),
                                    attempt,
                                    delay_ms = delay.as_millis() as u64,
                                    error = %err,
                                    "write_rejected"
                                );
                            }
                            WriteState::Retrying { attempt, delay }
                        }
                    }
                }
                WriteState::Retrying { attempt, delay } => {
                    if retry_delays.len() < MAX_RECORDED_DELAYS {
                        retry_delays.push(delay);
                    }
                    tokio::time::sleep(delay).await;
                    WriteState::Writing {
                        attempt: attempt.saturating_add(1),
                    }
                }
                WriteState::Done { attempts } => {
                    return Delivery {
                        attempts,
                        retry_delays,
                    };
                }
            };
        }
    }
}
