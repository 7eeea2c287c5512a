//! 写入管线：解码后的点经内存队列交给单一写入任务，写入失败按指数退避无限重试。
//!
//! - [`queue`]：无界 FIFO，生产端非阻塞
//! - [`backoff`]：退避策略
//! - [`writer`]：写入任务与单点写入状态机

pub mod backoff;
pub mod queue;
pub mod writer;

pub use backoff::BackoffPolicy;
pub use queue::{QueueConsumer, QueueProducer, ingestion_queue};
pub use writer::{Delivery, MAX_RECORDED_DELAYS, PersistenceWriter};

/// Pipeline 错误。
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("ingestion queue closed")]
    QueueClosed,
}
