//! 摄取队列

use crate::PipelineError;
use domain::Point;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// 创建无界摄取队列，返回生产端与消费端。
pub fn ingestion_queue() -> (QueueProducer, QueueConsumer) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        QueueProducer {
            sender,
            depth: depth.clone(),
        },
        QueueConsumer { receiver, depth },
    )
}

/// 生产端（可克隆）。
#[derive(Debug, Clone)]
pub struct QueueProducer {
    sender: mpsc::UnboundedSender<Point>,
    depth: Arc<AtomicUsize>,
}

impl QueueProducer {
    /// 入队，不阻塞；消费端已释放时返回 `QueueClosed`，点被丢弃。
    pub fn push(&self, point: Point) -> Result<(), PipelineError> {
        // 先计数再发送，避免消费端先出队导致计数下溢
        self.depth.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(point).is_err() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(PipelineError::QueueClosed);
        }
        Ok(())
    }

    /// 当前积压数量。
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 消费端（唯一）。
#[derive(Debug)]
pub struct QueueConsumer {
    receiver: mpsc::UnboundedReceiver<Point>,
    depth: Arc<AtomicUsize>,
}

impl QueueConsumer {
    /// 出队；所有生产端释放且队列为空时返回 `None`。
    pub async fn pop(&mut self) -> Option<Point> {
        let point = self.receiver.recv().await?;
        self.depth.fetch_sub(1, Ordering::AcqRel);
        Some(point)
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
