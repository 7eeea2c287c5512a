//! 内存写入实现
//!
//! 仅用于测试和本地演示。

use crate::error::StoreError;
use crate::traits::PointSink;
use domain::Point;
use std::sync::RwLock;

/// 内存时序点存储
#[derive(Debug, Default)]
pub struct InMemorySink {
    points: RwLock<Vec<Point>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的点（按写入顺序）
    pub fn points(&self) -> Vec<Point> {
        self.points.read().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.points.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl PointSink for InMemorySink {
    async fn write_points(&self, points: &[Point]) -> Result<(), StoreError> {
        let mut store = self
            .points
            .write()
            .map_err(|_| StoreError::Transient("lock failed".to_string()))?;
        store.extend(points.iter().cloned());
        Ok(())
    }
}
