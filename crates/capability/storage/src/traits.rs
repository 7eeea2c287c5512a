//! 存储接口 Trait 定义

use crate::error::StoreError;
use async_trait::async_trait;
use domain::Point;

/// 时序点写入接口。
///
/// 调用方负责重试；实现只需如实报告本次写入的结果。
#[async_trait]
pub trait PointSink: Send + Sync {
    /// 批量写入（空切片直接成功）。
    async fn write_points(&self, points: &[Point]) -> Result<(), StoreError>;

    /// 单点写入。
    async fn write_point(&self, point: &Point) -> Result<(), StoreError> {
        self.write_points(std::slice::from_ref(point)).await
    }
}
