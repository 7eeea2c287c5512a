//! # Bridge Storage 模块
//!
//! 时序点写入抽象与实现：
//!
//! - [`traits`]：`PointSink` 写入接口（异步，支持动态分发）
//! - [`error`]：`StoreError`，区分瞬时错误与拒绝
//! - [`line_protocol`]：InfluxDB line protocol 编码
//! - [`influx`]：InfluxDB v2 HTTP 写入实现（生产环境）
//! - [`in_memory`]：内存实现（测试）
//!
//! 写入器只报告结果，不做重试；重试与退避由 pipeline 的写入循环负责。

pub mod error;
pub mod in_memory;
pub mod influx;
pub mod line_protocol;
pub mod traits;

pub use error::*;
pub use in_memory::InMemorySink;
pub use influx::{InfluxAuth, InfluxConfig, InfluxSink};
pub use line_protocol::{encode_point, encode_points};
pub use traits::*;
