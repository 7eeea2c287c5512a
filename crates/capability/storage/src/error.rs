//! 存储层错误类型
//!
//! 写入失败按是否可能自愈分类：
//! - 瞬时错误：网络、超时、5xx、429
//! - 拒绝：其余非 2xx（数据或权限问题，重试不会自愈）

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transient store error: {0}")]
    Transient(String),
    #[error("store rejected write (http {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("store client error: {0}")]
    Client(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}
