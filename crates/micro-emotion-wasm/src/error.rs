//! 错误类型
//!
//! 逐帧错误（关键点不足、基准退化）都在帧处理流程内部消化，
//! 不会中断调用方的渲染循环。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmotionError {
    /// 关键点数量不足，无法读取固定索引
    #[error("insufficient landmarks: expected {expected}, got {got}")]
    InsufficientLandmarks { expected: usize, got: usize },

    /// 扁平坐标数组长度不是偶数
    #[error("malformed coordinate buffer of length {len}")]
    MalformedCoordinates { len: usize },

    /// 关键点坐标为 NaN 或无穷
    #[error("non-finite coordinate at landmark {index}")]
    NonFiniteCoordinate { index: usize },

    /// 基准分母接近 0
    #[error("degenerate baseline for {measure}")]
    DegenerateBaseline { measure: &'static str },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EmotionError>;
