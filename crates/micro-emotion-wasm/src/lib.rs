//! 微表情检测 WASM 库
//!
//! 基于面部关键点与个人平静基准的实时微表情识别，编译为 WebAssembly
//! 在浏览器端运行，也可作为普通 Rust 库被服务端复用。
//!
//! ## 模块
//! - `landmarks`: 478 点面网格关键点
//! - `geometry`: 几何特征提取（嘴宽、眉眼距、眼睑高度等）
//! - `calibration`: 平静基准校准状态机
//! - `signals`: 基准相对信号归一化
//! - `classifier`: 有序规则表分类
//! - `history`: 表情变化记录（限流 + 容量上限）
//! - `session`: 会话上下文与单帧处理流程
//! - `wasm`: 浏览器端接口

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod landmarks;
pub mod session;
pub mod signals;
pub mod wasm;

// 重新导出核心类型，方便外部使用
pub use calibration::{CalibrationState, Calibrator};
pub use classifier::{classify, EmotionDecision, EmotionLabel};
pub use config::SessionConfig;
pub use error::{EmotionError, Result};
pub use geometry::{GeometricMeasures, NeutralBaseline};
pub use history::{EventLog, HistoryRecord};
pub use landmarks::Keypoint;
pub use session::{FrameOutcome, FrameReport, SessionContext};
pub use signals::{normalize, EmotionMetrics};
pub use wasm::EmotionDetector;
