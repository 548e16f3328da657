//! 会话参数
//!
//! 默认值：3 秒校准窗口、α=0.1 的基准平滑、
//! 8 条历史记录、2.5 秒记录间隔、0.6 的记录置信度阈值。

use serde::{Deserialize, Serialize};

pub const DEFAULT_CALIBRATION_DURATION_MS: f64 = 3000.0;
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.1;
pub const DEFAULT_HISTORY_CAPACITY: usize = 8;
pub const DEFAULT_HISTORY_MIN_GAP_MS: f64 = 2500.0;
pub const DEFAULT_HISTORY_MIN_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// 校准窗口时长（毫秒）
    pub calibration_duration_ms: f64,
    /// 校准期间新样本的权重
    pub smoothing_alpha: f64,
    /// 历史记录容量，超出后淘汰最旧记录
    pub history_capacity: usize,
    /// 两条历史记录之间的最小间隔（毫秒）
    pub history_min_gap_ms: f64,
    /// 写入历史记录所需的最低置信度（严格大于）
    pub history_min_confidence: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            calibration_duration_ms: DEFAULT_CALIBRATION_DURATION_MS,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            history_min_gap_ms: DEFAULT_HISTORY_MIN_GAP_MS,
            history_min_confidence: DEFAULT_HISTORY_MIN_CONFIDENCE,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.calibration_duration_ms.is_finite() || self.calibration_duration_ms <= 0.0 {
            return Err("calibrationDurationMs must be > 0".to_string());
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err("smoothingAlpha must be in (0,1]".to_string());
        }
        if self.history_capacity == 0 {
            return Err("historyCapacity must be >= 1".to_string());
        }
        if !self.history_min_gap_ms.is_finite() || self.history_min_gap_ms < 0.0 {
            return Err("historyMinGapMs must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.history_min_confidence) {
            return Err("historyMinConfidence must be in [0,1]".to_string());
        }
        Ok(())
    }
}
