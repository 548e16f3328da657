//! 基准相对信号归一化
//!
//! 把当前帧几何特征与个人平静基准比较，得到 [0,1] 区间的表情信号：
//! - smile: 嘴角拉伸比例 × 5
//! - browLift: 左右眉眼距平均拉伸比例 × 6
//! - mouthOpen: 嘴部张开高度绝对增量 / 10
//! - squint: 眼睑高度缩小比例 × 4
//! - eyeOpen: 保留字段，恒为 0
//!
//! 分母接近 0 或出现非有限值时，对应信号直接置 0，不向分类器传播 NaN。

use serde::{Deserialize, Serialize};

use crate::error::{EmotionError, Result};
use crate::geometry::{GeometricMeasures, NeutralBaseline};

pub const SMILE_GAIN: f64 = 5.0;
pub const BROW_LIFT_GAIN: f64 = 6.0;
/// 嘴部张开以像素增量计，每 10 像素对应满值
pub const MOUTH_OPEN_SCALE: f64 = 10.0;
pub const SQUINT_GAIN: f64 = 4.0;

/// 视为退化的分母阈值
pub const MIN_DENOMINATOR: f64 = 1e-6;

/// 归一化表情信号，各字段位于 [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionMetrics {
    pub smile: f64,
    pub brow_lift: f64,
    /// 保留字段，目前不参与分类
    pub eye_open: f64,
    pub mouth_open: f64,
    pub squint: f64,
}

impl EmotionMetrics {
    /// 全 0 信号，对应未校准状态
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// `max(0, min(1, v))`，非有限值按 0 处理
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 计算当前帧相对基准的表情信号
///
/// 没有基准时返回全 0 信号，这是定义好的行为而不是错误。
pub fn normalize(current: &GeometricMeasures, baseline: Option<&NeutralBaseline>) -> EmotionMetrics {
    let Some(nb) = baseline else {
        return EmotionMetrics::neutral();
    };

    let smile = ratio(current.mouth_width, nb.mouth_width, "mouthWidth")
        .map(|r| (r - 1.0) * SMILE_GAIN);

    let brow_lift = ratio(current.left_brow_dist, nb.left_brow_dist, "leftBrowDist")
        .and_then(|left| {
            ratio(current.right_brow_dist, nb.right_brow_dist, "rightBrowDist")
                .map(|right| ((left + right) / 2.0 - 1.0) * BROW_LIFT_GAIN)
        });

    let mouth_open = finite(
        (current.mouth_height - nb.mouth_height) / MOUTH_OPEN_SCALE,
        "mouthHeight",
    );

    let squint = ratio(current.eye_height_sum(), nb.eye_height_sum(), "eyeHeight")
        .map(|r| (1.0 - r) * SQUINT_GAIN);

    EmotionMetrics {
        smile: soften(smile),
        brow_lift: soften(brow_lift),
        eye_open: 0.0,
        mouth_open: soften(mouth_open),
        squint: soften(squint),
    }
}

fn ratio(numerator: f64, denominator: f64, measure: &'static str) -> Result<f64> {
    if !denominator.is_finite() || denominator.abs() < MIN_DENOMINATOR {
        return Err(EmotionError::DegenerateBaseline { measure });
    }
    finite(numerator / denominator, measure)
}

fn finite(value: f64, measure: &'static str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EmotionError::DegenerateBaseline { measure })
    }
}

fn soften(signal: Result<f64>) -> f64 {
    match signal {
        Ok(value) => clamp_unit(value),
        Err(e) => {
            tracing::debug!(error = %e, "signal forced to zero");
            0.0
        }
    }
}
