//! 面部几何特征提取
//!
//! 从固定索引的关键点对计算 7 个欧氏距离：嘴宽、鼻宽、左右眉眼距、
//! 嘴部张开高度、左右眼睑高度。每帧重新计算，不保留状态。

use serde::{Deserialize, Serialize};

use crate::error::{EmotionError, Result};
use crate::landmarks::{Keypoint, MESH_POINT_COUNT};

/// 左右嘴角
pub const MOUTH_CORNERS: (usize, usize) = (61, 291);
/// 左右鼻翼
pub const NOSE_WINGS: (usize, usize) = (102, 331);
/// 左眉内侧 → 左眼内眼角
pub const LEFT_BROW_EYE: (usize, usize) = (107, 133);
/// 右眉内侧 → 右眼内眼角
pub const RIGHT_BROW_EYE: (usize, usize) = (336, 362);
/// 上唇内缘 → 下唇内缘
pub const INNER_LIPS: (usize, usize) = (13, 14);
/// 左眼上眼睑 → 下眼睑
pub const LEFT_EYELIDS: (usize, usize) = (159, 145);
/// 右眼上眼睑 → 下眼睑
pub const RIGHT_EYELIDS: (usize, usize) = (386, 374);

/// 单帧几何特征
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometricMeasures {
    pub mouth_width: f64,
    pub nose_width: f64,
    pub left_brow_dist: f64,
    pub right_brow_dist: f64,
    pub mouth_height: f64,
    pub left_eye_h: f64,
    pub right_eye_h: f64,
}

/// 平静状态基准，字段与 [`GeometricMeasures`] 一致
pub type NeutralBaseline = GeometricMeasures;

impl GeometricMeasures {
    /// 从完整的 478 点面网格中提取几何特征
    ///
    /// 关键点不足时立即失败，不读取不存在的索引。
    pub fn extract(points: &[Keypoint]) -> Result<Self> {
        if points.len() < MESH_POINT_COUNT {
            return Err(EmotionError::InsufficientLandmarks {
                expected: MESH_POINT_COUNT,
                got: points.len(),
            });
        }

        Ok(Self {
            mouth_width: pair_distance(points, MOUTH_CORNERS)?,
            nose_width: pair_distance(points, NOSE_WINGS)?,
            left_brow_dist: pair_distance(points, LEFT_BROW_EYE)?,
            right_brow_dist: pair_distance(points, RIGHT_BROW_EYE)?,
            mouth_height: pair_distance(points, INNER_LIPS)?,
            left_eye_h: pair_distance(points, LEFT_EYELIDS)?,
            right_eye_h: pair_distance(points, RIGHT_EYELIDS)?,
        })
    }

    /// 指数移动平均：`self * (1 - alpha) + sample * alpha`
    pub fn blend(&self, sample: &GeometricMeasures, alpha: f64) -> Self {
        let mix = |old: f64, new: f64| old * (1.0 - alpha) + new * alpha;
        Self {
            mouth_width: mix(self.mouth_width, sample.mouth_width),
            nose_width: mix(self.nose_width, sample.nose_width),
            left_brow_dist: mix(self.left_brow_dist, sample.left_brow_dist),
            right_brow_dist: mix(self.right_brow_dist, sample.right_brow_dist),
            mouth_height: mix(self.mouth_height, sample.mouth_height),
            left_eye_h: mix(self.left_eye_h, sample.left_eye_h),
            right_eye_h: mix(self.right_eye_h, sample.right_eye_h),
        }
    }

    /// 两个眼睑高度之和，眯眼信号的分子/分母
    pub fn eye_height_sum(&self) -> f64 {
        self.left_eye_h + self.right_eye_h
    }
}

fn pair_distance(points: &[Keypoint], (a, b): (usize, usize)) -> Result<f64> {
    let pa = &points[a];
    let pb = &points[b];
    if !pa.is_finite() {
        return Err(EmotionError::NonFiniteCoordinate { index: a });
    }
    if !pb.is_finite() {
        return Err(EmotionError::NonFiniteCoordinate { index: b });
    }
    Ok(pa.distance(pb))
}
