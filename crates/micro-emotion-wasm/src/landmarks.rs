//! 面部关键点
//!
//! 关键点来自 MediaPipe Face Mesh（开启 refineLandmarks），共 478 个，
//! 其中 468..478 为虹膜细化点。坐标为视频帧像素坐标。

use serde::{Deserialize, Serialize};

use crate::error::{EmotionError, Result};

/// 完整面网格的关键点数量
pub const MESH_POINT_COUNT: usize = 478;

/// 虹膜细化点的起始索引
pub const IRIS_START: usize = 468;

/// 二维关键点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Keypoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 将扁平坐标数组 `[x0, y0, x1, y1, ...]` 转换为关键点序列
///
/// 空数组表示当前帧未检测到人脸，返回空序列。
pub fn from_flat(coords: &[f64]) -> Result<Vec<Keypoint>> {
    if coords.len() % 2 != 0 {
        return Err(EmotionError::MalformedCoordinates { len: coords.len() });
    }
    Ok(coords
        .chunks_exact(2)
        .map(|pair| Keypoint::new(pair[0], pair[1]))
        .collect())
}
