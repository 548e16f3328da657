//! 公共验证函数模块
//! 帧请求与校准请求在进入会话之前的输入检查。

use micro_emotion_wasm::Keypoint;

use crate::constants::MAX_KEYPOINTS_PER_FRAME;

/// 验证帧时间戳：有限且非负
pub fn validate_timestamp(timestamp_ms: f64) -> Result<(), &'static str> {
    if !timestamp_ms.is_finite() {
        return Err("timestampMs 必须是有限数值");
    }
    if timestamp_ms < 0.0 {
        return Err("timestampMs 不能为负数");
    }
    Ok(())
}

/// 验证帧请求：关键点数量上限与时间戳
///
/// 关键点数量不足或坐标非有限值不在这里拒绝，由会话流程按帧处理。
pub fn validate_frame(keypoints: &[Keypoint], timestamp_ms: Option<f64>) -> Result<(), &'static str> {
    if keypoints.len() > MAX_KEYPOINTS_PER_FRAME {
        return Err("关键点数量超过上限");
    }
    if let Some(ts) = timestamp_ms {
        validate_timestamp(ts)?;
    }
    Ok(())
}
