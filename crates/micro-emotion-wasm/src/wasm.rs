//! 浏览器端接口
//!
//! 前端在 requestAnimationFrame 循环中运行关键点检测，
//! 每帧把扁平坐标数组和时间戳交给 `EmotionDetector.processFrame`。

use wasm_bindgen::prelude::*;

use crate::config::SessionConfig;
use crate::history::HistoryRecord;
use crate::landmarks;
use crate::session::SessionContext;

/// 微表情检测器
#[wasm_bindgen]
pub struct EmotionDetector {
    session: SessionContext,
}

#[wasm_bindgen]
impl EmotionDetector {
    /// 使用默认参数创建检测器
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            session: SessionContext::default(),
        }
    }

    /// 使用自定义参数创建检测器
    ///
    /// `config` 为 camelCase 字段的对象，缺省字段使用默认值。
    #[wasm_bindgen(js_name = "withConfig")]
    pub fn with_config(config: JsValue) -> Result<EmotionDetector, JsValue> {
        let config: SessionConfig = serde_wasm_bindgen::from_value(config)?;
        let session =
            SessionContext::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { session })
    }

    /// 处理一帧
    ///
    /// # 参数
    /// - `landmarks`: 扁平坐标 `[x0, y0, x1, y1, ...]`，未检测到人脸时传空数组
    /// - `timestamp`: 当前时间戳（毫秒）
    ///
    /// # 返回
    /// 序列化为 JsValue 的 FrameReport
    #[wasm_bindgen(js_name = "processFrame")]
    pub fn process_frame(&mut self, landmarks: &[f64], timestamp: f64) -> Result<JsValue, JsValue> {
        let keypoints =
            landmarks::from_flat(landmarks).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let report = self.session.step(&keypoints, timestamp);
        Ok(serde_wasm_bindgen::to_value(&report)?)
    }

    #[wasm_bindgen(js_name = "beginCalibration")]
    pub fn begin_calibration(&mut self, timestamp: f64) {
        self.session.begin_calibration(timestamp);
    }

    #[wasm_bindgen(js_name = "cancelCalibration")]
    pub fn cancel_calibration(&mut self) -> bool {
        self.session.cancel_calibration()
    }

    /// 是否仍在校准
    ///
    /// 传入 `now` 时先检查截止时间，没有新帧到达时窗口也能按时结束。
    #[wasm_bindgen(js_name = "isCalibrating")]
    pub fn is_calibrating(&mut self, now: Option<f64>) -> bool {
        if let Some(now) = now {
            self.session.expire_calibration(now);
        }
        self.session.is_calibrating()
    }

    #[wasm_bindgen(js_name = "isCalibrated")]
    pub fn is_calibrated(&self) -> bool {
        self.session.is_calibrated()
    }

    /// 历史记录，从新到旧
    pub fn history(&self) -> Result<JsValue, JsValue> {
        let records: Vec<HistoryRecord> = self.session.history().copied().collect();
        Ok(serde_wasm_bindgen::to_value(&records)?)
    }

    /// 丢弃基准与历史，保留参数
    pub fn reset(&mut self) {
        self.session = SessionContext::new(self.session.config().clone()).unwrap_or_default();
    }
}

impl Default for EmotionDetector {
    fn default() -> Self {
        Self::new()
    }
}
