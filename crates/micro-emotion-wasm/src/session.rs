//! 会话上下文
//!
//! 把基准、校准状态、记录日志与上一次分类结果收拢到一个显式的上下文值中，
//! 每帧处理是 `(帧, 上下文) -> (结果, 新上下文)` 的纯变换，调度由外部负责。
//!
//! 单帧流程：
//! 1. 检查校准截止时间
//! 2. 无人脸 → 保留上一次结果
//! 3. 特征提取失败 → 拒绝该帧，保留上一次结果
//! 4. 校准中 → 只用于更新基准
//! 5. 否则 → 归一化 → 分类 → 尝试写入记录

use serde::Serialize;

use crate::calibration::{CalibrationState, Calibrator};
use crate::classifier::{classify, EmotionDecision};
use crate::config::SessionConfig;
use crate::error::{EmotionError, Result};
use crate::geometry::{GeometricMeasures, NeutralBaseline};
use crate::history::{EventLog, HistoryRecord};
use crate::landmarks::Keypoint;
use crate::signals::{normalize, EmotionMetrics};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FrameOutcome {
    /// 未检测到人脸
    NoFace { held: Option<EmotionDecision> },
    /// 关键点无法使用
    Rejected {
        reason: String,
        held: Option<EmotionDecision>,
    },
    #[serde(rename_all = "camelCase")]
    Calibrating { samples: u32, remaining_ms: f64 },
    Classified {
        metrics: EmotionMetrics,
        decision: EmotionDecision,
        logged: Option<HistoryRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    #[serde(flatten)]
    pub outcome: FrameOutcome,
    /// 校准窗口在本帧结束
    pub calibration_completed: bool,
}

impl FrameReport {
    /// 本帧应展示的结果：新的分类结果或保留的上一次结果
    pub fn decision(&self) -> Option<&EmotionDecision> {
        match &self.outcome {
            FrameOutcome::Classified { decision, .. } => Some(decision),
            FrameOutcome::NoFace { held } | FrameOutcome::Rejected { held, .. } => held.as_ref(),
            FrameOutcome::Calibrating { .. } => None,
        }
    }

    pub fn logged(&self) -> Option<&HistoryRecord> {
        match &self.outcome {
            FrameOutcome::Classified { logged, .. } => logged.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    config: SessionConfig,
    calibrator: Calibrator,
    log: EventLog,
    last_decision: Option<EmotionDecision>,
    last_metrics: Option<EmotionMetrics>,
    frames: u64,
}

impl SessionContext {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate().map_err(EmotionError::InvalidConfig)?;
        Ok(Self::build(config))
    }

    fn build(config: SessionConfig) -> Self {
        Self {
            calibrator: Calibrator::from_config(&config),
            log: EventLog::from_config(&config),
            config,
            last_decision: None,
            last_metrics: None,
            frames: 0,
        }
    }

    /// 处理一帧，返回本帧结果与更新后的上下文
    pub fn process_frame(mut self, keypoints: &[Keypoint], now_ms: f64) -> (FrameReport, Self) {
        let report = self.step(keypoints, now_ms);
        (report, self)
    }

    /// 就地处理一帧
    pub fn step(&mut self, keypoints: &[Keypoint], now_ms: f64) -> FrameReport {
        self.frames += 1;
        let calibration_completed = self.calibrator.tick(now_ms);
        let outcome = self.evaluate(keypoints, now_ms);
        FrameReport {
            outcome,
            calibration_completed,
        }
    }

    fn evaluate(&mut self, keypoints: &[Keypoint], now_ms: f64) -> FrameOutcome {
        if keypoints.is_empty() {
            return FrameOutcome::NoFace {
                held: self.last_decision,
            };
        }

        let measures = match GeometricMeasures::extract(keypoints) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "frame rejected");
                return FrameOutcome::Rejected {
                    reason: e.to_string(),
                    held: self.last_decision,
                };
            }
        };

        if self.calibrator.is_calibrating() {
            let samples = self.calibrator.observe(&measures);
            return FrameOutcome::Calibrating {
                samples,
                remaining_ms: self.calibrator.remaining_ms(now_ms),
            };
        }

        let metrics = normalize(&measures, self.calibrator.baseline());
        let decision = classify(&metrics);
        let logged = self.log.offer(&decision, now_ms);
        if let Some(record) = &logged {
            tracing::debug!(label = %record.label, confidence = record.confidence, "emotion logged");
        }

        self.last_decision = Some(decision);
        self.last_metrics = Some(metrics);

        FrameOutcome::Classified {
            metrics,
            decision,
            logged,
        }
    }

    pub fn begin_calibration(&mut self, now_ms: f64) {
        self.calibrator.begin(now_ms);
    }

    /// 不处理帧、只检查校准截止时间，窗口在本次调用中结束时返回 true
    pub fn expire_calibration(&mut self, now_ms: f64) -> bool {
        self.calibrator.tick(now_ms)
    }

    pub fn cancel_calibration(&mut self) -> bool {
        self.calibrator.cancel()
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_calibrating()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_calibrated()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibrator.state()
    }

    pub fn baseline(&self) -> Option<&NeutralBaseline> {
        self.calibrator.baseline()
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.log.records()
    }

    pub fn history_len(&self) -> usize {
        self.log.len()
    }

    pub fn last_decision(&self) -> Option<&EmotionDecision> {
        self.last_decision.as_ref()
    }

    pub fn last_metrics(&self) -> Option<&EmotionMetrics> {
        self.last_metrics.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::build(SessionConfig::default())
    }
}
