//! 平静基准校准模块
//!
//! 两状态有限状态机：Idle → Calibrating → Idle。
//!
//! 外部触发 `begin` 后进入校准窗口，截止时间在每帧 `tick` 时检查，
//! 到期自动回到 Idle，不依赖定时回调。窗口内第一帧直接作为基准，
//! 之后每帧按 EMA 平滑：`baseline = baseline * (1 - α) + sample * α`。

use serde::Serialize;

use crate::config::SessionConfig;
use crate::geometry::{GeometricMeasures, NeutralBaseline};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CalibrationState {
    Idle,
    #[serde(rename_all = "camelCase")]
    Calibrating { started_at_ms: f64, deadline_ms: f64 },
}

/// 基准校准器
#[derive(Debug, Clone)]
pub struct Calibrator {
    duration_ms: f64,
    alpha: f64,
    state: CalibrationState,
    baseline: Option<NeutralBaseline>,
    /// 窗口开始前的基准，取消校准时恢复
    previous: Option<NeutralBaseline>,
    /// 当前窗口已吸收的样本数
    samples: u32,
}

impl Calibrator {
    pub fn new(duration_ms: f64, alpha: f64) -> Self {
        Self {
            duration_ms,
            alpha,
            state: CalibrationState::Idle,
            baseline: None,
            previous: None,
            samples: 0,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.calibration_duration_ms, config.smoothing_alpha)
    }

    /// 开始（或重新开始）校准窗口
    ///
    /// 旧基准保留到新窗口的第一帧才被覆盖，窗口内无样本时旧基准不变。
    pub fn begin(&mut self, now_ms: f64) {
        if !self.is_calibrating() {
            self.previous = self.baseline;
        }
        self.state = CalibrationState::Calibrating {
            started_at_ms: now_ms,
            deadline_ms: now_ms + self.duration_ms,
        };
        self.samples = 0;
        tracing::info!(
            duration_ms = self.duration_ms,
            recalibration = self.previous.is_some(),
            "calibration started"
        );
    }

    /// 取消进行中的校准，恢复窗口开始前的基准
    ///
    /// 未在校准时返回 false。
    pub fn cancel(&mut self) -> bool {
        if !self.is_calibrating() {
            return false;
        }
        self.baseline = self.previous.take();
        self.state = CalibrationState::Idle;
        self.samples = 0;
        tracing::info!("calibration cancelled");
        true
    }

    /// 检查截止时间，窗口在本次调用中结束时返回 true
    ///
    /// 早于窗口起点的时间戳来自另一个时钟，窗口改为从该时刻重新起算。
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let CalibrationState::Calibrating {
            started_at_ms,
            deadline_ms,
        } = self.state
        else {
            return false;
        };
        if now_ms < started_at_ms {
            tracing::warn!(
                started_at_ms,
                now_ms,
                "timestamp precedes calibration start, re-anchoring window"
            );
            self.state = CalibrationState::Calibrating {
                started_at_ms: now_ms,
                deadline_ms: now_ms + self.duration_ms,
            };
            return false;
        }
        if now_ms < deadline_ms {
            return false;
        }

        self.state = CalibrationState::Idle;
        self.previous = None;
        if self.samples == 0 {
            tracing::warn!("calibration window closed without samples, keeping previous baseline");
        } else {
            tracing::info!(samples = self.samples, "calibration completed");
        }
        true
    }

    /// 吸收一帧样本，返回当前窗口的样本数
    ///
    /// 仅在校准中生效。
    pub fn observe(&mut self, sample: &GeometricMeasures) -> u32 {
        if !self.is_calibrating() {
            return self.samples;
        }

        self.baseline = match (self.samples, self.baseline) {
            (0, _) | (_, None) => Some(*sample),
            (_, Some(current)) => Some(current.blend(sample, self.alpha)),
        };
        self.samples += 1;
        self.samples
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrating { .. })
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn baseline(&self) -> Option<&NeutralBaseline> {
        self.baseline.as_ref()
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// 校准窗口剩余时间（毫秒），未校准时为 0
    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        match self.state {
            CalibrationState::Calibrating { deadline_ms, .. } => (deadline_ms - now_ms).max(0.0),
            CalibrationState::Idle => 0.0,
        }
    }
}
