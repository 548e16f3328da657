//! 内存会话表
//!
//! 每个会话持有一个 `SessionContext`，帧在锁内就地推进，同一会话的帧
//! 不会交错执行。记录写入和校准完成通过 broadcast 通道广播给 SSE 订阅者。
//!
//! 每个会话只使用一个时钟：客户端首次给出的时间戳决定时钟来源，
//! 之后缺省的时间戳按上一次时间戳加上经过的服务器时间推算。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use micro_emotion_wasm::{
    CalibrationState, EmotionDecision, EmotionError, EmotionLabel, EmotionMetrics, FrameReport,
    HistoryRecord, Keypoint, NeutralBaseline, SessionConfig, SessionContext,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::constants::SESSION_EVENT_CHANNEL_CAPACITY;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("session {0} not found")]
    NotFound(Uuid),
    #[error("session limit reached ({0})")]
    LimitReached(usize),
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}

impl From<EmotionError> for RegistryError {
    fn from(value: EmotionError) -> Self {
        match value {
            EmotionError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    History {
        session_id: Uuid,
        record: HistoryView,
    },
    CalibrationComplete {
        session_id: Uuid,
        baseline: Option<NeutralBaseline>,
    },
    Closed {
        session_id: Uuid,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::History { session_id, .. }
            | Self::CalibrationComplete { session_id, .. }
            | Self::Closed { session_id } => *session_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub label: EmotionLabel,
    pub emoji: &'static str,
    pub confidence: f64,
    pub timestamp_ms: f64,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl From<&HistoryRecord> for HistoryView {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            label: record.label,
            emoji: record.emoji,
            confidence: record.confidence,
            timestamp_ms: record.timestamp_ms,
            recorded_at: DateTime::from_timestamp_millis(record.timestamp_ms as i64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub config: SessionConfig,
    pub calibration: CalibrationState,
    pub calibrating: bool,
    pub calibrated: bool,
    pub baseline: Option<NeutralBaseline>,
    pub last_decision: Option<EmotionDecision>,
    pub last_metrics: Option<EmotionMetrics>,
    pub frames: u64,
    pub history_len: usize,
}

struct SessionSlot {
    ctx: SessionContext,
    created_at: DateTime<Utc>,
    last_seen: Instant,
    /// 会话时钟上最近一次时间戳及其对应的服务器时刻
    clock: Option<(f64, Instant)>,
}

impl SessionSlot {
    /// 按会话时钟解析时间戳，缺省时从上一次时间戳推算，首次缺省时使用服务器时间
    fn resolve_clock(&mut self, at: Option<f64>) -> f64 {
        let now = match (at, self.clock) {
            (Some(ts), _) => ts,
            (None, Some((ts, seen))) => ts + seen.elapsed().as_secs_f64() * 1000.0,
            (None, None) => now_ms(),
        };
        self.clock = Some((now, Instant::now()));
        now
    }

    /// 没有帧到达时，按推算的会话时间结束已到期的校准窗口
    fn expire_calibration(&mut self) -> bool {
        let Some((ts, seen)) = self.clock else {
            return false;
        };
        self.ctx
            .expire_calibration(ts + seen.elapsed().as_secs_f64() * 1000.0)
    }

    fn status(&self, id: Uuid) -> SessionStatus {
        SessionStatus {
            id,
            created_at: self.created_at,
            config: self.ctx.config().clone(),
            calibration: self.ctx.calibration_state(),
            calibrating: self.ctx.is_calibrating(),
            calibrated: self.ctx.is_calibrated(),
            baseline: self.ctx.baseline().copied(),
            last_decision: self.ctx.last_decision().copied(),
            last_metrics: self.ctx.last_metrics().copied(),
            frames: self.ctx.frames(),
            history_len: self.ctx.history_len(),
        }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

pub struct SessionRegistry {
    max_sessions: usize,
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CHANNEL_CAPACITY);
        Self {
            max_sessions,
            sessions: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub async fn create(&self, config: SessionConfig) -> Result<SessionStatus, RegistryError> {
        let ctx = SessionContext::new(config)?;
        let mut sessions = self.sessions.lock().await;
        if sessions.len() >= self.max_sessions {
            return Err(RegistryError::LimitReached(self.max_sessions));
        }

        let id = Uuid::new_v4();
        let slot = SessionSlot {
            ctx,
            created_at: Utc::now(),
            last_seen: Instant::now(),
            clock: None,
        };
        let status = slot.status(id);
        sessions.insert(id, slot);
        tracing::info!(session_id = %id, active = sessions.len(), "session created");
        Ok(status)
    }

    pub async fn status(&self, id: Uuid) -> Result<SessionStatus, RegistryError> {
        let (status, completed) = {
            let mut sessions = self.sessions.lock().await;
            let slot = sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
            let completed = slot.expire_calibration();
            (slot.status(id), completed)
        };

        if completed {
            tracing::info!(session_id = %id, "calibration window expired without new frames");
            self.publish(SessionEvent::CalibrationComplete {
                session_id: id,
                baseline: status.baseline,
            });
        }
        Ok(status)
    }

    /// 推进一帧。`at` 缺省时按会话时钟推算。
    pub async fn process_frame(
        &self,
        id: Uuid,
        keypoints: &[Keypoint],
        at: Option<f64>,
    ) -> Result<FrameReport, RegistryError> {
        let (report, baseline) = {
            let mut sessions = self.sessions.lock().await;
            let slot = sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
            let now = slot.resolve_clock(at);
            let report = slot.ctx.step(keypoints, now);
            slot.touch();
            (report, slot.ctx.baseline().copied())
        };

        if report.calibration_completed {
            tracing::info!(session_id = %id, "calibration completed");
            self.publish(SessionEvent::CalibrationComplete {
                session_id: id,
                baseline,
            });
        }
        if let Some(record) = report.logged() {
            self.publish(SessionEvent::History {
                session_id: id,
                record: HistoryView::from(record),
            });
        }

        Ok(report)
    }

    /// 开始校准窗口，起点取自会话时钟
    pub async fn begin_calibration(
        &self,
        id: Uuid,
        at: Option<f64>,
    ) -> Result<SessionStatus, RegistryError> {
        let mut sessions = self.sessions.lock().await;
        let slot = sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        let now = slot.resolve_clock(at);
        slot.ctx.begin_calibration(now);
        slot.touch();
        tracing::info!(session_id = %id, started_at_ms = now, "calibration started");
        Ok(slot.status(id))
    }

    /// 返回是否确有进行中的校准被取消
    pub async fn cancel_calibration(&self, id: Uuid) -> Result<bool, RegistryError> {
        let mut sessions = self.sessions.lock().await;
        let slot = sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        slot.touch();
        Ok(slot.ctx.cancel_calibration())
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<HistoryView>, RegistryError> {
        let sessions = self.sessions.lock().await;
        let slot = sessions.get(&id).ok_or(RegistryError::NotFound(id))?;
        Ok(slot.ctx.history().map(HistoryView::from).collect())
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), RegistryError> {
        let removed = self.sessions.lock().await.remove(&id);
        if removed.is_none() {
            return Err(RegistryError::NotFound(id));
        }
        tracing::info!(session_id = %id, "session removed");
        self.publish(SessionEvent::Closed { session_id: id });
        Ok(())
    }

    /// 淘汰空闲时间不少于 `ttl` 的会话，返回淘汰数量
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<Uuid> = {
            let mut sessions = self.sessions.lock().await;
            let stale: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, slot)| slot.last_seen.elapsed() >= ttl)
                .map(|(id, _)| *id)
                .collect();
            for id in &stale {
                sessions.remove(id);
            }
            stale
        };

        for id in &evicted {
            self.publish(SessionEvent::Closed { session_id: *id });
        }
        evicted.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // 没有订阅者时发送失败是正常情况
        let _ = self.events.send(event);
    }
}

/// 服务器墙钟，Unix 毫秒
pub fn now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

#[cfg(test)]
mod tests {
    use micro_emotion_wasm::landmarks::MESH_POINT_COUNT;

    use super::*;

    fn flat_face() -> Vec<Keypoint> {
        (0..MESH_POINT_COUNT)
            .map(|i| Keypoint::new(i as f64, (i % 7) as f64 + 1.0))
            .collect()
    }

    #[tokio::test]
    async fn create_respects_limit() {
        let registry = SessionRegistry::new(1);
        registry
            .create(SessionConfig::default())
            .await
            .expect("first session");
        let err = registry
            .create(SessionConfig::default())
            .await
            .expect_err("limit");
        assert_eq!(err, RegistryError::LimitReached(1));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let registry = SessionRegistry::new(4);
        let cfg = SessionConfig {
            history_capacity: 0,
            ..SessionConfig::default()
        };
        let err = registry.create(cfg).await.expect_err("invalid");
        assert!(matches!(err, RegistryError::InvalidConfig(_)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let registry = SessionRegistry::new(4);
        let id = Uuid::new_v4();
        assert_eq!(
            registry.status(id).await.expect_err("missing"),
            RegistryError::NotFound(id)
        );
        assert_eq!(
            registry.remove(id).await.expect_err("missing"),
            RegistryError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn calibration_completion_is_broadcast() {
        let registry = SessionRegistry::new(4);
        let mut rx = registry.subscribe();
        let status = registry
            .create(SessionConfig::default())
            .await
            .expect("create");

        registry
            .begin_calibration(status.id, Some(0.0))
            .await
            .expect("begin");
        registry
            .process_frame(status.id, &flat_face(), Some(100.0))
            .await
            .expect("frame");
        let report = registry
            .process_frame(status.id, &flat_face(), Some(3000.0))
            .await
            .expect("frame");
        assert!(report.calibration_completed);

        match rx.recv().await.expect("event") {
            SessionEvent::CalibrationComplete {
                session_id,
                baseline,
            } => {
                assert_eq!(session_id, status.id);
                assert!(baseline.is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }

        let status = registry.status(status.id).await.expect("status");
        assert!(status.calibrated);
        assert!(!status.calibrating);
        assert_eq!(status.frames, 2);
    }

    #[tokio::test]
    async fn missing_timestamps_follow_the_session_clock() {
        let registry = SessionRegistry::new(4);
        let status = registry
            .create(SessionConfig::default())
            .await
            .expect("create");

        registry
            .process_frame(status.id, &flat_face(), Some(16.0))
            .await
            .expect("frame");
        let status = registry
            .begin_calibration(status.id, None)
            .await
            .expect("begin");
        match status.calibration {
            CalibrationState::Calibrating { started_at_ms, .. } => {
                assert!((16.0..1_000.0).contains(&started_at_ms));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_closes_overdue_window() {
        let registry = SessionRegistry::new(4);
        let mut rx = registry.subscribe();
        let cfg = SessionConfig {
            calibration_duration_ms: 1.0,
            ..SessionConfig::default()
        };
        let status = registry.create(cfg).await.expect("create");

        registry
            .begin_calibration(status.id, Some(0.0))
            .await
            .expect("begin");
        tokio::time::sleep(Duration::from_millis(20)).await;

        let status = registry.status(status.id).await.expect("status");
        assert!(!status.calibrating);
        match rx.recv().await.expect("event") {
            SessionEvent::CalibrationComplete { session_id, .. } => {
                assert_eq!(session_id, status.id)
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn evict_idle_drops_stale_sessions() {
        let registry = SessionRegistry::new(4);
        let mut rx = registry.subscribe();
        let status = registry
            .create(SessionConfig::default())
            .await
            .expect("create");

        assert_eq!(registry.evict_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.evict_idle(Duration::ZERO).await, 1);
        assert!(registry.is_empty().await);

        match rx.recv().await.expect("event") {
            SessionEvent::Closed { session_id } => assert_eq!(session_id, status.id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn history_view_carries_wall_clock() {
        let record = HistoryRecord {
            label: EmotionLabel::Joy,
            emoji: EmotionLabel::Joy.emoji(),
            confidence: 0.8,
            timestamp_ms: 1_700_000_000_000.0,
        };
        let view = HistoryView::from(&record);
        assert_eq!(
            view.recorded_at.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }
}
