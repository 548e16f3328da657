//! 表情变化记录
//!
//! 只有同时满足以下条件的结果才会写入记录：
//! - 置信度超过阈值（默认 0.6）
//! - 标签与上一条记录不同
//! - 距上一条记录至少间隔最小时长（默认 2.5 秒）
//!
//! 记录容量有限（默认 8 条），超出后淘汰最旧的一条。
//! 限流只做时间戳比较，不依赖额外定时任务。

use std::collections::VecDeque;

use serde::Serialize;

use crate::classifier::{EmotionDecision, EmotionLabel};
use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub label: EmotionLabel,
    pub emoji: &'static str,
    pub confidence: f64,
    /// 记录时间戳（毫秒）
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    min_gap_ms: f64,
    min_confidence: f64,
    /// 最新的记录在队首
    records: VecDeque<HistoryRecord>,
    last_label: Option<EmotionLabel>,
    last_logged_ms: Option<f64>,
}

impl EventLog {
    pub fn new(capacity: usize, min_gap_ms: f64, min_confidence: f64) -> Self {
        Self {
            capacity: capacity.max(1),
            min_gap_ms,
            min_confidence,
            records: VecDeque::with_capacity(capacity.max(1)),
            last_label: None,
            last_logged_ms: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.history_capacity,
            config.history_min_gap_ms,
            config.history_min_confidence,
        )
    }

    /// 提交一帧分类结果，满足记录条件时写入并返回新记录
    pub fn offer(&mut self, decision: &EmotionDecision, now_ms: f64) -> Option<HistoryRecord> {
        if decision.confidence <= self.min_confidence {
            return None;
        }
        if self.last_label == Some(decision.label) {
            return None;
        }
        if let Some(last) = self.last_logged_ms {
            if now_ms - last < self.min_gap_ms {
                return None;
            }
        }

        let record = HistoryRecord {
            label: decision.label,
            emoji: decision.label.emoji(),
            confidence: decision.confidence,
            timestamp_ms: now_ms,
        };
        self.last_label = Some(decision.label);
        self.last_logged_ms = Some(now_ms);

        self.records.push_front(record);
        while self.records.len() > self.capacity {
            self.records.pop_back();
        }
        Some(record)
    }

    /// 按从新到旧的顺序遍历记录
    pub fn records(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
