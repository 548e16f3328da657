//! 表情分类
//!
//! 按固定顺序匹配规则表，第一条命中的规则决定标签与置信度。
//! 各类别的触发条件互相重叠，顺序即优先级：
//!
//! | # | 条件 | 标签 | 置信度 |
//! |---|------|------|--------|
//! | 1 | smile > 0.4 | Joy | smile |
//! | 2 | browLift > 0.5 且 mouthOpen > 0.3 | Surprise | (browLift + mouthOpen) / 2 |
//! | 3 | browLift > 0.4 且 smile < 0.2 | Worry | browLift |
//! | 4 | squint > 0.7 且 mouthOpen < 0.2 | Focus/Anger | squint |
//! | 5 | mouthOpen > 0.6 | Laughter | mouthOpen |
//! | - | 其他 | Neutral | 0.5 |

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::signals::{clamp_unit, EmotionMetrics};

/// 未命中任何规则时的固定置信度
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    Joy,
    Surprise,
    Worry,
    #[serde(rename = "Focus/Anger")]
    FocusAnger,
    Laughter,
    Neutral,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 6] = [
        EmotionLabel::Joy,
        EmotionLabel::Surprise,
        EmotionLabel::Worry,
        EmotionLabel::FocusAnger,
        EmotionLabel::Laughter,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joy => "Joy",
            Self::Surprise => "Surprise",
            Self::Worry => "Worry",
            Self::FocusAnger => "Focus/Anger",
            Self::Laughter => "Laughter",
            Self::Neutral => "Neutral",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Joy => "😊",
            Self::Surprise => "😲",
            Self::Worry => "😟",
            Self::FocusAnger => "😠",
            Self::Laughter => "😆",
            Self::Neutral => "😐",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单帧分类结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionDecision {
    pub label: EmotionLabel,
    pub confidence: f64,
}

impl EmotionDecision {
    pub fn new(label: EmotionLabel, confidence: f64) -> Self {
        Self {
            label,
            confidence: clamp_unit(confidence),
        }
    }

    pub fn neutral() -> Self {
        Self::new(EmotionLabel::Neutral, NEUTRAL_CONFIDENCE)
    }
}

// 输出时附带 emoji，前端直接渲染
impl Serialize for EmotionDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("EmotionDecision", 3)?;
        s.serialize_field("label", &self.label)?;
        s.serialize_field("emoji", self.label.emoji())?;
        s.serialize_field("confidence", &self.confidence)?;
        s.end()
    }
}

/// 规则表中的一条规则
pub struct Rule {
    pub label: EmotionLabel,
    pub matches: fn(&EmotionMetrics) -> bool,
    pub confidence: fn(&EmotionMetrics) -> f64,
}

/// 按优先级排列的规则表，Neutral 作为兜底不在表中
pub static RULES: [Rule; 5] = [
    Rule {
        label: EmotionLabel::Joy,
        matches: |m| m.smile > 0.4,
        confidence: |m| m.smile,
    },
    Rule {
        label: EmotionLabel::Surprise,
        matches: |m| m.brow_lift > 0.5 && m.mouth_open > 0.3,
        confidence: |m| (m.brow_lift + m.mouth_open) / 2.0,
    },
    Rule {
        label: EmotionLabel::Worry,
        matches: |m| m.brow_lift > 0.4 && m.smile < 0.2,
        confidence: |m| m.brow_lift,
    },
    Rule {
        label: EmotionLabel::FocusAnger,
        matches: |m| m.squint > 0.7 && m.mouth_open < 0.2,
        confidence: |m| m.squint,
    },
    Rule {
        label: EmotionLabel::Laughter,
        matches: |m| m.mouth_open > 0.6,
        confidence: |m| m.mouth_open,
    },
];

/// 无状态的逐帧分类
pub fn classify(metrics: &EmotionMetrics) -> EmotionDecision {
    RULES
        .iter()
        .find(|rule| (rule.matches)(metrics))
        .map(|rule| EmotionDecision::new(rule.label, (rule.confidence)(metrics)))
        .unwrap_or_else(EmotionDecision::neutral)
}
