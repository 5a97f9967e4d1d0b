//! 매크로 바이어스 - 점수 구간별 라벨.
//!
//! 종합 점수와 지역 점수를 대시보드 문구와 색상으로 바꿉니다.
//!
//! | 구간 | 라벨 |
//! |------|------|
//! | `score >= 0.5` | Strong macro, bullish bias |
//! | `0.15 <= score < 0.5` | Supportive macro, mild bullish bias |
//! | `-0.15 < score < 0.15` | Neutral / mixed |
//! | `score <= -0.15` | Weak macro, bearish bias |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strong 하한.
const STRONG_THRESHOLD: f64 = 0.5;
/// Supportive 하한.
const SUPPORTIVE_THRESHOLD: f64 = 0.15;
/// Neutral 하한 (이 값 이하는 Weak).
const WEAK_THRESHOLD: f64 = -0.15;

/// 매크로 바이어스.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacroBias {
    /// 강한 매크로, 강세 바이어스
    Strong,
    /// 우호적 매크로, 약한 강세 바이어스
    Supportive,
    /// 중립 / 혼조
    Neutral,
    /// 약한 매크로, 약세 바이어스
    Weak,
}

impl MacroBias {
    /// 점수에서 바이어스를 결정합니다.
    pub fn from_score(score: f64) -> Self {
        if score >= STRONG_THRESHOLD {
            Self::Strong
        } else if score >= SUPPORTIVE_THRESHOLD {
            Self::Supportive
        } else if score > WEAK_THRESHOLD {
            Self::Neutral
        } else {
            Self::Weak
        }
    }

    /// 대시보드 문구.
    pub fn description(self) -> &'static str {
        match self {
            Self::Strong => "Strong macro, bullish bias",
            Self::Supportive => "Supportive macro, mild bullish bias",
            Self::Neutral => "Neutral / mixed",
            Self::Weak => "Weak macro, bearish bias",
        }
    }

    /// 컬러 코드 (UI용).
    pub fn color_code(self) -> &'static str {
        match self {
            Self::Strong => "#2ecc71",
            Self::Supportive => "#f1c40f",
            Self::Neutral => "#bdc3c7",
            Self::Weak => "#e74c3c",
        }
    }
}

impl fmt::Display for MacroBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strong => "STRONG",
            Self::Supportive => "SUPPORTIVE",
            Self::Neutral => "NEUTRAL",
            Self::Weak => "WEAK",
        };
        write!(f, "{}", s)
    }
}
