//! 지표별 점수 규칙.
//!
//! 모든 규칙은 발표치를 `[-1.0, +1.0]` 범위의 하위 점수로 변환합니다.
//! 구체적인 기준값과 스케일은 설정으로 주어지며 코드에 박혀 있지 않습니다.

use serde::{Deserialize, Serialize};

use crate::domain::Reading;

/// 하위 점수의 하한.
pub const MIN_SUB_SCORE: f64 = -1.0;
/// 하위 점수의 상한.
pub const MAX_SUB_SCORE: f64 = 1.0;

/// 점수 규칙.
///
/// ```
/// use edge_core::{Reading, ScoringRule, Unit};
///
/// // CPI 3.2%: 기준 2.0%, 스케일 3.0, 낮을수록 유리
/// let rule = ScoringRule::Level { neutral: 2.0, scale: 3.0, higher_is_better: false };
/// let score = rule.sub_score(&Reading::new(3.2, Unit::Percent));
/// assert!((score + 0.4).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringRule {
    /// 수준 규칙: 고정 기준값 대비 발표치의 거리.
    ///
    /// `sign * (actual - neutral) / scale`
    Level {
        neutral: f64,
        scale: f64,
        higher_is_better: bool,
    },

    /// 서프라이즈 규칙: 예측치(없으면 이전치, 그것도 없으면 `fallback_neutral`)
    /// 대비 발표치의 차이.
    ///
    /// `sign * (actual - reference) / scale`
    Surprise {
        scale: f64,
        higher_is_better: bool,
        fallback_neutral: f64,
    },
}

impl ScoringRule {
    /// 하위 점수를 계산합니다. 결과는 항상 `[-1, 1]`로 잘립니다.
    ///
    /// 입력이 유한하지 않으면 NaN이 그대로 전파되므로 호출자가 걸러야 합니다.
    pub fn sub_score(&self, reading: &Reading) -> f64 {
        let (delta, scale, higher_is_better) = match *self {
            Self::Level {
                neutral,
                scale,
                higher_is_better,
            } => (reading.actual - neutral, scale, higher_is_better),
            Self::Surprise {
                scale,
                higher_is_better,
                fallback_neutral,
            } => {
                let reference = reading
                    .forecast
                    .or(reading.previous)
                    .unwrap_or(fallback_neutral);
                (reading.actual - reference, scale, higher_is_better)
            }
        };

        let sign = if higher_is_better { 1.0 } else { -1.0 };
        (sign * delta / scale).clamp(MIN_SUB_SCORE, MAX_SUB_SCORE)
    }

    /// 규칙 파라미터의 유효성 검사 (스케일은 양수여야 함).
    pub fn validate(&self) -> Result<(), String> {
        let scale = match *self {
            Self::Level { scale, neutral, .. } => {
                if !neutral.is_finite() {
                    return Err("neutral must be finite".to_string());
                }
                scale
            }
            Self::Surprise {
                scale,
                fallback_neutral,
                ..
            } => {
                if !fallback_neutral.is_finite() {
                    return Err("fallback_neutral must be finite".to_string());
                }
                scale
            }
        };

        if !(scale.is_finite() && scale > 0.0) {
            return Err(format!("scale must be a positive number, got {}", scale));
        }
        Ok(())
    }
}
