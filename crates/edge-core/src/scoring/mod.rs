//! 점수 계산.
//!
//! - [`ScoringRule`]: 발표치 → `[-1, 1]` 하위 점수
//! - [`Scorer`]: 지표 모음 → 스코어카드 (하위 점수 + 가중 평균 종합 점수)

pub mod rule;
pub mod scorer;

pub use rule::{ScoringRule, MAX_SUB_SCORE, MIN_SUB_SCORE};
pub use scorer::{IndicatorRule, Scorer};

/// 점수 규칙 버전.
///
/// 규칙의 의미가 바뀌면 올립니다. 버전이 다른 저장 스냅샷은 로드 시 버려집니다.
pub const SCORING_RULE_VERSION: u32 = 1;
