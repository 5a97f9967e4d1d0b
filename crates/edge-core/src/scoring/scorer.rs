//! 지표 모음을 스코어카드로 변환하는 스코어러.
//!
//! 순수 함수입니다. 같은 입력에는 항상 같은 출력을 내며 내부 상태를 바꾸지 않습니다.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::rule::ScoringRule;
use super::SCORING_RULE_VERSION;
use crate::config::AppConfig;
use crate::domain::{IndicatorSet, ScoreCard, ScoredIndicator};
use crate::error::EdgeResult;

/// 지표 하나에 적용되는 규칙과 가중치.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRule {
    pub rule: ScoringRule,
    pub weight: f64,
}

/// 스코어러.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    rules: HashMap<String, IndicatorRule>,
}

impl Scorer {
    /// 규칙이 없는 스코어러.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지표 규칙을 추가합니다.
    pub fn with_rule(mut self, id: impl Into<String>, rule: ScoringRule, weight: f64) -> Self {
        self.rules.insert(id.into(), IndicatorRule { rule, weight });
        self
    }

    /// 설정의 지표 계획에서 생성합니다.
    pub fn from_config(config: &AppConfig) -> Self {
        config
            .indicator_plan()
            .into_iter()
            .fold(Self::new(), |scorer, planned| {
                scorer.with_rule(planned.id, planned.rule, planned.weight)
            })
    }

    /// id에 해당하는 규칙.
    pub fn rule_for(&self, id: &str) -> Option<&IndicatorRule> {
        self.rules.get(id)
    }

    /// 지표 모음의 점수를 계산합니다.
    ///
    /// - MISSING / PARSE_ERROR 지표는 하위 점수 없이 목록에만 남고 종합 점수에서 제외됩니다.
    /// - 규칙이 없거나 결과가 유한하지 않은 지표도 같은 방식으로 제외됩니다.
    /// - 반영된 지표가 없으면 `DataUnavailable`.
    pub fn score(&self, indicators: IndicatorSet) -> EdgeResult<ScoreCard> {
        let scored: Vec<ScoredIndicator> = indicators
            .into_iter()
            .map(|indicator| {
                let rule = self.rules.get(&indicator.id);
                let sub_score = match (indicator.reading(), rule) {
                    (Some(reading), Some(r)) => {
                        let score = r.rule.sub_score(reading);
                        if score.is_finite() {
                            debug!(id = %indicator.id, actual = reading.actual, score, "하위 점수 계산");
                            Some(score)
                        } else {
                            warn!(id = %indicator.id, actual = reading.actual, "하위 점수가 유한하지 않아 제외");
                            None
                        }
                    }
                    (Some(_), None) => {
                        warn!(id = %indicator.id, "점수 규칙이 없는 지표 제외");
                        None
                    }
                    (None, _) => {
                        debug!(id = %indicator.id, status = %indicator.status(), "수집 실패 지표 제외");
                        None
                    }
                };

                ScoredIndicator {
                    sub_score,
                    weight: rule.map(|r| r.weight).unwrap_or(0.0),
                    rule_version: SCORING_RULE_VERSION,
                    indicator,
                }
            })
            .collect();

        ScoreCard::from_scored(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Indicator, Reading, Unit};

    fn cpi_rule() -> ScoringRule {
        ScoringRule::Level {
            neutral: 2.0,
            scale: 3.0,
            higher_is_better: false,
        }
    }

    #[test]
    fn test_excluded_indicator_does_not_shift_composite() {
        let scorer = Scorer::new()
            .with_rule("CPI_YoY", cpi_rule(), 1.0)
            .with_rule(
                "Unemployment",
                ScoringRule::Level {
                    neutral: 4.0,
                    scale: 2.0,
                    higher_is_better: false,
                },
                1.0,
            );

        let indicators: IndicatorSet = vec![
            Indicator::ok("CPI_YoY", "us", "CPI YoY", Reading::new(3.2, Unit::Percent)),
            Indicator::parse_error("Unemployment", "us", "Unemployment", "no number in cell"),
        ]
        .into_iter()
        .collect();

        let card = scorer.score(indicators).unwrap();
        assert!((card.composite_score() + 0.4).abs() < 1e-9);
        assert_eq!(card.scored_count(), 1);
        assert_eq!(card.indicators().len(), 2);
        assert!(card.indicators()[1].sub_score.is_none());
    }

    #[test]
    fn test_all_failed_is_data_unavailable() {
        let scorer = Scorer::new().with_rule("CPI_YoY", cpi_rule(), 1.0);
        let indicators: IndicatorSet =
            vec![Indicator::missing("CPI_YoY", "us", "CPI YoY", "HTTP 503")]
                .into_iter()
                .collect();

        let err = scorer.score(indicators).unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[test]
    fn test_indicator_without_rule_is_excluded() {
        let scorer = Scorer::new().with_rule("CPI_YoY", cpi_rule(), 1.0);
        let indicators: IndicatorSet = vec![
            Indicator::ok("CPI_YoY", "us", "CPI YoY", Reading::new(2.0, Unit::Percent)),
            Indicator::ok("Unknown", "us", "Unknown", Reading::new(99.0, Unit::Index)),
        ]
        .into_iter()
        .collect();

        let card = scorer.score(indicators).unwrap();
        assert_eq!(card.scored_count(), 1);
        assert_eq!(card.composite_score(), 0.0);
    }

    #[test]
    fn test_weighted_mean() {
        let scorer = Scorer::new()
            .with_rule(
                "a",
                ScoringRule::Level {
                    neutral: 0.0,
                    scale: 1.0,
                    higher_is_better: true,
                },
                3.0,
            )
            .with_rule(
                "b",
                ScoringRule::Level {
                    neutral: 0.0,
                    scale: 1.0,
                    higher_is_better: true,
                },
                1.0,
            );
        let indicators: IndicatorSet = vec![
            Indicator::ok("a", "us", "A", Reading::new(1.0, Unit::Index)),
            Indicator::ok("b", "us", "B", Reading::new(-1.0, Unit::Index)),
        ]
        .into_iter()
        .collect();

        // (1*3 + -1*1) / 4 = 0.5
        let card = scorer.score(indicators).unwrap();
        assert!((card.composite_score() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let scorer = Scorer::from_config(&AppConfig::default());
        let make = || -> IndicatorSet {
            vec![
                Indicator::ok("us.CPI_YoY", "us", "CPI YoY", Reading::new(3.4, Unit::Percent).with_forecast(3.3)),
                Indicator::ok("us.PMI", "us", "PMI", Reading::new(49.1, Unit::Index).with_previous(48.7)),
                Indicator::missing("us.RetailSales_MoM", "us", "Retail Sales", "timeout"),
            ]
            .into_iter()
            .collect()
        };

        let first = scorer.score(make()).unwrap();
        let second = scorer.score(make()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.composite_score().to_bits(),
            second.composite_score().to_bits()
        );
    }
}
