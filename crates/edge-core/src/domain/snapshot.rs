//! 스냅샷 - 캐시의 저장 단위.
//!
//! 스냅샷은 점수가 매겨진 지표 목록과 그로부터 계산된 종합 점수,
//! 계산 시각과 만료 시각을 묶은 불변 값입니다.
//!
//! # 불변 조건
//!
//! - 종합 점수는 항상 하위 점수들로부터 다시 계산할 수 있습니다.
//!   스냅샷은 [`ScoreCard`]로만 생성되며, 역직렬화 시에도 종합 점수를
//!   재계산해 저장된 값과 다르면 거부합니다.
//! - 생성 후에는 변경할 수 없습니다 (필드는 비공개, 조회 메서드만 제공).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::indicator::Indicator;
use super::regime::MacroBias;
use crate::error::{EdgeError, EdgeResult};
use crate::scoring::SCORING_RULE_VERSION;

/// 역직렬화 시 종합 점수 비교 허용 오차.
const COMPOSITE_TOLERANCE: f64 = 1e-9;

/// 점수가 매겨진 지표.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredIndicator {
    /// 원본 지표
    pub indicator: Indicator,
    /// 하위 점수 (`[-1, 1]`). 종합 점수에서 제외된 지표는 None.
    pub sub_score: Option<f64>,
    /// 가중 평균에 사용한 가중치
    pub weight: f64,
    /// 점수 규칙 버전
    pub rule_version: u32,
}

impl ScoredIndicator {
    /// 종합 점수에 반영된 지표인지 여부.
    pub fn is_scored(&self) -> bool {
        self.sub_score.is_some()
    }
}

/// 사용 가능한 하위 점수들의 가중 평균.
///
/// 제외된 지표(하위 점수 None)는 분자와 분모 모두에서 빠집니다.
/// 사용할 수 있는 지표가 없으면 None.
pub fn weighted_composite(scored: &[ScoredIndicator]) -> Option<f64> {
    let (sum, total_weight) = scored
        .iter()
        .filter_map(|s| s.sub_score.map(|score| (score, s.weight)))
        .fold((0.0, 0.0), |(sum, w), (score, weight)| {
            (sum + score * weight, w + weight)
        });

    if total_weight > 0.0 {
        Some(sum / total_weight)
    } else {
        None
    }
}

/// 스코어러의 결과 - 아직 시각이 찍히지 않은 스냅샷 후보.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    indicators: Vec<ScoredIndicator>,
    composite_score: f64,
}

impl ScoreCard {
    /// 점수가 매겨진 지표들로 생성합니다.
    ///
    /// 사용 가능한 지표가 하나도 없으면 `DataUnavailable`.
    pub fn from_scored(indicators: Vec<ScoredIndicator>) -> EdgeResult<Self> {
        let composite_score = weighted_composite(&indicators).ok_or_else(|| {
            EdgeError::DataUnavailable(format!(
                "{}개 지표 중 점수를 계산할 수 있는 지표가 없습니다",
                indicators.len()
            ))
        })?;

        Ok(Self {
            indicators,
            composite_score,
        })
    }

    pub fn indicators(&self) -> &[ScoredIndicator] {
        &self.indicators
    }

    pub fn composite_score(&self) -> f64 {
        self.composite_score
    }

    /// 종합 점수에 반영된 지표 수.
    pub fn scored_count(&self) -> usize {
        self.indicators.iter().filter(|s| s.is_scored()).count()
    }
}

/// 지역별 점수 (스냅샷에서 파생).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionScore {
    /// 지역 키
    pub region: String,
    /// 지역 내 사용 가능한 하위 점수의 가중 평균
    pub score: Option<f64>,
    /// 점수에 반영된 지표 수
    pub usable: usize,
    /// 전체 지표 수
    pub total: usize,
}

impl RegionScore {
    /// 지역 점수의 바이어스 라벨.
    pub fn bias(&self) -> Option<MacroBias> {
        self.score.map(MacroBias::from_score)
    }
}

/// 매크로 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct Snapshot {
    indicators: Vec<ScoredIndicator>,
    composite_score: f64,
    computed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    rule_version: u32,
}

impl Snapshot {
    /// 스코어카드에 계산 시각과 TTL을 찍어 스냅샷을 만듭니다.
    pub fn new(card: ScoreCard, computed_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            indicators: card.indicators,
            composite_score: card.composite_score,
            computed_at,
            expires_at: computed_at + ttl,
            rule_version: SCORING_RULE_VERSION,
        }
    }

    /// 표시 순서대로 정렬된 지표.
    pub fn indicators(&self) -> &[ScoredIndicator] {
        &self.indicators
    }

    /// id로 지표 조회.
    pub fn indicator(&self, id: &str) -> Option<&ScoredIndicator> {
        self.indicators.iter().find(|s| s.indicator.id == id)
    }

    pub fn composite_score(&self) -> f64 {
        self.composite_score
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn rule_version(&self) -> u32 {
        self.rule_version
    }

    /// 종합 점수의 바이어스 라벨.
    pub fn bias(&self) -> MacroBias {
        MacroBias::from_score(self.composite_score)
    }

    /// 종합 점수에 반영된 지표 수.
    pub fn scored_count(&self) -> usize {
        self.indicators.iter().filter(|s| s.is_scored()).count()
    }

    /// 지역별 점수 (지역이 처음 등장한 순서).
    pub fn region_scores(&self) -> Vec<RegionScore> {
        let mut regions: Vec<&str> = Vec::new();
        for s in &self.indicators {
            if !regions.contains(&s.indicator.region.as_str()) {
                regions.push(&s.indicator.region);
            }
        }

        regions
            .into_iter()
            .map(|region| {
                let members: Vec<ScoredIndicator> = self
                    .indicators
                    .iter()
                    .filter(|s| s.indicator.region == region)
                    .cloned()
                    .collect();
                RegionScore {
                    region: region.to_string(),
                    score: weighted_composite(&members),
                    usable: members.iter().filter(|s| s.is_scored()).count(),
                    total: members.len(),
                }
            })
            .collect()
    }

    /// 점수가 가장 높은 지역 (동점이면 먼저 나온 지역).
    pub fn strongest_region(&self) -> Option<RegionScore> {
        self.extreme_region(|candidate, best| candidate > best)
    }

    /// 점수가 가장 낮은 지역 (동점이면 먼저 나온 지역).
    pub fn weakest_region(&self) -> Option<RegionScore> {
        self.extreme_region(|candidate, best| candidate < best)
    }

    fn extreme_region(&self, better: impl Fn(f64, f64) -> bool) -> Option<RegionScore> {
        self.region_scores()
            .into_iter()
            .filter(|r| r.score.is_some())
            .fold(None, |best: Option<RegionScore>, r| {
                let replace = match (&best, r.score) {
                    (Some(b), Some(score)) => better(score, b.score.unwrap_or(score)),
                    _ => true,
                };
                if replace {
                    Some(r)
                } else {
                    best
                }
            })
    }
}

/// 직렬화된 스냅샷의 원시 형태. 검증 후 [`Snapshot`]으로 변환됩니다.
#[derive(Deserialize)]
struct SnapshotRecord {
    indicators: Vec<ScoredIndicator>,
    composite_score: f64,
    computed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    rule_version: u32,
}

impl TryFrom<SnapshotRecord> for Snapshot {
    type Error = String;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let recomputed = weighted_composite(&record.indicators)
            .ok_or_else(|| "snapshot has no scored indicators".to_string())?;

        if (recomputed - record.composite_score).abs() > COMPOSITE_TOLERANCE {
            return Err(format!(
                "stored composite {} does not match sub-scores ({})",
                record.composite_score, recomputed
            ));
        }
        if record.expires_at < record.computed_at {
            return Err("expires_at precedes computed_at".to_string());
        }

        Ok(Self {
            indicators: record.indicators,
            composite_score: recomputed,
            computed_at: record.computed_at,
            expires_at: record.expires_at,
            rule_version: record.rule_version,
        })
    }
}
