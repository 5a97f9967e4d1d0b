//! 매크로 지표 도메인 타입.
//!
//! 외부 사이트의 마크업은 언제든 바뀔 수 있으므로, 수집 결과는 예외가 아니라
//! 태그가 붙은 값([`FetchOutcome`])으로 표현합니다. 지표 하나가 실패해도
//! 나머지 지표의 수집과 점수 계산에는 영향을 주지 않습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 지표 값의 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// 퍼센트 (예: CPI YoY 3.2%)
    Percent,
    /// 지수 (예: PMI 51.2)
    Index,
}

impl Unit {
    /// 표시용 접미사.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Index => "",
        }
    }
}

/// 경제 캘린더 한 행에서 읽은 수치.
///
/// `actual`은 필수이고, 예측치와 이전치는 페이지에 없을 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// 발표치
    pub actual: f64,
    /// 예측치
    pub forecast: Option<f64>,
    /// 이전치
    pub previous: Option<f64>,
    /// 단위
    pub unit: Unit,
}

impl Reading {
    /// 발표치만으로 생성합니다.
    pub fn new(actual: f64, unit: Unit) -> Self {
        Self {
            actual,
            forecast: None,
            previous: None,
            unit,
        }
    }

    /// 예측치를 설정합니다.
    pub fn with_forecast(mut self, forecast: f64) -> Self {
        self.forecast = Some(forecast);
        self
    }

    /// 이전치를 설정합니다.
    pub fn with_previous(mut self, previous: f64) -> Self {
        self.previous = Some(previous);
        self
    }
}

/// 수집 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStatus {
    /// 정상 수집
    Ok,
    /// 네트워크 실패, 타임아웃, 비정상 HTTP 상태
    Missing,
    /// 페이지는 받았으나 값을 찾거나 해석하지 못함
    ParseError,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::Missing => "MISSING",
            Self::ParseError => "PARSE_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// 지표 하나의 수집 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchOutcome {
    /// 정상 수집된 값
    Ok(Reading),
    /// 수집 실패 사유
    Missing(String),
    /// 파싱 실패 사유
    ParseError(String),
}

impl FetchOutcome {
    /// 상태 태그.
    pub fn status(&self) -> FetchStatus {
        match self {
            Self::Ok(_) => FetchStatus::Ok,
            Self::Missing(_) => FetchStatus::Missing,
            Self::ParseError(_) => FetchStatus::ParseError,
        }
    }

    /// 정상 수집된 경우의 값.
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Ok(reading) => Some(reading),
            _ => None,
        }
    }

    /// 실패 사유 (정상이면 None).
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Missing(reason) | Self::ParseError(reason) => Some(reason),
        }
    }
}

/// 매크로 지표 하나.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// 지표 ID (예: "us.CPI_YoY")
    pub id: String,
    /// 지역 키 (예: "us")
    pub region: String,
    /// 표시용 이름 (예: "CPI YoY")
    pub label: String,
    /// 사이트에 표시된 발표 시각
    pub source_timestamp: Option<DateTime<Utc>>,
    /// 수집 결과
    pub outcome: FetchOutcome,
}

impl Indicator {
    /// 정상 수집된 지표.
    pub fn ok(
        id: impl Into<String>,
        region: impl Into<String>,
        label: impl Into<String>,
        reading: Reading,
    ) -> Self {
        Self {
            id: id.into(),
            region: region.into(),
            label: label.into(),
            source_timestamp: None,
            outcome: FetchOutcome::Ok(reading),
        }
    }

    /// 네트워크 등으로 수집하지 못한 지표.
    pub fn missing(
        id: impl Into<String>,
        region: impl Into<String>,
        label: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            region: region.into(),
            label: label.into(),
            source_timestamp: None,
            outcome: FetchOutcome::Missing(reason.into()),
        }
    }

    /// 값을 해석하지 못한 지표.
    pub fn parse_error(
        id: impl Into<String>,
        region: impl Into<String>,
        label: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            region: region.into(),
            label: label.into(),
            source_timestamp: None,
            outcome: FetchOutcome::ParseError(reason.into()),
        }
    }

    /// 발표 시각을 설정합니다.
    pub fn with_source_timestamp(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.source_timestamp = ts;
        self
    }

    /// 수집 상태.
    pub fn status(&self) -> FetchStatus {
        self.outcome.status()
    }

    /// 정상 수집된 값.
    pub fn reading(&self) -> Option<&Reading> {
        self.outcome.reading()
    }

    /// 점수 계산에 사용할 수 있는지 여부.
    pub fn is_usable(&self) -> bool {
        self.status() == FetchStatus::Ok
    }
}

/// 설정 순서를 유지하는 지표 모음 (id → Indicator).
///
/// 순서가 곧 표시 순서이므로 `HashMap` 대신 벡터로 보관하고
/// id 조회는 선형 탐색으로 처리합니다. 지표 수는 수십 개 수준입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet {
    items: Vec<Indicator>,
}

impl IndicatorSet {
    /// 빈 모음.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지표를 추가합니다. 같은 id가 이미 있으면 교체합니다 (순서 유지).
    pub fn insert(&mut self, indicator: Indicator) {
        match self.items.iter_mut().find(|i| i.id == indicator.id) {
            Some(existing) => *existing = indicator,
            None => self.items.push(indicator),
        }
    }

    /// id로 조회합니다.
    pub fn get(&self, id: &str) -> Option<&Indicator> {
        self.items.iter().find(|i| i.id == id)
    }

    /// 설정 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 정상 수집된 지표 수.
    pub fn usable_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_usable()).count()
    }

    /// 상태별 개수 (ok, missing, parse_error).
    pub fn status_counts(&self) -> (usize, usize, usize) {
        self.items
            .iter()
            .fold((0, 0, 0), |(ok, missing, parse), i| match i.status() {
                FetchStatus::Ok => (ok + 1, missing, parse),
                FetchStatus::Missing => (ok, missing + 1, parse),
                FetchStatus::ParseError => (ok, missing, parse + 1),
            })
    }
}

impl FromIterator<Indicator> for IndicatorSet {
    fn from_iter<I: IntoIterator<Item = Indicator>>(iter: I) -> Self {
        let mut set = IndicatorSet::new();
        for indicator in iter {
            set.insert(indicator);
        }
        set
    }
}

impl IntoIterator for IndicatorSet {
    type Item = Indicator;
    type IntoIter = std::vec::IntoIter<Indicator>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
