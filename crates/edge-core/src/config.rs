//! 설정 관리.
//!
//! 설정은 세 단계로 쌓입니다.
//!
//! 1. 코드에 내장된 기본값 ([`AppConfig::default`])
//! 2. TOML 설정 파일 (선택)
//! 3. `EDGE__` 접두사 환경 변수 (예: `EDGE__CACHE__TTL_HOURS=6`)
//!
//! 테이블은 깊게 병합되고 배열(`regions`, `indicators`)은 통째로 교체됩니다.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::Unit;
use crate::error::{EdgeError, EdgeResult};
use crate::logging::LogConfig;
use crate::scoring::ScoringRule;

/// 환경 변수 접두사.
pub const ENV_PREFIX: &str = "EDGE";

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 기본 스냅샷 파일 경로.
pub const DEFAULT_PERSIST_PATH: &str = "data/snapshot.json";

/// 애플리케이션 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 외부 사이트 요청 설정
    pub source: SourceConfig,
    /// 캐시 설정
    pub cache: CacheConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LogConfig,
    /// 지역 목록 (표시 순서)
    pub regions: Vec<RegionConfig>,
    /// 지역마다 수집할 지표 목록 (표시 순서)
    pub indicators: Vec<IndicatorSpec>,
}

/// 외부 사이트 요청 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// User-Agent 헤더 (모바일 브라우저로 위장)
    pub user_agent: String,
    /// Accept-Language 헤더
    pub accept_language: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Linux; Android 10; Pixel 4 XL) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0 Mobile Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            request_timeout_secs: 6,
        }
    }
}

impl SourceConfig {
    /// 요청 타임아웃.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 캐시 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 스냅샷 유효 기간 (시간)
    pub ttl_hours: u32,
    /// 스냅샷 JSON 파일 경로 (빈 문자열이면 메모리 전용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 12,
            persist_path: Some(PathBuf::from(DEFAULT_PERSIST_PATH)),
        }
    }
}

impl CacheConfig {
    /// 파일 미러링 경로. 비어 있으면 `None`.
    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// 스냅샷 유효 기간.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.ttl_hours))
    }
}

/// 지역 (경제 캘린더 페이지 하나).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// 지역 키 (지표 id 접두사)
    pub key: String,
    /// 표시용 이름
    pub label: String,
    /// 경제 캘린더 페이지 URL
    pub url: String,
}

impl RegionConfig {
    fn new(key: &str, label: &str, slug: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            url: format!("https://m.investing.com/economic-calendar/{}", slug),
        }
    }
}

/// 지표 종류 (지역마다 반복 적용).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// 지표 키 (예: "CPI_YoY")
    pub key: String,
    /// 표시용 이름
    pub label: String,
    /// 캘린더 행 이름에서 찾을 키워드 (대소문자 무시)
    pub keywords: Vec<String>,
    /// 값 단위
    pub unit: Unit,
    /// 종합 점수 가중치
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// 점수 규칙
    pub rule: ScoringRule,
}

fn default_weight() -> f64 {
    1.0
}

/// 지역 × 지표 조합으로 펼쳐진 수집 대상 하나.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedIndicator {
    /// 지표 id (`"<region>.<key>"`)
    pub id: String,
    pub region: String,
    pub label: String,
    pub url: String,
    pub keywords: Vec<String>,
    pub unit: Unit,
    pub weight: f64,
    pub rule: ScoringRule,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            cache: CacheConfig::default(),
            logging: LogConfig::default(),
            regions: vec![
                RegionConfig::new("eurozone", "Eurozone", "euro-zone"),
                RegionConfig::new("uk", "United Kingdom", "united-kingdom"),
                RegionConfig::new("us", "United States", "united-states"),
                RegionConfig::new("canada", "Canada", "canada"),
                RegionConfig::new("australia", "Australia", "australia"),
                RegionConfig::new("new_zealand", "New Zealand", "new-zealand"),
                RegionConfig::new("switzerland", "Switzerland", "switzerland"),
                RegionConfig::new("japan", "Japan", "japan"),
            ],
            indicators: vec![
                IndicatorSpec {
                    key: "RetailSales_MoM".to_string(),
                    label: "Retail Sales (m/m)".to_string(),
                    keywords: vec!["retail sales".to_string()],
                    unit: Unit::Percent,
                    weight: 1.0,
                    rule: ScoringRule::Surprise {
                        scale: 0.5,
                        higher_is_better: true,
                        fallback_neutral: 0.0,
                    },
                },
                IndicatorSpec {
                    key: "PMI".to_string(),
                    label: "PMI".to_string(),
                    keywords: vec!["pmi".to_string()],
                    unit: Unit::Index,
                    weight: 1.0,
                    rule: ScoringRule::Level {
                        neutral: 50.0,
                        scale: 5.0,
                        higher_is_better: true,
                    },
                },
                IndicatorSpec {
                    key: "CPI_YoY".to_string(),
                    label: "CPI YoY".to_string(),
                    keywords: vec![
                        "cpi".to_string(),
                        "consumer price".to_string(),
                        "inflation".to_string(),
                    ],
                    unit: Unit::Percent,
                    weight: 1.0,
                    rule: ScoringRule::Level {
                        neutral: 2.0,
                        scale: 3.0,
                        higher_is_better: false,
                    },
                },
            ],
        }
    }
}

impl AppConfig {
    /// 기본값 → 설정 파일(선택) → 환경 변수 순으로 설정을 로드하고 검증합니다.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> EdgeResult<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로의 파일이 있으면 그것을, 없으면 내장 기본값만 사용합니다.
    pub fn load_default() -> EdgeResult<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(Some(path))
        } else {
            Self::load(None::<&Path>)
        }
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> EdgeResult<()> {
        if self.regions.is_empty() {
            return Err(EdgeError::Config("regions must not be empty".to_string()));
        }
        if self.indicators.is_empty() {
            return Err(EdgeError::Config("indicators must not be empty".to_string()));
        }
        if self.cache.ttl_hours == 0 {
            return Err(EdgeError::Config("cache.ttl_hours must be positive".to_string()));
        }
        if self.source.request_timeout_secs == 0 {
            return Err(EdgeError::Config(
                "source.request_timeout_secs must be positive".to_string(),
            ));
        }

        let mut region_keys = HashSet::new();
        for region in &self.regions {
            if !region_keys.insert(region.key.as_str()) {
                return Err(EdgeError::Config(format!("duplicate region key: {}", region.key)));
            }
            if region.url.trim().is_empty() {
                return Err(EdgeError::Config(format!("region {} has no url", region.key)));
            }
        }

        let mut indicator_keys = HashSet::new();
        for spec in &self.indicators {
            if !indicator_keys.insert(spec.key.as_str()) {
                return Err(EdgeError::Config(format!("duplicate indicator key: {}", spec.key)));
            }
            if spec.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(EdgeError::Config(format!("indicator {} has no keywords", spec.key)));
            }
            if !(spec.weight.is_finite() && spec.weight > 0.0) {
                return Err(EdgeError::Config(format!(
                    "indicator {} weight must be positive, got {}",
                    spec.key, spec.weight
                )));
            }
            spec.rule
                .validate()
                .map_err(|e| EdgeError::Config(format!("indicator {} rule: {}", spec.key, e)))?;
        }

        Ok(())
    }

    /// 지역 × 지표 조합을 표시 순서대로 펼칩니다.
    pub fn indicator_plan(&self) -> Vec<PlannedIndicator> {
        self.regions
            .iter()
            .flat_map(|region| {
                self.indicators.iter().map(move |spec| PlannedIndicator {
                    id: format!("{}.{}", region.key, spec.key),
                    region: region.key.clone(),
                    label: spec.label.clone(),
                    url: region.url.clone(),
                    keywords: spec
                        .keywords
                        .iter()
                        .map(|k| k.trim().to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect(),
                    unit: spec.unit,
                    weight: spec.weight,
                    rule: spec.rule,
                })
            })
            .collect()
    }

    /// 지역 키로 표시용 이름 조회.
    pub fn region_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.regions
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.label.as_str())
            .unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.ttl(), chrono::Duration::hours(12));
        assert_eq!(config.source.request_timeout(), Duration::from_secs(6));
    }

    #[test]
    fn test_indicator_plan_order() {
        let config = AppConfig::default();
        let plan = config.indicator_plan();
        assert_eq!(plan.len(), 8 * 3);
        assert_eq!(plan[0].id, "eurozone.RetailSales_MoM");
        assert_eq!(plan[2].id, "eurozone.CPI_YoY");
        assert_eq!(plan[3].id, "uk.RetailSales_MoM");
        assert_eq!(
            plan[8].url,
            "https://m.investing.com/economic-calendar/united-states"
        );
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_weights() {
        let mut config = AppConfig::default();
        config.regions.push(config.regions[0].clone());
        assert!(matches!(config.validate(), Err(EdgeError::Config(_))));

        let mut config = AppConfig::default();
        config.indicators[0].weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.indicators[1].keywords = vec!["  ".to_string()];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.ttl_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load(None::<&Path>).unwrap();
        assert_eq!(config.regions.len(), 8);
        assert_eq!(config.indicators.len(), 3);
        assert_eq!(config.cache.ttl_hours, 12);
        assert_eq!(
            config.cache.persist_path(),
            Some(Path::new("data/snapshot.json"))
        );
    }

    #[test]
    fn test_empty_persist_path_disables_mirroring() {
        let cache = CacheConfig {
            persist_path: Some(PathBuf::new()),
            ..CacheConfig::default()
        };
        assert_eq!(cache.persist_path(), None);
    }

    #[test]
    fn test_region_label_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.region_label("new_zealand"), "New Zealand");
        assert_eq!(config.region_label("mars"), "mars");
    }
}
