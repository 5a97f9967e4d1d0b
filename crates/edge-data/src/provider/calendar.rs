//! 경제 캘린더 수집기.
//!
//! 지역마다 모바일 경제 캘린더 페이지 하나를 받아, 그 지역의 지표들을
//! 페이지에서 각각 찾아 읽습니다.
//!
//! ## 동작
//! - 같은 URL은 갱신당 한 번만 요청하고, 서로 다른 페이지는 동시에 요청합니다.
//! - 재시도는 없습니다. 타임아웃, 전송 실패, 2xx가 아닌 상태, 빈 본문이면
//!   해당 페이지의 지표가 모두 MISSING이 됩니다.
//! - 페이지는 받았지만 행과 원문 텍스트 어디에서도 지표를 찾지 못하거나
//!   값을 읽지 못하면 PARSE_ERROR입니다.
//!
//! ## 사용 예시
//! ```rust,ignore
//! let fetcher = CalendarFetcher::from_config(&config)?;
//! let indicators = fetcher.fetch_indicators().await;
//! for indicator in indicators.iter() {
//!     println!("{}: {}", indicator.id, indicator.status());
//! }
//! ```

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use edge_core::{AppConfig, EdgeError, EdgeResult, Indicator, IndicatorSet, PlannedIndicator, SourceConfig};

use super::parse::CalendarPage;
use super::IndicatorSource;

/// 페이지 요청 에러.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("요청 타임아웃")]
    Timeout,

    #[error("HTTP 상태 {0}")]
    Status(u16),

    #[error("HTTP 요청 실패: {0}")]
    Http(reqwest::Error),

    #[error("빈 응답 본문")]
    EmptyBody,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(err)
        }
    }
}

impl From<FetchError> for EdgeError {
    fn from(err: FetchError) -> Self {
        EdgeError::Network(err.to_string())
    }
}

/// 경제 캘린더 수집기.
pub struct CalendarFetcher {
    client: Client,
    plan: Vec<PlannedIndicator>,
}

impl CalendarFetcher {
    /// 요청 설정과 수집 계획으로 생성합니다.
    pub fn new(source: &SourceConfig, plan: Vec<PlannedIndicator>) -> EdgeResult<Self> {
        let mut headers = HeaderMap::new();
        let language = HeaderValue::from_str(&source.accept_language)
            .map_err(|e| EdgeError::Config(format!("invalid accept_language: {}", e)))?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = Client::builder()
            .timeout(source.request_timeout())
            .user_agent(source.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| EdgeError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { client, plan })
    }

    /// 애플리케이션 설정에서 생성합니다.
    pub fn from_config(config: &AppConfig) -> EdgeResult<Self> {
        Self::new(&config.source, config.indicator_plan())
    }

    /// 수집 계획.
    pub fn plan(&self) -> &[PlannedIndicator] {
        &self.plan
    }

    /// 요청할 페이지 URL (중복 제거, 계획 순서).
    fn page_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for planned in &self.plan {
            if !urls.contains(&planned.url.as_str()) {
                urls.push(&planned.url);
            }
        }
        urls
    }

    /// 페이지 하나를 받아옵니다.
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(body)
    }

    /// 페이지 결과에서 지표 하나를 만듭니다.
    ///
    /// `Parse`는 PARSE_ERROR, 그 밖의 에러는 MISSING이 됩니다.
    fn resolve(planned: &PlannedIndicator, page: Option<&EdgeResult<CalendarPage>>) -> Indicator {
        let located = match page {
            Some(Ok(page)) => page
                .locate(&planned.keywords, planned.unit)
                .map_err(EdgeError::Parse),
            Some(Err(e)) => Err(e.clone()),
            None => Err(EdgeError::Network("page was not requested".to_string())),
        };

        match located {
            Ok(found) => {
                debug!(id = %planned.id, actual = found.reading.actual, "지표 수집");
                Indicator::ok(&planned.id, &planned.region, &planned.label, found.reading)
                    .with_source_timestamp(found.released_at)
            }
            Err(EdgeError::Parse(reason)) => {
                debug!(id = %planned.id, %reason, "지표 파싱 실패");
                Indicator::parse_error(&planned.id, &planned.region, &planned.label, reason)
            }
            Err(EdgeError::Network(reason)) => {
                Indicator::missing(&planned.id, &planned.region, &planned.label, reason)
            }
            Err(other) => {
                Indicator::missing(&planned.id, &planned.region, &planned.label, other.to_string())
            }
        }
    }
}

#[async_trait]
impl IndicatorSource for CalendarFetcher {
    async fn fetch_indicators(&self) -> IndicatorSet {
        let started = Instant::now();
        let urls = self.page_urls();

        let bodies = join_all(
            urls.iter()
                .map(|url| async move { (*url, self.fetch_page(url).await) }),
        )
        .await;

        let pages: HashMap<&str, EdgeResult<CalendarPage>> = bodies
            .into_iter()
            .map(|(url, result)| {
                if let Err(e) = &result {
                    warn!(url, error = %e, "캘린더 페이지 수집 실패");
                }
                let page = result
                    .map(|body| CalendarPage::parse(&body))
                    .map_err(EdgeError::from);
                (url, page)
            })
            .collect();

        let indicators: IndicatorSet = self
            .plan
            .iter()
            .map(|planned| Self::resolve(planned, pages.get(planned.url.as_str())))
            .collect();

        let (ok, missing, parse_error) = indicators.status_counts();
        info!(
            pages = urls.len(),
            ok,
            missing,
            parse_error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "지표 수집 완료"
        );

        indicators
    }
}
