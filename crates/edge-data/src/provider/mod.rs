//! 매크로 지표 수집.
//!
//! - [`IndicatorSource`]: 접근자가 의존하는 수집 트레잇
//! - [`CalendarFetcher`]: 경제 캘린더 페이지 수집기
//! - [`parse`]: 캘린더 HTML 파싱

pub mod calendar;
pub mod parse;

use async_trait::async_trait;
use edge_core::IndicatorSet;

pub use calendar::{CalendarFetcher, FetchError};
pub use parse::{CalendarPage, CalendarRow};

/// 지표 수집 트레잇.
///
/// 실패는 지표별 상태(MISSING / PARSE_ERROR)로 표현되므로 에러를 반환하지 않습니다.
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    /// 설정된 모든 지표를 한 번씩 수집합니다 (설정 순서 유지).
    async fn fetch_indicators(&self) -> IndicatorSet;
}
