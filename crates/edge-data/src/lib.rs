//! 데이터 수집, 캐시, 스냅샷 접근.
//!
//! 이 crate는 다음을 제공합니다:
//! - 경제 캘린더 페이지 수집기 (reqwest + scraper)
//! - 단일 슬롯 스냅샷 캐시 (TTL, JSON 파일 미러링)
//! - 스냅샷 접근자 (캐시 확인 → 갱신 → 저장, 실패 시 이전 스냅샷 반환)
//! - 시계 추상화

pub mod accessor;
pub mod cache;
pub mod clock;
pub mod provider;

pub use accessor::{Freshness, ServedSnapshot, SnapshotAccessor};
pub use cache::{SnapshotCache, SnapshotFile};
pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::{CalendarFetcher, FetchError, IndicatorSource};
