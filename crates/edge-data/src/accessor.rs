//! 스냅샷 접근자 - 표시 계층의 유일한 진입점.
//!
//! # 동작 흐름
//!
//! ```text
//! get_snapshot()
//!         │
//!         ▼
//! ┌───────────────────┐
//! │ 1. 캐시 확인       │ ── 유효 ──▶ Fresh 반환
//! └─────────┬─────────┘
//!           │ 없음 / 만료
//! ┌─────────▼─────────┐
//! │ 2. 갱신 Lock 획득  │ ← 동시에 들어온 요청은 대기
//! └─────────┬─────────┘
//!           │
//!     ┌─────┴──────────┐
//!     │ 대기 중 다른    │ ── YES ──▶ 그 결과를 캐시에서 읽어 반환
//!     │ 요청이 갱신?    │
//!     └─────┬──────────┘
//!           │ NO
//!     ┌─────▼──────────┐
//!     │ 캐시 재확인     │ ── 유효 ──▶ Fresh 반환
//!     └─────┬──────────┘
//!           │ 없음 / 만료
//! ┌─────────▼─────────┐
//! │ 3. 수집 → 점수     │
//! └─────────┬─────────┘
//!      성공 │ 실패 (DataUnavailable)
//!           │   │
//!           │   ▼
//!           │ 이전 스냅샷 있음 → Stale 반환 (캐시는 그대로)
//!           │ 이전 스냅샷 없음 → DataUnavailable
//!           ▼
//! ┌───────────────────┐
//! │ 4. 캐시 저장       │ ──▶ Fresh 반환
//! └───────────────────┘
//! ```
//!
//! # 갱신 병합
//!
//! 호출자는 Lock을 기다리기 전에 "완료된 갱신 시도 횟수"를 읽어 둡니다.
//! Lock을 얻었을 때 그 값이 바뀌었다면 앞선 호출자가 대신 갱신한 것이므로
//! 수집하지 않고 캐시에서 결과를 읽습니다. 동시에 들어온 N개의 요청은
//! 성공이든 실패든 수집기를 한 번만 호출합니다.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use edge_core::{AppConfig, EdgeError, EdgeResult, IndicatorSet, Scorer, Snapshot};

use crate::cache::SnapshotCache;
use crate::clock::{Clock, SystemClock};
use crate::provider::{CalendarFetcher, IndicatorSource};

/// 스냅샷의 신선도.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    /// TTL 이내 스냅샷
    Fresh,
    /// 갱신에 실패해 이전 스냅샷을 반환
    Stale {
        /// 이전 스냅샷의 계산 시각
        as_of: DateTime<Utc>,
        /// 갱신 실패 사유
        reason: String,
    },
}

/// 접근자가 반환하는 스냅샷.
#[derive(Debug, Clone)]
pub struct ServedSnapshot {
    pub snapshot: Arc<Snapshot>,
    pub freshness: Freshness,
}

impl ServedSnapshot {
    fn fresh(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            freshness: Freshness::Fresh,
        }
    }

    fn stale(snapshot: Arc<Snapshot>, reason: impl Into<String>) -> Self {
        Self {
            freshness: Freshness::Stale {
                as_of: snapshot.computed_at(),
                reason: reason.into(),
            },
            snapshot,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.freshness, Freshness::Stale { .. })
    }
}

/// 스냅샷 접근자.
pub struct SnapshotAccessor {
    source: Arc<dyn IndicatorSource>,
    scorer: Scorer,
    cache: Arc<SnapshotCache>,
    clock: Arc<dyn Clock>,
    /// 갱신 직렬화 Lock. 마지막 갱신 실패 사유를 보관합니다.
    refresh_lock: Mutex<Option<String>>,
    /// 완료된 갱신 시도 횟수 (성공 + 실패)
    completed_refreshes: AtomicU64,
}

impl SnapshotAccessor {
    pub fn new(
        source: Arc<dyn IndicatorSource>,
        scorer: Scorer,
        cache: Arc<SnapshotCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            scorer,
            cache,
            clock,
            refresh_lock: Mutex::new(None),
            completed_refreshes: AtomicU64::new(0),
        }
    }

    /// 설정으로 실제 수집기, 캐시, 시스템 시계를 조립합니다.
    ///
    /// 스냅샷 파일이 설정되어 있으면 캐시를 미리 채웁니다.
    pub async fn from_config(config: &AppConfig) -> EdgeResult<Self> {
        let source = Arc::new(CalendarFetcher::from_config(config)?);
        let cache = Arc::new(SnapshotCache::from_config(&config.cache));
        cache.warm().await;

        Ok(Self::new(
            source,
            Scorer::from_config(config),
            cache,
            Arc::new(SystemClock),
        ))
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// 현재 스냅샷을 반환합니다.
    ///
    /// - `Ok(Fresh)`: 캐시 적중 또는 갱신 성공
    /// - `Ok(Stale)`: 갱신 실패, 이전 스냅샷 반환
    /// - `Err(DataUnavailable)`: 갱신 실패, 이전 스냅샷 없음
    pub async fn get_snapshot(&self) -> EdgeResult<ServedSnapshot> {
        if let Ok(snapshot) = self.cache.get_fresh(self.clock.now()).await {
            debug!(computed_at = %snapshot.computed_at(), "캐시 적중");
            return Ok(ServedSnapshot::fresh(snapshot));
        }

        let seen = self.completed_refreshes.load(Ordering::Acquire);
        let mut last_failure = self.refresh_lock.lock().await;

        if self.completed_refreshes.load(Ordering::Acquire) != seen {
            debug!("대기 중 완료된 갱신 결과 사용");
            let reason = last_failure
                .clone()
                .unwrap_or_else(|| "refresh failed".to_string());
            return self.resolve_from_cache(reason).await;
        }

        // 대기 중 다른 경로로 캐시가 채워졌을 수 있음
        if let Ok(snapshot) = self.cache.get_fresh(self.clock.now()).await {
            debug!(computed_at = %snapshot.computed_at(), "Lock 획득 후 캐시 적중");
            return Ok(ServedSnapshot::fresh(snapshot));
        }

        let result = self.refresh().await;
        *last_failure = result.as_ref().err().map(|e| e.to_string());
        self.completed_refreshes.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(snapshot) => Ok(ServedSnapshot::fresh(snapshot)),
            Err(e) => self.fallback(e).await,
        }
    }

    /// 수집만 실행합니다 (점수 계산, 캐시 갱신 없음). 마크업 변경 진단용.
    pub async fn check_source(&self) -> IndicatorSet {
        self.source.fetch_indicators().await
    }

    /// 수집 → 점수 → 캐시 저장.
    #[instrument(skip(self))]
    async fn refresh(&self) -> EdgeResult<Arc<Snapshot>> {
        let started = Instant::now();
        info!("스냅샷 갱신 시작");

        let indicators = self.source.fetch_indicators().await;
        let card = self.scorer.score(indicators)?;
        let snapshot = Arc::new(Snapshot::new(card, self.clock.now(), self.cache.ttl()));
        self.cache.put(Arc::clone(&snapshot)).await;

        info!(
            composite = snapshot.composite_score(),
            scored = snapshot.scored_count(),
            total = snapshot.indicators().len(),
            expires_at = %snapshot.expires_at(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "스냅샷 갱신 완료"
        );
        Ok(snapshot)
    }

    /// 갱신 실패 시 이전 스냅샷으로 대체합니다.
    async fn fallback(&self, error: EdgeError) -> EdgeResult<ServedSnapshot> {
        match self.cache.get().await {
            Some(previous) => {
                warn!(
                    as_of = %previous.computed_at(),
                    error = %error,
                    "갱신 실패, 이전 스냅샷 반환"
                );
                Ok(ServedSnapshot::stale(previous, error.to_string()))
            }
            None => {
                warn!(error = %error, "갱신 실패, 이전 스냅샷 없음");
                Err(match error {
                    EdgeError::DataUnavailable(_) => error,
                    other => EdgeError::DataUnavailable(other.to_string()),
                })
            }
        }
    }

    /// 다른 호출자가 끝낸 갱신의 결과를 캐시에서 읽습니다.
    async fn resolve_from_cache(&self, reason: String) -> EdgeResult<ServedSnapshot> {
        if let Ok(snapshot) = self.cache.get_fresh(self.clock.now()).await {
            return Ok(ServedSnapshot::fresh(snapshot));
        }
        match self.cache.get().await {
            Some(previous) => Ok(ServedSnapshot::stale(previous, reason)),
            None => Err(EdgeError::DataUnavailable(reason)),
        }
    }
}
