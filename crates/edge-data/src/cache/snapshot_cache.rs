//! 단일 슬롯 스냅샷 캐시.
//!
//! 호출자 구분 없이 스냅샷 하나만 보관합니다. 만료 여부만 판정하고
//! 만료된 스냅샷을 이전 값으로 쓸지는 접근자가 결정합니다.
//!
//! 만료 조건: `now - computed_at >= ttl`

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use edge_core::{CacheConfig, EdgeError, EdgeResult, Snapshot};

use super::persist::SnapshotFile;

/// 스냅샷 캐시.
#[derive(Debug)]
pub struct SnapshotCache {
    slot: RwLock<Option<Arc<Snapshot>>>,
    ttl: Duration,
    store: Option<SnapshotFile>,
}

impl SnapshotCache {
    /// 메모리 전용 캐시.
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
            store: None,
        }
    }

    /// 파일 미러링 캐시.
    pub fn with_store(ttl: Duration, store: SnapshotFile) -> Self {
        Self {
            store: Some(store),
            ..Self::new(ttl)
        }
    }

    /// 캐시 설정에서 생성합니다.
    pub fn from_config(config: &CacheConfig) -> Self {
        match config.persist_path() {
            Some(path) => Self::with_store(config.ttl(), SnapshotFile::new(path)),
            None => Self::new(config.ttl()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 저장된 스냅샷 (만료 여부와 무관).
    pub async fn get(&self) -> Option<Arc<Snapshot>> {
        self.slot.read().await.clone()
    }

    /// 스냅샷을 교체합니다. 파일 저장 실패는 로그만 남깁니다.
    pub async fn put(&self, snapshot: Arc<Snapshot>) {
        {
            let mut slot = self.slot.write().await;
            *slot = Some(Arc::clone(&snapshot));
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&snapshot).await {
                warn!(path = %store.path().display(), error = %e, "스냅샷 파일 저장 실패");
            }
        }
    }

    /// 만료 여부.
    pub fn is_expired(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> bool {
        now - snapshot.computed_at() >= self.ttl
    }

    /// 만료되지 않은 스냅샷. 없거나 만료되었으면 `CacheMiss`.
    pub async fn get_fresh(&self, now: DateTime<Utc>) -> EdgeResult<Arc<Snapshot>> {
        match self.get().await {
            Some(snapshot) if !self.is_expired(&snapshot, now) => Ok(snapshot),
            Some(snapshot) => {
                debug!(computed_at = %snapshot.computed_at(), "캐시 만료");
                Err(EdgeError::CacheMiss)
            }
            None => Err(EdgeError::CacheMiss),
        }
    }

    /// 파일에서 스냅샷을 불러와 슬롯을 채웁니다.
    ///
    /// 읽을 수 없는 파일은 무시합니다. 불러왔으면 true.
    pub async fn warm(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };

        match store.load().await {
            Ok(Some(snapshot)) => {
                info!(
                    path = %store.path().display(),
                    computed_at = %snapshot.computed_at(),
                    "저장된 스냅샷으로 캐시 초기화"
                );
                *self.slot.write().await = Some(Arc::new(snapshot));
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(path = %store.path().display(), error = %e, "저장된 스냅샷 무시");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use edge_core::{Indicator, Reading, ScoreCard, ScoredIndicator, Unit, SCORING_RULE_VERSION};

    fn snapshot_at(computed_at: DateTime<Utc>) -> Snapshot {
        let card = ScoreCard::from_scored(vec![ScoredIndicator {
            indicator: Indicator::ok("us.CPI_YoY", "us", "CPI YoY", Reading::new(3.2, Unit::Percent)),
            sub_score: Some(-0.4),
            weight: 1.0,
            rule_version: SCORING_RULE_VERSION,
        }])
        .unwrap();
        Snapshot::new(card, computed_at, Duration::hours(12))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_empty_cache_is_miss() {
        let cache = SnapshotCache::new(Duration::hours(12));
        assert!(cache.get().await.is_none());
        assert!(matches!(
            cache.get_fresh(t0()).await,
            Err(EdgeError::CacheMiss)
        ));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let cache = SnapshotCache::new(Duration::hours(12));
        cache.put(Arc::new(snapshot_at(t0()))).await;

        let almost = t0() + Duration::hours(11) + Duration::minutes(59);
        assert!(cache.get_fresh(almost).await.is_ok());

        let exact = t0() + Duration::hours(12);
        assert!(cache.get_fresh(exact).await.is_err());
        // 만료되어도 get()은 스냅샷을 돌려줌
        assert!(cache.get().await.is_some());
    }

    #[tokio::test]
    async fn test_put_replaces_single_slot() {
        let cache = SnapshotCache::new(Duration::hours(12));
        cache.put(Arc::new(snapshot_at(t0()))).await;
        let later = t0() + Duration::hours(13);
        cache.put(Arc::new(snapshot_at(later))).await;

        assert_eq!(cache.get().await.unwrap().computed_at(), later);
    }

    #[tokio::test]
    async fn test_warm_without_store_is_noop() {
        let cache = SnapshotCache::new(Duration::hours(12));
        assert!(!cache.warm().await);
    }
}
