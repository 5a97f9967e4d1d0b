//! 스냅샷 접근자 통합 테스트
//!
//! 캐시 적중, 만료 경계, 이전 스냅샷 대체, 재시작 후 대체, 콜드 스타트 실패, 동시 요청 병합을
//! 스크립트로 움직이는 수집기와 수동 시계로 검증합니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use edge_core::{
    EdgeError, FetchStatus, Indicator, IndicatorSet, Reading, Scorer, ScoringRule, Snapshot, Unit,
};
use edge_data::{
    Freshness, IndicatorSource, ManualClock, SnapshotAccessor, SnapshotCache, SnapshotFile,
};

/// 응답을 바꿔 끼울 수 있는 수집기.
struct ScriptedSource {
    calls: AtomicUsize,
    delay: std::time::Duration,
    response: Mutex<IndicatorSet>,
}

impl ScriptedSource {
    fn new(response: IndicatorSet) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: std::time::Duration::ZERO,
            response: Mutex::new(response),
        }
    }

    fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    fn respond_with(&self, response: IndicatorSet) {
        *self.response.lock().unwrap() = response;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndicatorSource for ScriptedSource {
    async fn fetch_indicators(&self) -> IndicatorSet {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.lock().unwrap().clone()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).unwrap()
}

fn scorer() -> Scorer {
    Scorer::new()
        .with_rule(
            "us.CPI_YoY",
            ScoringRule::Level {
                neutral: 2.0,
                scale: 3.0,
                higher_is_better: false,
            },
            1.0,
        )
        .with_rule(
            "us.Unemployment",
            ScoringRule::Level {
                neutral: 4.0,
                scale: 2.0,
                higher_is_better: false,
            },
            1.0,
        )
}

/// CPI 3.2% 정상, 실업률 파싱 실패.
fn healthy() -> IndicatorSet {
    vec![
        Indicator::ok("us.CPI_YoY", "us", "CPI YoY", Reading::new(3.2, Unit::Percent)),
        Indicator::parse_error("us.Unemployment", "us", "Unemployment", "no number in cell"),
    ]
    .into_iter()
    .collect()
}

fn all_missing() -> IndicatorSet {
    vec![
        Indicator::missing("us.CPI_YoY", "us", "CPI YoY", "요청 타임아웃"),
        Indicator::missing("us.Unemployment", "us", "Unemployment", "요청 타임아웃"),
    ]
    .into_iter()
    .collect()
}

struct Harness {
    source: Arc<ScriptedSource>,
    clock: Arc<ManualClock>,
    cache: Arc<SnapshotCache>,
    accessor: Arc<SnapshotAccessor>,
}

fn harness(source: ScriptedSource) -> Harness {
    let source = Arc::new(source);
    let clock = Arc::new(ManualClock::new(t0()));
    let cache = Arc::new(SnapshotCache::new(Duration::hours(12)));
    let accessor = Arc::new(SnapshotAccessor::new(
        source.clone(),
        scorer(),
        cache.clone(),
        clock.clone(),
    ));
    Harness {
        source,
        clock,
        cache,
        accessor,
    }
}

#[tokio::test]
async fn test_cpi_example_snapshot() {
    let h = harness(ScriptedSource::new(healthy()));

    let served = h.accessor.get_snapshot().await.unwrap();
    let snapshot = &served.snapshot;

    assert_eq!(served.freshness, Freshness::Fresh);
    assert!((snapshot.composite_score() + 0.4).abs() < 1e-9);
    assert_eq!(snapshot.computed_at(), t0());
    assert_eq!(snapshot.expires_at(), t0() + Duration::hours(12));
    assert_eq!(snapshot.scored_count(), 1);

    let unemployment = snapshot.indicator("us.Unemployment").unwrap();
    assert_eq!(unemployment.indicator.status(), FetchStatus::ParseError);
    assert!(unemployment.sub_score.is_none());
}

#[tokio::test]
async fn test_second_call_within_ttl_is_cache_hit() {
    let h = harness(ScriptedSource::new(healthy()));

    let first = h.accessor.get_snapshot().await.unwrap();
    h.clock.advance(Duration::hours(3));
    let second = h.accessor.get_snapshot().await.unwrap();

    assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
    assert_eq!(second.snapshot.computed_at(), t0());
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn test_expiry_boundary_triggers_refresh() {
    let h = harness(ScriptedSource::new(healthy()));
    h.accessor.get_snapshot().await.unwrap();

    h.clock.set(t0() + Duration::hours(11) + Duration::minutes(59));
    let still_fresh = h.accessor.get_snapshot().await.unwrap();
    assert_eq!(still_fresh.snapshot.computed_at(), t0());
    assert_eq!(h.source.calls(), 1);

    h.clock.set(t0() + Duration::hours(12));
    let refreshed = h.accessor.get_snapshot().await.unwrap();
    assert_eq!(refreshed.freshness, Freshness::Fresh);
    assert_eq!(refreshed.snapshot.computed_at(), t0() + Duration::hours(12));
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_failed_refresh_returns_stale_and_keeps_cache() {
    let h = harness(ScriptedSource::new(healthy()));
    let original = h.accessor.get_snapshot().await.unwrap();

    h.source.respond_with(all_missing());
    h.clock.advance(Duration::hours(13));
    let served = h.accessor.get_snapshot().await.unwrap();

    assert!(served.is_stale());
    assert!(Arc::ptr_eq(&served.snapshot, &original.snapshot));
    match &served.freshness {
        Freshness::Stale { as_of, reason } => {
            assert_eq!(*as_of, t0());
            assert!(!reason.is_empty());
        }
        Freshness::Fresh => panic!("expected stale snapshot"),
    }

    let cached = h.cache.get().await.unwrap();
    assert!(Arc::ptr_eq(&cached, &original.snapshot));
}

#[tokio::test]
async fn test_recovery_after_stale() {
    let h = harness(ScriptedSource::new(healthy()));
    h.accessor.get_snapshot().await.unwrap();

    h.source.respond_with(all_missing());
    h.clock.advance(Duration::hours(12));
    assert!(h.accessor.get_snapshot().await.unwrap().is_stale());

    h.source.respond_with(healthy());
    let recovered = h.accessor.get_snapshot().await.unwrap();
    assert_eq!(recovered.freshness, Freshness::Fresh);
    assert_eq!(recovered.snapshot.computed_at(), t0() + Duration::hours(12));
    assert_eq!(h.source.calls(), 3);
}

#[tokio::test]
async fn test_cold_start_failure_is_data_unavailable() {
    let h = harness(ScriptedSource::new(all_missing()));

    let err = h.accessor.get_snapshot().await.unwrap_err();
    assert!(matches!(err, EdgeError::DataUnavailable(_)));
    assert!(h.cache.get().await.is_none());
}

#[tokio::test]
async fn test_warmed_expired_snapshot_is_served_stale_when_refresh_fails() {
    let path = std::env::temp_dir()
        .join(format!("edge-data-{}", uuid::Uuid::new_v4()))
        .join("snapshot.json");
    let saved = Snapshot::new(scorer().score(healthy()).unwrap(), t0(), Duration::hours(12));
    SnapshotFile::new(&path).save(&saved).await.unwrap();

    // 재시작: 파일에서 캐시를 채운 뒤 TTL이 지난 시점에 갱신 실패
    let cache = Arc::new(SnapshotCache::with_store(
        Duration::hours(12),
        SnapshotFile::new(&path),
    ));
    assert!(cache.warm().await);

    let source = Arc::new(ScriptedSource::new(all_missing()));
    let clock = Arc::new(ManualClock::new(t0() + Duration::hours(14)));
    let accessor = SnapshotAccessor::new(source.clone(), scorer(), cache.clone(), clock);

    let served = accessor.get_snapshot().await.unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(*served.snapshot, saved);
    match &served.freshness {
        Freshness::Stale { as_of, reason } => {
            assert_eq!(*as_of, saved.computed_at());
            assert!(reason.contains("데이터 없음"));
        }
        Freshness::Fresh => panic!("expected stale snapshot"),
    }

    let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_fetch_once() {
    let h = harness(
        ScriptedSource::new(healthy()).with_delay(std::time::Duration::from_millis(200)),
    );

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let accessor = h.accessor.clone();
            tokio::spawn(async move { accessor.get_snapshot().await })
        })
        .collect();

    let mut served = Vec::new();
    for task in tasks {
        served.push(task.await.unwrap().unwrap());
    }

    assert_eq!(h.source.calls(), 1);
    assert!(served
        .iter()
        .all(|s| s.freshness == Freshness::Fresh && Arc::ptr_eq(&s.snapshot, &served[0].snapshot)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_fetch_once_and_share_stale() {
    let h = harness(
        ScriptedSource::new(healthy()).with_delay(std::time::Duration::from_millis(200)),
    );
    let original = h.accessor.get_snapshot().await.unwrap();

    h.source.respond_with(all_missing());
    h.clock.advance(Duration::hours(12));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let accessor = h.accessor.clone();
            tokio::spawn(async move { accessor.get_snapshot().await })
        })
        .collect();

    for task in tasks {
        let served = task.await.unwrap().unwrap();
        assert!(served.is_stale());
        assert!(Arc::ptr_eq(&served.snapshot, &original.snapshot));
    }
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_start_failures_fetch_once() {
    let h = harness(
        ScriptedSource::new(all_missing()).with_delay(std::time::Duration::from_millis(200)),
    );

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let accessor = h.accessor.clone();
            tokio::spawn(async move { accessor.get_snapshot().await })
        })
        .collect();

    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_data_unavailable());
    }
    assert_eq!(h.source.calls(), 1);
}
