//! 스냅샷 캐시.
//!
//! - [`SnapshotCache`]: 단일 슬롯 메모리 캐시 (TTL)
//! - [`SnapshotFile`]: 스냅샷 JSON 파일 저장소

pub mod persist;
pub mod snapshot_cache;

pub use persist::SnapshotFile;
pub use snapshot_cache::SnapshotCache;
