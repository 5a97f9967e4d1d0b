//! # Edge Core
//!
//! 매크로 스냅샷의 도메인 모델과 점수 규칙을 제공합니다.
//!
//! - 지표 / 발표치 / 수집 결과 타입
//! - 점수 규칙과 스코어러
//! - 스냅샷 (종합 점수, 지역 점수, 바이어스)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod scoring;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use scoring::*;
