//! 매크로 스냅샷 시스템의 에러 타입.
//!
//! 지표 단위 실패(네트워크/파싱)는 [`crate::FetchOutcome`]으로 흡수되고,
//! 여기 정의된 에러는 갱신 전체 또는 설정/저장소 수준의 실패를 나타냅니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Clone, Error)]
pub enum EdgeError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 네트워크 에러 (지표 단위, MISSING으로 흡수)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 파싱 에러 (지표 단위, PARSE_ERROR로 흡수)
    #[error("파싱 에러: {0}")]
    Parse(String),

    /// 사용 가능한 지표가 하나도 없음
    #[error("데이터 없음: {0}")]
    DataUnavailable(String),

    /// 캐시 미스 (내부용, 호출자에게 노출되지 않음)
    #[error("캐시 미스")]
    CacheMiss,

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 스냅샷 파일 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),
}

/// Result 타입 별칭.
pub type EdgeResult<T> = Result<T, EdgeError>;

impl EdgeError {
    /// 표시 계층이 "데이터 없음" 상태로 렌더링해야 하는 에러인지 확인합니다.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, EdgeError::DataUnavailable(_))
    }
}

impl From<serde_json::Error> for EdgeError {
    fn from(err: serde_json::Error) -> Self {
        EdgeError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for EdgeError {
    fn from(err: config::ConfigError) -> Self {
        EdgeError::Config(err.to_string())
    }
}
