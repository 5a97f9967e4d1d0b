//! 도메인 모델.

pub mod indicator;
pub mod regime;
pub mod snapshot;

pub use indicator::{FetchOutcome, FetchStatus, Indicator, IndicatorSet, Reading, Unit};
pub use regime::MacroBias;
pub use snapshot::{weighted_composite, RegionScore, ScoreCard, ScoredIndicator, Snapshot};
