//! 텍스트 / JSON 출력.
//!
//! 표시 상태는 세 가지입니다: 최신(fresh), 이전 값(stale), 데이터 없음.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use edge_core::{
    AppConfig, EdgeError, FetchOutcome, IndicatorSet, MacroBias, Reading, RegionScore,
    ScoredIndicator, Unit,
};
use edge_data::{Freshness, ServedSnapshot};

fn fmt_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// 점수 (부호 포함, 없으면 "n/a").
fn fmt_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:+.2}", s),
        None => "n/a".to_string(),
    }
}

fn fmt_number(value: Option<f64>, unit: Unit) -> String {
    match (value, unit) {
        (Some(v), Unit::Percent) => format!("{:.2}%", v),
        (Some(v), Unit::Index) => format!("{:.1}", v),
        (None, _) => "?".to_string(),
    }
}

/// "발표치 vs 예측치 / 이전치".
fn fmt_reading(reading: &Reading) -> String {
    format!(
        "{} vs {} / {}",
        fmt_number(Some(reading.actual), reading.unit),
        fmt_number(reading.forecast, reading.unit),
        fmt_number(reading.previous, reading.unit)
    )
}

fn fmt_outcome(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Ok(reading) => fmt_reading(reading),
        FetchOutcome::Missing(reason) | FetchOutcome::ParseError(reason) => {
            format!("{} ({})", outcome.status(), reason)
        }
    }
}

fn fmt_bias(bias: Option<MacroBias>) -> &'static str {
    bias.map(MacroBias::description).unwrap_or("No data")
}

fn indicator_line(scored: &ScoredIndicator) -> String {
    format!(
        "  {:<20} {:<36} {:>6}",
        scored.indicator.label,
        fmt_outcome(&scored.indicator.outcome),
        fmt_score(scored.sub_score)
    )
}

fn region_header(region: &RegionScore, config: &AppConfig) -> String {
    format!(
        "{:<16} {:>6}  {}  ({}/{})",
        config.region_label(&region.region),
        fmt_score(region.score),
        fmt_bias(region.bias()),
        region.usable,
        region.total
    )
}

/// 스냅샷을 텍스트로 출력합니다.
pub fn render_snapshot(served: &ServedSnapshot, config: &AppConfig) -> String {
    let snapshot = &served.snapshot;
    let mut lines = Vec::new();

    match &served.freshness {
        Freshness::Fresh => lines.push(format!(
            "EdgeFinder macro snapshot [fresh] computed {}, expires {}",
            fmt_time(snapshot.computed_at()),
            fmt_time(snapshot.expires_at())
        )),
        Freshness::Stale { as_of, reason } => {
            lines.push(format!(
                "EdgeFinder macro snapshot [STALE as of {}]",
                fmt_time(*as_of)
            ));
            lines.push(format!("  refresh failed: {}", reason));
        }
    }
    lines.push(String::new());

    for region in snapshot.region_scores() {
        lines.push(region_header(&region, config));
        for scored in snapshot
            .indicators()
            .iter()
            .filter(|s| s.indicator.region == region.region)
        {
            lines.push(indicator_line(scored));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "Composite edge score: {}  {}  ({} of {} indicators)",
        fmt_score(Some(snapshot.composite_score())),
        snapshot.bias().description(),
        snapshot.scored_count(),
        snapshot.indicators().len()
    ));

    if let (Some(strongest), Some(weakest)) =
        (snapshot.strongest_region(), snapshot.weakest_region())
    {
        lines.push(format!(
            "Strongest: {} ({})   Weakest: {} ({})",
            config.region_label(&strongest.region),
            fmt_score(strongest.score),
            config.region_label(&weakest.region),
            fmt_score(weakest.score)
        ));
    }

    lines.join("\n") + "\n"
}

/// 데이터 없음 상태.
pub fn render_unavailable(error: &EdgeError) -> String {
    format!(
        "EdgeFinder macro snapshot [no data]\n  No macro data is available right now.\n  {}\n",
        error
    )
}

/// 수집 결과 진단 출력.
pub fn render_check(indicators: &IndicatorSet, config: &AppConfig) -> String {
    let mut lines: Vec<String> = indicators
        .iter()
        .map(|indicator| {
            let released = indicator
                .source_timestamp
                .map(fmt_time)
                .unwrap_or_default();
            format!(
                "{:<12} {:<30} {:<12} {} {}",
                indicator.status().to_string(),
                indicator.id,
                config.region_label(&indicator.region),
                fmt_outcome(&indicator.outcome),
                released
            )
            .trim_end()
            .to_string()
        })
        .collect();

    let (ok, missing, parse_error) = indicators.status_counts();
    lines.push(String::new());
    lines.push(format!(
        "{} ok, {} missing, {} parse errors",
        ok, missing, parse_error
    ));

    lines.join("\n") + "\n"
}

/// 스냅샷 JSON (스냅샷 + 신선도 + 파생 값).
pub fn snapshot_json(served: &ServedSnapshot) -> Value {
    let snapshot = &served.snapshot;
    let freshness = match &served.freshness {
        Freshness::Fresh => json!({ "state": "fresh" }),
        Freshness::Stale { as_of, reason } => json!({
            "state": "stale",
            "as_of": as_of,
            "reason": reason,
        }),
    };

    json!({
        "freshness": freshness,
        "bias": snapshot.bias(),
        "regions": snapshot.region_scores(),
        "strongest_region": snapshot.strongest_region().map(|r| r.region),
        "weakest_region": snapshot.weakest_region().map(|r| r.region),
        "snapshot": snapshot.as_ref(),
    })
}

/// 데이터 없음 JSON.
pub fn unavailable_json(error: &EdgeError) -> Value {
    json!({
        "freshness": { "state": "unavailable", "reason": error.to_string() },
    })
}
