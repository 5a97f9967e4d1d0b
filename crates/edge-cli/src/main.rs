//! EdgeFinder 매크로 스냅샷 CLI.

mod render;

use clap::{Parser, Subcommand};
use edge_core::{init_logging, AppConfig};
use edge_data::SnapshotAccessor;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "edgefinder")]
#[command(about = "EdgeFinder macro snapshot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (기본: config/default.toml, 없으면 내장 기본값)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일보다 우선
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 현재 스냅샷 표시 (캐시 → 갱신 → 이전 스냅샷 순)
    Show {
        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 수집기만 실행해 지표별 상태 확인 (점수 계산, 캐시 갱신 없음)
    Check,

    /// 적용된 설정을 TOML로 출력
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 설정 로드
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(Some(path))?,
        None => AppConfig::load_default()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // 로깅 초기화
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;
    tracing::debug!(
        regions = config.regions.len(),
        indicators = config.indicators.len(),
        ttl_hours = config.cache.ttl_hours,
        "설정 로드 완료"
    );

    match cli.command {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            let accessor = SnapshotAccessor::from_config(&config).await?;
            let indicators = accessor.check_source().await;
            print!("{}", render::render_check(&indicators, &config));

            if indicators.usable_count() > 0 {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Show { json } => {
            let accessor = SnapshotAccessor::from_config(&config).await?;
            match accessor.get_snapshot().await {
                Ok(served) => {
                    if json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&render::snapshot_json(&served))?
                        );
                    } else {
                        print!("{}", render::render_snapshot(&served, &config));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) if e.is_data_unavailable() => {
                    tracing::error!(error = %e, "표시할 스냅샷 없음");
                    if json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&render::unavailable_json(&e))?
                        );
                    } else {
                        print!("{}", render::render_unavailable(&e));
                    }
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
