//! 주식 분석 어드바이저 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 종목 두 개 분석
//! advisor analyze -d data -s 005930,000660
//!
//! # 설정 파일의 관심종목 그룹을 JSON으로 분석
//! advisor analyze -d data -g semis -c config/advisor.toml --format json
//!
//! # 단일 종목 백테스트
//! advisor backtest -d data -s 005930
//!
//! # 기본 설정 출력
//! advisor config > config/advisor.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use advisor_cli::commands::analyze::{run_analyze, AnalyzeCliConfig, OutputFormat};
use advisor_cli::commands::backtest::{run_backtest, BacktestCliConfig};
use advisor_cli::commands::config::default_config_toml;
use advisor_cli::commands::load_analysis_config;
use advisor_core::init_logging;

#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Stock analysis advisor - 지표, 캔들 패턴, 신호 융합, 백테스트", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 여러 종목 분석 후 리포트 출력
    Analyze {
        /// CSV 데이터 디렉토리 (<SYMBOL>.csv)
        #[arg(short, long)]
        data_dir: PathBuf,

        /// 종목 목록 (쉼표로 구분, 예: 005930,000660)
        #[arg(short, long, conflicts_with = "group")]
        symbols: Option<String>,

        /// 설정 파일의 관심종목 그룹 이름
        #[arg(short, long)]
        group: Option<String>,

        /// 설정 파일 (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 출력 형식
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// 워커 수 (설정 파일 값 덮어쓰기)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// 단일 종목 백테스트
    Backtest {
        /// CSV 데이터 디렉토리 (<SYMBOL>.csv)
        #[arg(short, long)]
        data_dir: PathBuf,

        /// 종목 코드/심볼
        #[arg(short, long)]
        symbol: String,

        /// 설정 파일 (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 기본 설정을 TOML로 출력
    Config,
}

impl Commands {
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Analyze { config, .. } | Commands::Backtest { config, .. } => config.as_ref(),
            Commands::Config => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Config = cli.command {
        println!("{}", default_config_toml()?);
        return Ok(());
    }

    let config = load_analysis_config(cli.command.config_path().map(PathBuf::as_path))?;
    init_logging(config.logging.to_log_config()).context("로깅 초기화 실패")?;

    match cli.command {
        Commands::Analyze {
            data_dir,
            symbols,
            group,
            format,
            workers,
            ..
        } => {
            let cancel = CancellationToken::new();
            let ctrl_c_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("중단 요청 수신, 남은 종목을 건너뜁니다");
                    ctrl_c_cancel.cancel();
                }
            });

            let cli_config = AnalyzeCliConfig {
                data_dir,
                symbols,
                group,
                format,
                workers,
            };
            let (report, rendered) = run_analyze(cli_config, config, cancel).await?;

            println!("{}", rendered);
            info!(
                completed = report.summary.completed,
                failed = report.summary.failed,
                skipped = report.summary.skipped,
                "분석 완료"
            );
            if format == OutputFormat::Text {
                println!(
                    "\n완료 {} / 실패 {} / 건너뜀 {} ({:.2}초)",
                    report.summary.completed,
                    report.summary.failed,
                    report.summary.skipped,
                    report.summary.elapsed.as_secs_f64()
                );
            }
        }

        Commands::Backtest {
            data_dir, symbol, ..
        } => {
            let result = run_backtest(BacktestCliConfig { data_dir, symbol }, &config).await?;
            println!("{}", result.summary());
        }

        Commands::Config => {}
    }

    Ok(())
}
