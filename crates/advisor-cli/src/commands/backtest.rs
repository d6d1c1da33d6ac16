//! 단일 종목 백테스트 명령어.
//!
//! # 사용 예시
//!
//! ```bash
//! advisor backtest -d data -s 005930
//! advisor backtest -d data -s SPY -c config/advisor.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use advisor_analytics::{AnalysisConfig, AnalysisPipeline, BacktestResult};
use advisor_core::PriceDataProvider;

use crate::provider::CsvPriceProvider;

/// 백테스트 명령 설정.
#[derive(Debug, Clone)]
pub struct BacktestCliConfig {
    /// CSV 데이터 디렉토리
    pub data_dir: PathBuf,
    /// 종목 코드
    pub symbol: String,
}

/// 백테스트 실행.
pub async fn run_backtest(cli: BacktestCliConfig, config: &AnalysisConfig) -> Result<BacktestResult> {
    let provider = CsvPriceProvider::new(&cli.data_dir);
    let series = provider
        .fetch_series(&cli.symbol)
        .await
        .with_context(|| format!("{} 데이터 로드 실패", cli.symbol))?;

    info!(symbol = %cli.symbol, bars = series.len(), "백테스트 시작");

    let pipeline = AnalysisPipeline::new(config);
    let record = tokio::task::spawn_blocking(move || pipeline.analyze(&series))
        .await
        .context("백테스트 태스크 실행 실패")??;

    Ok(record.backtest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backtest_missing_symbol() {
        let cli = BacktestCliConfig {
            data_dir: std::env::temp_dir().join("advisor-cli-none"),
            symbol: "NONE".to_string(),
        };
        let err = run_backtest(cli, &AnalysisConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("NONE"));
    }

    #[tokio::test]
    async fn test_backtest_short_history() {
        let dir = std::env::temp_dir().join(format!("advisor-cli-bt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SHORT.csv"),
            "date,open,high,low,close,volume\n2024-01-02,10,11,9,10,100\n2024-01-03,10,12,9,11,100\n",
        )
        .unwrap();

        let cli = BacktestCliConfig {
            data_dir: dir.clone(),
            symbol: "SHORT".to_string(),
        };
        let result = run_backtest(cli, &AnalysisConfig::default()).await.unwrap();
        assert!(result.is_insufficient());
        assert_eq!(result.data_points, 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
