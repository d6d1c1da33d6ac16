//! 다종목 분석 명령어.
//!
//! # 사용 예시
//!
//! ```bash
//! # 두 종목 분석 (텍스트 출력)
//! advisor analyze -d data -s 005930,000660
//!
//! # 관심종목 그룹 전체를 JSON으로
//! advisor analyze -d data -g semis -c config/advisor.toml --format json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use advisor_analytics::{
    AnalysisConfig, AnalysisPipeline, BatchAnalyzer, BatchReport, JsonReportRenderer,
    ReportRenderer, SymbolOutcome, TextReportRenderer,
};
use advisor_core::WatchlistStore;

use crate::provider::CsvPriceProvider;

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// 터미널 텍스트
    #[default]
    Text,
    /// JSON
    Json,
}

impl OutputFormat {
    /// 형식에 맞는 렌더러.
    pub fn renderer(self) -> Box<dyn ReportRenderer> {
        match self {
            OutputFormat::Text => Box::new(TextReportRenderer),
            OutputFormat::Json => Box::new(JsonReportRenderer::new(true)),
        }
    }
}

/// 분석 명령 설정.
#[derive(Debug, Clone)]
pub struct AnalyzeCliConfig {
    /// CSV 데이터 디렉토리
    pub data_dir: PathBuf,
    /// 쉼표로 구분된 종목 목록
    pub symbols: Option<String>,
    /// 관심종목 그룹 이름
    pub group: Option<String>,
    /// 출력 형식
    pub format: OutputFormat,
    /// 워커 수 (설정 파일 값 덮어쓰기)
    pub workers: Option<usize>,
}

/// `A, B,,C` → `["A", "B", "C"]`
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 분석 대상 종목을 결정합니다.
///
/// `--symbols`가 우선이며, 없으면 설정의 관심종목 그룹을 사용합니다.
pub fn resolve_symbols(
    symbols: Option<&str>,
    group: Option<&str>,
    watchlist: &dyn WatchlistStore,
) -> Result<Vec<String>> {
    if let Some(raw) = symbols {
        let list = parse_symbol_list(raw);
        if list.is_empty() {
            bail!("종목 목록이 비어 있습니다");
        }
        return Ok(list);
    }

    let Some(group) = group else {
        bail!("--symbols 또는 --group 중 하나를 지정해야 합니다");
    };

    let entries = watchlist.symbols(group).ok_or_else(|| {
        anyhow!(
            "관심종목 그룹을 찾을 수 없습니다: {} (사용 가능: {})",
            group,
            watchlist.groups().join(", ")
        )
    })?;
    if entries.is_empty() {
        bail!("관심종목 그룹이 비어 있습니다: {}", group);
    }

    Ok(entries.into_iter().map(|e| e.symbol).collect())
}

/// 분석 실행 후 리포트를 반환합니다.
pub async fn run_analyze(
    cli: AnalyzeCliConfig,
    mut config: AnalysisConfig,
    cancel: CancellationToken,
) -> Result<(BatchReport, String)> {
    if let Some(workers) = cli.workers {
        config.batch = config.batch.with_workers(workers);
        config
            .batch
            .validate()
            .map_err(|e| anyhow!("배치 설정 오류: {}", e))?;
    }

    let symbols = resolve_symbols(cli.symbols.as_deref(), cli.group.as_deref(), &config.watchlist)?;
    info!(count = symbols.len(), data_dir = %cli.data_dir.display(), "분석 대상 확정");

    let provider = Arc::new(CsvPriceProvider::new(&cli.data_dir));
    let analyzer = BatchAnalyzer::new(provider, AnalysisPipeline::new(&config), config.batch);
    let report = analyzer.run(symbols, cancel).await;

    for result in &report.results {
        match &result.outcome {
            SymbolOutcome::Failed(e) => warn!(symbol = %result.symbol, error = %e, "분석 실패"),
            SymbolOutcome::Skipped => warn!(symbol = %result.symbol, "취소로 건너뜀"),
            SymbolOutcome::Completed(_) => {}
        }
    }

    let renderer = cli.format.renderer();
    let rendered = renderer.render(&report.records())?;
    Ok((report, rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{StaticWatchlist, WatchlistEntry};

    fn watchlist() -> StaticWatchlist {
        StaticWatchlist::new().with_group(
            "semis",
            vec![
                WatchlistEntry::new("005930", "삼성전자"),
                WatchlistEntry::new("000660", "SK하이닉스"),
            ],
        )
    }

    #[test]
    fn test_parse_symbol_list() {
        assert_eq!(parse_symbol_list(" A, B,,C "), vec!["A", "B", "C"]);
        assert!(parse_symbol_list(" , ").is_empty());
    }

    #[test]
    fn test_resolve_prefers_symbols() {
        let list = resolve_symbols(Some("AAPL"), Some("semis"), &watchlist()).unwrap();
        assert_eq!(list, vec!["AAPL"]);
    }

    #[test]
    fn test_resolve_group() {
        let list = resolve_symbols(None, Some("semis"), &watchlist()).unwrap();
        assert_eq!(list, vec!["005930", "000660"]);

        let err = resolve_symbols(None, Some("bio"), &watchlist()).unwrap_err();
        assert!(err.to_string().contains("semis"));

        assert!(resolve_symbols(None, None, &watchlist()).is_err());
    }

    #[tokio::test]
    async fn test_run_analyze_reports_missing_symbol() {
        let dir = std::env::temp_dir().join(format!("advisor-cli-analyze-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut csv = String::from("date,open,high,low,close,volume\n");
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..60i64 {
            let close = 100 + (i % 9);
            csv.push_str(&format!(
                "{},{},{},{},{},1000\n",
                start + chrono::Duration::days(i),
                close,
                close + 2,
                close - 2,
                close
            ));
        }
        std::fs::write(dir.join("AAA.csv"), csv).unwrap();

        let cli = AnalyzeCliConfig {
            data_dir: dir.clone(),
            symbols: Some("AAA,ZZZ".to_string()),
            group: None,
            format: OutputFormat::Json,
            workers: Some(2),
        };
        let (report, rendered) = run_analyze(cli, AnalysisConfig::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.summary.completed, 1);
        assert_eq!(report.summary.failed, 1);
        assert!(rendered.contains("\"symbol\": \"AAA\""));

        std::fs::remove_dir_all(&dir).ok();
    }
}
