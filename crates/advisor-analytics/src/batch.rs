//! 다종목 배치 분석.
//!
//! 고정 크기 워커 풀이 종목 작업 큐를 소비하고 결과 큐에 종목별 결과를 보냅니다.
//! 워커끼리 공유하는 가변 상태는 없으며, 결과는 제출 순서대로 다시 정렬됩니다.
//!
//! 취소는 협조적입니다. 취소 후에는 새 종목을 제출하지 않고 아직 시작하지 않은
//! 종목은 `Skipped`로 남지만, 이미 실행 중인 종목은 끝까지 분석합니다.
//!
//! 가격 데이터 제공자의 재시도와 속도 제한은 제공자 구현의 책임입니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use advisor_core::{AdvisorError, AdvisorResult, PriceDataProvider, PriceSeries};

use crate::pipeline::AnalysisPipeline;
use crate::report::AnalysisRecord;

/// 배치 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 워커 수 (기본: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl BatchConfig {
    /// 워커 수 설정.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// 설정 검증.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("워커 수는 0보다 커야 합니다".to_string());
        }
        Ok(())
    }
}

/// 종목별 배치 결과.
#[derive(Debug)]
pub enum SymbolOutcome {
    /// 분석 완료
    Completed(Box<AnalysisRecord>),
    /// 데이터 조회 또는 분석 실패
    Failed(AdvisorError),
    /// 취소로 인해 실행하지 않음
    Skipped,
}

impl SymbolOutcome {
    /// 완료된 경우 레코드 참조.
    pub fn record(&self) -> Option<&AnalysisRecord> {
        match self {
            SymbolOutcome::Completed(record) => Some(record),
            _ => None,
        }
    }

    /// 완료 여부.
    pub fn is_completed(&self) -> bool {
        matches!(self, SymbolOutcome::Completed(_))
    }
}

/// 종목 하나의 결과.
#[derive(Debug)]
pub struct SymbolResult {
    /// 종목 코드
    pub symbol: String,
    /// 결과
    pub outcome: SymbolOutcome,
}

/// 배치 실행 요약.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// 완료 종목 수
    pub completed: usize,
    /// 실패 종목 수
    pub failed: usize,
    /// 건너뛴 종목 수
    pub skipped: usize,
    /// 소요 시간
    pub elapsed: Duration,
}

/// 배치 실행 결과 (제출 순서 유지).
#[derive(Debug)]
pub struct BatchReport {
    /// 종목별 결과
    pub results: Vec<SymbolResult>,
    /// 요약
    pub summary: BatchSummary,
}

impl BatchReport {
    /// 완료된 분석 레코드만 제출 순서대로 반환합니다.
    pub fn records(&self) -> Vec<AnalysisRecord> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.record().cloned())
            .collect()
    }
}

/// 배치 분석기.
pub struct BatchAnalyzer {
    provider: Arc<dyn PriceDataProvider>,
    pipeline: Arc<AnalysisPipeline>,
    config: BatchConfig,
}

impl BatchAnalyzer {
    /// 새 배치 분석기 생성.
    pub fn new(
        provider: Arc<dyn PriceDataProvider>,
        pipeline: AnalysisPipeline,
        config: BatchConfig,
    ) -> Self {
        Self {
            provider,
            pipeline: Arc::new(pipeline),
            config,
        }
    }

    /// 종목 목록을 분석합니다.
    ///
    /// 종목별 실패는 결과에 기록될 뿐 배치를 중단하지 않습니다.
    pub async fn run(&self, symbols: Vec<String>, cancel: CancellationToken) -> BatchReport {
        let started = Instant::now();
        let total = symbols.len();
        let workers = self.config.workers.max(1).min(total.max(1));

        info!(symbols = total, workers, provider = self.provider.name(), "배치 분석 시작");

        let (job_tx, job_rx) = mpsc::channel::<(usize, String)>(workers);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, SymbolOutcome)>();

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let job_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                let provider = Arc::clone(&self.provider);
                let pipeline = Arc::clone(&self.pipeline);
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    loop {
                        // 큐 잠금은 다음 작업을 꺼낼 때만 유지
                        let job = { job_rx.lock().await.recv().await };
                        let Some((index, symbol)) = job else {
                            break;
                        };

                        let outcome = if cancel.is_cancelled() {
                            SymbolOutcome::Skipped
                        } else {
                            debug!(worker_id, symbol = %symbol, "종목 분석 시작");
                            analyze_symbol(provider.as_ref(), &pipeline, &symbol).await
                        };

                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);

        for (index, symbol) in symbols.iter().cloned().enumerate() {
            if cancel.is_cancelled() {
                info!(submitted = index, total, "배치 취소: 남은 종목 제출 중단");
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(submitted = index, total, "배치 취소: 남은 종목 제출 중단");
                    break;
                }
                sent = job_tx.send((index, symbol)) => {
                    if sent.is_err() {
                        warn!("작업 큐가 닫혀 제출을 중단합니다");
                        break;
                    }
                }
            }
        }
        drop(job_tx);

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!(error = %e, "배치 워커 비정상 종료");
            }
        }

        let mut outcomes: HashMap<usize, SymbolOutcome> = HashMap::with_capacity(total);
        while let Some((index, outcome)) = result_rx.recv().await {
            outcomes.insert(index, outcome);
        }

        let results: Vec<SymbolResult> = symbols
            .into_iter()
            .enumerate()
            .map(|(index, symbol)| SymbolResult {
                symbol,
                outcome: outcomes.remove(&index).unwrap_or(SymbolOutcome::Skipped),
            })
            .collect();

        let mut summary = BatchSummary {
            elapsed: started.elapsed(),
            ..Default::default()
        };
        for result in &results {
            match result.outcome {
                SymbolOutcome::Completed(_) => summary.completed += 1,
                SymbolOutcome::Failed(_) => summary.failed += 1,
                SymbolOutcome::Skipped => summary.skipped += 1,
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "배치 분석 완료"
        );

        BatchReport { results, summary }
    }
}

/// 종목 하나를 조회하고 분석합니다.
///
/// CPU 연산은 `spawn_blocking`으로 별도 스레드 풀에서 실행합니다.
async fn analyze_symbol(
    provider: &dyn PriceDataProvider,
    pipeline: &Arc<AnalysisPipeline>,
    symbol: &str,
) -> SymbolOutcome {
    let series = match provider.fetch_series(symbol).await {
        Ok(series) => series,
        Err(e) => {
            warn!(symbol, error = %e, "가격 데이터 조회 실패");
            return SymbolOutcome::Failed(e);
        }
    };

    let pipeline = Arc::clone(pipeline);
    let analyzed = tokio::task::spawn_blocking(move || pipeline.analyze(&series))
        .await
        .map_err(|e| AdvisorError::Internal(format!("분석 태스크 실행 실패: {}", e)))
        .and_then(|result| result);

    match analyzed {
        Ok(record) => SymbolOutcome::Completed(Box::new(record)),
        Err(e) => {
            warn!(symbol, error = %e, "종목 분석 실패");
            SymbolOutcome::Failed(e)
        }
    }
}

/// 메모리 기반 가격 데이터 제공자.
///
/// 테스트나 미리 로드한 데이터를 배치에 넣을 때 사용합니다.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryProvider {
    /// 빈 제공자 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 시계열 추가.
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    /// 시계열 추가 (같은 종목은 교체).
    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }
}

#[async_trait]
impl PriceDataProvider for InMemoryProvider {
    async fn fetch_series(&self, symbol: &str) -> AdvisorResult<PriceSeries> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| AdvisorError::Data(format!("종목 데이터 없음: {}", symbol)))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
