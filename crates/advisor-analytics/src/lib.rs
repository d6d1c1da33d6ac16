//! 기술적 분석 및 백테스팅 엔진.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 기술적 지표 (RSI, MACD, KDJ, 볼린저 밴드, ATR 기반 동적 RSI 임계값)
//! - 캔들 패턴 인식 (장악형, 도지, 망치형, 교수형)
//! - 지표/패턴 가중 융합 신호
//! - 신호 재생 백테스트와 성과 지표
//! - 호출자 소유 지표 캐시와 다종목 배치 분석
//!
//! # Re-exports
//!
//! - [`indicators`]: 지표 계산 (IndicatorEngine, IndicatorSnapshot 등)
//! - [`backtest`]: 백테스트 (BacktestEngine, SlippageModel 등)
//! - [`performance`]: 성과 지표 (PerformanceMetrics)

pub mod backtest;
pub mod batch;
pub mod cache;
pub mod config;
pub mod fusion;
pub mod indicators;
pub mod patterns;
pub mod performance;
pub mod pipeline;
pub mod report;

// Indicators 모듈 re-exports
pub use indicators::{
    BollingerBandsParams, BollingerBandsResult, DynamicRsiThreshold, DynamicThresholdCalculator,
    DynamicThresholdParams, IndicatorEngine, IndicatorError, IndicatorParams, IndicatorResult,
    IndicatorSnapshot, KdjParams, KdjResult, MacdParams, MacdResult, MacdSnapshot,
    MomentumCalculator, TrendIndicators, VolatilityIndicators,
};

// Patterns / Fusion
pub use fusion::{ConfidenceBands, FusionConfig, FusionWeights, SignalFusion};
pub use patterns::{
    net_pattern_strength, PatternDirection, PatternOccurrence, PatternParams, PatternRecognizer,
    PatternType,
};

// Backtest / Performance
pub use backtest::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestResult, BacktestStatus, EquityPoint,
    SlippageModel, SlippageResult,
};
pub use performance::metrics::{PerformanceMetrics, DEFAULT_SORTINO_CAP, TRADING_DAYS_PER_YEAR};

// 실행 계층
pub use batch::{
    BatchAnalyzer, BatchConfig, BatchReport, BatchSummary, InMemoryProvider, SymbolOutcome,
    SymbolResult,
};
pub use cache::{CacheKey, CacheStats, IndicatorCache, SnapshotSeries};
pub use config::{AnalysisConfig, AnalysisConfigError};
pub use pipeline::AnalysisPipeline;
pub use report::{AnalysisRecord, JsonReportRenderer, ReportRenderer, TextReportRenderer};
