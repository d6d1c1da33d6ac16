//! 단일 종목 분석 파이프라인.
//!
//! 지표 계산 → 패턴 인식 → 신호 융합 → 백테스트를 순차 실행하고
//! 결과를 `AnalysisRecord`로 묶습니다. 내부에서 대기하거나 I/O를 하지 않습니다.

use tracing::debug;

use advisor_core::{analysis_span, AdvisorError, AdvisorResult, PriceSeries};

use crate::backtest::BacktestEngine;
use crate::cache::IndicatorCache;
use crate::config::AnalysisConfig;
use crate::fusion::SignalFusion;
use crate::indicators::{IndicatorEngine, IndicatorSnapshot};
use crate::patterns::PatternRecognizer;
use crate::report::AnalysisRecord;

/// 분석 파이프라인.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    indicators: IndicatorEngine,
    patterns: PatternRecognizer,
    fusion: SignalFusion,
    backtest: BacktestEngine,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl AnalysisPipeline {
    /// 설정으로 파이프라인을 구성합니다.
    pub fn new(config: &AnalysisConfig) -> Self {
        let indicators = IndicatorEngine::new(config.indicators);
        let patterns = PatternRecognizer::new(config.patterns);
        let fusion = SignalFusion::new(config.fusion);
        let backtest = BacktestEngine::new(config.backtest)
            .with_fusion(fusion.clone())
            .with_patterns(patterns.clone())
            .with_required_bars(config.indicators.min_bars());

        Self {
            indicators,
            patterns,
            fusion,
            backtest,
        }
    }

    /// 지표 엔진.
    pub fn indicators(&self) -> &IndicatorEngine {
        &self.indicators
    }

    /// 종목 하나를 분석합니다.
    ///
    /// 이력이 짧아도 실패하지 않으며 신호와 스냅샷이 비어 있는 레코드를 반환합니다.
    pub fn analyze(&self, series: &PriceSeries) -> AdvisorResult<AnalysisRecord> {
        let snapshots = self.indicators.compute(series);
        self.assemble(series, &snapshots)
    }

    /// 호출자 캐시를 사용해 종목 하나를 분석합니다.
    pub fn analyze_cached(
        &self,
        series: &PriceSeries,
        cache: &mut IndicatorCache,
    ) -> AdvisorResult<AnalysisRecord> {
        let snapshots = cache.get_or_compute(series, &self.indicators);
        self.assemble(series, &snapshots)
    }

    fn assemble(
        &self,
        series: &PriceSeries,
        snapshots: &[Option<IndicatorSnapshot>],
    ) -> AdvisorResult<AnalysisRecord> {
        let span = analysis_span!("analyze", series.symbol());
        let _guard = span.enter();

        let latest_bar = series.last();
        let snapshot = snapshots.last().copied().flatten();
        let patterns = self.patterns.recognize(series);
        let signal = match (snapshot, latest_bar) {
            (Some(snapshot), Some(bar)) => Some(self.fusion.fuse(&snapshot, &patterns, bar.close)),
            _ => None,
        };

        let backtest = self
            .backtest
            .run(series, snapshots)
            .map_err(|e| AdvisorError::Config(e.to_string()))?;

        debug!(
            bars = series.len(),
            patterns = patterns.len(),
            direction = ?signal.as_ref().map(|s| s.direction),
            trades = backtest.metrics.trade_count,
            "analysis finished"
        );

        Ok(AnalysisRecord {
            symbol: series.symbol().to_string(),
            latest_date: latest_bar.map(|b| b.date),
            latest_price: latest_bar.map(|b| b.close),
            signal,
            patterns,
            snapshot,
            backtest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::PriceBar;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn zigzag(len: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = (0..len)
            .map(|i| {
                let wave = Decimal::from((i % 20) as i64 - 10).abs();
                let close = dec!(100) + wave + Decimal::from(i as i64) / dec!(10);
                PriceBar::new(
                    start + chrono::Duration::days(i as i64),
                    close - dec!(0.3),
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    dec!(50000),
                )
            })
            .collect();
        PriceSeries::new("ZIG", bars).unwrap()
    }

    #[test]
    fn test_analyze_full_record() {
        let pipeline = AnalysisPipeline::default();
        let series = zigzag(120);
        let record = pipeline.analyze(&series).unwrap();

        assert_eq!(record.symbol, "ZIG");
        assert_eq!(record.latest_date, series.last_date());
        assert!(record.snapshot.is_some());
        assert!(record.signal.is_some());
        assert_eq!(record.backtest.data_points, 120);
        assert!(!record.backtest.is_insufficient());
    }

    #[test]
    fn test_short_history_is_not_an_error() {
        let pipeline = AnalysisPipeline::default();
        let record = pipeline.analyze(&zigzag(10)).unwrap();

        assert!(record.signal.is_none());
        assert!(record.snapshot.is_none());
        assert!(record.backtest.is_insufficient());
    }

    #[test]
    fn test_cached_matches_uncached() {
        let pipeline = AnalysisPipeline::default();
        let series = zigzag(80);
        let mut cache = IndicatorCache::new();

        let direct = pipeline.analyze(&series).unwrap();
        let cached = pipeline.analyze_cached(&series, &mut cache).unwrap();
        let cached_again = pipeline.analyze_cached(&series, &mut cache).unwrap();

        assert_eq!(direct, cached);
        assert_eq!(cached, cached_again);
        assert_eq!(cache.stats().hits, 1);
    }
}
