//! 기술적 지표 모듈.
//!
//! 가격 시계열을 봉별 지표 스냅샷으로 변환하는 순수 함수들을 제공합니다.
//! 모든 계산은 정상 입력에 대해 실패하지 않으며, 이력이 부족한 구간은
//! 0이 아니라 "값 없음"(`None`)으로 표현됩니다.
//!
//! # 지원 지표
//!
//! ## 추세 지표
//! - **MACD**: 12/26/9 EMA 기반
//!
//! ## 모멘텀 지표
//! - **RSI**: Wilder 평활 상대강도지수
//! - **KDJ**: 스토캐스틱 기반 K/D/J
//!
//! ## 변동성 지표
//! - **Bollinger Bands**: 20일 SMA ± 2σ
//! - **ATR**: 평균 실제 범위
//! - **동적 RSI 임계값**: ATR% 백분위에 따른 과매도/과매수 기준
//!
//! # 사용 예시
//!
//! ```ignore
//! use advisor_analytics::indicators::{IndicatorEngine, IndicatorParams};
//!
//! let engine = IndicatorEngine::new(IndicatorParams::default());
//! if let Some(snapshot) = engine.latest(&series) {
//!     println!("RSI: {}", snapshot.rsi);
//! }
//! ```

pub mod dynamic_threshold;
pub mod momentum;
pub mod snapshot;
pub mod trend;
pub mod volatility;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use advisor_core::PriceSeries;

pub use dynamic_threshold::{
    DynamicRsiThreshold, DynamicThresholdCalculator, DynamicThresholdParams,
};
pub use momentum::{KdjParams, KdjResult, MomentumCalculator};
pub use snapshot::{IndicatorSnapshot, MacdSnapshot, SNAPSHOT_DECIMALS};
pub use trend::{MacdParams, MacdResult, TrendIndicators};
pub use volatility::{BollingerBandsParams, BollingerBandsResult, VolatilityIndicators};

/// 지표 파라미터 오류.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 데이터 부족 오류
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),
}

/// 지표 검증 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// 전체 지표 파라미터 세트.
///
/// 캐시 키의 일부이므로 직렬화 형태가 곧 파라미터 지문입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// RSI 기간 (기본: 14)
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// MACD 파라미터
    #[serde(default)]
    pub macd: MacdParams,
    /// KDJ 파라미터
    #[serde(default)]
    pub kdj: KdjParams,
    /// 볼린저 밴드 파라미터
    #[serde(default)]
    pub bollinger: BollingerBandsParams,
    /// ATR 기간 (기본: 14)
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// 동적 RSI 임계값 파라미터
    #[serde(default)]
    pub dynamic_threshold: DynamicThresholdParams,
}

fn default_rsi_period() -> usize {
    14
}
fn default_atr_period() -> usize {
    14
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            macd: MacdParams::default(),
            kdj: KdjParams::default(),
            bollinger: BollingerBandsParams::default(),
            atr_period: default_atr_period(),
            dynamic_threshold: DynamicThresholdParams::default(),
        }
    }
}

impl IndicatorParams {
    /// 모든 파라미터 검증.
    pub fn validate(&self) -> IndicatorResult<()> {
        if self.rsi_period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "RSI 기간은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.atr_period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "ATR 기간은 0보다 커야 합니다".to_string(),
            ));
        }
        self.macd.validate()?;
        self.kdj.validate()?;
        self.bollinger.validate()?;
        self.dynamic_threshold.validate()?;
        Ok(())
    }

    /// 첫 스냅샷이 생기는 데 필요한 최소 봉 수.
    ///
    /// RSI/MACD/KDJ/볼린저/ATR 중 가장 긴 이력 요구량입니다.
    pub fn min_bars(&self) -> usize {
        (self.rsi_period + 1)
            .max(self.macd.min_bars())
            .max(self.kdj.period)
            .max(self.bollinger.period)
            .max(self.atr_period)
    }

    /// 시계열이 스냅샷을 만들기에 충분한지 확인합니다.
    pub fn ensure_sufficient(&self, provided: usize) -> IndicatorResult<()> {
        let required = self.min_bars();
        if provided < required {
            return Err(IndicatorError::InsufficientData { required, provided });
        }
        Ok(())
    }
}

/// 통합 지표 엔진.
///
/// 파라미터 세트를 보관하고 시계열 전체에 대한 스냅샷을 계산합니다.
/// 내부 상태가 없으므로 같은 입력은 항상 같은 출력을 냅니다.
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
    trend: TrendIndicators,
    momentum: MomentumCalculator,
    volatility: VolatilityIndicators,
    threshold: DynamicThresholdCalculator,
}

impl IndicatorEngine {
    /// 새로운 지표 엔진 생성.
    pub fn new(params: IndicatorParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// 파라미터 세트.
    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    // ==================== 개별 지표 ====================

    /// RSI 계산.
    pub fn rsi(&self, closes: &[Decimal]) -> Vec<Option<Decimal>> {
        self.momentum.rsi(closes, self.params.rsi_period)
    }

    /// MACD 계산.
    pub fn macd(&self, closes: &[Decimal]) -> Vec<MacdResult> {
        self.trend.macd(closes, self.params.macd)
    }

    /// KDJ 계산.
    pub fn kdj(&self, high: &[Decimal], low: &[Decimal], close: &[Decimal]) -> Vec<Option<KdjResult>> {
        self.momentum.kdj(high, low, close, self.params.kdj)
    }

    /// 볼린저 밴드 계산.
    pub fn bollinger_bands(&self, closes: &[Decimal]) -> Vec<Option<BollingerBandsResult>> {
        self.volatility.bollinger_bands(closes, self.params.bollinger)
    }

    /// ATR 계산.
    pub fn atr(&self, high: &[Decimal], low: &[Decimal], close: &[Decimal]) -> Vec<Option<Decimal>> {
        self.volatility.atr(high, low, close, self.params.atr_period)
    }

    /// 마지막 봉 기준 동적 RSI 임계값.
    ///
    /// 이력이 부족하면 중립 기본값을 반환합니다.
    pub fn dynamic_rsi_threshold(&self, series: &PriceSeries) -> DynamicRsiThreshold {
        self.threshold.latest(
            &series.highs(),
            &series.lows(),
            &series.closes(),
            self.params.rsi_period,
            self.params.atr_period,
            &self.params.dynamic_threshold,
        )
    }

    /// 봉별 동적 RSI 임계값 시계열.
    pub fn dynamic_rsi_series(&self, series: &PriceSeries) -> Vec<DynamicRsiThreshold> {
        self.threshold.series(
            &series.highs(),
            &series.lows(),
            &series.closes(),
            self.params.rsi_period,
            self.params.atr_period,
            &self.params.dynamic_threshold,
        )
    }

    // ==================== 스냅샷 ====================

    /// 시계열 전체의 봉별 스냅샷 계산.
    ///
    /// 반환 벡터는 입력 봉 수와 같은 길이이며, 이력이 부족한 봉은 `None`입니다.
    pub fn compute(&self, series: &PriceSeries) -> Vec<Option<IndicatorSnapshot>> {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();

        let rsi = self.rsi(&closes);
        let macd = self.macd(&closes);
        let kdj = self.kdj(&highs, &lows, &closes);
        let bollinger = self.bollinger_bands(&closes);
        let atr = self.atr(&highs, &lows, &closes);
        let thresholds = self.threshold.series(
            &highs,
            &lows,
            &closes,
            self.params.rsi_period,
            self.params.atr_period,
            &self.params.dynamic_threshold,
        );

        let snapshots: Vec<Option<IndicatorSnapshot>> = series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let rsi = rsi[i]?;
                let line = macd[i].macd?;
                let signal = macd[i].signal?;
                let histogram = macd[i].histogram?;
                let kdj = kdj[i]?;
                let bollinger = bollinger[i]?;
                let atr = atr[i]?;
                let prev_histogram = i
                    .checked_sub(1)
                    .and_then(|p| macd[p].histogram)
                    .map(snapshot::round);

                Some(IndicatorSnapshot {
                    index: i,
                    date: bar.date,
                    close: bar.close,
                    rsi: snapshot::round(rsi),
                    macd: MacdSnapshot {
                        line: snapshot::round(line),
                        signal: snapshot::round(signal),
                        histogram: snapshot::round(histogram),
                        prev_histogram,
                    },
                    kdj: snapshot::round_kdj(kdj),
                    bollinger: snapshot::round_bollinger(bollinger),
                    atr: snapshot::round(atr),
                    atr_percent: snapshot::round(advisor_core::safe_div(
                        atr,
                        bar.close,
                        Decimal::ZERO,
                    ) * Decimal::ONE_HUNDRED),
                    dynamic_rsi: snapshot::round_threshold(thresholds[i]),
                })
            })
            .collect();

        debug!(
            symbol = series.symbol(),
            bars = series.len(),
            snapshots = snapshots.iter().flatten().count(),
            "indicator snapshots computed"
        );

        snapshots
    }

    /// 스냅샷이 있는 봉만 모아서 반환합니다.
    pub fn snapshots(&self, series: &PriceSeries) -> Vec<IndicatorSnapshot> {
        self.compute(series).into_iter().flatten().collect()
    }

    /// 마지막 봉의 스냅샷.
    ///
    /// 마지막 봉에 이력이 부족하면 `None`입니다.
    pub fn latest(&self, series: &PriceSeries) -> Option<IndicatorSnapshot> {
        self.compute(series).pop().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::PriceBar;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn series_from_closes(closes: &[Decimal]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                PriceBar::new(
                    start + chrono::Duration::days(i as i64),
                    *c - dec!(0.5),
                    *c + dec!(1),
                    *c - dec!(1),
                    *c,
                    dec!(100000),
                )
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn test_min_bars_default() {
        let params = IndicatorParams::default();
        // MACD 26 + 9 - 1 = 34가 가장 김
        assert_eq!(params.min_bars(), 34);
        assert!(params.ensure_sufficient(33).is_err());
        assert!(params.ensure_sufficient(34).is_ok());
    }

    #[test]
    fn test_compute_alignment() {
        let engine = IndicatorEngine::default();
        let closes: Vec<Decimal> = (0..60).map(|i| Decimal::from(100 + i)).collect();
        let series = series_from_closes(&closes);

        let snapshots = engine.compute(&series);
        assert_eq!(snapshots.len(), 60);
        assert!(snapshots[32].is_none());
        let first = snapshots[33].unwrap();
        assert_eq!(first.index, 33);
        assert_eq!(first.close, dec!(133));
        assert!(first.macd.prev_histogram.is_none());
        assert!(snapshots[34].unwrap().macd.prev_histogram.is_some());
    }

    #[test]
    fn test_short_series_has_no_snapshot() {
        let engine = IndicatorEngine::default();
        let series = series_from_closes(&[dec!(100), dec!(101), dec!(102)]);

        assert!(engine.latest(&series).is_none());
        assert!(engine.snapshots(&series).is_empty());
        let threshold = engine.dynamic_rsi_threshold(&series);
        assert!(!threshold.adaptive);
    }

    #[test]
    fn test_rising_series_macd_histogram_settles_at_zero() {
        let engine = IndicatorEngine::default();
        let closes: Vec<Decimal> = (0..120).map(|i| Decimal::from(100 + i)).collect();
        let series = series_from_closes(&closes);

        let latest = engine.latest(&series).unwrap();
        assert_eq!(latest.rsi, dec!(100));
        assert_eq!(latest.macd.line, dec!(7));
        assert_eq!(latest.macd.histogram, Decimal::ZERO);
        assert!(!latest.macd.crossed_down());
    }

    #[test]
    fn test_params_validation() {
        assert!(IndicatorParams::default().validate().is_ok());

        let invalid = IndicatorParams {
            rsi_period: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_params_serde_defaults() {
        let params: IndicatorParams = serde_json::from_str(r#"{"rsi_period": 10}"#).unwrap();
        assert_eq!(params.rsi_period, 10);
        assert_eq!(params.macd, MacdParams::default());
        assert_eq!(params.dynamic_threshold.lookback, 252);
    }
}
