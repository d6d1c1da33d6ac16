//! ATR 기반 동적 RSI 임계값.
//!
//! 변동성이 높은 구간에서는 RSI 과매도/과매수 기준을 바깥쪽으로 넓혀
//! 잦은 역추세 신호를 줄입니다.
//!
//! 1. ATR(14)을 종가 대비 퍼센트로 변환
//! 2. 최근 lookback 구간 ATR% 분포에서 현재 값의 백분위(중간 순위) 계산
//! 3. 과매도 = 30 - 백분위 × 15, 과매수 = 70 + 백분위 × 15

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use advisor_core::clamp_decimal;

use super::{IndicatorError, IndicatorResult, MomentumCalculator, VolatilityIndicators};

/// 동적 임계값 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicThresholdParams {
    /// ATR% 백분위 계산 구간 (기본: 252 거래일).
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// 기준 과매도 값 (기본: 30).
    #[serde(default = "default_base_oversold")]
    pub base_oversold: Decimal,
    /// 기준 과매수 값 (기본: 70).
    #[serde(default = "default_base_overbought")]
    pub base_overbought: Decimal,
    /// 최대 조정 폭 (기본: 15).
    #[serde(default = "default_max_adjustment")]
    pub max_adjustment: Decimal,
}

fn default_lookback() -> usize {
    252
}
fn default_base_oversold() -> Decimal {
    dec!(30)
}
fn default_base_overbought() -> Decimal {
    dec!(70)
}
fn default_max_adjustment() -> Decimal {
    dec!(15)
}

impl Default for DynamicThresholdParams {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            base_oversold: default_base_oversold(),
            base_overbought: default_base_overbought(),
            max_adjustment: default_max_adjustment(),
        }
    }
}

impl DynamicThresholdParams {
    /// 파라미터 검증.
    pub fn validate(&self) -> IndicatorResult<()> {
        if self.lookback == 0 {
            return Err(IndicatorError::InvalidParameter(
                "lookback은 0보다 커야 합니다".to_string(),
            ));
        }
        let hundred = dec!(100);
        if self.base_oversold < Decimal::ZERO
            || self.base_overbought > hundred
            || self.base_oversold >= self.base_overbought
        {
            return Err(IndicatorError::InvalidParameter(format!(
                "RSI 기준값 범위가 잘못되었습니다: 과매도 {}, 과매수 {}",
                self.base_oversold, self.base_overbought
            )));
        }
        if self.max_adjustment < Decimal::ZERO {
            return Err(IndicatorError::InvalidParameter(
                "최대 조정 폭은 음수일 수 없습니다".to_string(),
            ));
        }
        Ok(())
    }
}

/// 동적 RSI 임계값.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRsiThreshold {
    /// 현재 RSI
    pub rsi: Decimal,
    /// 과매도 기준
    pub oversold: Decimal,
    /// 과매수 기준
    pub overbought: Decimal,
    /// 현재 ATR%의 백분위 (0 ~ 1)
    pub volatility_percentile: Decimal,
    /// 변동성 조정이 적용되었는지 (이력 부족 시 false, 중립 기본값)
    pub adaptive: bool,
}

impl DynamicRsiThreshold {
    /// 이력이 부족할 때 사용하는 중립 기본값.
    pub fn neutral(params: &DynamicThresholdParams) -> Self {
        Self {
            rsi: dec!(50),
            oversold: params.base_oversold,
            overbought: params.base_overbought,
            volatility_percentile: dec!(0.5),
            adaptive: false,
        }
    }

    /// 과매도 상태인지 확인합니다.
    pub fn is_oversold(&self) -> bool {
        self.rsi < self.oversold
    }

    /// 과매수 상태인지 확인합니다.
    pub fn is_overbought(&self) -> bool {
        self.rsi > self.overbought
    }
}

/// 동적 임계값 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicThresholdCalculator {
    momentum: MomentumCalculator,
    volatility: VolatilityIndicators,
}

impl DynamicThresholdCalculator {
    /// 새로운 계산기 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 중간 순위 백분위: (작은 값 수 + 0.5 × 같은 값 수) / 전체 수.
    ///
    /// 값이 없으면 0.5입니다.
    pub fn percentile_rank(window: &[Decimal], current: Decimal) -> Decimal {
        if window.is_empty() {
            return dec!(0.5);
        }

        let less = window.iter().filter(|v| **v < current).count();
        let equal = window.iter().filter(|v| **v == current).count();
        let rank = (Decimal::from(less) + Decimal::from(equal) * dec!(0.5))
            / Decimal::from(window.len());

        clamp_decimal(rank, Decimal::ZERO, Decimal::ONE)
    }

    /// 백분위로 임계값을 보간합니다.
    fn thresholds(
        params: &DynamicThresholdParams,
        percentile: Decimal,
    ) -> (Decimal, Decimal) {
        let adjustment = percentile * params.max_adjustment;
        let oversold = clamp_decimal(params.base_oversold - adjustment, Decimal::ZERO, dec!(100));
        let overbought =
            clamp_decimal(params.base_overbought + adjustment, Decimal::ZERO, dec!(100));
        (oversold, overbought)
    }

    /// 최소 필요 데이터 수: max(RSI 기간, ATR 기간, lookback).
    pub fn required_bars(rsi_period: usize, atr_period: usize, params: &DynamicThresholdParams) -> usize {
        rsi_period.max(atr_period).max(params.lookback)
    }

    /// 마지막 봉 기준 동적 임계값 계산.
    ///
    /// 데이터가 `required_bars`보다 적으면 중립 기본값을 반환합니다.
    pub fn latest(
        &self,
        high: &[Decimal],
        low: &[Decimal],
        close: &[Decimal],
        rsi_period: usize,
        atr_period: usize,
        params: &DynamicThresholdParams,
    ) -> DynamicRsiThreshold {
        self.series(high, low, close, rsi_period, atr_period, params)
            .pop()
            .unwrap_or_else(|| DynamicRsiThreshold::neutral(params))
    }

    /// 봉별 동적 임계값 시계열 계산.
    ///
    /// 각 봉은 그 시점까지의 데이터만 사용하므로 백테스트 재생에 사용할 수 있습니다.
    pub fn series(
        &self,
        high: &[Decimal],
        low: &[Decimal],
        close: &[Decimal],
        rsi_period: usize,
        atr_period: usize,
        params: &DynamicThresholdParams,
    ) -> Vec<DynamicRsiThreshold> {
        let len = high.len().min(low.len()).min(close.len());
        let required = Self::required_bars(rsi_period, atr_period, params);

        let rsi = self.momentum.rsi(&close[..len], rsi_period);
        let atr_pct = self
            .volatility
            .atr_percent(&high[..len], &low[..len], &close[..len], atr_period);

        let neutral = DynamicRsiThreshold::neutral(params);
        let mut result = Vec::with_capacity(len);

        for i in 0..len {
            let (Some(current_rsi), Some(current_atr)) = (rsi[i], atr_pct[i]) else {
                result.push(neutral);
                continue;
            };
            if i + 1 < required || params.lookback == 0 {
                result.push(neutral);
                continue;
            }

            let start = (i + 1).saturating_sub(params.lookback);
            let window: Vec<Decimal> = atr_pct[start..=i].iter().flatten().copied().collect();
            let percentile = Self::percentile_rank(&window, current_atr);
            let (oversold, overbought) = Self::thresholds(params, percentile);

            result.push(DynamicRsiThreshold {
                rsi: current_rsi,
                oversold,
                overbought,
                volatility_percentile: percentile,
                adaptive: true,
            });
        }

        result
    }
}
