//! 추세 지표 (Trend Indicators).
//!
//! 이동평균 기반의 추세 지표들을 제공합니다.
//! - SMA (Simple Moving Average)
//! - EMA (Exponential Moving Average)
//! - MACD (Moving Average Convergence Divergence)
//!
//! 모든 계산은 입력과 같은 길이의 벡터를 반환하며,
//! 이력이 부족한 구간은 `None`입니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use advisor_core::decimal_mean;

use super::{IndicatorError, IndicatorResult};

/// MACD 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    /// 단기 EMA 기간 (기본: 12).
    #[serde(default = "default_fast_period")]
    pub fast_period: usize,
    /// 장기 EMA 기간 (기본: 26).
    #[serde(default = "default_slow_period")]
    pub slow_period: usize,
    /// 시그널 라인 기간 (기본: 9).
    #[serde(default = "default_signal_period")]
    pub signal_period: usize,
}

fn default_fast_period() -> usize {
    12
}
fn default_slow_period() -> usize {
    26
}
fn default_signal_period() -> usize {
    9
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: default_fast_period(),
            slow_period: default_slow_period(),
            signal_period: default_signal_period(),
        }
    }
}

impl MacdParams {
    /// 파라미터 검증.
    pub fn validate(&self) -> IndicatorResult<()> {
        if self.fast_period == 0 || self.slow_period == 0 || self.signal_period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "MACD 기간은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(IndicatorError::InvalidParameter(format!(
                "MACD 단기 기간({})은 장기 기간({})보다 작아야 합니다",
                self.fast_period, self.slow_period
            )));
        }
        Ok(())
    }

    /// 첫 히스토그램이 계산되는 데 필요한 최소 데이터 수.
    pub fn min_bars(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }
}

/// MACD 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdResult {
    /// MACD 라인 (단기 EMA - 장기 EMA).
    pub macd: Option<Decimal>,
    /// 시그널 라인 (MACD의 EMA).
    pub signal: Option<Decimal>,
    /// 히스토그램 (MACD - 시그널).
    pub histogram: Option<Decimal>,
}

/// 추세 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrendIndicators;

impl TrendIndicators {
    /// 새로운 추세 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 단순 이동평균 (SMA) 계산.
    ///
    /// SMA = (P1 + P2 + ... + Pn) / n
    ///
    /// # 반환
    /// 각 시점의 SMA 값 (처음 period-1개는 None)
    pub fn sma(&self, prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
        let mut result = vec![None; prices.len()];
        if period == 0 || prices.len() < period {
            return result;
        }

        for i in (period - 1)..prices.len() {
            result[i] = Some(decimal_mean(&prices[i + 1 - period..=i]));
        }

        result
    }

    /// 지수 이동평균 (EMA) 계산.
    ///
    /// EMA = (현재가 × k) + (이전 EMA × (1 - k)), k = 2 / (period + 1)
    ///
    /// 첫 EMA는 처음 period개의 단순 평균으로 시작합니다.
    pub fn ema(&self, prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
        let mut result = vec![None; prices.len()];
        if period == 0 || prices.len() < period {
            return result;
        }

        let multiplier = Decimal::TWO / Decimal::from(period + 1);
        let one_minus = Decimal::ONE - multiplier;

        let seed = decimal_mean(&prices[..period]);
        result[period - 1] = Some(seed);

        let mut ema = seed;
        for i in period..prices.len() {
            ema = prices[i] * multiplier + ema * one_minus;
            result[i] = Some(ema);
        }

        result
    }

    /// MACD 계산.
    ///
    /// - MACD 라인 = EMA(fast) - EMA(slow)
    /// - 시그널 = MACD 라인의 EMA(signal)
    /// - 히스토그램 = MACD - 시그널
    pub fn macd(&self, prices: &[Decimal], params: MacdParams) -> Vec<MacdResult> {
        let fast_ema = self.ema(prices, params.fast_period);
        let slow_ema = self.ema(prices, params.slow_period);

        let macd_line: Vec<Option<Decimal>> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(fast, slow)| match (fast, slow) {
                (Some(f), Some(s)) => Some(*f - *s),
                _ => None,
            })
            .collect();

        // 시그널 라인은 정의된 MACD 구간에 대해서만 계산
        let first_defined = macd_line.iter().position(Option::is_some);
        let signal_line = match first_defined {
            Some(start) => {
                let values: Vec<Decimal> = macd_line[start..].iter().flatten().copied().collect();
                let mut signal = vec![None; start];
                signal.extend(self.ema(&values, params.signal_period));
                signal
            }
            None => vec![None; prices.len()],
        };

        macd_line
            .iter()
            .zip(signal_line.iter())
            .map(|(macd, signal)| MacdResult {
                macd: *macd,
                signal: *signal,
                histogram: match (macd, signal) {
                    (Some(m), Some(s)) => Some(*m - *s),
                    _ => None,
                },
            })
            .collect()
    }
}
