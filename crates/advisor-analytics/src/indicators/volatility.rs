//! 변동성 지표 (Volatility Indicators).
//!
//! 가격 변동성을 측정하는 지표들을 제공합니다.
//! - Bollinger Bands (볼린저 밴드)
//! - ATR (Average True Range)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use advisor_core::{clamp_decimal, decimal_mean, decimal_sqrt, safe_div};

use super::{IndicatorError, IndicatorResult};

/// 볼린저 밴드 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BollingerBandsParams {
    /// 이동평균 기간 (기본: 20).
    #[serde(default = "default_bb_period")]
    pub period: usize,
    /// 표준편차 배수 (기본: 2.0).
    #[serde(default = "default_bb_multiplier")]
    pub std_dev_multiplier: Decimal,
}

fn default_bb_period() -> usize {
    20
}
fn default_bb_multiplier() -> Decimal {
    dec!(2.0)
}

impl Default for BollingerBandsParams {
    fn default() -> Self {
        Self {
            period: default_bb_period(),
            std_dev_multiplier: default_bb_multiplier(),
        }
    }
}

impl BollingerBandsParams {
    /// 파라미터 검증.
    pub fn validate(&self) -> IndicatorResult<()> {
        if self.period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "볼린저 밴드 기간은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.std_dev_multiplier <= Decimal::ZERO {
            return Err(IndicatorError::InvalidParameter(format!(
                "표준편차 배수는 양수여야 합니다: {}",
                self.std_dev_multiplier
            )));
        }
        Ok(())
    }
}

/// 볼린저 밴드 결과.
///
/// 항상 `upper >= middle >= lower`입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BollingerBandsResult {
    /// 상단 밴드.
    pub upper: Decimal,
    /// 중간 밴드 (SMA).
    pub middle: Decimal,
    /// 하단 밴드.
    pub lower: Decimal,
    /// 밴드 폭 ((상단 - 하단) / 중간). 중간이 0이면 0.
    pub bandwidth: Decimal,
    /// %B ((종가 - 하단) / (상단 - 하단)), 0~1로 제한. 밴드 폭이 0이면 0.5.
    pub percent_b: Decimal,
}

/// 변동성 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolatilityIndicators;

impl VolatilityIndicators {
    /// 새로운 변동성 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 볼린저 밴드 계산.
    ///
    /// - 중간 밴드 = N일 SMA
    /// - 상단/하단 = 중간 ± (배수 × 모표준편차)
    pub fn bollinger_bands(
        &self,
        prices: &[Decimal],
        params: BollingerBandsParams,
    ) -> Vec<Option<BollingerBandsResult>> {
        let period = params.period;
        let mut result = vec![None; prices.len()];
        if period == 0 || prices.len() < period {
            return result;
        }

        // 음수 배수가 들어와도 밴드 순서가 뒤집히지 않도록 절대값 사용
        let multiplier = params.std_dev_multiplier.abs();

        for i in (period - 1)..prices.len() {
            let window = &prices[i + 1 - period..=i];

            let middle = decimal_mean(window);
            let deviation = multiplier.saturating_mul(Self::population_std_dev(window, middle));
            let upper = middle.saturating_add(deviation);
            let lower = middle.saturating_sub(deviation);
            let width = upper.saturating_sub(lower);

            let percent_b = if width.is_zero() {
                dec!(0.5)
            } else {
                clamp_decimal((prices[i] - lower) / width, Decimal::ZERO, Decimal::ONE)
            };

            result[i] = Some(BollingerBandsResult {
                upper,
                middle,
                lower,
                bandwidth: safe_div(width, middle, Decimal::ZERO),
                percent_b,
            });
        }

        result
    }

    /// 모표준편차.
    ///
    /// 큰 가격에서 제곱합이 넘치지 않도록 구간 최대 절대값 대비 상대 편차로 계산한 뒤
    /// 다시 곱합니다.
    fn population_std_dev(window: &[Decimal], mean: Decimal) -> Decimal {
        let scale = window
            .iter()
            .map(|p| p.abs())
            .fold(mean.abs(), Decimal::max);
        if scale.is_zero() {
            return Decimal::ZERO;
        }

        let squared: Vec<Decimal> = window
            .iter()
            .map(|p| {
                let relative = (*p - mean) / scale;
                relative * relative
            })
            .collect();
        scale.saturating_mul(decimal_sqrt(decimal_mean(&squared)))
    }

    /// True Range 계산.
    ///
    /// 첫 봉은 당일 범위(고가 - 저가)를 사용합니다.
    pub fn true_range(&self, high: &[Decimal], low: &[Decimal], close: &[Decimal]) -> Vec<Decimal> {
        let len = high.len().min(low.len()).min(close.len());
        let mut ranges = Vec::with_capacity(len);

        for i in 0..len {
            let hl = high[i] - low[i];
            if i == 0 {
                ranges.push(hl);
                continue;
            }
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            ranges.push(hl.max(hc).max(lc));
        }

        ranges
    }

    /// ATR (Average True Range) 계산.
    ///
    /// 초기 ATR은 처음 period개 TR의 단순 평균이며 이후 Wilder 평활을 적용합니다.
    pub fn atr(
        &self,
        high: &[Decimal],
        low: &[Decimal],
        close: &[Decimal],
        period: usize,
    ) -> Vec<Option<Decimal>> {
        let true_ranges = self.true_range(high, low, close);
        let len = true_ranges.len();
        let mut result = vec![None; len];
        if period == 0 || len < period {
            return result;
        }

        let period_decimal = Decimal::from(period);
        let mut atr = decimal_mean(&true_ranges[..period]);
        result[period - 1] = Some(atr);

        // atr × (n-1)을 거치지 않는 Wilder 평활: atr += (tr - atr) / n
        for i in period..len {
            atr += (true_ranges[i] - atr) / period_decimal;
            result[i] = Some(atr);
        }

        result
    }

    /// ATR 퍼센트 계산 (ATR / 종가 × 100).
    ///
    /// 종가가 0이면 0입니다.
    pub fn atr_percent(
        &self,
        high: &[Decimal],
        low: &[Decimal],
        close: &[Decimal],
        period: usize,
    ) -> Vec<Option<Decimal>> {
        self.atr(high, low, close, period)
            .into_iter()
            .zip(close.iter())
            .map(|(atr, c)| atr.map(|a| safe_div(a, *c, Decimal::ZERO) * dec!(100)))
            .collect()
    }
}
