//! 모멘텀 지표 (Momentum Indicators).
//!
//! 가격 모멘텀과 과매수/과매도 상태를 측정하는 지표들을 제공합니다.
//! - RSI (Relative Strength Index, Wilder 평활)
//! - KDJ (스토캐스틱 기반 K/D/J)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use advisor_core::clamp_decimal;

use super::{IndicatorError, IndicatorResult};

/// KDJ 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdjParams {
    /// RSV 기간 (기본: 9).
    #[serde(default = "default_kdj_period")]
    pub period: usize,
    /// K 평활 계수 (기본: 3, K = 2/3·이전K + 1/3·RSV).
    #[serde(default = "default_kdj_smoothing")]
    pub k_smoothing: usize,
    /// D 평활 계수 (기본: 3).
    #[serde(default = "default_kdj_smoothing")]
    pub d_smoothing: usize,
}

fn default_kdj_period() -> usize {
    9
}
fn default_kdj_smoothing() -> usize {
    3
}

impl Default for KdjParams {
    fn default() -> Self {
        Self {
            period: default_kdj_period(),
            k_smoothing: default_kdj_smoothing(),
            d_smoothing: default_kdj_smoothing(),
        }
    }
}

impl KdjParams {
    /// 파라미터 검증.
    pub fn validate(&self) -> IndicatorResult<()> {
        if self.period == 0 || self.k_smoothing == 0 || self.d_smoothing == 0 {
            return Err(IndicatorError::InvalidParameter(
                "KDJ 기간과 평활 계수는 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

/// KDJ 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdjResult {
    /// K (0 ~ 100).
    pub k: Decimal,
    /// D (0 ~ 100).
    pub d: Decimal,
    /// 표시용 J (0 ~ 100으로 제한).
    pub j: Decimal,
    /// 원본 J (= 3K - 2D, 범위를 벗어날 수 있음).
    pub j_raw: Decimal,
}

/// 모멘텀 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct MomentumCalculator;

impl MomentumCalculator {
    /// 새로운 모멘텀 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// RSI (Relative Strength Index) 계산.
    ///
    /// RSI = 100 - (100 / (1 + RS)), RS = 평균 상승폭 / 평균 하락폭
    ///
    /// 첫 평균은 처음 period개 변화량의 단순 평균이며 이후 Wilder 평활
    /// (`avg = (이전avg × (period-1) + 현재) / period`)을 적용합니다.
    ///
    /// 평균 하락폭이 0이면 평균 상승폭이 있을 때 100, 둘 다 0이면 50입니다.
    ///
    /// # 반환
    /// 0-100 사이의 RSI 값들 (인덱스 period부터 정의)
    pub fn rsi(&self, prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
        let mut result = vec![None; prices.len()];
        if period == 0 || prices.len() <= period {
            return result;
        }

        let period_decimal = Decimal::from(period);
        let mut avg_gain = Decimal::ZERO;
        let mut avg_loss = Decimal::ZERO;

        for i in 1..=period {
            let (gain, loss) = Self::split_change(prices[i] - prices[i - 1]);
            avg_gain += gain;
            avg_loss += loss;
        }
        avg_gain /= period_decimal;
        avg_loss /= period_decimal;
        result[period] = Some(Self::rsi_value(avg_gain, avg_loss));

        let prev_weight = period_decimal - Decimal::ONE;
        for i in (period + 1)..prices.len() {
            let (gain, loss) = Self::split_change(prices[i] - prices[i - 1]);
            avg_gain = (avg_gain * prev_weight + gain) / period_decimal;
            avg_loss = (avg_loss * prev_weight + loss) / period_decimal;
            result[i] = Some(Self::rsi_value(avg_gain, avg_loss));
        }

        result
    }

    fn split_change(change: Decimal) -> (Decimal, Decimal) {
        if change > Decimal::ZERO {
            (change, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -change)
        }
    }

    fn rsi_value(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
        if avg_loss.is_zero() {
            return if avg_gain > Decimal::ZERO {
                dec!(100)
            } else {
                dec!(50)
            };
        }

        let rs = avg_gain / avg_loss;
        let rsi = dec!(100) - (dec!(100) / (Decimal::ONE + rs));
        clamp_decimal(rsi, Decimal::ZERO, dec!(100))
    }

    /// KDJ 계산.
    ///
    /// RSV = (종가 - N일 최저가) / (N일 최고가 - N일 최저가) × 100
    /// (범위가 0이면 50)
    ///
    /// K, D는 50에서 시작하여 각각 RSV, K를 평활합니다. J = 3K - 2D.
    ///
    /// # 반환
    /// 인덱스 period-1부터 정의되는 KDJ 값들
    pub fn kdj(
        &self,
        high: &[Decimal],
        low: &[Decimal],
        close: &[Decimal],
        params: KdjParams,
    ) -> Vec<Option<KdjResult>> {
        let len = high.len().min(low.len()).min(close.len());
        let mut result = vec![None; len];
        if params.period == 0 || params.k_smoothing == 0 || params.d_smoothing == 0 {
            return result;
        }
        if len < params.period {
            return result;
        }

        let k_alpha = Decimal::ONE / Decimal::from(params.k_smoothing);
        let d_alpha = Decimal::ONE / Decimal::from(params.d_smoothing);
        let hundred = dec!(100);

        let mut k = dec!(50);
        let mut d = dec!(50);

        for i in (params.period - 1)..len {
            let start = i + 1 - params.period;
            let highest = high[start..=i].iter().copied().fold(high[start], Decimal::max);
            let lowest = low[start..=i].iter().copied().fold(low[start], Decimal::min);
            let range = highest - lowest;

            let rsv = if range.is_zero() {
                dec!(50)
            } else {
                clamp_decimal((close[i] - lowest) / range * hundred, Decimal::ZERO, hundred)
            };

            k = clamp_decimal(
                (Decimal::ONE - k_alpha) * k + k_alpha * rsv,
                Decimal::ZERO,
                hundred,
            );
            d = clamp_decimal(
                (Decimal::ONE - d_alpha) * d + d_alpha * k,
                Decimal::ZERO,
                hundred,
            );
            let j_raw = dec!(3) * k - Decimal::TWO * d;

            result[i] = Some(KdjResult {
                k,
                d,
                j: clamp_decimal(j_raw, Decimal::ZERO, hundred),
                j_raw,
            });
        }

        result
    }
}
