//! 슬리피지 모델.
//!
//! 체결가를 기준가에서 불리한 방향으로 조정합니다.
//!
//! # 지원 모델
//!
//! - **None**: 슬리피지 없음
//! - **Fixed**: 고정 비율 슬리피지
//! - **VolumeImpact**: 봉 거래량 대비 주문 수량(참여율)에 비례하는 시장 충격
//!
//! 거래량 정보가 없는 봉에서는 VolumeImpact가 0으로 동작합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use advisor_core::{PriceBar, Side};

/// 슬리피지 모델.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlippageModel {
    /// 슬리피지 없음.
    None,

    /// 고정 비율 슬리피지.
    Fixed {
        /// 슬리피지 비율 (예: 0.0005 = 0.05%)
        #[serde(default = "default_fixed_rate")]
        rate: Decimal,
    },

    /// 거래량 참여율 기반 시장 충격.
    ///
    /// slippage = min(수량 / 봉 거래량 × impact, max_rate)
    VolumeImpact {
        /// 시장 충격 계수
        #[serde(default = "default_impact")]
        impact: Decimal,
        /// 최대 슬리피지 비율
        #[serde(default = "default_max_rate")]
        max_rate: Decimal,
    },
}

fn default_fixed_rate() -> Decimal {
    dec!(0.0005)
} // 0.05%
fn default_impact() -> Decimal {
    dec!(0.1)
}
fn default_max_rate() -> Decimal {
    dec!(0.01)
} // 1%

impl Default for SlippageModel {
    fn default() -> Self {
        Self::VolumeImpact {
            impact: default_impact(),
            max_rate: default_max_rate(),
        }
    }
}

impl SlippageModel {
    /// 고정 슬리피지 모델 생성.
    pub fn fixed(rate: Decimal) -> Self {
        Self::Fixed { rate }
    }

    /// 거래량 충격 모델 생성.
    pub fn volume_impact(impact: Decimal, max_rate: Decimal) -> Self {
        Self::VolumeImpact { impact, max_rate }
    }

    /// 모델이 적용할 수 있는 최대 슬리피지 비율.
    ///
    /// 포지션 수량을 정할 때 체결 후 잔고가 음수가 되지 않도록 사용합니다.
    pub fn max_rate(&self) -> Decimal {
        match self {
            SlippageModel::None => Decimal::ZERO,
            SlippageModel::Fixed { rate } => *rate,
            SlippageModel::VolumeImpact { max_rate, .. } => *max_rate,
        }
    }

    /// 슬리피지 비율만 계산.
    pub fn calculate_rate(&self, size: Decimal, bar: &PriceBar) -> Decimal {
        match self {
            SlippageModel::None => Decimal::ZERO,

            SlippageModel::Fixed { rate } => *rate,

            SlippageModel::VolumeImpact { impact, max_rate } => {
                if !bar.has_volume() {
                    return Decimal::ZERO;
                }
                let participation = size / bar.volume;
                (participation * *impact).min(*max_rate).max(Decimal::ZERO)
            }
        }
    }

    /// 슬리피지가 적용된 체결가 계산.
    ///
    /// # Arguments
    /// * `price` - 기준 가격
    /// * `side` - 주문 방향 (매수는 높게, 매도는 낮게 체결)
    /// * `size` - 주문 수량
    /// * `bar` - 체결 봉 (거래량 참조)
    pub fn calculate_execution_price(
        &self,
        price: Decimal,
        side: Side,
        size: Decimal,
        bar: &PriceBar,
    ) -> SlippageResult {
        let slippage_rate = self.calculate_rate(size, bar);
        let slippage_amount = price * slippage_rate;

        let execution_price = match side {
            Side::Buy => price + slippage_amount,
            Side::Sell => price - slippage_amount,
        };

        SlippageResult {
            base_price: price,
            execution_price,
            slippage_rate,
            slippage_amount,
        }
    }

    /// 설정 검증.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SlippageModel::None => Ok(()),
            SlippageModel::Fixed { rate } if *rate < Decimal::ZERO || *rate >= Decimal::ONE => {
                Err(format!("고정 슬리피지 비율이 범위를 벗어났습니다: {}", rate))
            }
            SlippageModel::VolumeImpact { impact, max_rate }
                if *impact < Decimal::ZERO
                    || *max_rate < Decimal::ZERO
                    || *max_rate >= Decimal::ONE =>
            {
                Err(format!(
                    "거래량 충격 슬리피지 설정이 잘못되었습니다: impact={}, max_rate={}",
                    impact, max_rate
                ))
            }
            _ => Ok(()),
        }
    }

    /// 모델 이름 반환.
    pub fn name(&self) -> &'static str {
        match self {
            SlippageModel::None => "None",
            SlippageModel::Fixed { .. } => "Fixed",
            SlippageModel::VolumeImpact { .. } => "VolumeImpact",
        }
    }
}

/// 슬리피지 계산 결과.
#[derive(Debug, Clone, Copy)]
pub struct SlippageResult {
    /// 기준 가격
    pub base_price: Decimal,
    /// 슬리피지 적용 후 실행 가격
    pub execution_price: Decimal,
    /// 적용된 슬리피지 비율
    pub slippage_rate: Decimal,
    /// 슬리피지 금액 (단위 가격 기준)
    pub slippage_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(volume: Decimal) -> PriceBar {
        PriceBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100),
            volume,
        )
    }

    #[test]
    fn test_fixed_slippage() {
        let model = SlippageModel::fixed(dec!(0.001));
        let result = model.calculate_execution_price(dec!(100), Side::Buy, dec!(10), &bar(dec!(1000)));

        assert_eq!(result.base_price, dec!(100));
        assert_eq!(result.slippage_rate, dec!(0.001));
        assert_eq!(result.slippage_amount, dec!(0.1));
        assert_eq!(result.execution_price, dec!(100.1));
    }

    #[test]
    fn test_fixed_slippage_sell() {
        let model = SlippageModel::fixed(dec!(0.001));
        let result = model.calculate_execution_price(dec!(100), Side::Sell, dec!(10), &bar(dec!(1000)));

        assert_eq!(result.execution_price, dec!(99.9));
    }

    #[test]
    fn test_volume_impact_scales_with_participation() {
        let model = SlippageModel::volume_impact(dec!(0.1), dec!(0.01));
        let b = bar(dec!(10000));

        // 1% 참여 → 0.1%
        assert_eq!(model.calculate_rate(dec!(100), &b), dec!(0.001));
        // 5% 참여 → 0.5%
        assert_eq!(model.calculate_rate(dec!(500), &b), dec!(0.005));
        // 상한
        assert_eq!(model.calculate_rate(dec!(50000), &b), dec!(0.01));
    }

    #[test]
    fn test_volume_impact_without_volume_is_zero() {
        let model = SlippageModel::default();
        let result = model.calculate_execution_price(dec!(100), Side::Buy, dec!(500), &bar(Decimal::ZERO));

        assert_eq!(result.slippage_rate, Decimal::ZERO);
        assert_eq!(result.execution_price, dec!(100));
    }

    #[test]
    fn test_max_rate() {
        assert_eq!(SlippageModel::None.max_rate(), Decimal::ZERO);
        assert_eq!(SlippageModel::fixed(dec!(0.002)).max_rate(), dec!(0.002));
        assert_eq!(SlippageModel::default().max_rate(), dec!(0.01));
    }

    #[test]
    fn test_serde_tagged() {
        let model: SlippageModel =
            serde_json::from_str(r#"{"type":"volume_impact","impact":"0.2"}"#).unwrap();
        assert_eq!(model, SlippageModel::volume_impact(dec!(0.2), dec!(0.01)));

        let none: SlippageModel = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(none, SlippageModel::None);
    }

    #[test]
    fn test_validation() {
        assert!(SlippageModel::default().validate().is_ok());
        assert!(SlippageModel::fixed(dec!(-0.1)).validate().is_err());
        assert!(SlippageModel::volume_impact(dec!(0.1), dec!(1.5)).validate().is_err());
    }
}
