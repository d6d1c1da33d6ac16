//! 성과 지표 계산 모듈
//!
//! 백테스트 자산 곡선과 거래 목록에서 성과 지표를 계산합니다:
//! - 샤프 비율 (Sharpe Ratio): 일간 수익률 표준편차 대비 초과 수익
//! - 소르티노 비율 (Sortino Ratio): 하방 편차 대비 초과 수익 (상한 적용)
//! - 최대 낙폭 (Maximum Drawdown): 고점 대비 최대 하락폭
//! - 승률 (Win Rate): 청산 거래 중 수익 거래 비율
//! - 프로핏 팩터 (Profit Factor): 총 수익 / 총 손실 비율
//!
//! 거래가 없어도 모든 필드는 0으로 채워져 존재합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use advisor_core::{clamp_decimal, decimal_sqrt, safe_div, Trade};

/// 연간 거래일 수 (연율화 계산에 사용)
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// 소르티노 비율 기본 상한.
///
/// 하방 편차가 0에 가까울 때 비율이 발산하지 않도록 `[-상한, 상한]`으로 제한합니다.
pub const DEFAULT_SORTINO_CAP: Decimal = dec!(3.0);

/// 프로핏 팩터 상한 (손실 거래가 없을 때 사용).
pub const PROFIT_FACTOR_CAP: Decimal = dec!(100);

/// 비율 지표 표시 자릿수.
const RATIO_DECIMALS: u32 = 4;

/// 백테스트 성과 지표.
///
/// 미청산 거래는 `open_trades`로만 집계되고 거래 통계에서는 제외됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// 총 수익률 (%)
    ///
    /// (최종 자산 - 초기 자본) / 초기 자본 × 100
    pub total_return_pct: Decimal,

    /// 연율화 수익률 (%)
    ///
    /// 선형 근사: 총 수익률 × 252 / 기간(봉 수)
    pub annualized_return_pct: Decimal,

    /// 승률 (%)
    pub win_rate_pct: Decimal,

    /// 평균 수익 (수익 거래만)
    pub avg_win: Decimal,

    /// 평균 손실 (손실 거래만, 양수로 표시)
    pub avg_loss: Decimal,

    /// 프로핏 팩터
    ///
    /// 총 수익 / 총 손실. 손실이 없으면 상한값, 거래가 없으면 0.
    pub profit_factor: Decimal,

    /// 샤프 비율 (연율화)
    pub sharpe_ratio: Decimal,

    /// 소르티노 비율 (연율화, 상한 적용)
    pub sortino_ratio: Decimal,

    /// 최대 낙폭 (%, 양수)
    pub max_drawdown_pct: Decimal,

    /// 청산 거래 수
    pub trade_count: usize,

    /// 수익 거래 수
    pub winning_trades: usize,

    /// 손실 거래 수
    pub losing_trades: usize,

    /// 미청산 거래 수
    pub open_trades: usize,

    /// 평균 보유 기간 (봉 수)
    pub avg_bars_held: Decimal,

    /// 시장 노출 비율 (%): 포지션을 보유한 봉 / 전체 봉
    pub exposure_pct: Decimal,

    /// 청산 거래 총 수수료
    pub total_fees: Decimal,

    /// 청산 거래 순손익
    pub net_profit: Decimal,
}

impl PerformanceMetrics {
    /// 자산 곡선과 거래 목록에서 성과 지표를 계산합니다.
    ///
    /// # 매개변수
    ///
    /// * `equity` - 봉별 자산 가치 (첫 값은 초기 자본)
    /// * `trades` - 전체 거래 (미청산 포함)
    /// * `bars_in_market` - 포지션을 보유한 봉 수
    /// * `risk_free_rate` - 연간 무위험 이자율 (예: 0.03 = 3%)
    /// * `sortino_cap` - 소르티노 비율 상한
    pub fn calculate(
        equity: &[Decimal],
        trades: &[Trade],
        bars_in_market: usize,
        risk_free_rate: Decimal,
        sortino_cap: Decimal,
    ) -> Self {
        let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
        let open_trades = trades.len() - closed.len();

        let initial = equity.first().copied().unwrap_or(Decimal::ZERO);
        let last = equity.last().copied().unwrap_or(initial);
        let total_return_pct = safe_div(last - initial, initial, Decimal::ZERO) * dec!(100);
        let periods = equity.len().saturating_sub(1);
        let annualized_return_pct = Self::annualize_return(total_return_pct, periods);
        let max_drawdown_pct = max_drawdown_from_curve(equity);
        let exposure_pct = safe_div(
            Decimal::from(bars_in_market),
            Decimal::from(equity.len()),
            Decimal::ZERO,
        ) * dec!(100);

        let mut metrics = Self {
            total_return_pct: total_return_pct.round_dp(RATIO_DECIMALS),
            annualized_return_pct: annualized_return_pct.round_dp(RATIO_DECIMALS),
            max_drawdown_pct,
            open_trades,
            exposure_pct: exposure_pct.round_dp(2),
            ..Default::default()
        };

        // 청산 거래가 없으면 거래 의존 지표는 모두 0
        if closed.is_empty() {
            return metrics;
        }

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut bars_held = 0usize;
        for trade in &closed {
            if trade.pnl > Decimal::ZERO {
                gross_profit += trade.pnl;
                metrics.winning_trades += 1;
            } else if trade.pnl < Decimal::ZERO {
                gross_loss += trade.pnl.abs();
                metrics.losing_trades += 1;
            }
            metrics.total_fees += trade.fees;
            bars_held += trade.bars_held;
        }

        let count = Decimal::from(closed.len());
        metrics.trade_count = closed.len();
        metrics.net_profit = gross_profit - gross_loss;
        metrics.win_rate_pct =
            (Decimal::from(metrics.winning_trades) / count * dec!(100)).round_dp(2);
        metrics.avg_win = safe_div(
            gross_profit,
            Decimal::from(metrics.winning_trades),
            Decimal::ZERO,
        )
        .round_dp(2);
        metrics.avg_loss = safe_div(
            gross_loss,
            Decimal::from(metrics.losing_trades),
            Decimal::ZERO,
        )
        .round_dp(2);
        metrics.profit_factor = Self::profit_factor(gross_profit, gross_loss);
        metrics.avg_bars_held = (Decimal::from(bars_held) / count).round_dp(2);

        let returns = daily_returns(equity);
        let daily_rf = risk_free_rate / Decimal::from(TRADING_DAYS_PER_YEAR);
        metrics.sharpe_ratio = calculate_sharpe_ratio(&returns, daily_rf).round_dp(RATIO_DECIMALS);
        metrics.sortino_ratio =
            calculate_sortino_ratio(&returns, daily_rf, sortino_cap).round_dp(RATIO_DECIMALS);

        metrics
    }

    /// 수익률을 연율화합니다.
    ///
    /// 정확한 공식은 (1 + r)^(252/days) - 1 이지만
    /// 여기서는 선형 근사 r × (252 / days)를 사용합니다.
    fn annualize_return(total_return_pct: Decimal, periods: usize) -> Decimal {
        if periods == 0 {
            return Decimal::ZERO;
        }
        total_return_pct * Decimal::from(TRADING_DAYS_PER_YEAR) / Decimal::from(periods)
    }

    fn profit_factor(gross_profit: Decimal, gross_loss: Decimal) -> Decimal {
        if gross_loss.is_zero() {
            return if gross_profit > Decimal::ZERO {
                PROFIT_FACTOR_CAP
            } else {
                Decimal::ZERO
            };
        }
        (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP).round_dp(RATIO_DECIMALS)
    }

    /// 수익성 여부 (순수익 > 0, 프로핏 팩터 > 1).
    pub fn is_profitable(&self) -> bool {
        self.net_profit > Decimal::ZERO && self.profit_factor > Decimal::ONE
    }
}

/// 자산 곡선에서 일간 수익률(비율)을 계산합니다.
///
/// 직전 자산이 0 이하인 구간은 0으로 처리합니다.
pub fn daily_returns(equity: &[Decimal]) -> Vec<Decimal> {
    equity
        .windows(2)
        .map(|w| {
            if w[0] > Decimal::ZERO {
                (w[1] - w[0]) / w[0]
            } else {
                Decimal::ZERO
            }
        })
        .collect()
}

/// 자산 곡선에서 최대 낙폭(MDD)을 계산합니다.
///
/// # 계산 공식
///
/// MDD = (고점 - 저점) / 고점 × 100%
///
/// # 예시
///
/// 자산이 1000만원 → 1200만원(고점) → 1080만원(저점) → 1300만원
/// MDD = (1200 - 1080) / 1200 × 100 = 10%
pub fn max_drawdown_from_curve(equity_curve: &[Decimal]) -> Decimal {
    let Some(&first) = equity_curve.first() else {
        return Decimal::ZERO;
    };

    let mut max_drawdown = Decimal::ZERO;
    let mut peak = first;

    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }

        if peak > Decimal::ZERO {
            let drawdown = (peak - equity) / peak * dec!(100);
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    max_drawdown
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

/// 샤프 비율을 계산합니다.
///
/// Sharpe = 평균(일간 초과 수익률) / 표본 표준편차 × √252
///
/// 수익률이 2개 미만이거나 표준편차가 0이면 0입니다.
pub fn calculate_sharpe_ratio(returns: &[Decimal], daily_rf: Decimal) -> Decimal {
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let excess: Vec<Decimal> = returns.iter().map(|r| *r - daily_rf).collect();
    let mean_excess = mean(&excess);

    // 분산 계산: Σ(ri - mean)² / (n-1)
    let variance = excess
        .iter()
        .map(|r| {
            let diff = *r - mean_excess;
            diff * diff
        })
        .sum::<Decimal>()
        / Decimal::from(excess.len() - 1);

    let std_dev = decimal_sqrt(variance);
    if std_dev.is_zero() {
        return Decimal::ZERO;
    }

    let annualization = decimal_sqrt(Decimal::from(TRADING_DAYS_PER_YEAR));
    mean_excess / std_dev * annualization
}

/// 소르티노 비율을 계산합니다.
///
/// Sortino = 평균(일간 초과 수익률) / 하방 편차 × √252
///
/// 하방 편차 = √(Σ min(r - rf, 0)² / n)
///
/// 결과는 항상 `[-cap, cap]` 범위입니다. 하방 편차가 0이면
/// 평균 초과 수익이 양수일 때 상한값, 아니면 0을 반환합니다.
pub fn calculate_sortino_ratio(returns: &[Decimal], daily_rf: Decimal, cap: Decimal) -> Decimal {
    let cap = cap.abs();
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let excess: Vec<Decimal> = returns.iter().map(|r| *r - daily_rf).collect();
    let mean_excess = mean(&excess);

    let downside_squared_sum: Decimal = excess
        .iter()
        .filter(|r| **r < Decimal::ZERO)
        .map(|r| *r * *r)
        .sum();
    let downside_dev = decimal_sqrt(downside_squared_sum / Decimal::from(excess.len()));

    if downside_dev.is_zero() {
        return if mean_excess > Decimal::ZERO {
            cap
        } else {
            Decimal::ZERO
        };
    }

    let annualization = decimal_sqrt(Decimal::from(TRADING_DAYS_PER_YEAR));
    // 극단적으로 작은 하방 편차에서 Decimal 범위를 넘지 않도록 비율 단계에서 먼저 제한
    let ratio = clamp_decimal(mean_excess / downside_dev, -cap, cap);
    clamp_decimal(ratio * annualization, -cap, cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{Side, TradeStatus};
    use chrono::NaiveDate;

    fn trade(pnl: Decimal, status: TradeStatus) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        Trade {
            entry_date: date,
            entry_price: dec!(100),
            exit_date: date,
            exit_price: dec!(100),
            side: Side::Buy,
            size: dec!(10),
            fees: dec!(1),
            pnl,
            return_pct: pnl / dec!(10),
            bars_held: 4,
            status,
        }
    }

    #[test]
    fn test_max_drawdown() {
        let curve = vec![dec!(1000), dec!(1200), dec!(1080), dec!(1300)];
        assert_eq!(max_drawdown_from_curve(&curve), dec!(10));

        assert_eq!(max_drawdown_from_curve(&[]), Decimal::ZERO);
        let rising: Vec<Decimal> = (1..10).map(Decimal::from).collect();
        assert_eq!(max_drawdown_from_curve(&rising), Decimal::ZERO);
    }

    #[test]
    fn test_daily_returns() {
        let returns = daily_returns(&[dec!(100), dec!(110), dec!(99)]);
        assert_eq!(returns, vec![dec!(0.1), dec!(-0.1)]);
        assert!(daily_returns(&[dec!(100)]).is_empty());
    }

    #[test]
    fn test_sharpe_zero_variance() {
        let returns = vec![dec!(0.01); 10];
        assert_eq!(calculate_sharpe_ratio(&returns, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(calculate_sharpe_ratio(&[dec!(0.01)], Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_sign() {
        let returns = vec![dec!(0.01), dec!(0.02), dec!(-0.005), dec!(0.015)];
        assert!(calculate_sharpe_ratio(&returns, Decimal::ZERO) > Decimal::ZERO);
    }

    #[test]
    fn test_sortino_capped_without_downside() {
        let returns = vec![dec!(0.01), dec!(0.02), dec!(0.0), dec!(0.03)];
        assert_eq!(
            calculate_sortino_ratio(&returns, Decimal::ZERO, DEFAULT_SORTINO_CAP),
            DEFAULT_SORTINO_CAP
        );
    }

    #[test]
    fn test_sortino_tiny_downside_stays_bounded() {
        let mut returns = vec![dec!(0.05); 100];
        returns.push(dec!(-0.0000000001));
        let sortino = calculate_sortino_ratio(&returns, Decimal::ZERO, dec!(4));
        assert_eq!(sortino, dec!(4));
    }

    #[test]
    fn test_sortino_negative_bounded() {
        let returns = vec![dec!(-0.02), dec!(-0.01), dec!(-0.03)];
        let sortino = calculate_sortino_ratio(&returns, Decimal::ZERO, DEFAULT_SORTINO_CAP);
        assert!(sortino < Decimal::ZERO);
        assert!(sortino >= -DEFAULT_SORTINO_CAP);
    }

    #[test]
    fn test_empty_trades_all_zero() {
        let equity = vec![dec!(1000); 20];
        let metrics = PerformanceMetrics::calculate(
            &equity,
            &[],
            0,
            Decimal::ZERO,
            DEFAULT_SORTINO_CAP,
        );

        assert_eq!(metrics.trade_count, 0);
        assert_eq!(metrics.win_rate_pct, Decimal::ZERO);
        assert_eq!(metrics.sharpe_ratio, Decimal::ZERO);
        assert_eq!(metrics.sortino_ratio, Decimal::ZERO);
        assert_eq!(metrics.max_drawdown_pct, Decimal::ZERO);
        assert_eq!(metrics.profit_factor, Decimal::ZERO);
        assert_eq!(metrics.total_return_pct, Decimal::ZERO);
    }

    #[test]
    fn test_open_trades_excluded_from_stats() {
        let equity = vec![dec!(1000), dec!(1010), dec!(1005), dec!(1030), dec!(1040)];
        let trades = vec![
            trade(dec!(50), TradeStatus::Closed),
            trade(dec!(-20), TradeStatus::Closed),
            trade(dec!(500), TradeStatus::Open),
        ];
        let metrics =
            PerformanceMetrics::calculate(&equity, &trades, 3, Decimal::ZERO, DEFAULT_SORTINO_CAP);

        assert_eq!(metrics.trade_count, 2);
        assert_eq!(metrics.open_trades, 1);
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.win_rate_pct, dec!(50));
        assert_eq!(metrics.avg_win, dec!(50));
        assert_eq!(metrics.avg_loss, dec!(20));
        assert_eq!(metrics.profit_factor, dec!(2.5));
        assert_eq!(metrics.net_profit, dec!(30));
        assert_eq!(metrics.total_fees, dec!(2));
        assert_eq!(metrics.avg_bars_held, dec!(4));
        assert_eq!(metrics.exposure_pct, dec!(60));
        assert_eq!(metrics.total_return_pct, dec!(4));
        assert!(metrics.is_profitable());
    }

    #[test]
    fn test_profit_factor_without_losses_is_capped() {
        let equity = vec![dec!(1000), dec!(1100)];
        let trades = vec![trade(dec!(100), TradeStatus::Closed)];
        let metrics =
            PerformanceMetrics::calculate(&equity, &trades, 1, Decimal::ZERO, DEFAULT_SORTINO_CAP);
        assert_eq!(metrics.profit_factor, PROFIT_FACTOR_CAP);
    }
}
