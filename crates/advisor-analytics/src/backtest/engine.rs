//! 백테스팅 엔진
//!
//! 봉별 지표 스냅샷으로 과거 신호를 재생하여 롱 전용 매매를 시뮬레이션하고
//! 성과를 분석합니다.
//!
//! # 상태 머신
//!
//! - **Flat** → 매수/강력 매수 신호 → 종가(슬리피지 반영)에 진입 → **Long**
//! - **Long** → 매도/강력 매도 신호 → 종가(슬리피지 반영)에 청산 → **Flat**
//!
//! 시계열 끝까지 청산되지 않은 거래는 미청산으로 표시되고 최종 자산 평가에만
//! 포함됩니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use advisor_analytics::backtest::{BacktestConfig, BacktestEngine};
//! use rust_decimal_macros::dec;
//!
//! let config = BacktestConfig::new(dec!(10_000_000))
//!     .with_commission_rate(dec!(0.00015));
//!
//! let engine = BacktestEngine::new(config);
//! let snapshots = indicator_engine.compute(&series);
//! let result = engine.run(&series, &snapshots)?;
//!
//! println!("{}", result.summary());
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use advisor_core::{PriceBar, PriceSeries, Side, Signal, Trade, TradeStatus};

use crate::backtest::slippage::SlippageModel;
use crate::fusion::SignalFusion;
use crate::indicators::IndicatorSnapshot;
use crate::patterns::PatternRecognizer;
use crate::performance::{PerformanceMetrics, DEFAULT_SORTINO_CAP};

/// 백테스트 오류
#[derive(Debug, Error)]
pub enum BacktestError {
    /// 설정 오류
    #[error("백테스트 설정 오류: {0}")]
    Config(String),
}

/// 백테스트 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 초기 자본금
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    /// 거래 수수료율 (예: 0.00015 = 0.015%)
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,

    /// 진입 시 사용할 현금 비율 (0 < x ≤ 1)
    #[serde(default = "default_position_size_pct")]
    pub position_size_pct: Decimal,

    /// 슬리피지 모델
    #[serde(default)]
    pub slippage: SlippageModel,

    /// 무위험 이자율 (연간, 예: 0.03 = 3%)
    #[serde(default)]
    pub risk_free_rate: Decimal,

    /// 소르티노 비율 상한
    #[serde(default = "default_sortino_cap")]
    pub sortino_cap: Decimal,
}

// 설정 기본값 함수들 (serde default용)
fn default_initial_capital() -> Decimal {
    Decimal::new(10_000_000, 0)
}
fn default_commission_rate() -> Decimal {
    dec!(0.00015)
} // 0.015%
fn default_position_size_pct() -> Decimal {
    Decimal::ONE
}
fn default_sortino_cap() -> Decimal {
    DEFAULT_SORTINO_CAP
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            commission_rate: default_commission_rate(),
            position_size_pct: default_position_size_pct(),
            slippage: SlippageModel::default(),
            risk_free_rate: Decimal::ZERO,
            sortino_cap: default_sortino_cap(),
        }
    }
}

impl BacktestConfig {
    /// 새로운 백테스트 설정을 생성합니다.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            ..Default::default()
        }
    }

    /// 수수료율 설정
    pub fn with_commission_rate(mut self, rate: Decimal) -> Self {
        self.commission_rate = rate;
        self
    }

    /// 포지션 크기 비율 설정
    pub fn with_position_size_pct(mut self, pct: Decimal) -> Self {
        self.position_size_pct = pct;
        self
    }

    /// 슬리피지 모델 설정
    pub fn with_slippage(mut self, model: SlippageModel) -> Self {
        self.slippage = model;
        self
    }

    /// 무위험 이자율 설정
    pub fn with_risk_free_rate(mut self, rate: Decimal) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// 소르티노 상한 설정
    pub fn with_sortino_cap(mut self, cap: Decimal) -> Self {
        self.sortino_cap = cap;
        self
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::Config(
                "초기 자본은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.commission_rate < Decimal::ZERO || self.commission_rate >= Decimal::ONE {
            return Err(BacktestError::Config(format!(
                "수수료율은 0 이상 1 미만이어야 합니다: {}",
                self.commission_rate
            )));
        }
        if self.position_size_pct <= Decimal::ZERO || self.position_size_pct > Decimal::ONE {
            return Err(BacktestError::Config(format!(
                "포지션 크기 비율은 (0, 1] 범위여야 합니다: {}",
                self.position_size_pct
            )));
        }
        if self.sortino_cap <= Decimal::ZERO {
            return Err(BacktestError::Config(
                "소르티노 상한은 0보다 커야 합니다".to_string(),
            ));
        }
        self.slippage.validate().map_err(BacktestError::Config)
    }
}

/// 자산 곡선의 한 점.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// 거래일
    pub date: NaiveDate,
    /// 종가 기준 평가 자산
    pub equity: Decimal,
}

/// 백테스트 결과 상태.
///
/// 지표가 0인 이유를 호출자가 구분할 수 있도록 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BacktestStatus {
    /// 정상 완료 (청산 거래 1건 이상)
    Completed,
    /// 시뮬레이션은 완료했지만 청산된 거래가 없음
    NoClosedTrades,
    /// 신호를 만들 이력이 부족함
    InsufficientData {
        /// 필요한 봉 수
        required: usize,
        /// 제공된 봉 수
        available: usize,
    },
}

impl BacktestStatus {
    /// 표시용 설명.
    pub fn describe(&self) -> String {
        match self {
            BacktestStatus::Completed => "완료".to_string(),
            BacktestStatus::NoClosedTrades => "청산 거래 없음".to_string(),
            BacktestStatus::InsufficientData {
                required,
                available,
            } => format!("데이터 부족 (필요 {}봉, 보유 {}봉)", required, available),
        }
    }
}

/// 백테스트 결과.
///
/// 한 번 만들어진 뒤에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// 종목 코드
    pub symbol: String,

    /// 초기 자본
    pub initial_capital: Decimal,

    /// 자산 곡선 (날짜 오름차순, 첫 값은 초기 자본)
    pub equity_curve: Vec<EquityPoint>,

    /// 거래 목록 (미청산 거래 포함)
    pub trades: Vec<Trade>,

    /// 성과 지표
    pub metrics: PerformanceMetrics,

    /// 상태
    pub status: BacktestStatus,

    /// 총 수수료
    pub total_commission: Decimal,

    /// 총 슬리피지 비용
    pub total_slippage: Decimal,

    /// 데이터 포인트 수
    pub data_points: usize,
}

impl BacktestResult {
    /// 자산 값만 추출합니다.
    pub fn equity_values(&self) -> Vec<Decimal> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }

    /// 최종 자산.
    pub fn final_equity(&self) -> Decimal {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_capital)
    }

    /// 청산된 거래만 반환합니다.
    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_closed())
    }

    /// 이력이 부족해 시뮬레이션하지 못했는지 확인합니다.
    pub fn is_insufficient(&self) -> bool {
        matches!(self.status, BacktestStatus::InsufficientData { .. })
    }

    /// 요약 문자열 반환
    pub fn summary(&self) -> String {
        let period = match (self.equity_curve.first(), self.equity_curve.last()) {
            (Some(first), Some(last)) => format!(
                "{} → {}",
                first.date.format("%Y-%m-%d"),
                last.date.format("%Y-%m-%d")
            ),
            _ => "-".to_string(),
        };

        format!(
            "백테스트 결과 요약: {}\n\
             ═══════════════════════════════════════\n\
             기간: {}\n\
             데이터 포인트: {}\n\
             상태: {}\n\
             ───────────────────────────────────────\n\
             초기 자본: {:.0}\n\
             최종 자산: {:.2}\n\
             총 수익률: {:.2}%\n\
             연율화 수익률: {:.2}%\n\
             ───────────────────────────────────────\n\
             청산 거래: {} (미청산 {})\n\
             승률: {:.1}%\n\
             평균 수익: {:.2}\n\
             평균 손실: {:.2}\n\
             프로핏 팩터: {:.2}\n\
             ───────────────────────────────────────\n\
             샤프 비율: {:.2}\n\
             소르티노 비율: {:.2}\n\
             최대 낙폭: {:.2}%\n\
             시장 노출: {:.1}%\n\
             ───────────────────────────────────────\n\
             총 수수료: {:.2}\n\
             총 슬리피지: {:.2}\n\
             ═══════════════════════════════════════",
            self.symbol,
            period,
            self.data_points,
            self.status.describe(),
            self.initial_capital,
            self.final_equity(),
            self.metrics.total_return_pct,
            self.metrics.annualized_return_pct,
            self.metrics.trade_count,
            self.metrics.open_trades,
            self.metrics.win_rate_pct,
            self.metrics.avg_win,
            self.metrics.avg_loss,
            self.metrics.profit_factor,
            self.metrics.sharpe_ratio,
            self.metrics.sortino_ratio,
            self.metrics.max_drawdown_pct,
            self.metrics.exposure_pct,
            self.total_commission,
            self.total_slippage,
        )
    }
}

/// 보유 중인 포지션
#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    /// 진입 봉 인덱스
    entry_index: usize,
    /// 진입일
    entry_date: NaiveDate,
    /// 진입 체결가
    entry_price: Decimal,
    /// 수량
    size: Decimal,
    /// 진입 금액 (체결가 × 수량)
    entry_cost: Decimal,
    /// 진입 수수료
    entry_fee: Decimal,
}

impl OpenPosition {
    fn cost_basis(&self) -> Decimal {
        self.entry_cost + self.entry_fee
    }
}

/// 시뮬레이션 진행 상태 (한 번의 실행 동안만 유지)
struct Simulation<'a> {
    config: &'a BacktestConfig,
    cash: Decimal,
    position: Option<OpenPosition>,
    trades: Vec<Trade>,
    total_commission: Decimal,
    total_slippage: Decimal,
}

impl<'a> Simulation<'a> {
    fn new(config: &'a BacktestConfig) -> Self {
        Self {
            config,
            cash: config.initial_capital,
            position: None,
            trades: Vec::new(),
            total_commission: Decimal::ZERO,
            total_slippage: Decimal::ZERO,
        }
    }

    /// 종가 기준 평가 자산.
    fn equity(&self, bar: &PriceBar) -> Decimal {
        self.cash + self.position.map_or(Decimal::ZERO, |p| p.size * bar.close)
    }

    /// 슬리피지 상한과 수수료를 감안해 현금으로 살 수 있는 정수 수량.
    fn position_size(&self, bar: &PriceBar) -> Decimal {
        let per_share = bar.close
            * (Decimal::ONE + self.config.slippage.max_rate())
            * (Decimal::ONE + self.config.commission_rate);
        if per_share <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.cash * self.config.position_size_pct / per_share).floor()
    }

    fn open(&mut self, index: usize, bar: &PriceBar) {
        let size = self.position_size(bar);
        if size <= Decimal::ZERO {
            debug!(date = %bar.date, cash = %self.cash, "진입 수량 0, 신호 무시");
            return;
        }

        let fill = self
            .config
            .slippage
            .calculate_execution_price(bar.close, Side::Buy, size, bar);
        let entry_cost = fill.execution_price * size;
        let entry_fee = entry_cost * self.config.commission_rate;

        self.cash -= entry_cost + entry_fee;
        self.total_commission += entry_fee;
        self.total_slippage += fill.slippage_amount * size;
        self.position = Some(OpenPosition {
            entry_index: index,
            entry_date: bar.date,
            entry_price: fill.execution_price,
            size,
            entry_cost,
            entry_fee,
        });
    }

    fn close(&mut self, index: usize, bar: &PriceBar) {
        let Some(position) = self.position.take() else {
            return;
        };

        let fill = self.config.slippage.calculate_execution_price(
            bar.close,
            Side::Sell,
            position.size,
            bar,
        );
        let proceeds = fill.execution_price * position.size;
        let exit_fee = proceeds * self.config.commission_rate;

        self.cash += proceeds - exit_fee;
        self.total_commission += exit_fee;
        self.total_slippage += fill.slippage_amount * position.size;

        let pnl = proceeds - exit_fee - position.cost_basis();
        self.trades.push(Trade {
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: bar.date,
            exit_price: fill.execution_price,
            side: Side::Buy,
            size: position.size,
            fees: position.entry_fee + exit_fee,
            pnl,
            return_pct: Self::return_pct(pnl, position.cost_basis()),
            bars_held: index - position.entry_index,
            status: TradeStatus::Closed,
        });
    }

    /// 미청산 포지션을 마지막 종가로 평가해 기록합니다.
    fn mark_open(&mut self, index: usize, bar: &PriceBar) {
        let Some(position) = self.position else {
            return;
        };

        let pnl = position.size * bar.close - position.cost_basis();
        self.trades.push(Trade {
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: bar.date,
            exit_price: bar.close,
            side: Side::Buy,
            size: position.size,
            fees: position.entry_fee,
            pnl,
            return_pct: Self::return_pct(pnl, position.cost_basis()),
            bars_held: index - position.entry_index,
            status: TradeStatus::Open,
        });
    }

    fn return_pct(pnl: Decimal, cost_basis: Decimal) -> Decimal {
        advisor_core::safe_div(pnl, cost_basis, Decimal::ZERO)
            .checked_mul(dec!(100))
            .unwrap_or(Decimal::ZERO)
            .round_dp(4)
    }
}

/// 백테스팅 엔진
///
/// 입력만으로 결과가 정해지며 실행 간에 상태를 공유하지 않습니다.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    /// 설정
    config: BacktestConfig,

    /// 봉별 신호 생성용 융합기
    fusion: SignalFusion,

    /// 봉별 패턴 인식기
    patterns: PatternRecognizer,

    /// 신호 생성에 필요한 최소 봉 수
    required_bars: usize,
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(BacktestConfig::default())
    }
}

impl BacktestEngine {
    /// 새로운 백테스트 엔진을 생성합니다.
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            fusion: SignalFusion::default(),
            patterns: PatternRecognizer::default(),
            required_bars: 2,
        }
    }

    /// 신호 융합기 설정
    pub fn with_fusion(mut self, fusion: SignalFusion) -> Self {
        self.fusion = fusion;
        self
    }

    /// 패턴 인식기 설정
    pub fn with_patterns(mut self, patterns: PatternRecognizer) -> Self {
        self.patterns = patterns;
        self
    }

    /// 최소 필요 봉 수 설정 (보통 지표 파라미터의 `min_bars()`)
    pub fn with_required_bars(mut self, required: usize) -> Self {
        self.required_bars = required.max(2);
        self
    }

    /// 설정
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// 봉별 신호를 재생합니다.
    ///
    /// 각 봉의 신호는 그 봉까지의 스냅샷과 패턴만 사용합니다.
    pub fn signal_series(
        &self,
        series: &PriceSeries,
        snapshots: &[Option<IndicatorSnapshot>],
    ) -> Vec<Option<Signal>> {
        let bars = series.bars();
        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let snapshot = snapshots.get(i).copied().flatten()?;
                let patterns = self.patterns.recognize_at(bars, i + 1);
                Some(self.fusion.fuse(&snapshot, &patterns, bar.close))
            })
            .collect()
    }

    /// 스냅샷 시계열로 백테스트를 실행합니다.
    ///
    /// # 매개변수
    ///
    /// * `series` - 가격 시계열
    /// * `snapshots` - `IndicatorEngine::compute` 결과 (봉 수와 같은 길이)
    pub fn run(
        &self,
        series: &PriceSeries,
        snapshots: &[Option<IndicatorSnapshot>],
    ) -> Result<BacktestResult, BacktestError> {
        let signals = self.signal_series(series, snapshots);
        self.run_with_signals(series, &signals)
    }

    /// 미리 계산된 봉별 신호로 백테스트를 실행합니다.
    ///
    /// 첫 봉의 신호는 무시하므로 자산 곡선은 항상 초기 자본에서 시작합니다.
    pub fn run_with_signals(
        &self,
        series: &PriceSeries,
        signals: &[Option<Signal>],
    ) -> Result<BacktestResult, BacktestError> {
        self.config.validate()?;

        let bars = series.bars();
        let mut sim = Simulation::new(&self.config);
        let mut equity_curve = Vec::with_capacity(bars.len());
        let mut bars_in_market = 0usize;

        for (i, bar) in bars.iter().enumerate() {
            let signal = if i == 0 {
                None
            } else {
                signals.get(i).and_then(Option::as_ref)
            };

            if let Some(signal) = signal {
                match sim.position {
                    None if signal.direction.is_buy() => sim.open(i, bar),
                    Some(_) if signal.direction.is_sell() => sim.close(i, bar),
                    _ => {}
                }
            }

            if sim.position.is_some() {
                bars_in_market += 1;
            }
            equity_curve.push(EquityPoint {
                date: bar.date,
                equity: sim.equity(bar),
            });
        }

        if let Some((last_index, last_bar)) = bars.iter().enumerate().last() {
            sim.mark_open(last_index, last_bar);
        }

        let equity_values: Vec<Decimal> = equity_curve.iter().map(|p| p.equity).collect();
        let metrics = PerformanceMetrics::calculate(
            &equity_values,
            &sim.trades,
            bars_in_market,
            self.config.risk_free_rate,
            self.config.sortino_cap,
        );

        let has_signal = signals.iter().skip(1).any(Option::is_some);
        let status = if bars.len() < self.required_bars || !has_signal {
            BacktestStatus::InsufficientData {
                required: self.required_bars,
                available: bars.len(),
            }
        } else if metrics.trade_count == 0 {
            BacktestStatus::NoClosedTrades
        } else {
            BacktestStatus::Completed
        };

        debug!(
            symbol = series.symbol(),
            bars = bars.len(),
            trades = metrics.trade_count,
            open_trades = metrics.open_trades,
            status = ?status,
            "backtest finished"
        );

        Ok(BacktestResult {
            symbol: series.symbol().to_string(),
            initial_capital: self.config.initial_capital,
            equity_curve,
            trades: sim.trades,
            metrics,
            status,
            total_commission: sim.total_commission,
            total_slippage: sim.total_slippage,
            data_points: bars.len(),
        })
    }
}
