//! 백테스트 거래 기록.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, Quantity};

/// 거래 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 거래 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// 청산 완료 (통계 포함)
    Closed,
    /// 시계열 종료 시점까지 미청산 (평가손익만, 통계 제외)
    Open,
}

/// 진입부터 청산까지의 단일 거래.
///
/// `exit_date`는 항상 `entry_date` 이후(같은 날 포함)입니다.
/// 미청산 거래의 청산가는 마지막 종가 평가값입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// 진입일
    pub entry_date: NaiveDate,
    /// 진입가 (슬리피지 반영)
    pub entry_price: Price,
    /// 청산일 (미청산이면 평가 기준일)
    pub exit_date: NaiveDate,
    /// 청산가 (슬리피지 반영, 미청산이면 평가가)
    pub exit_price: Price,
    /// 포지션 방향
    pub side: Side,
    /// 수량
    pub size: Quantity,
    /// 수수료 합계
    pub fees: Decimal,
    /// 손익 (수수료 차감)
    pub pnl: Decimal,
    /// 수익률 (%)
    pub return_pct: Decimal,
    /// 보유 기간 (봉 수)
    pub bars_held: usize,
    /// 상태
    pub status: TradeStatus,
}

impl Trade {
    /// 청산 완료 여부.
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// 수익 거래 여부.
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}
