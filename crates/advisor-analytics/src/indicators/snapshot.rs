//! 봉별 지표 스냅샷.
//!
//! 지표마다 이름 있는 필드를 가진 고정 레코드로, 신호 융합과 백테스트가
//! 같은 계약에 의존합니다. 모든 원시 지표가 정의된 봉에만 스냅샷이 존재합니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BollingerBandsResult, DynamicRsiThreshold, KdjResult};

/// 스냅샷 값 반올림 자릿수.
///
/// EMA 연쇄 계산의 마지막 자리 오차가 히스토그램 부호를 흔들지 않도록
/// 스냅샷에 담을 때 고정 자릿수로 반올림합니다.
pub const SNAPSHOT_DECIMALS: u32 = 8;

/// MACD 스냅샷.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    /// MACD 라인
    pub line: Decimal,
    /// 시그널 라인
    pub signal: Decimal,
    /// 히스토그램
    pub histogram: Decimal,
    /// 직전 봉 히스토그램 (교차 판단용)
    pub prev_histogram: Option<Decimal>,
}

impl MacdSnapshot {
    /// 히스토그램이 음→양으로 교차했는지 확인합니다.
    pub fn crossed_up(&self) -> bool {
        matches!(self.prev_histogram, Some(prev) if prev <= Decimal::ZERO)
            && self.histogram > Decimal::ZERO
    }

    /// 히스토그램이 양→음으로 교차했는지 확인합니다.
    pub fn crossed_down(&self) -> bool {
        matches!(self.prev_histogram, Some(prev) if prev >= Decimal::ZERO)
            && self.histogram < Decimal::ZERO
    }
}

/// 한 봉의 전체 지표 값.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// 시계열 내 봉 인덱스
    pub index: usize,
    /// 거래일
    pub date: NaiveDate,
    /// 종가
    pub close: Decimal,
    /// RSI (0 ~ 100)
    pub rsi: Decimal,
    /// MACD
    pub macd: MacdSnapshot,
    /// KDJ
    pub kdj: KdjResult,
    /// 볼린저 밴드
    pub bollinger: BollingerBandsResult,
    /// ATR
    pub atr: Decimal,
    /// ATR / 종가 × 100
    pub atr_percent: Decimal,
    /// 동적 RSI 임계값
    pub dynamic_rsi: DynamicRsiThreshold,
}

pub(crate) fn round(value: Decimal) -> Decimal {
    value.round_dp(SNAPSHOT_DECIMALS)
}

pub(crate) fn round_kdj(kdj: KdjResult) -> KdjResult {
    KdjResult {
        k: round(kdj.k),
        d: round(kdj.d),
        j: round(kdj.j),
        j_raw: round(kdj.j_raw),
    }
}

pub(crate) fn round_bollinger(bb: BollingerBandsResult) -> BollingerBandsResult {
    BollingerBandsResult {
        upper: round(bb.upper),
        middle: round(bb.middle),
        lower: round(bb.lower),
        bandwidth: round(bb.bandwidth),
        percent_b: round(bb.percent_b),
    }
}

pub(crate) fn round_threshold(threshold: DynamicRsiThreshold) -> DynamicRsiThreshold {
    DynamicRsiThreshold {
        rsi: round(threshold.rsi),
        oversold: round(threshold.oversold),
        overbought: round(threshold.overbought),
        volatility_percentile: round(threshold.volatility_percentile),
        adaptive: threshold.adaptive,
    }
}
