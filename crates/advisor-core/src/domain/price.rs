//! 일봉 가격 데이터 타입.
//!
//! - `PriceBar` - 하루치 OHLCV
//! - `PriceSeries` - 한 종목의 날짜 오름차순 일봉 시퀀스

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};
use crate::types::{Price, Quantity};

/// 일봉 OHLCV 데이터.
///
/// 거래량이 0이면 거래량 정보가 없는 것으로 취급합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    #[serde(default)]
    pub volume: Quantity,
}

impl PriceBar {
    /// 새 일봉을 생성합니다.
    pub fn new(
        date: NaiveDate,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 거래량 정보가 있는지 확인합니다.
    pub fn has_volume(&self) -> bool {
        self.volume > Decimal::ZERO
    }

    /// 몸통 크기 (|종가 - 시가|).
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 전체 범위 (고가 - 저가).
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 위꼬리 길이.
    pub fn upper_shadow(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    /// 아래꼬리 길이.
    pub fn lower_shadow(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    /// 양봉 여부.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉 여부.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn validate(&self) -> AdvisorResult<()> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| *p < Decimal::ZERO) {
            return Err(AdvisorError::MalformedInput(format!(
                "{}: 음수 가격이 포함되어 있습니다",
                self.date
            )));
        }
        if self.high < self.low {
            return Err(AdvisorError::MalformedInput(format!(
                "{}: 고가({})가 저가({})보다 낮습니다",
                self.date, self.high, self.low
            )));
        }
        let outside = |p: Decimal| p < self.low || p > self.high;
        if outside(self.open) || outside(self.close) {
            return Err(AdvisorError::MalformedInput(format!(
                "{}: 시가({})/종가({})가 고저 범위 [{}, {}]를 벗어났습니다",
                self.date, self.open, self.close, self.low, self.high
            )));
        }
        if self.volume < Decimal::ZERO {
            return Err(AdvisorError::MalformedInput(format!(
                "{}: 음수 거래량 {}",
                self.date, self.volume
            )));
        }
        Ok(())
    }
}

/// 한 종목의 일봉 시퀀스.
///
/// 생성 시 검증되며 이후 변경되지 않습니다. 날짜는 엄격한 오름차순입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// 검증된 가격 시계열을 생성합니다.
    ///
    /// # 에러
    ///
    /// 다음 경우 `AdvisorError::MalformedInput`을 반환합니다:
    /// - 빈 심볼
    /// - 날짜가 엄격한 오름차순이 아님 (중복 포함)
    /// - 음수 가격 또는 음수 거래량
    /// - 고가 < 저가
    /// - 시가/종가가 [저가, 고가] 밖
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> AdvisorResult<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(AdvisorError::MalformedInput(
                "심볼이 비어 있습니다".to_string(),
            ));
        }

        for bar in &bars {
            bar.validate()?;
        }

        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(AdvisorError::MalformedInput(format!(
                "{}: 날짜가 오름차순이 아닙니다 ({} 다음 {})",
                symbol, pair[0].date, pair[1].date
            )));
        }

        Ok(Self { symbol, bars })
    }

    /// 종목 심볼.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// 전체 일봉.
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// 일봉 개수.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// 마지막 일봉.
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// 마지막 거래일.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// 최근 `n`개 일봉 (부족하면 전체).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// 종가 시퀀스.
    pub fn closes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// 고가 시퀀스.
    pub fn highs(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.high).collect()
    }

    /// 저가 시퀀스.
    pub fn lows(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// 거래량 시퀀스.
    pub fn volumes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// 거래량 정보가 하나라도 있는지 확인합니다.
    pub fn has_volume(&self) -> bool {
        self.bars.iter().any(PriceBar::has_volume)
    }
}
