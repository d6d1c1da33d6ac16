//! 융합된 매매 신호.
//!
//! - `SignalDirection` - 5단계 매매 의견
//! - `Vote` - 개별 지표의 방향 투표
//! - `ContributingFactor` - 신호에 기여한 지표/패턴
//! - `Signal` - 최종 신호

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 매매 의견 (신뢰도 구간으로 결정).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    /// 강력 매수
    StrongBuy,
    /// 매수
    Buy,
    /// 관망
    Hold,
    /// 매도
    Sell,
    /// 강력 매도
    StrongSell,
}

impl SignalDirection {
    /// 매수 계열 의견인지 확인합니다.
    pub fn is_buy(&self) -> bool {
        matches!(self, SignalDirection::StrongBuy | SignalDirection::Buy)
    }

    /// 매도 계열 의견인지 확인합니다.
    pub fn is_sell(&self) -> bool {
        matches!(self, SignalDirection::StrongSell | SignalDirection::Sell)
    }

    /// 한글 표시 이름.
    pub fn label(&self) -> &'static str {
        match self {
            SignalDirection::StrongBuy => "강력 매수",
            SignalDirection::Buy => "매수",
            SignalDirection::Hold => "관망",
            SignalDirection::Sell => "매도",
            SignalDirection::StrongSell => "강력 매도",
        }
    }
}

impl std::fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalDirection::StrongBuy => write!(f, "STRONG_BUY"),
            SignalDirection::Buy => write!(f, "BUY"),
            SignalDirection::Hold => write!(f, "HOLD"),
            SignalDirection::Sell => write!(f, "SELL"),
            SignalDirection::StrongSell => write!(f, "STRONG_SELL"),
        }
    }
}

/// 개별 지표의 방향 투표.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    /// 매수 (+1)
    Buy,
    /// 중립 (0)
    Neutral,
    /// 매도 (-1)
    Sell,
}

impl Vote {
    /// 투표의 부호 값 (+1, 0, -1).
    pub fn value(&self) -> Decimal {
        match self {
            Vote::Buy => Decimal::ONE,
            Vote::Neutral => Decimal::ZERO,
            Vote::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    /// 중립이 아닌지 확인합니다.
    pub fn is_directional(&self) -> bool {
        !matches!(self, Vote::Neutral)
    }
}

/// 신호에 기여한 지표 또는 패턴.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributingFactor {
    /// 지표 이름 (예: "RSI", "MACD")
    pub name: String,
    /// 방향 투표
    pub vote: Vote,
    /// 가중치
    pub weight: Decimal,
    /// 판단 근거
    pub detail: String,
}

impl ContributingFactor {
    /// 새 기여 요인을 생성합니다.
    pub fn new(
        name: impl Into<String>,
        vote: Vote,
        weight: Decimal,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            vote,
            weight,
            detail: detail.into(),
        }
    }

    /// 가중 기여도 (vote × weight).
    pub fn contribution(&self) -> Decimal {
        self.vote.value() * self.weight
    }
}

/// 지표와 패턴을 융합한 매매 신호.
///
/// 입력만으로 결정되는 값이며 숨은 상태가 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// 신호 기준일
    pub date: NaiveDate,
    /// 매매 의견
    pub direction: SignalDirection,
    /// 신뢰도 (0 ~ 100)
    pub confidence: Decimal,
    /// 가중 점수 (-1 ~ 1)
    pub score: Decimal,
    /// 기여 요인 (가중치 내림차순)
    pub factors: Vec<ContributingFactor>,
    /// 설명 문구
    pub explanation: String,
}

impl Signal {
    /// 방향성 있는 기여 요인만 반환합니다.
    pub fn drivers(&self) -> impl Iterator<Item = &ContributingFactor> {
        self.factors.iter().filter(|f| f.vote.is_directional())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_classification() {
        assert!(SignalDirection::StrongBuy.is_buy());
        assert!(SignalDirection::Buy.is_buy());
        assert!(!SignalDirection::Hold.is_buy());
        assert!(!SignalDirection::Hold.is_sell());
        assert!(SignalDirection::Sell.is_sell());
        assert!(SignalDirection::StrongSell.is_sell());
        assert_eq!(SignalDirection::StrongSell.to_string(), "STRONG_SELL");
    }

    #[test]
    fn test_vote_value() {
        assert_eq!(Vote::Buy.value(), dec!(1));
        assert_eq!(Vote::Sell.value(), dec!(-1));
        assert_eq!(Vote::Neutral.value(), dec!(0));

        let factor = ContributingFactor::new("RSI", Vote::Sell, dec!(0.25), "과매수");
        assert_eq!(factor.contribution(), dec!(-0.25));
    }

    #[test]
    fn test_signal_serialization() {
        let signal = Signal {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            direction: SignalDirection::Buy,
            confidence: dec!(65),
            score: dec!(0.3),
            factors: vec![
                ContributingFactor::new("RSI", Vote::Buy, dec!(0.25), ""),
                ContributingFactor::new("KDJ", Vote::Neutral, dec!(0.15), ""),
            ],
            explanation: String::new(),
        };
        assert_eq!(signal.drivers().count(), 1);

        let json = serde_json::to_string(&signal).unwrap();
        assert!(json.contains("\"direction\":\"buy\""));
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signal);
    }
}
