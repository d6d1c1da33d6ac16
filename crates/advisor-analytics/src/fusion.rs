//! 다중 지표 신호 융합.
//!
//! 최신 지표 스냅샷과 최근 캔들 패턴을 받아 하나의 매매 신호를 만듭니다.
//!
//! 1. 지표별 규칙으로 방향 투표 (매수 +1, 중립 0, 매도 -1)
//! 2. 가중 평균 점수 = Σ(투표 × 가중치) / Σ가중치 ∈ [-1, 1]
//! 3. 신뢰도 = (점수 + 1) / 2 × 100
//! 4. 신뢰도 구간으로 매매 의견 결정
//!
//! 상승 추세(MACD 라인 > 0, 단기 EMA가 장기 EMA 위)에서는 과매수 오실레이터들이
//! 한꺼번에 매도로 돌아서도 신뢰도가 매도 구간 중앙값 아래로 내려가지 않습니다.
//! 추세 보정은 `trend_guard`로 끌 수 있습니다.
//!
//! 입력만으로 결과가 정해지는 순수 함수이므로 과거 임의 시점에 재생할 수 있습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use advisor_core::{clamp_decimal, safe_div, ContributingFactor, Signal, SignalDirection, Vote};

use crate::indicators::IndicatorSnapshot;
use crate::patterns::{net_pattern_strength, PatternOccurrence};

/// 지표별 가중치.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionWeights {
    /// RSI (동적 임계값)
    #[serde(default = "default_rsi_weight")]
    pub rsi: Decimal,
    /// MACD 히스토그램 교차
    #[serde(default = "default_macd_weight")]
    pub macd_cross: Decimal,
    /// MACD 모멘텀 (라인과 히스토그램 부호 일치)
    #[serde(default = "default_macd_momentum_weight")]
    pub macd_momentum: Decimal,
    /// KDJ
    #[serde(default = "default_kdj_weight")]
    pub kdj: Decimal,
    /// 볼린저 밴드 이탈
    #[serde(default = "default_bollinger_weight")]
    pub bollinger: Decimal,
    /// 캔들 패턴
    #[serde(default = "default_pattern_weight")]
    pub pattern: Decimal,
}

fn default_rsi_weight() -> Decimal {
    dec!(0.25)
}
fn default_macd_weight() -> Decimal {
    dec!(0.20)
}
fn default_macd_momentum_weight() -> Decimal {
    dec!(0.10)
}
fn default_kdj_weight() -> Decimal {
    dec!(0.15)
}
fn default_bollinger_weight() -> Decimal {
    dec!(0.20)
}
fn default_pattern_weight() -> Decimal {
    dec!(0.10)
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            rsi: default_rsi_weight(),
            macd_cross: default_macd_weight(),
            macd_momentum: default_macd_momentum_weight(),
            kdj: default_kdj_weight(),
            bollinger: default_bollinger_weight(),
            pattern: default_pattern_weight(),
        }
    }
}

impl FusionWeights {
    fn all(&self) -> [Decimal; 6] {
        [
            self.rsi,
            self.macd_cross,
            self.macd_momentum,
            self.kdj,
            self.bollinger,
            self.pattern,
        ]
    }

    /// 가중치 합.
    pub fn total(&self) -> Decimal {
        self.all().iter().sum()
    }
}

/// 신뢰도 → 매매 의견 구간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBands {
    /// 이 값 이상이면 강력 매수 (기본: 75)
    #[serde(default = "default_strong_buy")]
    pub strong_buy: Decimal,
    /// 이 값 이상이면 매수 (기본: 60)
    #[serde(default = "default_buy")]
    pub buy: Decimal,
    /// 이 값 이하이면 매도 (기본: 40)
    #[serde(default = "default_sell")]
    pub sell: Decimal,
    /// 이 값 이하이면 강력 매도 (기본: 25)
    #[serde(default = "default_strong_sell")]
    pub strong_sell: Decimal,
}

fn default_strong_buy() -> Decimal {
    dec!(75)
}
fn default_buy() -> Decimal {
    dec!(60)
}
fn default_sell() -> Decimal {
    dec!(40)
}
fn default_strong_sell() -> Decimal {
    dec!(25)
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            strong_buy: default_strong_buy(),
            buy: default_buy(),
            sell: default_sell(),
            strong_sell: default_strong_sell(),
        }
    }
}

impl ConfidenceBands {
    /// 신뢰도를 매매 의견으로 변환합니다.
    pub fn classify(&self, confidence: Decimal) -> SignalDirection {
        if confidence >= self.strong_buy {
            SignalDirection::StrongBuy
        } else if confidence >= self.buy {
            SignalDirection::Buy
        } else if confidence <= self.strong_sell {
            SignalDirection::StrongSell
        } else if confidence <= self.sell {
            SignalDirection::Sell
        } else {
            SignalDirection::Hold
        }
    }
}

/// 신호 융합 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// 지표별 가중치
    #[serde(default)]
    pub weights: FusionWeights,
    /// 신뢰도 구간
    #[serde(default)]
    pub bands: ConfidenceBands,
    /// KDJ 과매도 기준 (기본: 20)
    #[serde(default = "default_kdj_oversold")]
    pub kdj_oversold: Decimal,
    /// KDJ 과매수 기준 (기본: 80)
    #[serde(default = "default_kdj_overbought")]
    pub kdj_overbought: Decimal,
    /// 상승 추세에서 강력 매도 방지 (기본: true)
    #[serde(default = "default_trend_guard")]
    pub trend_guard: bool,
}

fn default_kdj_oversold() -> Decimal {
    dec!(20)
}
fn default_kdj_overbought() -> Decimal {
    dec!(80)
}
fn default_trend_guard() -> bool {
    true
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            bands: ConfidenceBands::default(),
            kdj_oversold: default_kdj_oversold(),
            kdj_overbought: default_kdj_overbought(),
            trend_guard: default_trend_guard(),
        }
    }
}

impl FusionConfig {
    /// 설정 검증.
    pub fn validate(&self) -> Result<(), String> {
        if self.weights.all().iter().any(|w| *w < Decimal::ZERO) {
            return Err("가중치는 음수일 수 없습니다".to_string());
        }
        if self.weights.total().is_zero() {
            return Err("가중치 합이 0입니다".to_string());
        }

        let b = &self.bands;
        let ordered = Decimal::ZERO <= b.strong_sell
            && b.strong_sell < b.sell
            && b.sell < b.buy
            && b.buy < b.strong_buy
            && b.strong_buy <= dec!(100);
        if !ordered {
            return Err(format!(
                "신뢰도 구간 순서가 잘못되었습니다: {} < {} < {} < {}",
                b.strong_sell, b.sell, b.buy, b.strong_buy
            ));
        }

        if self.kdj_oversold >= self.kdj_overbought {
            return Err("KDJ 과매도 기준은 과매수 기준보다 작아야 합니다".to_string());
        }
        Ok(())
    }
}

/// 신호 융합기.
#[derive(Debug, Clone, Default)]
pub struct SignalFusion {
    config: FusionConfig,
}

impl SignalFusion {
    /// 새로운 융합기 생성.
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// 설정.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// 스냅샷과 패턴을 하나의 신호로 융합합니다.
    ///
    /// # 인자
    /// * `snapshot` - 평가 시점 지표 스냅샷
    /// * `patterns` - 평가 시점까지의 최근 패턴
    /// * `close` - 평가 시점 종가
    pub fn fuse(
        &self,
        snapshot: &IndicatorSnapshot,
        patterns: &[PatternOccurrence],
        close: Decimal,
    ) -> Signal {
        let weights = &self.config.weights;

        let mut factors = vec![
            self.rsi_factor(snapshot, weights.rsi),
            self.macd_cross_factor(snapshot, weights.macd_cross),
            self.macd_momentum_factor(snapshot, weights.macd_momentum),
            self.kdj_factor(snapshot, weights.kdj),
            self.bollinger_factor(snapshot, close, weights.bollinger),
            self.pattern_factor(patterns, weights.pattern),
        ];
        // 가중치 내림차순, 같은 가중치는 정의 순서 유지
        factors.sort_by(|a, b| b.weight.cmp(&a.weight));

        let weighted: Decimal = factors.iter().map(ContributingFactor::contribution).sum();
        let mut score = clamp_decimal(
            safe_div(weighted, weights.total(), Decimal::ZERO),
            Decimal::NEGATIVE_ONE,
            Decimal::ONE,
        );

        let guarded = self.config.trend_guard
            && snapshot.macd.line > Decimal::ZERO
            && score < self.uptrend_score_floor();
        if guarded {
            score = self.uptrend_score_floor();
        }

        let confidence = Self::confidence_from_score(score);
        let direction = self.config.bands.classify(confidence);
        let mut explanation = Self::explain(direction, confidence, &factors);
        if guarded {
            explanation.push_str(" [상승 추세 보정]");
        }

        Signal {
            date: snapshot.date,
            direction,
            confidence,
            score,
            factors,
            explanation,
        }
    }

    /// 상승 추세에서 허용하는 최저 점수 (매도 구간 중앙값에 해당).
    fn uptrend_score_floor(&self) -> Decimal {
        let bands = &self.config.bands;
        let confidence = (bands.strong_sell + bands.sell) / Decimal::TWO;
        confidence / dec!(50) - Decimal::ONE
    }

    /// 점수 [-1, 1] → 신뢰도 [0, 100].
    pub fn confidence_from_score(score: Decimal) -> Decimal {
        let confidence = (score + Decimal::ONE) / Decimal::TWO * dec!(100);
        clamp_decimal(confidence.round_dp(2), Decimal::ZERO, dec!(100))
    }

    fn rsi_factor(&self, snapshot: &IndicatorSnapshot, weight: Decimal) -> ContributingFactor {
        let rsi = snapshot.rsi;
        let threshold = &snapshot.dynamic_rsi;
        let (vote, detail) = if rsi < threshold.oversold {
            (
                Vote::Buy,
                format!("과매도 ({:.1} < {:.1})", rsi, threshold.oversold),
            )
        } else if rsi > threshold.overbought {
            (
                Vote::Sell,
                format!("과매수 ({:.1} > {:.1})", rsi, threshold.overbought),
            )
        } else {
            (Vote::Neutral, format!("중립 ({:.1})", rsi))
        };
        ContributingFactor::new("RSI", vote, weight, detail)
    }

    fn macd_cross_factor(&self, snapshot: &IndicatorSnapshot, weight: Decimal) -> ContributingFactor {
        let macd = &snapshot.macd;
        let (vote, detail) = if macd.crossed_up() {
            (Vote::Buy, "히스토그램 양전환 (골든크로스)".to_string())
        } else if macd.crossed_down() {
            (Vote::Sell, "히스토그램 음전환 (데드크로스)".to_string())
        } else {
            (Vote::Neutral, format!("교차 없음 (히스토그램 {:.4})", macd.histogram))
        };
        ContributingFactor::new("MACD", vote, weight, detail)
    }

    fn macd_momentum_factor(
        &self,
        snapshot: &IndicatorSnapshot,
        weight: Decimal,
    ) -> ContributingFactor {
        let macd = &snapshot.macd;
        let (vote, detail) = if macd.line > Decimal::ZERO && macd.histogram > Decimal::ZERO {
            (Vote::Buy, "상승 모멘텀".to_string())
        } else if macd.line < Decimal::ZERO && macd.histogram < Decimal::ZERO {
            (Vote::Sell, "하락 모멘텀".to_string())
        } else {
            (Vote::Neutral, "모멘텀 혼조".to_string())
        };
        ContributingFactor::new("MACD 모멘텀", vote, weight, detail)
    }

    fn kdj_factor(&self, snapshot: &IndicatorSnapshot, weight: Decimal) -> ContributingFactor {
        let kdj = &snapshot.kdj;
        let (vote, detail) = if kdj.k < self.config.kdj_oversold && kdj.d < self.config.kdj_oversold
        {
            (
                Vote::Buy,
                format!("과매도 (K {:.1}, D {:.1})", kdj.k, kdj.d),
            )
        } else if kdj.k > self.config.kdj_overbought && kdj.d > self.config.kdj_overbought {
            (
                Vote::Sell,
                format!("과매수 (K {:.1}, D {:.1})", kdj.k, kdj.d),
            )
        } else {
            (Vote::Neutral, format!("중립 (K {:.1}, D {:.1})", kdj.k, kdj.d))
        };
        ContributingFactor::new("KDJ", vote, weight, detail)
    }

    fn bollinger_factor(
        &self,
        snapshot: &IndicatorSnapshot,
        close: Decimal,
        weight: Decimal,
    ) -> ContributingFactor {
        let bb = &snapshot.bollinger;
        let (vote, detail) = if close < bb.lower {
            (Vote::Buy, format!("하단 밴드 이탈 ({:.2} < {:.2})", close, bb.lower))
        } else if close > bb.upper {
            (Vote::Sell, format!("상단 밴드 돌파 ({:.2} > {:.2})", close, bb.upper))
        } else {
            (Vote::Neutral, format!("밴드 내 (%B {:.2})", bb.percent_b))
        };
        ContributingFactor::new("볼린저 밴드", vote, weight, detail)
    }

    fn pattern_factor(&self, patterns: &[PatternOccurrence], weight: Decimal) -> ContributingFactor {
        let net = net_pattern_strength(patterns);
        let names = || {
            patterns
                .iter()
                .map(|p| p.pattern.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let (vote, detail) = if net > Decimal::ZERO {
            (Vote::Buy, format!("강세 패턴 ({})", names()))
        } else if net < Decimal::ZERO {
            (Vote::Sell, format!("약세 패턴 ({})", names()))
        } else if patterns.is_empty() {
            (Vote::Neutral, "패턴 없음".to_string())
        } else {
            (Vote::Neutral, format!("중립 패턴 ({})", names()))
        };
        ContributingFactor::new("캔들 패턴", vote, weight, detail)
    }

    fn explain(
        direction: SignalDirection,
        confidence: Decimal,
        factors: &[ContributingFactor],
    ) -> String {
        let drivers: Vec<String> = factors
            .iter()
            .filter(|f| f.vote.is_directional())
            .map(|f| format!("{} {}", f.name, f.detail))
            .collect();

        if drivers.is_empty() {
            format!("{} (신뢰도 {:.1}): 뚜렷한 신호 없음", direction.label(), confidence)
        } else {
            format!(
                "{} (신뢰도 {:.1}): {}",
                direction.label(),
                confidence,
                drivers.join(", ")
            )
        }
    }
}
