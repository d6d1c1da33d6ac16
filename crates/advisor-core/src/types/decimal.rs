//! 정밀한 금융 계산을 위한 Decimal 유틸리티.
//!
//! 모든 가격/지표 계산은 `Decimal`로 수행되므로 같은 입력에 대해
//! 항상 비트 단위로 동일한 결과를 얻습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 거래량/수량 타입.
pub type Quantity = Decimal;

/// 제곱근 계산 허용 오차.
const SQRT_PRECISION: Decimal = dec!(0.0000000001);

/// 뉴턴 반복 최대 횟수.
const SQRT_MAX_ITERATIONS: usize = 64;

/// Decimal 제곱근 (뉴턴 방법).
///
/// 0 이하의 값은 0을 반환합니다.
pub fn decimal_sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    // 1 미만은 제곱근이 원래 값보다 크므로 1에서 시작
    let mut guess = if value > Decimal::ONE {
        value / Decimal::TWO
    } else {
        Decimal::ONE
    };

    for _ in 0..SQRT_MAX_ITERATIONS {
        let next_guess = (guess + value / guess) / Decimal::TWO;
        if (next_guess - guess).abs() < SQRT_PRECISION {
            return next_guess;
        }
        guess = next_guess;
    }

    guess
}

/// 값을 `[min, max]` 범위로 제한합니다.
pub fn clamp_decimal(value: Decimal, min: Decimal, max: Decimal) -> Decimal {
    value.max(min).min(max)
}

/// 0 나눗셈을 방지한 나눗셈. 분모가 0이면 `fallback`을 반환합니다.
pub fn safe_div(numerator: Decimal, denominator: Decimal, fallback: Decimal) -> Decimal {
    if denominator.is_zero() {
        fallback
    } else {
        numerator / denominator
    }
}

/// 산술 평균. 빈 슬라이스는 0입니다.
///
/// 합계가 `Decimal` 범위를 넘으면 각 값을 개수로 먼저 나눈 뒤 더합니다.
pub fn decimal_mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let count = Decimal::from(values.len());
    match values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
    {
        Some(sum) => sum / count,
        None => values.iter().map(|v| *v / count).sum(),
    }
}
