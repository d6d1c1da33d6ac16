//! 성과 분석 모듈
//!
//! 백테스트 결과의 성과를 측정하기 위한 도구를 제공합니다.
//!
//! # 모듈 구성
//!
//! - [`metrics`]: 성과 지표 계산 (샤프비율, 소르티노비율, 최대낙폭, 승률 등)

pub mod metrics;

pub use metrics::*;
