//! # Advisor Core
//!
//! 주식 분석 어드바이저의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 분석 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 일봉 가격 데이터 (`PriceBar`, `PriceSeries`)
//! - 매매 신호 및 기여 요인
//! - 거래 기록
//! - 외부 협력자 trait (가격 데이터 제공자, 관심종목 저장소)
//! - 설정 관리 및 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
