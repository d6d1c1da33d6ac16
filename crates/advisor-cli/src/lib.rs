//! 주식 분석 어드바이저 CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - CSV 디렉토리 가격 데이터 제공자
//! - 다종목 배치 분석과 리포트 출력
//! - 단일 종목 백테스트
//! - 기본 설정 출력

pub mod commands;
pub mod provider;

pub use provider::CsvPriceProvider;
