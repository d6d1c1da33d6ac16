//! 백테스팅 모듈
//!
//! 과거 신호를 재생하여 매매를 시뮬레이션하고 성과를 분석합니다.
//!
//! # 주요 구성요소
//!
//! - [`BacktestConfig`]: 백테스트 설정 (초기 자본, 수수료, 슬리피지 등)
//! - [`BacktestEngine`]: 백테스트 실행 엔진
//! - [`BacktestResult`]: 백테스트 결과 (자산 곡선, 거래, 성과 지표)
//! - [`SlippageModel`]: 체결가 조정 모델

pub mod engine;
pub mod slippage;

pub use engine::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestResult, BacktestStatus, EquityPoint,
};
pub use slippage::{SlippageModel, SlippageResult};
