//! 분석 시스템의 에러 타입.
//!
//! 지표/패턴/신호/백테스트 계산은 정상 입력에 대해 항상 값을 반환하므로
//! 이 모듈의 에러는 주로 입력 전제조건 위반과 외부 협력자 실패를 표현합니다.

use thiserror::Error;

/// 핵심 분석 에러.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// 잘못된 입력 데이터 (날짜 역순, 음수 가격 등)
    #[error("잘못된 입력 데이터: {0}")]
    MalformedInput(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터 제공자 에러
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 배치 작업 취소
    #[error("작업 취소됨: {0}")]
    Cancelled(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 분석 작업을 위한 Result 타입.
pub type AdvisorResult<T> = Result<T, AdvisorError>;

impl AdvisorError {
    /// 호출자의 입력 전제조건 위반인지 확인합니다.
    pub fn is_precondition(&self) -> bool {
        matches!(self, AdvisorError::MalformedInput(_))
    }

    /// 데이터 제공자 수준의 재시도로 해결될 수 있는 에러인지 확인합니다.
    ///
    /// 코어는 재시도하지 않습니다. 재시도 여부는 호출자가 결정합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdvisorError::Data(_))
    }
}

impl From<serde_json::Error> for AdvisorError {
    fn from(err: serde_json::Error) -> Self {
        AdvisorError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for AdvisorError {
    fn from(err: config::ConfigError) -> Self {
        AdvisorError::Config(err.to_string())
    }
}
