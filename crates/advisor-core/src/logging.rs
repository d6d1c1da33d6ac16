//! tracing 기반 로깅 초기화.
//!
//! 리포트는 stdout으로 나가므로 모든 로그는 stderr에 기록합니다.
//! 배치 분석 중에는 워커 스레드 ID를 붙여 종목별 흐름을 구분할 수 있습니다.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{
    filter::ParseError, fmt, layer::SubscriberExt, registry::Registry,
    util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 색상이 포함된 여러 줄 형식 (개발용)
    #[default]
    Pretty,
    /// 로그 수집기용 JSON
    Json,
    /// 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

/// 로깅 초기화 오류.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("알 수 없는 로그 형식: {0}")]
    UnknownFormat(String),

    #[error("로그 필터 파싱 실패: {0}")]
    Filter(#[from] ParseError),

    #[error("전역 subscriber가 이미 설정됨: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 레벨 필터 (예: "info", "advisor_analytics=debug")
    pub level: String,
    pub format: LogFormat,
    /// 워커 스레드 ID 출력 여부
    pub thread_ids: bool,
    /// 파일명/줄 번호 출력 여부
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            thread_ids: false,
            source_location: false,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    /// 필터를 만듭니다. `RUST_LOG`가 있으면 설정값보다 우선합니다.
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(&self.level)?),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_ids(self.thread_ids)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match self.format {
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Json => base.json().boxed(),
            LogFormat::Compact => base.compact().boxed(),
        }
    }
}

/// 전역 로깅을 초기화합니다. 프로세스당 한 번만 성공합니다.
///
/// ```no_run
/// use advisor_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("debug").with_format(LogFormat::Json))?;
/// # Ok::<(), advisor_core::logging::LoggingError>(())
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), LoggingError> {
    let filter = config.env_filter()?;

    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(filter)
        .try_init()?;

    tracing::debug!(format = ?config.format, level = %config.level, "로깅 초기화 완료");
    Ok(())
}

/// 종목(및 선택적으로 단계) 필드가 붙은 분석 span을 만듭니다.
#[macro_export]
macro_rules! analysis_span {
    ($name:expr, $symbol:expr) => {
        tracing::info_span!($name, symbol = %$symbol)
    };
    ($name:expr, $symbol:expr, $stage:expr) => {
        tracing::info_span!($name, symbol = %$symbol, stage = %$stage)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(LoggingError::UnknownFormat(s)) if s == "xml"
        ));
    }

    #[test]
    fn test_invalid_level_is_filter_error() {
        std::env::remove_var("RUST_LOG");
        let config = LogConfig::new("advisor=notalevel");
        assert!(matches!(config.env_filter(), Err(LoggingError::Filter(_))));
    }

    #[test]
    fn test_analysis_span_without_subscriber() {
        let span = analysis_span!("analyze", "005930", "indicators");
        let _guard = span.enter();
    }
}
