//! 설정 관리.
//!
//! 설정 파일(TOML)과 `ADVISOR__` 접두사 환경 변수를 병합하여 로드합니다.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AdvisorResult;
use crate::logging::{LogConfig, LogFormat};

/// 환경 변수 오버라이드 기본 접두사.
pub const DEFAULT_ENV_PREFIX: &str = "ADVISOR";

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default)]
    pub format: LogFormat,
    /// 배치 워커 스레드 ID 출력 여부
    #[serde(default)]
    pub thread_ids: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
            thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// 로깅 초기화용 `LogConfig`로 변환합니다.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig::new(self.level.clone())
            .with_format(self.format)
            .with_thread_ids(self.thread_ids)
    }
}

/// 파일과 환경 변수에서 설정을 로드합니다.
///
/// 환경 변수는 `{prefix}__SECTION__KEY` 형식이며 파일 값을 덮어씁니다.
/// 예: `ADVISOR__BATCH__WORKERS=8`
///
/// # 인자
///
/// * `path` - TOML 설정 파일 경로
/// * `prefix` - 환경 변수 접두사
pub fn load_config<T, P>(path: P, prefix: &str) -> AdvisorResult<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(
            config::Environment::with_prefix(prefix)
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    Ok(config.try_deserialize()?)
}

/// 환경 변수만으로 설정을 로드합니다 (파일 없음).
///
/// 누락된 필드는 `T`의 serde 기본값을 사용합니다.
pub fn load_config_from_env<T>(prefix: &str) -> AdvisorResult<T>
where
    T: DeserializeOwned,
{
    let config = config::Config::builder()
        .add_source(
            config::Environment::with_prefix(prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        logging: LoggingConfig,
        name: String,
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);

        let log = config.to_log_config();
        assert_eq!(log.level, "info");
        assert!(!log.thread_ids);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = std::env::temp_dir().join("advisor_core_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name = \"test\"\n[logging]\nlevel = \"debug\"\nformat = \"json\"").unwrap();

        let sample: Sample = load_config(&path, "ADVISOR_CORE_TEST").unwrap();
        assert_eq!(sample.name, "test");
        assert_eq!(sample.logging.level, "debug");
        assert_eq!(sample.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result: AdvisorResult<Sample> =
            load_config("/nonexistent/advisor.toml", "ADVISOR_CORE_TEST");
        assert!(matches!(result, Err(crate::AdvisorError::Config(_))));
    }
}
