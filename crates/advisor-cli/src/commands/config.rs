//! 기본 설정 출력 명령어.

use anyhow::{Context, Result};

use advisor_analytics::AnalysisConfig;

/// 기본 설정을 TOML 문자열로 만듭니다.
pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&AnalysisConfig::default()).context("기본 설정 직렬화 실패")
}
