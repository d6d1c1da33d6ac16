//! CLI 명령어 구현 모듈.

pub mod analyze;
pub mod backtest;
pub mod config;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use advisor_analytics::AnalysisConfig;
use advisor_core::{load_config_from_env, DEFAULT_ENV_PREFIX};

/// 분석 설정을 로드하고 검증합니다.
///
/// 파일이 없으면 기본값에 `ADVISOR__` 환경 변수만 적용합니다.
pub fn load_analysis_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("설정 파일을 찾을 수 없습니다: {}", path.display());
            }
            let config = AnalysisConfig::load(path)
                .with_context(|| format!("설정 파일 로드 실패: {}", path.display()))?;
            info!(path = %path.display(), "설정 파일 로드");
            config
        }
        None => load_config_from_env::<AnalysisConfig>(DEFAULT_ENV_PREFIX)
            .context("환경 변수 설정 로드 실패")?,
    };

    config.validate().context("설정 검증 실패")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_is_error() {
        let err = load_analysis_config(Some(Path::new("/nonexistent/advisor.toml"))).unwrap_err();
        assert!(err.to_string().contains("설정 파일"));
    }

    #[test]
    fn test_default_config_without_file() {
        let config = load_analysis_config(None).unwrap();
        assert_eq!(config.batch.workers, 4);
    }
}
