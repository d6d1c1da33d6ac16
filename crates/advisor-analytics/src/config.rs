//! 분석 설정.
//!
//! 지표 기간, 패턴 임계값, 신호 가중치와 구간, 백테스트 비용, 워커 수 등
//! 조정 가능한 값을 한곳에 모읍니다. 모든 필드는 기본값이 있어 부분 설정이 가능합니다.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [indicators]
//! rsi_period = 14
//!
//! [fusion.bands]
//! strong_buy = 80
//!
//! [backtest.slippage]
//! type = "volume_impact"
//! impact = 0.1
//!
//! [batch]
//! workers = 8
//!
//! [watchlist]
//! semis = [{ symbol = "005930", name = "삼성전자" }]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use advisor_core::{load_config, AdvisorResult, LoggingConfig, StaticWatchlist, DEFAULT_ENV_PREFIX};

use crate::backtest::BacktestConfig;
use crate::batch::BatchConfig;
use crate::fusion::FusionConfig;
use crate::indicators::IndicatorParams;
use crate::patterns::PatternParams;

/// 설정 검증 오류.
#[derive(Debug, Error)]
pub enum AnalysisConfigError {
    /// 지표 파라미터 오류
    #[error("지표 설정 오류: {0}")]
    Indicators(#[from] crate::indicators::IndicatorError),

    /// 패턴 파라미터 오류
    #[error("패턴 설정 오류: {0}")]
    Patterns(String),

    /// 신호 융합 설정 오류
    #[error("신호 융합 설정 오류: {0}")]
    Fusion(String),

    /// 백테스트 설정 오류
    #[error(transparent)]
    Backtest(#[from] crate::backtest::BacktestError),

    /// 배치 설정 오류
    #[error("배치 설정 오류: {0}")]
    Batch(String),
}

/// 전체 분석 설정.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// 로깅
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 지표 파라미터
    #[serde(default)]
    pub indicators: IndicatorParams,
    /// 패턴 파라미터
    #[serde(default)]
    pub patterns: PatternParams,
    /// 신호 융합
    #[serde(default)]
    pub fusion: FusionConfig,
    /// 백테스트
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// 배치 실행
    #[serde(default)]
    pub batch: BatchConfig,
    /// 관심종목 그룹
    #[serde(default)]
    pub watchlist: StaticWatchlist,
}

impl AnalysisConfig {
    /// TOML 파일과 `ADVISOR__` 환경 변수에서 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> AdvisorResult<Self> {
        load_config(path, DEFAULT_ENV_PREFIX)
    }

    /// 모든 하위 설정 검증.
    pub fn validate(&self) -> Result<(), AnalysisConfigError> {
        self.indicators.validate()?;
        self.patterns
            .validate()
            .map_err(AnalysisConfigError::Patterns)?;
        self.fusion.validate().map_err(AnalysisConfigError::Fusion)?;
        self.backtest.validate()?;
        self.batch.validate().map_err(AnalysisConfigError::Batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::SlippageModel;
    use advisor_core::{LogFormat, WatchlistStore};
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("advisor-analytics-{}-{}.toml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_default_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml() {
        let path = write_temp(
            "partial",
            r#"
[logging]
level = "debug"
format = "json"

[indicators]
rsi_period = 10

[fusion.bands]
strong_buy = 80

[backtest]
initial_capital = 5000000

[backtest.slippage]
type = "fixed"
rate = 0.001

[batch]
workers = 2

[watchlist]
semis = [{ symbol = "005930", name = "삼성전자" }, { symbol = "000660" }]
"#,
        );

        let config = AnalysisConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.indicators.rsi_period, 10);
        assert_eq!(config.indicators.macd.slow_period, 26);
        assert_eq!(config.fusion.bands.strong_buy, dec!(80));
        assert_eq!(config.fusion.bands.buy, dec!(60));
        assert_eq!(config.backtest.initial_capital, dec!(5000000));
        assert_eq!(config.backtest.slippage, SlippageModel::fixed(dec!(0.001)));
        assert_eq!(config.batch.workers, 2);
        assert_eq!(config.watchlist.symbols("semis").unwrap().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_reports_section() {
        let mut config = AnalysisConfig::default();
        config.batch.workers = 0;
        assert!(matches!(config.validate(), Err(AnalysisConfigError::Batch(_))));

        let mut config = AnalysisConfig::default();
        config.indicators.rsi_period = 0;
        assert!(matches!(
            config.validate(),
            Err(AnalysisConfigError::Indicators(_))
        ));

        let mut config = AnalysisConfig::default();
        config.backtest.position_size_pct = dec!(0);
        assert!(matches!(
            config.validate(),
            Err(AnalysisConfigError::Backtest(_))
        ));
    }

    #[test]
    fn test_serializes_to_toml() {
        let toml = toml::to_string_pretty(&AnalysisConfig::default()).unwrap();
        assert!(toml.contains("[indicators]"));
        assert!(toml.contains("[backtest.slippage]"));
    }
}
