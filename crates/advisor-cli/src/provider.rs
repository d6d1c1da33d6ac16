//! CSV 디렉토리 기반 가격 데이터 제공자.
//!
//! `<data_dir>/<SYMBOL>.csv` 파일을 읽습니다. 헤더는 `date,open,high,low,close,volume`이며
//! 거래량 칸이 비어 있거나 열이 없으면 거래량 정보 없음(0)으로 처리합니다.
//!
//! ```text
//! date,open,high,low,close,volume
//! 2024-01-02,78200,79800,78200,79600,17142847
//! 2024-01-03,78500,78800,77000,77000,
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use advisor_core::{AdvisorError, AdvisorResult, PriceBar, PriceDataProvider, PriceSeries};

/// CSV 한 행.
#[derive(Debug, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    volume: Option<Decimal>,
}

impl From<CsvBar> for PriceBar {
    fn from(row: CsvBar) -> Self {
        PriceBar::new(
            row.date,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume.unwrap_or(Decimal::ZERO),
        )
    }
}

/// CSV 가격 데이터 제공자.
#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    data_dir: PathBuf,
}

impl CsvPriceProvider {
    /// 데이터 디렉토리로 생성.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// 종목의 CSV 파일 경로.
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol))
    }

    /// CSV 내용을 시계열로 파싱합니다.
    pub fn parse(symbol: &str, content: &[u8]) -> AdvisorResult<PriceSeries> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content);

        let mut bars = Vec::new();
        for (line, row) in reader.deserialize::<CsvBar>().enumerate() {
            let row = row.map_err(|e| {
                AdvisorError::MalformedInput(format!("{} CSV {}행 파싱 실패: {}", symbol, line + 2, e))
            })?;
            bars.push(PriceBar::from(row));
        }

        PriceSeries::new(symbol, bars)
    }

    fn ensure_exists(path: &Path, symbol: &str) -> AdvisorResult<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(AdvisorError::Data(format!(
                "종목 데이터 없음: {} ({})",
                symbol,
                path.display()
            )))
        }
    }
}

#[async_trait]
impl PriceDataProvider for CsvPriceProvider {
    async fn fetch_series(&self, symbol: &str) -> AdvisorResult<PriceSeries> {
        let path = self.path_for(symbol);
        Self::ensure_exists(&path, symbol)?;

        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| AdvisorError::Data(format!("{} 읽기 실패: {}", path.display(), e)))?;

        let series = Self::parse(symbol, &content)?;
        debug!(symbol, bars = series.len(), path = %path.display(), "CSV 시계열 로드");
        Ok(series)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("advisor-cli-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_with_missing_volume() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,100,105,99,104,1500\n\
                   2024-01-03, 104 ,106,103,105.5,\n";
        let series = CsvPriceProvider::parse("AAA", csv.as_bytes()).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].volume, dec!(1500));
        assert_eq!(series.bars()[1].open, dec!(104));
        assert_eq!(series.bars()[1].close, dec!(105.5));
        assert_eq!(series.bars()[1].volume, Decimal::ZERO);
    }

    #[test]
    fn test_parse_without_volume_column() {
        let csv = "date,open,high,low,close\n2024-01-02,10,11,9,10.5\n";
        let series = CsvPriceProvider::parse("BBB", csv.as_bytes()).unwrap();
        assert!(!series.has_volume());
    }

    #[test]
    fn test_parse_errors() {
        let bad_number = "date,open,high,low,close,volume\n2024-01-02,abc,11,9,10,1\n";
        let err = CsvPriceProvider::parse("X", bad_number.as_bytes()).unwrap_err();
        assert!(err.is_precondition());

        let unordered = "date,open,high,low,close,volume\n\
                         2024-01-03,10,11,9,10,1\n\
                         2024-01-02,10,11,9,10,1\n";
        let err = CsvPriceProvider::parse("X", unordered.as_bytes()).unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_fetch_series_from_directory() {
        let dir = temp_dir("fetch");
        std::fs::write(
            dir.join("005930.csv"),
            "date,open,high,low,close,volume\n2024-01-02,78200,79800,78200,79600,17142847\n",
        )
        .unwrap();

        let provider = CsvPriceProvider::new(&dir);
        let series = provider.fetch_series("005930").await.unwrap();
        assert_eq!(series.symbol(), "005930");
        assert_eq!(series.last().unwrap().close, dec!(79600));

        let missing = provider.fetch_series("NOPE").await.unwrap_err();
        assert!(missing.is_retryable());

        std::fs::remove_dir_all(&dir).ok();
    }
}
