//! 외부 협력자 trait.
//!
//! 코어는 데이터 조회와 관심종목 관리를 구현하지 않습니다.
//! 재시도, 요청 한도 제어는 구현체의 책임입니다.

use async_trait::async_trait;

use super::{PriceSeries, WatchlistEntry};
use crate::error::AdvisorResult;

/// 가격 데이터 제공자.
///
/// 종목별로 날짜 오름차순 일봉 시계열을 제공합니다.
///
/// # 구현 예시
///
/// ```rust,ignore
/// #[async_trait]
/// impl PriceDataProvider for CsvProvider {
///     async fn fetch_series(&self, symbol: &str) -> AdvisorResult<PriceSeries> {
///         let bars = read_csv(self.path_for(symbol))?;
///         PriceSeries::new(symbol, bars)
///     }
/// }
/// ```
#[async_trait]
pub trait PriceDataProvider: Send + Sync {
    /// 종목의 일봉 시계열 조회.
    ///
    /// # Errors
    ///
    /// - `AdvisorError::Data`: 조회 실패, 종목 없음
    /// - `AdvisorError::MalformedInput`: 원천 데이터가 시계열 전제조건 위반
    async fn fetch_series(&self, symbol: &str) -> AdvisorResult<PriceSeries>;

    /// 제공자 이름 (로그용).
    fn name(&self) -> &str {
        "price-provider"
    }
}

/// 관심종목 그룹 저장소.
pub trait WatchlistStore: Send + Sync {
    /// 그룹 이름 목록.
    fn groups(&self) -> Vec<String>;

    /// 그룹에 속한 종목 목록. 그룹이 없으면 `None`.
    fn symbols(&self, group: &str) -> Option<Vec<WatchlistEntry>>;
}
