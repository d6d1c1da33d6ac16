//! 호출자 소유 지표 캐시.
//!
//! (종목, 지표 파라미터, 마지막 봉 날짜)를 키로 봉별 스냅샷을 보관합니다.
//! 프로세스 전역 상태가 아니며, 캐시를 가진 쪽이 무효화 시점을 결정합니다.
//!
//! 같은 종목에 더 최신 마지막 봉으로 저장하면 이전 날짜 항목은 자동으로 제거됩니다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use advisor_core::PriceSeries;

use crate::indicators::{IndicatorEngine, IndicatorParams, IndicatorSnapshot};

/// 캐시된 봉별 스냅샷.
pub type SnapshotSeries = Arc<Vec<Option<IndicatorSnapshot>>>;

/// 캐시 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// 종목 코드
    pub symbol: String,
    /// 지표 파라미터 지문
    pub params: String,
    /// 마지막 봉 날짜
    pub last_bar_date: NaiveDate,
}

impl CacheKey {
    /// 새 캐시 키 생성.
    pub fn new(symbol: impl Into<String>, params: &IndicatorParams, last_bar_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            params: Self::fingerprint(params),
            last_bar_date,
        }
    }

    /// 시계열의 마지막 봉 기준 키. 빈 시계열이면 `None`.
    pub fn for_series(series: &PriceSeries, params: &IndicatorParams) -> Option<Self> {
        series
            .last_date()
            .map(|date| Self::new(series.symbol(), params, date))
    }

    fn fingerprint(params: &IndicatorParams) -> String {
        serde_json::to_string(params).unwrap_or_else(|_| format!("{params:?}"))
    }
}

/// 캐시 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// 적중 횟수
    pub hits: u64,
    /// 미스 횟수
    pub misses: u64,
    /// 오래된 항목 제거 횟수
    pub evictions: u64,
    /// 현재 항목 수
    pub entries: usize,
}

impl CacheStats {
    /// 적중률 (0 ~ 1). 조회가 없으면 0.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 지표 스냅샷 캐시.
#[derive(Debug, Default)]
pub struct IndicatorCache {
    entries: HashMap<CacheKey, SnapshotSeries>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl IndicatorCache {
    /// 빈 캐시 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 키로 조회합니다.
    pub fn get(&mut self, key: &CacheKey) -> Option<SnapshotSeries> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(Arc::clone(value))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// 항목을 저장합니다.
    ///
    /// 같은 종목의 더 오래된 마지막 봉 날짜 항목은 제거합니다.
    pub fn insert(&mut self, key: CacheKey, value: SnapshotSeries) {
        let before = self.entries.len();
        self.entries
            .retain(|k, _| k.symbol != key.symbol || k.last_bar_date >= key.last_bar_date);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            self.evictions += evicted as u64;
            debug!(symbol = %key.symbol, evicted, "stale indicator cache entries evicted");
        }
        self.entries.insert(key, value);
    }

    /// 캐시에 있으면 반환하고, 없으면 계산 후 저장합니다.
    ///
    /// 빈 시계열은 캐시하지 않습니다.
    pub fn get_or_compute(&mut self, series: &PriceSeries, engine: &IndicatorEngine) -> SnapshotSeries {
        let Some(key) = CacheKey::for_series(series, engine.params()) else {
            return Arc::new(engine.compute(series));
        };

        if let Some(cached) = self.get(&key) {
            return cached;
        }

        let computed = Arc::new(engine.compute(series));
        self.insert(key, Arc::clone(&computed));
        computed
    }

    /// 종목의 모든 항목을 제거하고 제거된 수를 반환합니다.
    pub fn invalidate(&mut self, symbol: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.symbol != symbol);
        before - self.entries.len()
    }

    /// 전체 비우기 (통계는 유지).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 항목 수.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 통계.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::PriceBar;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn series(symbol: &str, len: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..len)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i % 7);
                PriceBar::new(
                    start + chrono::Duration::days(i as i64),
                    close,
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    dec!(1000),
                )
            })
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    #[test]
    fn test_hit_and_miss() {
        let engine = IndicatorEngine::default();
        let mut cache = IndicatorCache::new();
        let s = series("AAA", 60);

        let first = cache.get_or_compute(&s, &engine);
        let second = cache.get_or_compute(&s, &engine);

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_new_bar_evicts_stale_entry() {
        let engine = IndicatorEngine::default();
        let mut cache = IndicatorCache::new();

        cache.get_or_compute(&series("AAA", 60), &engine);
        cache.get_or_compute(&series("BBB", 60), &engine);
        cache.get_or_compute(&series("AAA", 61), &engine);

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.misses, 3);
    }

    #[test]
    fn test_different_params_are_separate_entries() {
        let mut cache = IndicatorCache::new();
        let s = series("AAA", 60);
        let default_engine = IndicatorEngine::default();
        let custom_engine = IndicatorEngine::new(IndicatorParams {
            rsi_period: 7,
            ..Default::default()
        });

        cache.get_or_compute(&s, &default_engine);
        cache.get_or_compute(&s, &custom_engine);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let engine = IndicatorEngine::default();
        let mut cache = IndicatorCache::new();
        cache.get_or_compute(&series("AAA", 40), &engine);
        cache.get_or_compute(&series("BBB", 40), &engine);

        assert_eq!(cache.invalidate("AAA"), 1);
        assert_eq!(cache.invalidate("AAA"), 0);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_empty_series_not_cached() {
        let engine = IndicatorEngine::default();
        let mut cache = IndicatorCache::new();
        let empty = PriceSeries::new("EMPTY", Vec::new()).unwrap();

        let result = cache.get_or_compute(&empty, &engine);
        assert!(result.is_empty());
        assert!(cache.is_empty());
    }
}
