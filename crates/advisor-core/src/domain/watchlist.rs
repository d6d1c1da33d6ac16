//! 관심종목 그룹.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::WatchlistStore;

/// 관심종목 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// 종목 코드/심볼
    pub symbol: String,
    /// 종목명
    #[serde(default)]
    pub name: String,
}

impl WatchlistEntry {
    /// 새 항목을 생성합니다.
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// 설정에서 로드하는 정적 관심종목 저장소.
///
/// 그룹은 이름 순으로 정렬되어 보관됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticWatchlist {
    groups: BTreeMap<String, Vec<WatchlistEntry>>,
}

impl StaticWatchlist {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 그룹을 추가합니다 (같은 이름이면 교체).
    pub fn with_group(mut self, name: impl Into<String>, entries: Vec<WatchlistEntry>) -> Self {
        self.groups.insert(name.into(), entries);
        self
    }

    /// 그룹이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl WatchlistStore for StaticWatchlist {
    fn groups(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    fn symbols(&self, group: &str) -> Option<Vec<WatchlistEntry>> {
        self.groups.get(group).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_watchlist() {
        let store = StaticWatchlist::new()
            .with_group(
                "semis",
                vec![
                    WatchlistEntry::new("005930", "삼성전자"),
                    WatchlistEntry::new("000660", "SK하이닉스"),
                ],
            )
            .with_group("etf", vec![WatchlistEntry::new("SPY", "")]);

        assert_eq!(store.groups(), vec!["etf".to_string(), "semis".to_string()]);
        assert_eq!(store.symbols("semis").map(|s| s.len()), Some(2));
        assert!(store.symbols("missing").is_none());
    }

    #[test]
    fn test_watchlist_deserialize() {
        let json = r#"{"kr": [{"symbol": "005930", "name": "삼성전자"}, {"symbol": "035720"}]}"#;
        let store: StaticWatchlist = serde_json::from_str(json).unwrap();
        let entries = store.symbols("kr").unwrap();
        assert_eq!(entries[1].symbol, "035720");
        assert_eq!(entries[1].name, "");
    }
}
