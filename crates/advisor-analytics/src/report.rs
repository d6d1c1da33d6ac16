//! 리포트 렌더러 경계.
//!
//! 분석 결과는 `AnalysisRecord` 하나로 전달되며, 렌더러는 이 레코드만 보고
//! 문서를 만듭니다. 출력 형식과 무관하게 레코드 구조는 고정입니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use advisor_core::{AdvisorError, AdvisorResult, Signal};

use crate::backtest::BacktestResult;
use crate::indicators::IndicatorSnapshot;
use crate::patterns::PatternOccurrence;

/// 종목별 분석 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// 종목 코드
    pub symbol: String,
    /// 마지막 봉 날짜
    pub latest_date: Option<NaiveDate>,
    /// 마지막 종가
    pub latest_price: Option<Decimal>,
    /// 마지막 봉 신호 (이력이 부족하면 없음)
    pub signal: Option<Signal>,
    /// 최근 구간 캔들 패턴
    pub patterns: Vec<PatternOccurrence>,
    /// 마지막 봉 지표 스냅샷
    pub snapshot: Option<IndicatorSnapshot>,
    /// 백테스트 결과
    pub backtest: BacktestResult,
}

/// 분석 결과 렌더러.
pub trait ReportRenderer: Send + Sync {
    /// 렌더러 이름.
    fn name(&self) -> &str;

    /// 여러 종목의 분석 결과를 하나의 문서로 렌더링합니다.
    fn render(&self, records: &[AnalysisRecord]) -> AdvisorResult<String>;
}

/// JSON 렌더러.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportRenderer {
    pretty: bool,
}

impl JsonReportRenderer {
    /// 새 렌더러 생성.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ReportRenderer for JsonReportRenderer {
    fn name(&self) -> &str {
        "json"
    }

    fn render(&self, records: &[AnalysisRecord]) -> AdvisorResult<String> {
        let output = if self.pretty {
            serde_json::to_string_pretty(records)?
        } else {
            serde_json::to_string(records)?
        };
        Ok(output)
    }
}

/// 터미널용 텍스트 렌더러.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReportRenderer;

impl TextReportRenderer {
    fn render_record(out: &mut String, record: &AnalysisRecord) -> std::fmt::Result {
        writeln!(out, "■ {}", record.symbol)?;
        match (record.latest_date, record.latest_price) {
            (Some(date), Some(price)) => writeln!(out, "  기준일: {}  종가: {:.2}", date, price)?,
            _ => writeln!(out, "  가격 데이터 없음")?,
        }

        match &record.signal {
            Some(signal) => {
                writeln!(
                    out,
                    "  신호: {} (신뢰도 {:.1}, 점수 {:.2})",
                    signal.direction.label(),
                    signal.confidence,
                    signal.score
                )?;
                writeln!(out, "  근거: {}", signal.explanation)?;
            }
            None => writeln!(out, "  신호: 이력 부족")?,
        }

        if let Some(snapshot) = &record.snapshot {
            writeln!(
                out,
                "  RSI {:.1} (과매도 {:.1} / 과매수 {:.1})  MACD {:.4} / {:.4}  KDJ {:.1}/{:.1}/{:.1}  %B {:.2}",
                snapshot.rsi,
                snapshot.dynamic_rsi.oversold,
                snapshot.dynamic_rsi.overbought,
                snapshot.macd.line,
                snapshot.macd.signal,
                snapshot.kdj.k,
                snapshot.kdj.d,
                snapshot.kdj.j,
                snapshot.bollinger.percent_b,
            )?;
        }

        if record.patterns.is_empty() {
            writeln!(out, "  패턴: 없음")?;
        } else {
            let patterns: Vec<String> = record
                .patterns
                .iter()
                .map(|p| format!("{}({}, {:.2})", p.pattern, p.date, p.strength))
                .collect();
            writeln!(out, "  패턴: {}", patterns.join(", "))?;
        }

        let m = &record.backtest.metrics;
        writeln!(
            out,
            "  백테스트 [{}]: 수익률 {:.2}%  거래 {}  승률 {:.1}%  샤프 {:.2}  소르티노 {:.2}  MDD {:.2}%",
            record.backtest.status.describe(),
            m.total_return_pct,
            m.trade_count,
            m.win_rate_pct,
            m.sharpe_ratio,
            m.sortino_ratio,
            m.max_drawdown_pct,
        )
    }
}

impl ReportRenderer for TextReportRenderer {
    fn name(&self) -> &str {
        "text"
    }

    fn render(&self, records: &[AnalysisRecord]) -> AdvisorResult<String> {
        let mut out = String::new();
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            Self::render_record(&mut out, record)
                .map_err(|e| AdvisorError::Internal(format!("리포트 작성 실패: {e}")))?;
        }
        Ok(out)
    }
}
