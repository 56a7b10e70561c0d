//! CSV report adapter implementing ReportPort.
//!
//! Writes into one output directory:
//! - `candidates.csv`: entry-qualified scan rows, date ascending, score descending
//! - `report.csv`: every evaluated instrument (only when requested)
//! - `backtest_summary.csv`: one row per instrument
//! - `backtest_trades.csv`: every closed trade

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::config::ScreenConfig;
use crate::domain::error::TwscanError;
use crate::domain::metrics::{BacktestSummary, RunStatus};
use crate::domain::position::Trade;
use crate::domain::scan::{rank_candidates, ScanRecord};
use crate::domain::signal::EntryCondition;
use crate::ports::report_port::ReportPort;

pub const CANDIDATES_FILE: &str = "candidates.csv";
pub const FULL_REPORT_FILE: &str = "report.csv";
pub const SUMMARY_FILE: &str = "backtest_summary.csv";
pub const TRADES_FILE: &str = "backtest_trades.csv";

/// Undefined indicator values become empty cells.
fn defined(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[derive(Debug, serde::Serialize)]
struct ScanRow {
    code: String,
    date: String,
    close: f64,
    volume: f64,
    ema: Option<f64>,
    vol_ma_fast: Option<f64>,
    vol_ma_slow: Option<f64>,
    k: Option<f64>,
    d: Option<f64>,
    adx: Option<f64>,
    macd: Option<f64>,
    macd_signal: Option<f64>,
    macd_hist: Option<f64>,
    atr: Option<f64>,
    trail_ema: Option<f64>,
    close_ma5: Option<f64>,
    above_ema: bool,
    volume_expanding: bool,
    kd_in_range: bool,
    trend_strong: bool,
    macd_bullish: bool,
    conditions_met: String,
    entry: bool,
    inst_sum: Option<f64>,
    inst_positive: bool,
    score: f64,
    suggested_entry: f64,
    suggested_exit: Option<f64>,
    held: bool,
    exit: bool,
    exit_reasons: String,
    exit_reasons_text: String,
}

impl ScanRow {
    fn from_record(record: &ScanRecord, config: &ScreenConfig) -> Self {
        let row = &record.row;
        let c = &record.evaluation.conditions;
        let reasons = record.exit_reasons();
        ScanRow {
            code: record.code.clone(),
            date: row.date.to_string(),
            close: row.close,
            volume: row.volume,
            ema: defined(row.ema),
            vol_ma_fast: defined(row.vol_ma_fast),
            vol_ma_slow: defined(row.vol_ma_slow),
            k: defined(row.k),
            d: defined(row.d),
            adx: defined(row.adx),
            macd: defined(row.macd),
            macd_signal: defined(row.macd_signal),
            macd_hist: defined(row.macd_hist),
            atr: defined(row.atr),
            trail_ema: defined(row.trail_ema),
            close_ma5: defined(row.close_ma5),
            above_ema: c.above_ema,
            volume_expanding: c.volume_expanding,
            kd_in_range: c.kd_in_range,
            trend_strong: c.trend_strong,
            macd_bullish: c.macd_bullish,
            conditions_met: EntryCondition::ALL
                .iter()
                .filter(|&&cond| c.get(cond))
                .map(|cond| cond.label(config.locale))
                .collect::<Vec<_>>()
                .join(", "),
            entry: record.entry(),
            inst_sum: record.evaluation.inst_sum,
            inst_positive: record.evaluation.inst_positive,
            score: record.score(),
            suggested_entry: record.suggested_entry,
            suggested_exit: record.suggested_exit,
            held: record.held,
            exit: record.exit(),
            exit_reasons: reasons.to_string(),
            exit_reasons_text: reasons.describe(config.locale).join("; "),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct SummaryRow<'a> {
    code: &'a str,
    status: &'a str,
    skip_reason: Option<&'a str>,
    initial_equity: f64,
    final_equity: f64,
    total_return: f64,
    cagr: f64,
    win_rate: Option<f64>,
    trade_count: usize,
    avg_win: Option<f64>,
    avg_loss: Option<f64>,
    max_drawdown: f64,
}

impl<'a> From<&'a BacktestSummary> for SummaryRow<'a> {
    fn from(s: &'a BacktestSummary) -> Self {
        SummaryRow {
            code: &s.code,
            status: s.status.label(),
            skip_reason: match &s.status {
                RunStatus::Skipped { reason } => Some(reason.as_str()),
                RunStatus::Completed => None,
            },
            initial_equity: s.initial_equity,
            final_equity: s.final_equity,
            total_return: s.total_return,
            cagr: s.cagr,
            win_rate: s.win_rate,
            trade_count: s.trade_count,
            avg_win: s.avg_win,
            avg_loss: s.avg_loss,
            max_drawdown: s.max_drawdown,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct TradeRow<'a> {
    code: &'a str,
    entry_date: String,
    entry_price: f64,
    exit_date: String,
    exit_price: f64,
    shares: i64,
    exit_reason: String,
    gross_return: f64,
    net_return: f64,
    net_pnl: f64,
    commission: f64,
    holding_days: i64,
    bars_held: usize,
}

impl<'a> From<&'a Trade> for TradeRow<'a> {
    fn from(t: &'a Trade) -> Self {
        TradeRow {
            code: &t.code,
            entry_date: t.entry_date.to_string(),
            entry_price: t.entry_price,
            exit_date: t.exit_date.to_string(),
            exit_price: t.exit_price,
            shares: t.shares,
            exit_reason: t.exit.label(),
            gross_return: t.gross_return,
            net_return: t.net_return,
            net_pnl: t.net_pnl,
            commission: t.commission,
            holding_days: t.holding_days,
            bars_held: t.bars_held,
        }
    }
}

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn write_rows<T, I>(&self, file: &str, rows: I) -> Result<PathBuf, TwscanError>
    where
        T: serde::Serialize,
        I: IntoIterator<Item = T>,
    {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| csv_error(&path, e))?;
        }
        writer.flush()?;
        tracing::info!(path = %path.display(), "report written");
        Ok(path)
    }
}

fn csv_error(path: &Path, err: csv::Error) -> TwscanError {
    TwscanError::Data {
        reason: format!("failed to write {}: {}", path.display(), err),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_scan(
        &self,
        records: &[ScanRecord],
        config: &ScreenConfig,
        full: bool,
    ) -> Result<(), TwscanError> {
        let candidates = rank_candidates(records);
        self.write_rows(
            CANDIDATES_FILE,
            candidates.iter().map(|r| ScanRow::from_record(r, config)),
        )?;
        if full {
            self.write_rows(
                FULL_REPORT_FILE,
                records.iter().map(|r| ScanRow::from_record(r, config)),
            )?;
        }
        Ok(())
    }

    fn write_backtest(&self, results: &[BacktestResult]) -> Result<(), TwscanError> {
        self.write_rows(
            SUMMARY_FILE,
            results.iter().map(|r| SummaryRow::from(&r.summary)),
        )?;
        self.write_rows(
            TRADES_FILE,
            results
                .iter()
                .flat_map(|r| r.trades.iter())
                .map(TradeRow::from),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::FrameRow;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::position::ExitTrigger;
    use crate::domain::signal::{EntryConditions, Evaluation, ExitReason};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn record(code: &str, entry: bool, score: f64, held: bool) -> ScanRecord {
        let row = FrameRow {
            ema: 95.0,
            atr: 2.0,
            ..FrameRow::undefined(&OhlcvBar {
                date: date(10),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1000,
            })
        };
        ScanRecord {
            code: code.to_string(),
            held,
            evaluation: Evaluation {
                date: row.date,
                conditions: EntryConditions {
                    above_ema: true,
                    ..EntryConditions::default()
                },
                entry,
                inst_sum: None,
                inst_positive: false,
                score,
                exit_reasons: held.then(|| [ExitReason::MacdFlipDown].into_iter().collect()),
            },
            row,
            suggested_entry: 100.0,
            suggested_exit: Some(96.0),
        }
    }

    fn read(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn scan_writes_ranked_candidates_only() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let records = vec![
            record("2603.TW", true, 0.4, false),
            record("2330.TW", true, 0.9, false),
            record("1101.TW", false, 2.0, false),
        ];

        adapter
            .write_scan(&records, &ScreenConfig::default(), false)
            .unwrap();

        let lines = read(&dir.path().join(CANDIDATES_FILE));
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("code,date,close,volume,ema"));
        assert!(lines[1].starts_with("2330.TW,2024-04-10"));
        assert!(lines[2].starts_with("2603.TW,"));
        assert!(!dir.path().join(FULL_REPORT_FILE).exists());
    }

    #[test]
    fn full_report_includes_exit_reasons() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let records = vec![record("2330.TW", false, 0.1, true)];

        adapter
            .write_scan(&records, &ScreenConfig::default(), true)
            .unwrap();

        let lines = read(&dir.path().join(FULL_REPORT_FILE));
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("macd_flip_down"));
        assert!(lines[1].contains("close above EMA"));
        // NaN indicators are written as empty cells.
        assert!(lines[1].starts_with("2330.TW,2024-04-10,100.0,1000.0,95.0,,"));
    }

    #[test]
    fn scan_rows_carry_volume_and_close_ma5() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let mut with_ma = record("2330.TW", true, 0.5, false);
        with_ma.row.close_ma5 = 98.5;
        let records = vec![with_ma, record("2603.TW", true, 0.4, false)];

        adapter
            .write_scan(&records, &ScreenConfig::default(), false)
            .unwrap();

        let lines = read(&dir.path().join(CANDIDATES_FILE));
        let header: Vec<&str> = lines[0].split(',').collect();
        let volume_col = header.iter().position(|h| *h == "volume").unwrap();
        let ma_col = header.iter().position(|h| *h == "close_ma5").unwrap();

        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first[volume_col], "1000.0");
        assert_eq!(first[ma_col], "98.5");
        // Undefined moving average is an empty cell.
        let second: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(second[ma_col], "");
    }

    #[test]
    fn backtest_writes_summary_and_trades() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().join("out"));
        let trade = Trade {
            code: "2330.TW".into(),
            entry_date: date(1),
            entry_price: 100.1,
            exit_date: date(8),
            exit_price: 109.89,
            shares: 10,
            exit: ExitTrigger::EndOfData,
            gross_return: 0.1,
            net_return: 0.095,
            net_pnl: 95.0,
            commission: 2.1,
            holding_days: 7,
            bars_held: 5,
        };
        let results = vec![
            BacktestResult {
                summary: BacktestSummary::compute("2330.TW", 1000.0, &[trade.clone()], &[]),
                trades: vec![trade],
                equity_curve: Vec::new(),
            },
            BacktestResult {
                summary: BacktestSummary::skipped("2603.TW", 1000.0, "no data for 2603.TW"),
                trades: Vec::new(),
                equity_curve: Vec::new(),
            },
        ];

        adapter.write_backtest(&results).unwrap();

        let summary = read(&dir.path().join("out").join(SUMMARY_FILE));
        assert_eq!(summary.len(), 3);
        assert!(summary[1].starts_with("2330.TW,completed,,"));
        assert!(summary[2].starts_with("2603.TW,skipped,no data for 2603.TW,"));

        let trades = read(&dir.path().join("out").join(TRADES_FILE));
        assert_eq!(trades.len(), 2);
        assert!(trades[1].contains("end_of_data"));
    }
}
