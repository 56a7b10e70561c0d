//! Latest-bar screening.
//!
//! A scan evaluates only the final bar of each instrument. Entry candidates
//! are ranked by date, then score.

use chrono::NaiveDate;

use super::config::ScreenConfig;
use super::error::TwscanError;
use super::frame::{compute_frame, FrameRow};
use super::inst_flow::InstFlow;
use super::notification::{entry_card, exit_card, notification_intent, NotificationIntent};
use super::ohlcv::{validate_series, OhlcvBar};
use super::signal::{evaluate, Evaluation, ExitReasonSet};
use super::stops::initial_stop;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub code: String,
    pub held: bool,
    /// Indicator values of the evaluated bar.
    pub row: FrameRow,
    pub evaluation: Evaluation,
    /// Latest close.
    pub suggested_entry: f64,
    /// Initial ATR stop below the latest close.
    pub suggested_exit: Option<f64>,
}

impl ScanRecord {
    pub fn date(&self) -> NaiveDate {
        self.row.date
    }

    pub fn entry(&self) -> bool {
        self.evaluation.entry
    }

    pub fn exit(&self) -> bool {
        self.evaluation.exit()
    }

    pub fn score(&self) -> f64 {
        self.evaluation.score
    }

    /// Empty for instruments that are not held.
    pub fn exit_reasons(&self) -> ExitReasonSet {
        self.evaluation.exit_reasons.clone().unwrap_or_default()
    }

    pub fn intent(&self, config: &ScreenConfig) -> NotificationIntent {
        notification_intent(&self.evaluation, self.held, &config.notify)
    }

    /// Message text for the record's notification intent, if any.
    pub fn card(&self, config: &ScreenConfig) -> Option<String> {
        match self.intent(config) {
            NotificationIntent::None => None,
            NotificationIntent::Entry => Some(entry_card(
                &self.code,
                &self.row,
                &self.evaluation,
                config.indicators.ema_period,
            )),
            NotificationIntent::Exit(reasons) => {
                Some(exit_card(&self.code, &self.row, &reasons, config.locale))
            }
        }
    }
}

/// Evaluates the final bar of `bars`.
///
/// Series shorter than the indicator warm-up are rejected with
/// `InsufficientData`; their conditions could never hold.
pub fn scan_latest(
    code: &str,
    bars: &[OhlcvBar],
    inst: Option<&InstFlow>,
    held: bool,
    config: &ScreenConfig,
) -> Result<ScanRecord, TwscanError> {
    if bars.is_empty() {
        return Err(TwscanError::NoData {
            code: code.to_string(),
        });
    }
    validate_series(bars).map_err(|source| TwscanError::InvalidSeries {
        code: code.to_string(),
        source,
    })?;

    let minimum = config.indicators.warmup_bars();
    if bars.len() < minimum {
        return Err(TwscanError::InsufficientData {
            code: code.to_string(),
            bars: bars.len(),
            minimum,
        });
    }

    let frame = compute_frame(bars, &config.indicators);
    let idx = frame.len() - 1;
    let inst_sum = inst.and_then(|flow| {
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        flow.rolling_sums(&dates, config.inst_lookback)
            .last()
            .copied()
            .flatten()
    });

    let evaluation = evaluate(&frame, idx, held, inst_sum, &config.signal).ok_or_else(|| {
        TwscanError::NoData {
            code: code.to_string(),
        }
    })?;
    let row = frame.rows[idx].clone();

    Ok(ScanRecord {
        code: code.to_string(),
        held,
        suggested_entry: row.close,
        suggested_exit: initial_stop(row.close, row.atr, config.stops.atr_mult),
        row,
        evaluation,
    })
}

/// Entry-qualified records, date ascending then score descending.
pub fn rank_candidates(records: &[ScanRecord]) -> Vec<ScanRecord> {
    let mut candidates: Vec<ScanRecord> = records.iter().filter(|r| r.entry()).cloned().collect();
    candidates.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| b.score().total_cmp(&a.score()))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::EntryConditions;

    fn bar(day: u32, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    fn record(code: &str, day: u32, entry: bool, score: f64) -> ScanRecord {
        let row = FrameRow::undefined(&bar(day, 10.0));
        ScanRecord {
            code: code.to_string(),
            held: false,
            evaluation: Evaluation {
                date: row.date,
                conditions: EntryConditions::default(),
                entry,
                inst_sum: None,
                inst_positive: false,
                score,
                exit_reasons: None,
            },
            row,
            suggested_entry: 10.0,
            suggested_exit: None,
        }
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = scan_latest("X", &[], None, false, &ScreenConfig::default()).unwrap_err();
        assert!(matches!(err, TwscanError::NoData { .. }));
    }

    #[test]
    fn short_series_is_insufficient() {
        let bars: Vec<OhlcvBar> = (1..=10).map(|d| bar(d, 10.0)).collect();
        let err = scan_latest("X", &bars, None, false, &ScreenConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            TwscanError::InsufficientData { bars: 10, minimum: 117, .. }
        ));
    }

    #[test]
    fn unordered_series_is_rejected() {
        let bars = vec![bar(2, 10.0), bar(1, 10.0)];
        let err = scan_latest("X", &bars, None, false, &ScreenConfig::default()).unwrap_err();
        assert!(matches!(err, TwscanError::InvalidSeries { .. }));
    }

    #[test]
    fn candidates_sorted_by_date_then_score() {
        let records = vec![
            record("A", 3, true, 0.5),
            record("B", 2, true, 0.1),
            record("C", 3, true, 0.9),
            record("D", 2, false, 5.0),
        ];
        let ranked: Vec<String> = rank_candidates(&records)
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(ranked, vec!["B", "C", "A"]);
    }

    #[test]
    fn unheld_record_has_no_exit_reasons() {
        let r = record("A", 3, false, 0.0);
        assert!(r.exit_reasons().is_empty());
        assert!(!r.exit());
        assert_eq!(r.card(&ScreenConfig::default()), None);
    }

    #[test]
    fn entry_record_renders_card() {
        let r = record("2330.TW", 3, true, 1.0);
        let card = r.card(&ScreenConfig::default()).unwrap();
        assert!(card.starts_with("ENTRY 2330.TW"));
    }
}
