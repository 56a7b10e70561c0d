//! Entry/exit evaluation and composite score for a single bar.
//!
//! Entry is the AND of five technical conditions. Exit is the OR of six
//! independently toggled reasons and is only evaluated for held
//! instruments. The score ranks candidates and never gates entry.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::frame::{FrameRow, IndicatorFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    ZhTw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryThresholds {
    pub kmin: f64,
    pub kmax: f64,
    pub dmin: f64,
    pub dmax: f64,
    pub adx_min: f64,
    pub macd_require_positive: bool,
    pub macd_require_cross: bool,
}

impl Default for EntryThresholds {
    fn default() -> Self {
        EntryThresholds {
            kmin: 20.0,
            kmax: 80.0,
            dmin: 20.0,
            dmax: 80.0,
            adx_min: 33.0,
            macd_require_positive: true,
            macd_require_cross: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitRules {
    pub trend_break_ema: bool,
    /// Consecutive closes below EMA; 0 disables the rule.
    pub ema_break_bars: usize,
    pub volume_fade: bool,
    pub macd_flip: bool,
    pub adx_below: bool,
    pub adx_weak_threshold: f64,
    pub adx_weakening: bool,
    pub adx_weak_bars: usize,
    pub kd_death_high: bool,
    pub kd_high_level: f64,
}

impl Default for ExitRules {
    fn default() -> Self {
        ExitRules {
            trend_break_ema: true,
            ema_break_bars: 2,
            volume_fade: true,
            macd_flip: true,
            adx_below: true,
            adx_weak_threshold: 25.0,
            adx_weakening: true,
            adx_weak_bars: 3,
            kd_death_high: true,
            kd_high_level: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreWeights {
    pub trend: f64,
    pub volume: f64,
    pub adx: f64,
    pub macd: f64,
    pub inst: f64,
    /// Scale applied to the institutional sum before `tanh`.
    pub inst_norm: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            trend: 0.3,
            volume: 0.2,
            adx: 0.3,
            macd: 0.2,
            inst: 0.0,
            inst_norm: 5000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalConfig {
    pub entry: EntryThresholds,
    pub exit: ExitRules,
    pub score: ScoreWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryCondition {
    AboveEma,
    VolumeExpanding,
    KdInRange,
    TrendStrong,
    MacdBullish,
}

impl EntryCondition {
    pub const ALL: [EntryCondition; 5] = [
        EntryCondition::AboveEma,
        EntryCondition::VolumeExpanding,
        EntryCondition::KdInRange,
        EntryCondition::TrendStrong,
        EntryCondition::MacdBullish,
    ];

    /// NaN inputs make every comparison false.
    pub fn holds(self, row: &FrameRow, t: &EntryThresholds) -> bool {
        match self {
            EntryCondition::AboveEma => row.close >= row.ema,
            EntryCondition::VolumeExpanding => row.vol_ma_fast >= row.vol_ma_slow,
            EntryCondition::KdInRange => {
                t.kmin <= row.k && row.k <= t.kmax && t.dmin <= row.d && row.d <= t.dmax
            }
            EntryCondition::TrendStrong => row.adx > t.adx_min,
            EntryCondition::MacdBullish => {
                let positive = !t.macd_require_positive || row.macd > 0.0;
                let cross = !t.macd_require_cross || row.macd > row.macd_signal;
                positive && cross && !row.macd.is_nan()
            }
        }
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (EntryCondition::AboveEma, Locale::En) => "close above EMA",
            (EntryCondition::VolumeExpanding, Locale::En) => "volume expanding",
            (EntryCondition::KdInRange, Locale::En) => "KD in range",
            (EntryCondition::TrendStrong, Locale::En) => "trend strong",
            (EntryCondition::MacdBullish, Locale::En) => "MACD bullish",
            (EntryCondition::AboveEma, Locale::ZhTw) => "股價高於EMA",
            (EntryCondition::VolumeExpanding, Locale::ZhTw) => "成交量放大",
            (EntryCondition::KdInRange, Locale::ZhTw) => "KD合理區間",
            (EntryCondition::TrendStrong, Locale::ZhTw) => "趨勢強勁",
            (EntryCondition::MacdBullish, Locale::ZhTw) => "MACD多頭",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryConditions {
    pub above_ema: bool,
    pub volume_expanding: bool,
    pub kd_in_range: bool,
    pub trend_strong: bool,
    pub macd_bullish: bool,
}

impl EntryConditions {
    pub fn evaluate(row: &FrameRow, thresholds: &EntryThresholds) -> Self {
        let check = |c: EntryCondition| c.holds(row, thresholds);
        EntryConditions {
            above_ema: check(EntryCondition::AboveEma),
            volume_expanding: check(EntryCondition::VolumeExpanding),
            kd_in_range: check(EntryCondition::KdInRange),
            trend_strong: check(EntryCondition::TrendStrong),
            macd_bullish: check(EntryCondition::MacdBullish),
        }
    }

    pub fn get(&self, condition: EntryCondition) -> bool {
        match condition {
            EntryCondition::AboveEma => self.above_ema,
            EntryCondition::VolumeExpanding => self.volume_expanding,
            EntryCondition::KdInRange => self.kd_in_range,
            EntryCondition::TrendStrong => self.trend_strong,
            EntryCondition::MacdBullish => self.macd_bullish,
        }
    }

    pub fn all(&self) -> bool {
        EntryCondition::ALL.iter().all(|&c| self.get(c))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExitReason {
    TrendBreakEma,
    VolumeFade,
    MacdFlipDown,
    AdxBelowThreshold,
    AdxWeakening,
    KdDeathCrossHigh,
}

impl ExitReason {
    pub fn code(self) -> &'static str {
        match self {
            ExitReason::TrendBreakEma => "trend_break_ema",
            ExitReason::VolumeFade => "volume_fade",
            ExitReason::MacdFlipDown => "macd_flip_down",
            ExitReason::AdxBelowThreshold => "adx_below_threshold",
            ExitReason::AdxWeakening => "adx_weakening",
            ExitReason::KdDeathCrossHigh => "kd_death_cross_high",
        }
    }

    pub fn describe(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (ExitReason::TrendBreakEma, Locale::En) => {
                "close below EMA for consecutive bars, trend weakening"
            }
            (ExitReason::VolumeFade, Locale::En) => "volume contracting and close below MA5",
            (ExitReason::MacdFlipDown, Locale::En) => "MACD turned bearish below zero",
            (ExitReason::AdxBelowThreshold, Locale::En) => "ADX below exit threshold",
            (ExitReason::AdxWeakening, Locale::En) => "ADX falling for consecutive bars",
            (ExitReason::KdDeathCrossHigh, Locale::En) => "KD death cross at high level",
            (ExitReason::TrendBreakEma, Locale::ZhTw) => "股價連續多天跌破 EMA，趨勢轉弱",
            (ExitReason::VolumeFade, Locale::ZhTw) => "成交量明顯縮小且跌破 MA5，買盤力道減弱",
            (ExitReason::MacdFlipDown, Locale::ZhTw) => "MACD 由多翻空，動能轉弱",
            (ExitReason::AdxBelowThreshold, Locale::ZhTw) => "ADX 低於門檻，趨勢力道不足",
            (ExitReason::AdxWeakening, Locale::ZhTw) => "ADX 連續多天走弱，趨勢轉疲",
            (ExitReason::KdDeathCrossHigh, Locale::ZhTw) => "KD 高檔出現死亡交叉，短線轉弱",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Exit reasons in canonical order, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExitReasonSet {
    reasons: Vec<ExitReason>,
}

impl ExitReasonSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reason: ExitReason) {
        if let Err(pos) = self.reasons.binary_search(&reason) {
            self.reasons.insert(pos, reason);
        }
    }

    pub fn contains(&self, reason: ExitReason) -> bool {
        self.reasons.binary_search(&reason).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ExitReason> + '_ {
        self.reasons.iter().copied()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.iter().map(ExitReason::code).collect()
    }

    pub fn describe(&self, locale: Locale) -> Vec<&'static str> {
        self.iter().map(|r| r.describe(locale)).collect()
    }
}

impl FromIterator<ExitReason> for ExitReasonSet {
    fn from_iter<I: IntoIterator<Item = ExitReason>>(iter: I) -> Self {
        let mut set = ExitReasonSet::new();
        for reason in iter {
            set.insert(reason);
        }
        set
    }
}

impl fmt::Display for ExitReasonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.codes().join(";"))
    }
}

struct ExitRule {
    reason: ExitReason,
    enabled: fn(&ExitRules) -> bool,
    fires: fn(&[FrameRow], usize, &ExitRules) -> bool,
}

const EXIT_RULES: [ExitRule; 6] = [
    ExitRule {
        reason: ExitReason::TrendBreakEma,
        enabled: |r| r.trend_break_ema && r.ema_break_bars > 0,
        fires: trend_break_ema,
    },
    ExitRule {
        reason: ExitReason::VolumeFade,
        enabled: |r| r.volume_fade,
        fires: |rows, i, _| {
            let row = &rows[i];
            row.vol_ma_fast < row.vol_ma_slow && row.close < row.close_ma5
        },
    },
    ExitRule {
        reason: ExitReason::MacdFlipDown,
        enabled: |r| r.macd_flip,
        fires: |rows, i, _| {
            let row = &rows[i];
            row.macd < row.macd_signal && row.macd < 0.0
        },
    },
    ExitRule {
        reason: ExitReason::AdxBelowThreshold,
        enabled: |r| r.adx_below,
        fires: |rows, i, r| rows[i].adx < r.adx_weak_threshold,
    },
    ExitRule {
        reason: ExitReason::AdxWeakening,
        enabled: |r| r.adx_weakening && r.adx_weak_bars > 0,
        fires: adx_weakening,
    },
    ExitRule {
        reason: ExitReason::KdDeathCrossHigh,
        enabled: |r| r.kd_death_high,
        fires: kd_death_cross_high,
    },
];

/// Close strictly below EMA on each of the last `ema_break_bars` bars.
fn trend_break_ema(rows: &[FrameRow], i: usize, rules: &ExitRules) -> bool {
    let n = rules.ema_break_bars;
    if i + 1 < n {
        return false;
    }
    rows[i + 1 - n..=i].iter().all(|row| row.close < row.ema)
}

/// ADX non-increasing across each of the last `adx_weak_bars` steps.
fn adx_weakening(rows: &[FrameRow], i: usize, rules: &ExitRules) -> bool {
    let n = rules.adx_weak_bars;
    if i < n {
        return false;
    }
    rows[i - n..=i]
        .windows(2)
        .all(|pair| pair[1].adx - pair[0].adx <= 0.0)
}

/// K falls to or below D after K was above both D and the high level on the
/// prior bar.
fn kd_death_cross_high(rows: &[FrameRow], i: usize, rules: &ExitRules) -> bool {
    if i == 0 {
        return false;
    }
    let (prev, cur) = (&rows[i - 1], &rows[i]);
    prev.k > rules.kd_high_level && prev.k > prev.d && cur.k <= cur.d
}

/// Every enabled exit reason that holds at `idx`.
pub fn exit_reasons(frame: &IndicatorFrame, idx: usize, rules: &ExitRules) -> ExitReasonSet {
    if idx >= frame.len() {
        return ExitReasonSet::new();
    }
    EXIT_RULES
        .iter()
        .filter(|rule| (rule.enabled)(rules) && (rule.fires)(&frame.rows, idx, rules))
        .map(|rule| rule.reason)
        .collect()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && !numerator.is_nan() {
        numerator / denominator
    } else {
        0.0
    }
}

/// Weighted blend of trend, volume, ADX, MACD and institutional sub-scores.
///
/// A zero or NaN denominator makes its term 0.
pub fn composite_score(
    row: &FrameRow,
    inst_sum: Option<f64>,
    thresholds: &EntryThresholds,
    weights: &ScoreWeights,
) -> f64 {
    let trend = ratio(row.close, row.ema).clamp(0.0, 2.0);
    let volume = ratio(row.vol_ma_fast, row.vol_ma_slow).clamp(0.0, 3.0);
    let adx = ratio(row.adx, thresholds.adx_min).clamp(0.0, 2.0);
    let macd = ratio(row.macd_hist, row.close).max(0.0);
    let inst = match inst_sum {
        Some(sum) if weights.inst_norm > 0.0 && !sum.is_nan() => {
            (sum / weights.inst_norm).tanh().max(0.0)
        }
        _ => 0.0,
    };

    weights.trend * trend
        + weights.volume * volume
        + weights.adx * adx
        + weights.macd * macd
        + weights.inst * inst
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub date: NaiveDate,
    pub conditions: EntryConditions,
    pub entry: bool,
    pub inst_sum: Option<f64>,
    /// Informational only; never part of the entry verdict.
    pub inst_positive: bool,
    pub score: f64,
    /// `Some` only for held instruments.
    pub exit_reasons: Option<ExitReasonSet>,
}

impl Evaluation {
    pub fn exit(&self) -> bool {
        self.exit_reasons.as_ref().is_some_and(|r| !r.is_empty())
    }
}

/// Evaluates bar `idx`; `None` when the index is outside the frame.
pub fn evaluate(
    frame: &IndicatorFrame,
    idx: usize,
    held: bool,
    inst_sum: Option<f64>,
    config: &SignalConfig,
) -> Option<Evaluation> {
    let row = frame.rows.get(idx)?;
    let conditions = EntryConditions::evaluate(row, &config.entry);
    let inst_sum = inst_sum.filter(|v| !v.is_nan());

    Some(Evaluation {
        date: row.date,
        conditions,
        entry: conditions.all(),
        inst_sum,
        inst_positive: inst_sum.is_some_and(|v| v > 0.0),
        score: composite_score(row, inst_sum, &config.entry, &config.score),
        exit_reasons: held.then(|| exit_reasons(frame, idx, &config.exit)),
    })
}
