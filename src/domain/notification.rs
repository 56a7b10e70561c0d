//! Notification intents and message cards.
//!
//! Deciding whether to notify is a pure function of the evaluation; the
//! delivery itself belongs to a [`crate::ports::notifier::Notifier`].

use crate::domain::frame::FrameRow;
use crate::domain::signal::{Evaluation, ExitReasonSet, Locale};

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyFlags {
    pub on_entry: bool,
    pub on_exit: bool,
}

impl Default for NotifyFlags {
    fn default() -> Self {
        NotifyFlags {
            on_entry: true,
            on_exit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationIntent {
    None,
    Entry,
    Exit(ExitReasonSet),
}

/// Held instruments never produce entry intents.
pub fn notification_intent(
    evaluation: &Evaluation,
    held: bool,
    flags: &NotifyFlags,
) -> NotificationIntent {
    if held {
        match &evaluation.exit_reasons {
            Some(reasons) if flags.on_exit && !reasons.is_empty() => {
                NotificationIntent::Exit(reasons.clone())
            }
            _ => NotificationIntent::None,
        }
    } else if flags.on_entry && evaluation.entry {
        NotificationIntent::Entry
    } else {
        NotificationIntent::None
    }
}

fn fmt2(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{v:.2}")
    }
}

pub fn entry_card(code: &str, row: &FrameRow, evaluation: &Evaluation, ema_period: usize) -> String {
    let inst = match evaluation.inst_sum {
        Some(sum) => format!("{sum:.0}"),
        None => "n/a".to_string(),
    };
    [
        format!("ENTRY {code}"),
        format!("date: {}", row.date),
        format!("close: {}", fmt2(row.close)),
        format!("EMA{ema_period}: {}", fmt2(row.ema)),
        format!("KD: K={} D={}", fmt2(row.k), fmt2(row.d)),
        format!("ADX: {}", fmt2(row.adx)),
        format!("institutional net: {inst}"),
        format!("MACD: {}", fmt2(row.macd)),
        format!("score: {:.3}", evaluation.score),
    ]
    .join("\n")
}

pub fn exit_card(code: &str, row: &FrameRow, reasons: &ExitReasonSet, locale: Locale) -> String {
    let mut lines = vec![
        format!("EXIT {code}"),
        format!("date: {}", row.date),
        format!("close: {}", fmt2(row.close)),
        "reasons:".to_string(),
    ];
    lines.extend(reasons.describe(locale).into_iter().map(|r| format!("- {r}")));
    lines.join("\n")
}
