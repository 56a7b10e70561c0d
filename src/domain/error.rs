//! Domain error types.

/// Problems with the shape of an input price series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("bar {index} ({date}) is not after the previous bar")]
    OutOfOrder { index: usize, date: chrono::NaiveDate },

    #[error("bar {index} ({date}) has a non-finite price")]
    NonFinite { index: usize, date: chrono::NaiveDate },
}

/// Top-level error type for twscan.
#[derive(Debug, thiserror::Error)]
pub enum TwscanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("invalid series for {code}: {source}")]
    InvalidSeries {
        code: String,
        #[source]
        source: SeriesError,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TwscanError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TwscanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TwscanError> for std::process::ExitCode {
    fn from(err: &TwscanError) -> Self {
        let code: u8 = match err {
            TwscanError::Io(_) => 1,
            TwscanError::ConfigParse { .. }
            | TwscanError::ConfigMissing { .. }
            | TwscanError::ConfigInvalid { .. } => 2,
            TwscanError::Data { .. } | TwscanError::InvalidSeries { .. } => 3,
            TwscanError::NoData { .. } | TwscanError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message_names_section_and_key() {
        let err = TwscanError::invalid("entry", "kmin", "kmin must not exceed kmax");
        assert_eq!(
            err.to_string(),
            "invalid config value [entry] kmin: kmin must not exceed kmax"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = TwscanError::InsufficientData {
            code: "2330.TW".into(),
            bars: 10,
            minimum: 120,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for 2330.TW: have 10 bars, need 120"
        );
    }

    #[test]
    fn invalid_series_wraps_source() {
        let err = TwscanError::InvalidSeries {
            code: "2330.TW".into(),
            source: SeriesError::OutOfOrder {
                index: 3,
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            },
        };
        assert!(err.to_string().contains("bar 3 (2024-01-02) is not after"));
    }
}
