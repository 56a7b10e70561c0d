//! CSV file data adapter.
//!
//! One file per instrument, `<CODE>.csv`, with a
//! `date,open,high,low,close,volume` header.

use crate::domain::error::TwscanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }

    fn read_all(&self, code: &str) -> Result<Vec<OhlcvBar>, TwscanError> {
        let path = self.csv_path(code);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TwscanError::NoData {
                    code: code.to_string(),
                })
            }
            Err(e) => {
                return Err(TwscanError::Data {
                    reason: format!("failed to read {}: {}", path.display(), e),
                })
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| TwscanError::Data {
                reason: format!("{code}: CSV parse error: {e}"),
            })?;
            let field = |idx: usize, name: &str| -> Result<&str, TwscanError> {
                record
                    .get(idx)
                    .map(str::trim)
                    .ok_or_else(|| TwscanError::Data {
                        reason: format!("{code}: row {}: missing {name} column", line + 1),
                    })
            };
            let price = |idx: usize, name: &str| -> Result<f64, TwscanError> {
                field(idx, name)?.parse().map_err(|e| TwscanError::Data {
                    reason: format!("{code}: row {}: invalid {name} value: {e}", line + 1),
                })
            };

            let date = NaiveDate::parse_from_str(field(0, "date")?, "%Y-%m-%d").map_err(|e| {
                TwscanError::Data {
                    reason: format!("{code}: row {}: invalid date format: {e}", line + 1),
                }
            })?;
            // Vendor exports sometimes write volume as a float.
            let volume = price(5, "volume")?;
            if !volume.is_finite() {
                return Err(TwscanError::Data {
                    reason: format!("{code}: row {}: invalid volume value: not finite", line + 1),
                });
            }

            bars.push(OhlcvBar {
                date,
                open: price(1, "open")?,
                high: price(2, "high")?,
                low: price(3, "low")?,
                close: price(4, "close")?,
                volume: volume.round() as i64,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TwscanError> {
        let mut bars = self.read_all(code)?;
        bars.retain(|b| {
            start_date.is_none_or(|s| b.date >= s) && end_date.is_none_or(|e| b.date <= e)
        });
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TwscanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TwscanError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TwscanError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TwscanError> {
        let bars = match self.read_all(code) {
            Ok(bars) => bars,
            Err(TwscanError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
