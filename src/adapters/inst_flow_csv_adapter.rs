//! Institutional net-flow CSV adapter.
//!
//! A single `date,code,net_inst` file covering every instrument. Rows are
//! keyed by numeric root so `2330` and `2330.TW` refer to the same flow.

use crate::domain::error::TwscanError;
use crate::domain::inst_flow::InstFlow;
use crate::domain::universe::numeric_root;
use crate::ports::inst_flow_port::InstFlowPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, serde::Deserialize)]
struct InstRow {
    date: String,
    code: String,
    net_inst: f64,
}

pub struct InstFlowCsvAdapter {
    flows: HashMap<String, InstFlow>,
}

impl InstFlowCsvAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TwscanError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TwscanError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_string(&content)
    }

    /// Rows for the same instrument and date are summed.
    pub fn from_string(content: &str) -> Result<Self, TwscanError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut daily: HashMap<String, BTreeMap<NaiveDate, f64>> = HashMap::new();

        for result in rdr.deserialize::<InstRow>() {
            let row = result.map_err(|e| TwscanError::Data {
                reason: format!("institutional flow CSV parse error: {e}"),
            })?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                TwscanError::Data {
                    reason: format!("invalid institutional flow date '{}': {}", row.date, e),
                }
            })?;
            let Some(root) = numeric_root(&row.code) else {
                continue;
            };
            *daily
                .entry(root.to_string())
                .or_default()
                .entry(date)
                .or_insert(0.0) += row.net_inst;
        }

        Ok(Self {
            flows: daily
                .into_iter()
                .map(|(root, days)| (root, InstFlow::new(days)))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

impl InstFlowPort for InstFlowCsvAdapter {
    fn inst_flow(&self, code: &str) -> Result<Option<InstFlow>, TwscanError> {
        Ok(numeric_root(code).and_then(|root| self.flows.get(root).cloned()))
    }
}
