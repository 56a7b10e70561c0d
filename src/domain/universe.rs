//! Instrument codes: normalisation, code lists and the held set.

use crate::domain::error::TwscanError;
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

/// Listing venue used to suffix bare numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Market {
    /// Main board, `.TW`.
    #[default]
    Tw,
    /// OTC board, `.TWO`.
    Two,
}

impl Market {
    pub fn suffix(self) -> &'static str {
        match self {
            Market::Tw => ".TW",
            Market::Two => ".TWO",
        }
    }
}

impl FromStr for Market {
    type Err = TwscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TW" => Ok(Market::Tw),
            "TWO" => Ok(Market::Two),
            other => Err(TwscanError::invalid(
                "run",
                "market",
                format!("unknown market '{other}', expected TW or TWO"),
            )),
        }
    }
}

/// Upper-cases `code` and appends the market suffix unless one is present.
/// Returns `None` for blank input.
pub fn normalize_code(code: &str, market: Market) -> Option<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        None
    } else if code.ends_with(".TW") || code.ends_with(".TWO") {
        Some(code)
    } else {
        Some(format!("{code}{}", market.suffix()))
    }
}

/// Normalised, de-duplicated and sorted.
pub fn normalize_codes<'a, I>(codes: I, market: Market) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    codes
        .into_iter()
        .filter_map(|c| normalize_code(c, market))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Parses a comma-separated code list such as `2330,2603.TW,5483.TWO`.
pub fn parse_codes(input: &str, market: Market) -> Result<Vec<String>, TwscanError> {
    if input.split(',').any(|token| token.trim().is_empty()) {
        return Err(TwscanError::invalid(
            "run",
            "codes",
            "empty token in code list",
        ));
    }
    Ok(normalize_codes(input.split(','), market))
}

/// First run of ASCII digits in `code`: `2330.TW` → `2330`.
pub fn numeric_root(code: &str) -> Option<&str> {
    let start = code.find(|c: char| c.is_ascii_digit())?;
    let rest = &code[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

/// Currently held instruments, matched by numeric root so `2330` in the
/// held list covers `2330.TW`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeldSet {
    roots: HashSet<String>,
}

impl HeldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per line; blank lines and `#` comments are ignored, as are
    /// lines without digits.
    pub fn parse(content: &str) -> Self {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(numeric_root)
            .collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        numeric_root(code).is_some_and(|root| self.roots.contains(root))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for HeldSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        HeldSet {
            roots: iter.into_iter().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_codes_get_market_suffix() {
        assert_eq!(normalize_code("2330", Market::Tw).as_deref(), Some("2330.TW"));
        assert_eq!(normalize_code(" 5483 ", Market::Two).as_deref(), Some("5483.TWO"));
        assert_eq!(normalize_code("2603.tw", Market::Two).as_deref(), Some("2603.TW"));
        assert_eq!(normalize_code("  ", Market::Tw), None);
    }

    #[test]
    fn normalize_dedupes_and_sorts() {
        let codes = normalize_codes(["2603", "2330.TW", "2330", "5483.TWO"], Market::Tw);
        assert_eq!(codes, vec!["2330.TW", "2603.TW", "5483.TWO"]);
    }

    #[test]
    fn parse_codes_rejects_empty_token() {
        assert!(parse_codes("2330,,2603", Market::Tw).is_err());
        assert_eq!(
            parse_codes("2603, 2330", Market::Tw).unwrap(),
            vec!["2330.TW", "2603.TW"]
        );
    }

    #[test]
    fn market_parses_case_insensitively() {
        assert_eq!("two".parse::<Market>().unwrap(), Market::Two);
        assert_eq!("TW".parse::<Market>().unwrap(), Market::Tw);
        assert!("NYSE".parse::<Market>().is_err());
    }

    #[test]
    fn numeric_root_extracts_digits() {
        assert_eq!(numeric_root("2330.TW"), Some("2330"));
        assert_eq!(numeric_root("00878.TW"), Some("00878"));
        assert_eq!(numeric_root("ABC"), None);
    }

    #[test]
    fn held_set_matches_by_root() {
        let held = HeldSet::parse("# holdings\n2330\n\n2603.TW\nnotes only\n");
        assert_eq!(held.len(), 2);
        assert!(held.contains("2330.TW"));
        assert!(held.contains("2603.TWO"));
        assert!(!held.contains("2317.TW"));
    }

    #[test]
    fn empty_held_set_contains_nothing() {
        let held = HeldSet::new();
        assert!(held.is_empty());
        assert!(!held.contains("2330.TW"));
    }
}
