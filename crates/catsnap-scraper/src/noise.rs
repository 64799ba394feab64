//! Specification noise filtering.
//!
//! Generic tables and key/value containers on product pages often carry EMI
//! offers, bank lists and section headings that look exactly like spec
//! rows. This is a denylist of observed noise signatures: built-in entries
//! plus per-source additions from the sources file.

use std::collections::{BTreeMap, HashSet};

use catsnap_core::NoiseConfig;
use regex::{Regex, RegexBuilder};

use crate::error::ScraperError;

/// Keys dropped on exact (trimmed, case-insensitive) match.
const NOISE_KEYS: &[&str] = &[
    "bank name/ tenure",
    "bank name/tenure",
    "3 months",
    "6 months",
    "9 months",
    "12 months",
    "18 months",
    "24 months",
];

/// Key patterns, matched case-insensitively anywhere in the key.
const NOISE_PATTERNS: &[&str] = &[
    r"^(amex|axis|citi|hdfc|hsbc|icici|indus|kotak|rbl|sbi|yes)$",
    r"specifications$",
    r"delivery\s*&\s*service",
    r"we will notify",
    r"^\d+\.\d+%$",
];

/// Values that are a bare rate, e.g. `"14.99%"`.
const PERCENT_VALUE: &str = r"^\d+\.\d+%$";

const DEFAULT_MAX_KEY_LEN: usize = 80;

/// Removes noise entries from a specification mapping.
///
/// Every rule is a predicate over a single entry, so filtering an already
/// filtered mapping removes nothing.
#[derive(Debug)]
pub struct NoiseFilter {
    keys: HashSet<String>,
    patterns: Vec<Regex>,
    percent_value: Regex,
    max_key_len: usize,
}

impl NoiseFilter {
    /// Built-in rules extended with a source's additions.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidRule`] if a configured pattern does not compile.
    pub fn new(config: &NoiseConfig) -> Result<Self, ScraperError> {
        let keys = NOISE_KEYS
            .iter()
            .map(|k| (*k).to_owned())
            .chain(config.keys.iter().map(|k| k.trim().to_lowercase()))
            .collect();

        let patterns = NOISE_PATTERNS
            .iter()
            .copied()
            .chain(config.patterns.iter().map(String::as_str))
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keys,
            patterns,
            percent_value: compile(PERCENT_VALUE)?,
            max_key_len: config.max_key_len.unwrap_or(DEFAULT_MAX_KEY_LEN),
        })
    }

    #[must_use]
    pub fn is_noise(&self, key: &str, value: &str) -> bool {
        let trimmed = key.trim();
        self.keys.contains(&trimmed.to_lowercase())
            || self.patterns.iter().any(|re| re.is_match(trimmed))
            || self.percent_value.is_match(value.trim())
            || trimmed.chars().count() > self.max_key_len
    }

    /// Filter `specs`, returning the kept entries and how many were removed.
    #[must_use]
    pub fn apply(&self, specs: BTreeMap<String, String>) -> (BTreeMap<String, String>, usize) {
        let before = specs.len();
        let kept: BTreeMap<String, String> = specs
            .into_iter()
            .filter(|(key, value)| !self.is_noise(key, value))
            .collect();
        let removed = before - kept.len();
        (kept, removed)
    }
}

fn compile(pattern: &str) -> Result<Regex, ScraperError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ScraperError::InvalidRule {
            rule: pattern.to_owned(),
            reason: e.to_string(),
        })
}
