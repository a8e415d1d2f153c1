//! Configuration consumed by the cleaning engine.
//!
//! The engine never reads files or environment variables itself; callers
//! build a [`CleaningConfig`] (directly, or through
//! [`PipelineConfig`](crate::PipelineConfig)) and pass it in.

use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};

/// Formats tried, in order, by [`TimestampFormat::auto`].
const AUTO_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormatKind {
    Strftime(String),
    Auto,
}

/// Expected layout of raw timestamp strings.
///
/// Accepts human patterns such as `MM/DD/YYYY` or `YYYY-MM-DD HH:MM:SS`,
/// raw chrono `strftime` strings (anything containing `%`), or `auto`.
/// In human patterns `MM` directly after an `HH` field means minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimestampFormat {
    source: String,
    kind: FormatKind,
}

impl TimestampFormat {
    /// Build a format from a pattern, validating it up front.
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Self::auto());
        }
        if trimmed.is_empty() {
            return Err(SluiceError::Config(
                "Timestamp format must not be empty".to_string(),
            ));
        }

        let strftime = if trimmed.contains('%') {
            trimmed.to_string()
        } else {
            translate_pattern(trimmed)?
        };

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(SluiceError::Config(format!(
                "Invalid timestamp format '{}'",
                pattern
            )));
        }

        Ok(Self {
            source: trimmed.to_string(),
            kind: FormatKind::Strftime(strftime),
        })
    }

    /// Try a fixed list of common layouts, including RFC 3339.
    pub fn auto() -> Self {
        Self {
            source: "auto".to_string(),
            kind: FormatKind::Auto,
        }
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The chrono format string, or `None` for `auto`.
    pub fn strftime(&self) -> Option<&str> {
        match &self.kind {
            FormatKind::Strftime(s) => Some(s),
            FormatKind::Auto => None,
        }
    }

    /// Parse a raw string. Date-only layouts resolve to midnight.
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match &self.kind {
            FormatKind::Strftime(fmt) => parse_with(raw, fmt),
            FormatKind::Auto => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
                .or_else(|| AUTO_FORMATS.iter().find_map(|fmt| parse_with(raw, fmt))),
        }
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            source: "MM/DD/YYYY".to_string(),
            kind: FormatKind::Strftime("%m/%d/%Y".to_string()),
        }
    }
}

impl TryFrom<String> for TimestampFormat {
    type Error = SluiceError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<TimestampFormat> for String {
    fn from(value: TimestampFormat) -> Self {
        value.source
    }
}

impl FromStr for TimestampFormat {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_with(raw: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, fmt).ok().or_else(|| {
        NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN))
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Hour,
    Other,
}

/// Translate `YYYY-MM-DD HH:MM:SS` style patterns into strftime.
fn translate_pattern(pattern: &str) -> Result<String> {
    const TOKENS: &[&str] = &["YYYY", "YY", "MM", "mm", "DD", "HH", "SS"];

    let mut out = String::with_capacity(pattern.len() + 4);
    let mut previous = Field::Other;
    let mut rest = pattern;

    while let Some(ch) = rest.chars().next() {
        if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            let spec = match *token {
                "YYYY" => "%Y",
                "YY" => "%y",
                "MM" if previous == Field::Hour => "%M",
                "MM" => "%m",
                "mm" => "%M",
                "DD" => "%d",
                "HH" => "%H",
                _ => "%S",
            };
            previous = if *token == "HH" { Field::Hour } else { Field::Other };
            out.push_str(spec);
            rest = &rest[token.len()..];
        } else if ch == 'T' {
            // ISO 8601 date/time separator.
            out.push(ch);
            rest = &rest[1..];
        } else if ch.is_ascii_alphabetic() {
            return Err(SluiceError::Config(format!(
                "Unknown token '{}' in timestamp format '{}'",
                ch, pattern
            )));
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    Ok(out)
}

/// What to do with rows whose timestamp does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimestampPolicy {
    /// Remove the row from the table.
    Drop,
    /// Keep the row and use the sentinel timestamp.
    #[default]
    SubstituteDefault,
}

impl TimestampPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            TimestampPolicy::Drop => "DROP",
            TimestampPolicy::SubstituteDefault => "SUBSTITUTE_DEFAULT",
        }
    }
}

impl FromStr for TimestampPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "drop" => Ok(TimestampPolicy::Drop),
            "substitute_default" | "substitute" | "default" => {
                Ok(TimestampPolicy::SubstituteDefault)
            }
            _ => Err(format!(
                "Unknown timestamp policy: {}. Use drop or substitute-default.",
                s
            )),
        }
    }
}

impl fmt::Display for TimestampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where deduplication runs for customers and inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStage {
    /// Compare raw rows, then impute and normalize.
    BeforeNormalization,
    /// Impute and normalize, then compare. Keeps cleaning idempotent.
    #[default]
    AfterNormalization,
}

/// Replacement values for missing cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationDefaults {
    pub quantity: f64,
    pub price: f64,
    pub stock_level: f64,
    pub reorder_level: f64,
    pub delivery_address: String,
    pub loyalty_status: String,
}

impl Default for ImputationDefaults {
    fn default() -> Self {
        Self {
            quantity: 0.0,
            price: 0.0,
            stock_level: 0.0,
            reorder_level: 0.0,
            delivery_address: "Unknown".to_string(),
            loyalty_status: "Unknown".to_string(),
        }
    }
}

/// Configuration for one cleaning run, applied uniformly to every dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Expected layout of raw timestamps.
    pub timestamp_format: TimestampFormat,
    /// Handling of unparseable timestamps.
    pub timestamp_policy: TimestampPolicy,
    /// Value used by [`TimestampPolicy::SubstituteDefault`].
    pub sentinel_timestamp: NaiveDateTime,
    /// Replacement values for missing cells.
    pub defaults: ImputationDefaults,
    /// Dedup position for customers and inventory.
    pub dedup_stage: DedupStage,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            timestamp_format: TimestampFormat::default(),
            timestamp_policy: TimestampPolicy::default(),
            sentinel_timestamp: sentinel_epoch(),
            defaults: ImputationDefaults::default(),
            dedup_stage: DedupStage::default(),
        }
    }
}

impl CleaningConfig {
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: ImputationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn with_dedup_stage(mut self, stage: DedupStage) -> Self {
        self.dedup_stage = stage;
        self
    }
}

/// `1970-01-01T00:00:00`.
pub fn sentinel_epoch() -> NaiveDateTime {
    NaiveDate::default().and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_translate_date_pattern() {
        let format = TimestampFormat::new("MM/DD/YYYY").unwrap();
        assert_eq!(format.strftime(), Some("%m/%d/%Y"));
        assert_eq!(format.parse("11/24/2024"), Some(ts(2024, 11, 24, 0, 0, 0)));
        assert_eq!(format.parse("invalid_date"), None);
    }

    #[test]
    fn test_translate_minutes_after_hours() {
        let format = TimestampFormat::new("YYYY-MM-DD HH:MM:SS").unwrap();
        assert_eq!(format.strftime(), Some("%Y-%m-%d %H:%M:%S"));
        assert_eq!(
            format.parse("2024-11-01 12:30:05"),
            Some(ts(2024, 11, 1, 12, 30, 5))
        );
        // Date-only input does not satisfy a datetime layout.
        assert_eq!(format.parse("2024-11-01"), None);
    }

    #[test]
    fn test_translate_iso_separator() {
        let format = TimestampFormat::new("YYYY-MM-DDTHH:MM:SS").unwrap();
        assert_eq!(format.strftime(), Some("%Y-%m-%dT%H:%M:%S"));
        assert_eq!(
            format.parse("2024-11-01T12:30:05"),
            Some(ts(2024, 11, 1, 12, 30, 5))
        );
        assert!(TimestampFormat::new("YYYY-MM-DDXHH").is_err());
    }

    #[test]
    fn test_strftime_passthrough() {
        let format = TimestampFormat::new("%d.%m.%Y").unwrap();
        assert_eq!(format.parse("24.11.2024"), Some(ts(2024, 11, 24, 0, 0, 0)));
    }

    #[test]
    fn test_invalid_patterns_rejected() {
        assert!(TimestampFormat::new("").is_err());
        assert!(TimestampFormat::new("QQ/DD").is_err());
        assert!(TimestampFormat::new("%Q").is_err());
    }

    #[test]
    fn test_auto_format() {
        let format = TimestampFormat::new("auto").unwrap();
        assert_eq!(format.strftime(), None);
        assert_eq!(
            format.parse("2024-11-01 12:00:00"),
            Some(ts(2024, 11, 1, 12, 0, 0))
        );
        assert_eq!(format.parse("03/01/2022"), Some(ts(2022, 3, 1, 0, 0, 0)));
        assert_eq!(
            format.parse("2024-11-01T12:00:00+02:00"),
            Some(ts(2024, 11, 1, 10, 0, 0))
        );
        assert_eq!(format.parse("Invalid Date"), None);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("drop".parse::<TimestampPolicy>(), Ok(TimestampPolicy::Drop));
        assert_eq!(
            "SUBSTITUTE_DEFAULT".parse::<TimestampPolicy>(),
            Ok(TimestampPolicy::SubstituteDefault)
        );
        assert_eq!(
            "substitute-default".parse::<TimestampPolicy>(),
            Ok(TimestampPolicy::SubstituteDefault)
        );
        assert!("skip".parse::<TimestampPolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.sentinel_timestamp, ts(1970, 1, 1, 0, 0, 0));
        assert_eq!(config.defaults.delivery_address, "Unknown");
        assert_eq!(config.defaults.quantity, 0.0);
        assert_eq!(config.timestamp_policy, TimestampPolicy::SubstituteDefault);
    }

    #[test]
    fn test_config_serde_names() {
        let json = serde_json::json!({
            "timestamp_format": "YYYY-MM-DD HH:MM:SS",
            "timestamp_policy": "DROP",
            "defaults": { "loyalty_status": "None" }
        });
        let config: CleaningConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.timestamp_policy, TimestampPolicy::Drop);
        assert_eq!(config.timestamp_format.as_str(), "YYYY-MM-DD HH:MM:SS");
        assert_eq!(config.defaults.loyalty_status, "None");
        assert_eq!(config.defaults.delivery_address, "Unknown");

        let bad = serde_json::json!({ "timestamp_format": "QQ" });
        assert!(serde_json::from_value::<CleaningConfig>(bad).is_err());
    }
}
