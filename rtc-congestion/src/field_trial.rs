//! Field trials: string-keyed experiment configuration.
//!
//! A field trial string is a sequence of `Name/Value/` pairs, e.g.
//! `"WebRTC-Bwe-ScreamV2/MinRefWindow:6000,VirtualRtt:20ms/"`. The value of a
//! trial group is itself a comma separated list of `Key:Value` parameters
//! which the consumer of the group parses into typed settings.

use std::collections::HashMap;
use std::str::FromStr;

use units::{DataRate, DataSize, TimeDelta};

use crate::error::{Error, Result};

/// Read access to field trial groups.
pub trait FieldTrialsView: Send + Sync {
    /// Returns the value of `key`, or an empty string if it is not set.
    fn lookup(&self, key: &str) -> String;

    fn is_enabled(&self, key: &str) -> bool {
        self.lookup(key).starts_with("Enabled")
    }

    fn is_disabled(&self, key: &str) -> bool {
        self.lookup(key).starts_with("Disabled")
    }
}

/// Field trials parsed from a `Name/Value/` string.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct FieldTrials {
    key_value_map: HashMap<String, String>,
}

impl FieldTrials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `s`. When a key is repeated the first value wins.
    pub fn parse(s: &str) -> Result<Self> {
        let mut key_value_map = HashMap::new();
        let mut rest = s;
        while !rest.is_empty() {
            let (key, after_key) = rest
                .split_once('/')
                .ok_or_else(|| Error::ErrFieldTrialMissingSeparator(rest.to_owned()))?;
            if key.is_empty() {
                return Err(Error::ErrFieldTrialEmptyKey);
            }
            let (value, after_value) = after_key
                .split_once('/')
                .ok_or_else(|| Error::ErrFieldTrialMissingSeparator(after_key.to_owned()))?;
            if value.is_empty() {
                return Err(Error::ErrFieldTrialEmptyValue(key.to_owned()));
            }
            key_value_map
                .entry(key.to_owned())
                .or_insert_with(|| value.to_owned());
            rest = after_value;
        }
        Ok(Self { key_value_map })
    }

    /// Sets or replaces a single trial group.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.key_value_map.insert(key.into(), value.into());
    }
}

impl FromStr for FieldTrials {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FieldTrialsView for FieldTrials {
    fn lookup(&self, key: &str) -> String {
        self.key_value_map.get(key).cloned().unwrap_or_default()
    }
}

/// Splits a trial group value into its `Key:Value` parameters.
pub(crate) fn split_parameters(group: &str) -> impl Iterator<Item = Result<(&str, &str)>> {
    group
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(key, value)| (key.trim(), value.trim()))
                .ok_or_else(|| Error::ErrFieldTrialFormat(entry.to_owned()))
        })
}

/// A value that can be read from a field trial parameter.
pub trait FieldTrialValue: Sized {
    fn parse_value(value: &str) -> Option<Self>;
}

impl FieldTrialValue for f64 {
    fn parse_value(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FieldTrialValue for i32 {
    fn parse_value(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FieldTrialValue for bool {
    fn parse_value(value: &str) -> Option<Self> {
        match value {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

/// Splits `"100ms"` or `"100 ms"` into its number and unit.
fn split_unit(value: &str) -> Option<(f64, &str)> {
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let number = value[..end].parse().ok()?;
    Some((number, value[end..].trim()))
}

impl FieldTrialValue for TimeDelta {
    fn parse_value(value: &str) -> Option<Self> {
        if value == "inf" {
            return Some(TimeDelta::plus_infinity());
        }
        let (number, unit) = split_unit(value)?;
        match unit {
            "" | "ms" => Some(TimeDelta::from_millis_f64(number)),
            "s" => Some(TimeDelta::from_seconds_f64(number)),
            "us" => Some(TimeDelta::from_seconds_f64(number / 1_000_000.0)),
            "min" => Some(TimeDelta::from_seconds_f64(number * 60.0)),
            _ => None,
        }
    }
}

impl FieldTrialValue for DataSize {
    fn parse_value(value: &str) -> Option<Self> {
        let (number, unit) = split_unit(value)?;
        match unit {
            "" | "B" | "bytes" => Some(DataSize::from_bytes(number.round() as i64)),
            _ => None,
        }
    }
}

impl FieldTrialValue for DataRate {
    fn parse_value(value: &str) -> Option<Self> {
        if value == "inf" {
            return Some(DataRate::plus_infinity());
        }
        let (number, unit) = split_unit(value)?;
        match unit {
            "" | "kbps" => Some(DataRate::from_bps((number * 1_000.0).round() as i64)),
            "bps" => Some(DataRate::from_bps(number.round() as i64)),
            _ => None,
        }
    }
}

/// Parses `value` for parameter `key`.
pub(crate) fn parse_parameter<T: FieldTrialValue>(key: &str, value: &str) -> Result<T> {
    T::parse_value(value).ok_or_else(|| Error::ErrFieldTrialValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_trials_parse() {
        let trials =
            FieldTrials::parse("WebRTC-Bwe-ScreamV2/MinRefWindow:6000/Other/Enabled/").unwrap();
        assert_eq!(trials.lookup("WebRTC-Bwe-ScreamV2"), "MinRefWindow:6000");
        assert!(trials.is_enabled("Other"));
        assert!(!trials.is_disabled("Other"));
        assert_eq!(trials.lookup("Missing"), "");
    }

    #[test]
    fn test_field_trials_first_value_wins() {
        let trials = FieldTrials::parse("A/1/A/2/").unwrap();
        assert_eq!(trials.lookup("A"), "1");
    }

    #[test]
    fn test_field_trials_parse_errors() {
        assert_eq!(
            FieldTrials::parse("NoSeparator"),
            Err(Error::ErrFieldTrialMissingSeparator("NoSeparator".to_owned()))
        );
        assert_eq!(FieldTrials::parse("/x/"), Err(Error::ErrFieldTrialEmptyKey));
        assert_eq!(
            FieldTrials::parse("Key//"),
            Err(Error::ErrFieldTrialEmptyValue("Key".to_owned()))
        );
        assert!("Key/Value".parse::<FieldTrials>().is_err());
    }

    #[test]
    fn test_split_parameters() {
        let params: Vec<_> = split_parameters("A:1, B : 2ms,,").collect();
        assert_eq!(params, vec![Ok(("A", "1")), Ok(("B", "2ms"))]);

        let params: Vec<_> = split_parameters("Broken").collect();
        assert_eq!(params, vec![Err(Error::ErrFieldTrialFormat("Broken".to_owned()))]);
    }

    #[test]
    fn test_parse_values_with_units() {
        assert_eq!(TimeDelta::parse_value("25ms"), Some(TimeDelta::from_millis(25)));
        assert_eq!(TimeDelta::parse_value("25"), Some(TimeDelta::from_millis(25)));
        assert_eq!(TimeDelta::parse_value("1 s"), Some(TimeDelta::from_seconds(1)));
        assert_eq!(TimeDelta::parse_value("1min"), Some(TimeDelta::from_minutes(1)));
        assert_eq!(TimeDelta::parse_value("500us"), Some(TimeDelta::from_micros(500)));
        assert_eq!(TimeDelta::parse_value("fast"), None);

        assert_eq!(DataSize::parse_value("3000"), Some(DataSize::from_bytes(3000)));
        assert_eq!(DataSize::parse_value("1200 bytes"), Some(DataSize::from_bytes(1200)));
        assert_eq!(DataSize::parse_value("3kB"), None);

        assert_eq!(DataRate::parse_value("300kbps"), Some(DataRate::from_kbps(300)));
        assert_eq!(DataRate::parse_value("inf"), Some(DataRate::plus_infinity()));

        assert_eq!(bool::parse_value("1"), Some(true));
        assert_eq!(bool::parse_value("false"), Some(false));
        assert_eq!(f64::parse_value("0.0625"), Some(0.0625));
        assert_eq!(i32::parse_value("-3"), Some(-3));
    }

    #[test]
    fn test_parse_parameter_error() {
        assert_eq!(
            parse_parameter::<f64>("BetaLoss", "high"),
            Err(Error::ErrFieldTrialValue {
                key: "BetaLoss".to_owned(),
                value: "high".to_owned(),
            })
        );
    }
}
