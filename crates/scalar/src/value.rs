//! The scalar value type and its bag encoding.

use crate::error::{Error, Result};
use crate::text::{format_duration, format_timestamp, parse_duration, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Which primitive kind a value holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int64,
    Float64,
    String,
    Duration,
    Timestamp,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Bool,
        ValueKind::Int64,
        ValueKind::Float64,
        ValueKind::String,
        ValueKind::Duration,
        ValueKind::Timestamp,
    ];

    /// Name of the bag slot holding this kind.
    pub fn slot(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int64 => "int64",
            ValueKind::Float64 => "float64",
            ValueKind::String => "string",
            ValueKind::Duration => "duration",
            ValueKind::Timestamp => "timestamp",
        }
    }

    pub fn from_slot(slot: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slot() == slot)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot())
    }
}

/// Exactly one typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    /// Signed nanoseconds
    Duration(i64),
    Timestamp(DateTime<Utc>),
}

impl ScalarValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ScalarValue::Bool(_) => ValueKind::Bool,
            ScalarValue::Int64(_) => ValueKind::Int64,
            ScalarValue::Float64(_) => ValueKind::Float64,
            ScalarValue::String(_) => ValueKind::String,
            ScalarValue::Duration(_) => ValueKind::Duration,
            ScalarValue::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Decode the single populated slot of `bag`.
    ///
    /// # Example
    ///
    /// ```
    /// use scalar::{ScalarValue, ValueBag};
    ///
    /// let bag = ValueBag {
    ///     duration: Some("10m".to_string()),
    ///     ..Default::default()
    /// };
    /// let value = ScalarValue::decode(&bag)?;
    /// assert_eq!(value, ScalarValue::Duration(600_000_000_000));
    /// assert_eq!(value.encode()?, bag);
    /// # Ok::<(), scalar::Error>(())
    /// ```
    pub fn decode(bag: &ValueBag) -> Result<Self> {
        let slots = bag.populated();
        match slots.len() {
            0 => return Err(Error::NoValue),
            1 => {}
            _ => return Err(Error::AmbiguousValue { slots }),
        }

        let value = match bag {
            ValueBag { bool: Some(b), .. } => ScalarValue::Bool(*b),
            ValueBag { int64: Some(i), .. } => ScalarValue::Int64(*i),
            ValueBag { float64: Some(f), .. } => ScalarValue::Float64(*f),
            ValueBag { string: Some(s), .. } => ScalarValue::String(s.clone()),
            ValueBag {
                duration: Some(d), ..
            } => ScalarValue::Duration(parse_duration(d)?),
            ValueBag {
                timestamp: Some(t), ..
            } => ScalarValue::Timestamp(parse_timestamp(t)?),
            _ => return Err(Error::NoValue),
        };
        Ok(value)
    }

    /// Encode into a bag with exactly the matching slot set.
    ///
    /// Non-finite floats have no representation in a bag and are rejected.
    pub fn encode(&self) -> Result<ValueBag> {
        let mut bag = ValueBag::default();
        match self {
            ScalarValue::Bool(b) => bag.bool = Some(*b),
            ScalarValue::Int64(i) => bag.int64 = Some(*i),
            ScalarValue::Float64(f) => {
                if !f.is_finite() {
                    return Err(Error::InvalidState {
                        reason: format!("float64 value {f} is not finite"),
                    });
                }
                bag.float64 = Some(*f);
            }
            ScalarValue::String(s) => bag.string = Some(s.clone()),
            ScalarValue::Duration(d) => bag.duration = Some(format_duration(*d)),
            ScalarValue::Timestamp(t) => bag.timestamp = Some(format_timestamp(t)),
        }
        Ok(bag)
    }

    /// Parse `text` as a value of `kind`.
    ///
    /// Accepts the same text [`Display`](fmt::Display) produces, so
    /// `ScalarValue::parse(v.kind(), &v.to_string())` gives back `v`.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidText {
            kind,
            input: text.to_string(),
            reason,
        };
        let value = match kind {
            ValueKind::Bool => {
                ScalarValue::Bool(text.parse().map_err(|e| invalid(format!("{e}")))?)
            }
            ValueKind::Int64 => {
                ScalarValue::Int64(text.parse().map_err(|e| invalid(format!("{e}")))?)
            }
            ValueKind::Float64 => {
                ScalarValue::Float64(text.parse().map_err(|e| invalid(format!("{e}")))?)
            }
            ValueKind::String => ScalarValue::String(text.to_string()),
            ValueKind::Duration => ScalarValue::Duration(parse_duration(text)?),
            ValueKind::Timestamp => ScalarValue::Timestamp(parse_timestamp(text)?),
        };
        Ok(value)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int64(i) => write!(f, "{i}"),
            ScalarValue::Float64(x) => write!(f, "{x}"),
            ScalarValue::String(s) => f.write_str(s),
            ScalarValue::Duration(d) => f.write_str(&format_duration(*d)),
            ScalarValue::Timestamp(t) => f.write_str(&format_timestamp(t)),
        }
    }
}

impl TryFrom<ValueBag> for ScalarValue {
    type Error = Error;

    fn try_from(bag: ValueBag) -> Result<Self> {
        Self::decode(&bag)
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.encode()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let bag = ValueBag::deserialize(deserializer)?;
        Self::decode(&bag).map_err(serde::de::Error::custom)
    }
}

/// External shape of a value: six optional slots, one of which should be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueBag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bool: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int64: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float64: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    /// Duration text such as `"10m"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// RFC 3339 timestamp text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ValueBag {
    /// Kinds whose slot is set, in slot order.
    pub fn populated(&self) -> Vec<ValueKind> {
        let flags = [
            (ValueKind::Bool, self.bool.is_some()),
            (ValueKind::Int64, self.int64.is_some()),
            (ValueKind::Float64, self.float64.is_some()),
            (ValueKind::String, self.string.is_some()),
            (ValueKind::Duration, self.duration.is_some()),
            (ValueKind::Timestamp, self.timestamp.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(kind, set)| set.then_some(kind))
            .collect()
    }

    /// Whether two bags hold the same value.
    ///
    /// Durations and timestamps compare by what they denote, so `"90s"` and
    /// `"1m30s"` are equivalent. Bags that do not decode compare field by
    /// field.
    pub fn equivalent(&self, other: &Self) -> bool {
        match (ScalarValue::decode(self), ScalarValue::decode(other)) {
            (Ok(a), Ok(b)) => a == b,
            _ => self == other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bag_with(kind: ValueKind, text: &str) -> ValueBag {
        let mut bag = ValueBag::default();
        match kind {
            ValueKind::Bool => bag.bool = Some(text.parse().unwrap()),
            ValueKind::Int64 => bag.int64 = Some(text.parse().unwrap()),
            ValueKind::Float64 => bag.float64 = Some(text.parse().unwrap()),
            ValueKind::String => bag.string = Some(text.to_string()),
            ValueKind::Duration => bag.duration = Some(text.to_string()),
            ValueKind::Timestamp => bag.timestamp = Some(text.to_string()),
        }
        bag
    }

    #[test]
    fn test_decode_each_kind() {
        assert_eq!(
            ScalarValue::decode(&bag_with(ValueKind::Bool, "true")).unwrap(),
            ScalarValue::Bool(true)
        );
        assert_eq!(
            ScalarValue::decode(&bag_with(ValueKind::Int64, "-42")).unwrap(),
            ScalarValue::Int64(-42)
        );
        assert_eq!(
            ScalarValue::decode(&bag_with(ValueKind::Float64, "0.25")).unwrap(),
            ScalarValue::Float64(0.25)
        );
        assert_eq!(
            ScalarValue::decode(&bag_with(ValueKind::String, "")).unwrap(),
            ScalarValue::String(String::new())
        );
        assert_eq!(
            ScalarValue::decode(&bag_with(ValueKind::Duration, "2h")).unwrap(),
            ScalarValue::Duration(7_200_000_000_000)
        );
        assert_eq!(
            ScalarValue::decode(&bag_with(ValueKind::Timestamp, "2024-03-01T12:30:00Z")).unwrap(),
            ScalarValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_encode_reproduces_single_slot_bags() {
        let cases = [
            (ValueKind::Bool, "false"),
            (ValueKind::Int64, "9000"),
            (ValueKind::Float64, "1.5"),
            (ValueKind::String, "p99"),
            (ValueKind::Duration, "10m"),
            (ValueKind::Duration, "1h30m"),
            (ValueKind::Timestamp, "2024-03-01T12:30:00Z"),
        ];
        for (kind, text) in cases {
            let bag = bag_with(kind, text);
            let value = ScalarValue::decode(&bag).unwrap();
            assert_eq!(value.kind(), kind);
            assert_eq!(value.encode().unwrap(), bag, "{kind} {text}");
        }
    }

    #[test]
    fn test_non_canonical_input_is_equivalent() {
        let bag = bag_with(ValueKind::Duration, "90s");
        let encoded = ScalarValue::decode(&bag).unwrap().encode().unwrap();
        assert_eq!(encoded.duration.as_deref(), Some("1m30s"));
        assert!(encoded.equivalent(&bag));
    }

    #[test]
    fn test_no_value() {
        assert_eq!(ScalarValue::decode(&ValueBag::default()), Err(Error::NoValue));
    }

    #[test]
    fn test_ambiguous_names_every_slot() {
        let bag = ValueBag {
            bool: Some(true),
            string: Some("x".to_string()),
            duration: Some("1s".to_string()),
            ..Default::default()
        };
        let err = ScalarValue::decode(&bag).unwrap_err();
        assert_eq!(
            err,
            Error::AmbiguousValue {
                slots: vec![ValueKind::Bool, ValueKind::String, ValueKind::Duration],
            }
        );
        assert!(err.to_string().ends_with("bool, string, duration"));
    }

    #[test]
    fn test_bad_duration_text() {
        let err = ScalarValue::decode(&bag_with(ValueKind::Duration, "soon")).unwrap_err();
        assert!(matches!(err, Error::InvalidDuration { .. }));
    }

    #[test]
    fn test_non_finite_float_is_invalid_state() {
        let err = ScalarValue::Float64(f64::NAN).encode().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_serde_bag_shape() {
        let value: ScalarValue = serde_json::from_str(r#"{"duration": "5m"}"#).unwrap();
        assert_eq!(value, ScalarValue::Duration(300_000_000_000));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"duration":"5m"}"#);

        let err = serde_json::from_str::<ScalarValue>(r#"{"int64": 1, "bool": true}"#).unwrap_err();
        assert!(err.to_string().contains("ambiguous value"));

        assert!(serde_json::from_str::<ValueBag>(r#"{"decimal": 1}"#).is_err());
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(
            ScalarValue::parse(ValueKind::Duration, "2h"),
            Ok(ScalarValue::Duration(7_200_000_000_000))
        );
        assert_eq!(
            ScalarValue::parse(ValueKind::Bool, "true"),
            Ok(ScalarValue::Bool(true))
        );
        assert_eq!(
            ScalarValue::parse(ValueKind::String, "o:user:1"),
            Ok(ScalarValue::String("o:user:1".to_string()))
        );

        let err = ScalarValue::parse(ValueKind::Int64, "1.5").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidText {
                kind: ValueKind::Int64,
                ..
            }
        ));
        assert!(err.to_string().starts_with("invalid int64 value \"1.5\""));
    }

    #[test]
    fn test_parse_accepts_display_output() {
        let values = [
            ScalarValue::Int64(-3),
            ScalarValue::Float64(2.5),
            ScalarValue::Duration(90_000_000_000),
            ScalarValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        ];
        for value in values {
            assert_eq!(ScalarValue::parse(value.kind(), &value.to_string()), Ok(value));
        }
    }

    #[test]
    fn test_slot_names() {
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_slot(kind.slot()), Some(kind));
        }
        assert_eq!(ValueKind::from_slot("decimal"), None);
    }
}
