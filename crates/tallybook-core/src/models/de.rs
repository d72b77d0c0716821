//! Lenient deserializers for API fields.
//!
//! The server is inconsistent about encodings: ids arrive as numbers or
//! strings, amounts as numbers or decimal strings, `status` as a bool or
//! a "True"/"False" string.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};

struct StringOrNumberVisitor;

impl<'de> Visitor<'de> for StringOrNumberVisitor {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string or number")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        let v = v.trim();
        if v.is_empty() {
            Ok(None)
        } else {
            Ok(Some(v.to_string()))
        }
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

/// String or number as `Option<String>`; empty strings and null become `None`.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(StringOrNumberVisitor)
}

/// Required identifier encoded as a string or number.
pub(crate) fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_number(deserializer)?.ok_or_else(|| de::Error::custom("missing identifier"))
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number or decimal string")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v as f64)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v as f64)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let v = v.trim();
        if v.is_empty() {
            return Ok(0.0);
        }
        v.parse::<f64>()
            .map_err(|_| E::custom(format!("invalid amount '{}'", v)))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(0.0)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(0.0)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

/// Monetary amount as a number or decimal string; null and "" are zero.
pub(crate) fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(AmountVisitor)
}

struct BoolVisitor;

impl<'de> Visitor<'de> for BoolVisitor {
    type Value = bool;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a boolean or string 'True'/'False'")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v != 0)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v != 0)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(matches!(v.to_lowercase().as_str(), "true" | "success" | "ok"))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(false)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(false)
    }
}

/// Flag that may be a bool, 0/1, or a "True"/"False" string.
pub(crate) fn bool_like<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(BoolVisitor)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "super::string_or_number")]
        id: Option<String>,
        #[serde(default, deserialize_with = "super::amount")]
        amount: f64,
        #[serde(default, deserialize_with = "super::bool_like")]
        status: bool,
    }

    #[test]
    fn test_string_or_number_variants() {
        let p: Probe = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(p.id.as_deref(), Some("42"));
        let p: Probe = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(p.id.as_deref(), Some("abc"));
        let p: Probe = serde_json::from_str(r#"{"id": ""}"#).unwrap();
        assert_eq!(p.id, None);
        let p: Probe = serde_json::from_str(r#"{"id": null}"#).unwrap();
        assert_eq!(p.id, None);
    }

    #[test]
    fn test_amount_accepts_decimal_strings() {
        let p: Probe = serde_json::from_str(r#"{"amount": "1250.50"}"#).unwrap();
        assert_eq!(p.amount, 1250.5);
        let p: Probe = serde_json::from_str(r#"{"amount": 300}"#).unwrap();
        assert_eq!(p.amount, 300.0);
        let p: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.amount, 0.0);
        assert!(serde_json::from_str::<Probe>(r#"{"amount": "lots"}"#).is_err());
    }

    #[test]
    fn test_bool_like() {
        let p: Probe = serde_json::from_str(r#"{"status": "True"}"#).unwrap();
        assert!(p.status);
        let p: Probe = serde_json::from_str(r#"{"status": 0}"#).unwrap();
        assert!(!p.status);
        let p: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert!(!p.status);
    }
}
