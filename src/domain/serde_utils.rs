//! Serde helpers for the loosely typed API payloads.

use serde::de::{self, Visitor};
use serde::Deserializer;
use std::fmt;

/// Ids that arrive either as JSON strings or integers, normalised to a string.
pub mod flexible_id {
    use super::{de, fmt, Deserializer, Visitor};

    struct StringOrIntVisitor;

    impl Visitor<'_> for StringOrIntVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-empty string or an integer id")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let value = value.trim();
            if value.is_empty() {
                return Err(de::Error::custom("empty id"));
            }
            Ok(value.to_string())
        }
    }

    /// Deserializes an id from a string or number.
    ///
    /// # Errors
    ///
    /// Returns an error for empty strings and non-scalar values.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StringOrIntVisitor)
    }

    /// Optional variant; `null` maps to `None`.
    pub mod option {
        use super::{de, fmt, Deserializer, StringOrIntVisitor, Visitor};

        /// Deserializes an optional id.
        ///
        /// # Errors
        ///
        /// Returns an error if a present value is not a usable id.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct OptionVisitor;

            impl<'de> Visitor<'de> for OptionVisitor {
                type Value = Option<String>;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("an optional id")
                }

                fn visit_none<E>(self) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(None)
                }

                fn visit_unit<E>(self) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(None)
                }

                fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    deserializer.deserialize_any(StringOrIntVisitor).map(Some)
                }
            }

            deserializer.deserialize_option(OptionVisitor)
        }
    }
}

/// Timestamps as RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or epoch
/// seconds/milliseconds.
pub mod flexible_timestamp {
    use super::{de, fmt, Deserializer, Visitor};
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

    const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const MILLIS_THRESHOLD: i64 = 10_000_000_000;

    /// Parses the textual forms accepted by this module.
    #[must_use]
    pub fn parse_str(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(value, SQL_FORMAT)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    /// Interprets an epoch value, guessing milliseconds for large numbers.
    #[must_use]
    pub fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
        if value.abs() >= MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(value)
        } else {
            DateTime::from_timestamp(value, 0)
        }
    }

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a timestamp string or epoch number")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            from_epoch(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("epoch out of range: {value}")))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let value = i64::try_from(value).map_err(de::Error::custom)?;
            self.visit_i64(value)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse_str(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp: {value}")))
        }
    }

    /// Deserializes an optional timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value is not a recognised timestamp.
    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(TimestampVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Ids {
        #[serde(deserialize_with = "flexible_id::deserialize")]
        id: String,
        #[serde(default, deserialize_with = "flexible_id::option::deserialize")]
        other: Option<String>,
    }

    #[derive(Deserialize)]
    struct Stamp {
        #[serde(default, deserialize_with = "flexible_timestamp::option")]
        at: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[test]
    fn test_id_from_number_and_string() {
        let ids: Ids = serde_json::from_str(r#"{"id": 17, "other": "abc"}"#).unwrap();
        assert_eq!(ids.id, "17");
        assert_eq!(ids.other.as_deref(), Some("abc"));

        let ids: Ids = serde_json::from_str(r#"{"id": " 9 ", "other": null}"#).unwrap();
        assert_eq!(ids.id, "9");
        assert!(ids.other.is_none());
    }

    #[test]
    fn test_empty_id_is_rejected() {
        assert!(serde_json::from_str::<Ids>(r#"{"id": ""}"#).is_err());
        assert!(serde_json::from_str::<Ids>(r#"{"id": [1]}"#).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let rfc: Stamp = serde_json::from_str(r#"{"at": "2024-05-01T10:30:00+02:00"}"#).unwrap();
        assert_eq!(rfc.at.unwrap().hour(), 8);

        let sql: Stamp = serde_json::from_str(r#"{"at": "2024-05-01 10:30:00"}"#).unwrap();
        assert_eq!(sql.at.unwrap().hour(), 10);

        let secs: Stamp = serde_json::from_str(r#"{"at": 1714559400}"#).unwrap();
        let millis: Stamp = serde_json::from_str(r#"{"at": 1714559400000}"#).unwrap();
        assert_eq!(secs.at, millis.at);
        assert_eq!(secs.at.unwrap().year(), 2024);

        let missing: Stamp = serde_json::from_str("{}").unwrap();
        assert!(missing.at.is_none());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        assert!(serde_json::from_str::<Stamp>(r#"{"at": "yesterday"}"#).is_err());
    }
}
