use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// An ISO-8601 UTC instant as recorded in manifests and events.
///
/// Stored verbatim as a string so that values written by earlier versions
/// (or supplied by callers) round-trip byte-for-byte. New timestamps use
/// microsecond precision and a `Z` suffix, e.g. `2024-01-01T00:00:00.000000Z`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// The current wall-clock time in UTC.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Format a UTC datetime.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Parse and validate an RFC 3339 string. The original text is kept.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s).map_err(|e| TypeError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(s.to_string()))
    }

    /// The instant as a UTC datetime, if the stored text is valid RFC 3339.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn now_is_utc_with_z_suffix() {
        let ts = Timestamp::now();
        assert!(ts.as_str().ends_with('Z'));
        // Should be after 2020-01-01.
        let at = ts.to_datetime().unwrap();
        assert!(at.timestamp() > 1_577_836_800);
    }

    #[test]
    fn from_datetime_has_microsecond_precision() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Timestamp::from_datetime(at).as_str(),
            "2024-01-01T00:00:00.000000Z"
        );
    }

    #[test]
    fn parse_keeps_original_text() {
        let ts = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.as_str(), "2024-01-01T00:00:00Z");
        assert!(ts.to_datetime().is_some());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(TypeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn serde_is_transparent() {
        let ts = Timestamp::parse("2024-01-02T03:04:05Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-01-02T03:04:05Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
