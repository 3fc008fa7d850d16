//! Migration versions.
//!
//! A [`MigrationVersion`] is the UTC creation timestamp of a migration,
//! truncated to whole seconds. Independently authored migrations get
//! monotonic, collision-resistant versions without a central counter.
//!
//! Two textual forms exist:
//! - canonical: `2021-03-10T05:16:21Z` (stored in the ledger, sorts
//!   lexicographically in chronological order)
//! - file-safe: `2021-03-10T051621Z` (used in migration directory names)

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const FILE_SAFE_FORMAT: &str = "%Y-%m-%dT%H%M%SZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Unix timestamp of `0001-01-01T00:00:00Z`, the "no version" sentinel.
const ZERO_TIMESTAMP: i64 = -62_135_596_800;

/// Totally ordered, globally unique migration identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MigrationVersion(DateTime<Utc>);

impl MigrationVersion {
    /// Build a version from UTC calendar components.
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> CoreResult<Self> {
        let dt = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .ok_or_else(|| CoreError::InvalidVersion {
                value: format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"),
                reason: "not a valid calendar date and time".to_string(),
            })?;
        Self::from_datetime(dt)
    }

    /// Build a version from a UTC timestamp, dropping sub-second precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> CoreResult<Self> {
        let truncated = truncate_to_seconds(dt);
        if truncated.timestamp() == ZERO_TIMESTAMP {
            return Err(CoreError::InvalidVersion {
                value: truncated.format(CANONICAL_FORMAT).to_string(),
                reason: "the zero timestamp is reserved".to_string(),
            });
        }
        Ok(Self(truncated))
    }

    /// Version for a migration created right now.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Parse any accepted textual form.
    ///
    /// Accepts RFC 3339 with any offset (normalized to UTC), the file-safe
    /// form, and a bare `YYYY-MM-DD` date (midnight UTC).
    pub fn parse(value: &str) -> CoreResult<Self> {
        let trimmed = value.trim();
        let dt = if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            dt.with_timezone(&Utc)
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, FILE_SAFE_FORMAT) {
            Utc.from_utc_datetime(&naive)
        } else if let Some(naive) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            Utc.from_utc_datetime(&naive)
        } else {
            return Err(CoreError::InvalidVersion {
                value: value.to_string(),
                reason: "expected RFC 3339 (2021-03-10T05:16:21Z), file-safe \
                         (2021-03-10T051621Z), or a date (2021-03-10)"
                    .to_string(),
            });
        };
        Self::from_datetime(dt)
    }

    /// Parse only the file-safe form used in migration directory names.
    pub fn parse_file_safe(value: &str) -> CoreResult<Self> {
        let naive = NaiveDateTime::parse_from_str(value, FILE_SAFE_FORMAT).map_err(|e| {
            CoreError::InvalidVersion {
                value: value.to_string(),
                reason: format!("expected YYYY-MM-DDTHHMMSSZ: {e}"),
            }
        })?;
        Self::from_datetime(Utc.from_utc_datetime(&naive))
    }

    /// The underlying UTC timestamp.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// File-safe form, e.g. `2021-03-10T051621Z`.
    pub fn to_file_safe(&self) -> String {
        self.0.format(FILE_SAFE_FORMAT).to_string()
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl FromStr for MigrationVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MigrationVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MigrationVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
