use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::de::Error as DeError;
use serde::ser::Error as SerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Point in time, always held in UTC.
///
/// Provider payloads may carry any RFC3339 offset; values are shifted to UTC
/// on the way in so comparisons and cache payloads stay canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Wall-clock time `offset` from now, used for breaker retry estimates.
    pub fn now_plus(offset: Duration) -> Self {
        Self(OffsetDateTime::now_utc() + offset)
    }

    /// Midnight UTC at the start of `date` (statement period ends).
    pub fn at_midnight(date: Date) -> Self {
        Self(date.midnight().assume_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        OffsetDateTime::parse(input.trim(), &Rfc3339)
            .map(Self::from)
            .map_err(|_| ValidationError::InvalidTimestamp {
                value: input.to_owned(),
            })
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// `None` outside the years RFC3339 can express (0000-9999).
    pub fn to_rfc3339(self) -> Option<String> {
        self.0.format(&Rfc3339).ok()
    }
}

impl From<OffsetDateTime> for UtcDateTime {
    fn from(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_rfc3339() {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = self
            .to_rfc3339()
            .ok_or_else(|| S::Error::custom("timestamp year outside RFC3339 range"))?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn offsets_are_shifted_to_utc() {
        let parsed = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect("valid rfc3339");
        assert_eq!(parsed.to_rfc3339().as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(parsed, UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid"));
    }

    #[test]
    fn rejects_text_that_is_not_rfc3339() {
        let err = UtcDateTime::parse("2024-01-01 00:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidTimestamp { .. }));
    }

    #[test]
    fn period_end_is_midnight_utc() {
        let date = Date::from_calendar_date(2023, Month::June, 30).expect("valid date");
        let end = UtcDateTime::at_midnight(date);
        assert_eq!(end.to_string(), "2023-06-30T00:00:00Z");
        assert_eq!(end.year(), 2023);
    }

    #[test]
    fn now_plus_moves_forward() {
        let later = UtcDateTime::now_plus(Duration::from_secs(3_600));
        assert!(later > UtcDateTime::now());
    }
}
