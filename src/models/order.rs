use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Context, ItemId, UserId};

/// A historical order. Never modified once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub timestamp: DateTime<Utc>,
    /// Explicit rating on the 1..=5 scale; `None` for implicit feedback
    pub rating: Option<f64>,
    /// Weather and mood recorded at order time, when both are known
    pub context: Option<Context>,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<UserId>,
        item_id: impl Into<ItemId>,
        timestamp: DateTime<Utc>,
        rating: Option<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            item_id: item_id.into(),
            timestamp,
            rating,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// Parses the timestamp formats found in stored orders
///
/// Accepts RFC 3339 as well as naive `YYYY-MM-DD HH:MM:SS[.ffffff]` values,
/// which are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-09T18:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09 18:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09 18:30:00.000000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09 18:30"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
