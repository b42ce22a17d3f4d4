use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::classifier;

/// A single captured note.
///
/// Serialized field names follow the browser storage layout the
/// tool started with (`type`, `timestamp`), so old dumps load as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Creation time in epoch milliseconds, unique within a collection
    pub id: i64,

    /// Trimmed, never empty
    pub text: String,

    #[serde(rename = "type")]
    pub category: Category,

    /// Immutable once set
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub completed: bool,
}

impl Entry {
    /// Build a fresh entry from already-trimmed text, classifying it.
    pub fn new(id: i64, text: String, created_at: DateTime<Utc>) -> Self {
        let category = classifier::classify(&text);
        Entry {
            id,
            text,
            category,
            created_at,
            completed: false,
        }
    }

    /// Status label used in listings and exports
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            "Завершено"
        } else {
            "Активно"
        }
    }

    /// Creation time rendered the way the ru-RU locale prints it
    /// ("16.10.2026, 14:05:09"), in the given timezone.
    pub fn formatted_timestamp_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        self.created_at
            .with_timezone(tz)
            .format("%d.%m.%Y, %H:%M:%S")
            .to_string()
    }

    /// Creation time in the machine's local timezone
    pub fn formatted_timestamp(&self) -> String {
        self.formatted_timestamp_in(&chrono::Local)
    }
}

/// Pick an id for a new entry: the creation millisecond, bumped past any
/// id already in use so ids stay unique even for same-millisecond adds.
/// `None` once the largest id in use is `i64::MAX`.
pub fn next_id(now: DateTime<Utc>, existing: &[Entry]) -> Option<i64> {
    let millis = now.timestamp_millis();
    match existing.iter().map(|e| e.id).max() {
        Some(max) if max >= millis => max.checked_add(1),
        _ => Some(millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_new_entry_is_classified_and_open() {
        let entry = Entry::new(1, "Купить молоко".to_string(), at(1));
        assert_eq!(entry.category, Category::Purchase);
        assert!(!entry.completed);
        assert_eq!(entry.status_label(), "Активно");
    }

    #[test]
    fn test_formatted_timestamp() {
        let created = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let entry = Entry::new(1, "x".to_string(), created);
        assert_eq!(entry.formatted_timestamp_in(&Utc), "05.03.2024, 07:08:09");
    }

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(at(1_000), &[]), Some(1_000));

        let existing = vec![Entry::new(1_000, "a".to_string(), at(1_000))];
        assert_eq!(next_id(at(1_000), &existing), Some(1_001));
        assert_eq!(next_id(at(5_000), &existing), Some(5_000));
    }

    #[test]
    fn test_next_id_at_max_does_not_overflow() {
        let existing = vec![Entry::new(i64::MAX, "a".to_string(), at(1_000))];
        assert_eq!(next_id(at(1_000), &existing), None);
    }

    #[test]
    fn test_json_layout() {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let entry = Entry::new(1704164645000, "Позвонить маме".to_string(), created);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["type"], "task");
        assert_eq!(json["text"], "Позвонить маме");
        assert_eq!(json["completed"], false);
        assert!(json["timestamp"].as_str().unwrap().starts_with("2024-01-02T03:04:05"));
    }

    #[test]
    fn test_loads_browser_dump() {
        let raw = r#"{"id":1700000000000,"text":"Идея","type":"idea","timestamp":"2023-11-14T22:13:20.000Z","completed":true}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.id, 1700000000000);
        assert_eq!(entry.category, Category::Idea);
        assert!(entry.completed);
        assert_eq!(entry.created_at.timestamp_millis(), 1700000000000);
    }
}
