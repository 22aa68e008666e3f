use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One paper as returned by the search API and filtered for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "arxiv_id")]
    pub id: String,
    pub url: String,
    pub summary: String,
    #[serde(rename = "published", with = "minute_timestamp")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "updated", with = "minute_timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Name of the topic profile that produced this record.
    #[serde(rename = "category")]
    pub topic: String,
    #[serde(rename = "categories", default)]
    pub raw_categories: Vec<String>,
}

impl Paper {
    pub fn updated_display(&self) -> String {
        self.updated_at.format(minute_timestamp::FORMAT).to_string()
    }
}

/// Timestamps are stored as `YYYY-MM-DD HH:MM` in UTC.
pub mod minute_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, FORMAT) {
            return Ok(naive.and_utc());
        }
        // Accept full RFC 3339 as well, e.g. hand-edited files
        raw.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}
