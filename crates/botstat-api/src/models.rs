//! Typed records returned by the botstat.io endpoints

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Statistics snapshot for one bot, returned by the info endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub username: String,
    pub fullname: String,
    pub users_live: i64,
    pub users_die: i64,
    pub users_empty: i64,
    pub groups_live: i64,
    pub groups_die: i64,
    pub users_in_groups: i64,
    /// Demographic breakdown, present only when the service computed it.
    #[serde(default)]
    pub arabic: Option<String>,
    #[serde(default)]
    pub male: Option<String>,
    #[serde(default)]
    pub female: Option<String>,
    /// When the snapshot was taken. The service formats this as
    /// `"YYYY-MM-DD, HH:MM:SS"`; commas are stripped before parsing.
    #[serde(default, deserialize_with = "service_date")]
    pub date: Option<NaiveDateTime>,
}

/// Identifier of a newly created check task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskId {
    pub id: String,
}

/// Current state of a background check task.
///
/// The service does not document the full payload; fields beyond the
/// status string are kept in `extra` as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn service_date<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(text) => {
            let cleaned = text.replace(',', "");
            NaiveDateTime::parse_from_str(cleaned.trim(), "%Y-%m-%d %H:%M:%S")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}
