use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::time::parse_time_minutes;

/// One schedulable record: an appointment or an administrative block.
///
/// Field names follow the scheduling service's JSON payload. Date, times
/// and ids are kept as raw text whatever JSON type they arrive as, so a
/// bad value degrades one entry instead of failing the whole load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(deserialize_with = "required_text")]
    pub id: String,

    #[serde(default, deserialize_with = "text_or_empty")]
    pub date: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub start_time: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub end_time: Option<String>,

    #[serde(default)]
    pub is_blocked: bool,

    #[serde(default, deserialize_with = "lenient_text")]
    pub resource_id: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Entry {
    pub fn new(id: &str, date: &str, start_time: &str, end_time: &str) -> Self {
        Self {
            id: id.to_string(),
            date: date.to_string(),
            start_time: Some(start_time.to_string()),
            end_time: Some(end_time.to_string()),
            is_blocked: false,
            resource_id: None,
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn blocked(mut self) -> Self {
        self.is_blocked = true;
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    /// Calendar day of the entry; `None` when the date is not `YYYY-MM-DD`.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }
}

/// Strings pass through; other scalars and containers keep their JSON
/// text so the time parser can flag them. `null` reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_text(deserializer)?.ok_or_else(|| D::Error::custom("entry id must not be null"))
}

/// Parses a JSON array of entries. Elements that cannot form an entry at
/// all (no id, not an object) are logged and dropped one by one; the rest
/// of the array still loads.
#[tracing::instrument(skip(text))]
pub fn parse_entries(text: &str) -> anyhow::Result<Vec<Entry>> {
    let values: Vec<Value> =
        serde_json::from_str(text).context("entries must be a JSON array of entry objects")?;

    let total = values.len();
    let mut entries = Vec::with_capacity(total);
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<Entry>(value) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(index, error = %err, "dropping unreadable entry record"),
        }
    }
    debug!(total, kept = entries.len(), "parsed entries");
    Ok(entries)
}

/// Reads entries from a JSON file, or from stdin when `path` is `-`.
#[tracing::instrument]
pub fn load_entries(path: &Path) -> anyhow::Result<Vec<Entry>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read entries from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };

    let entries = parse_entries(&text)?;
    info!(count = entries.len(), "loaded entries");
    Ok(entries)
}

/// Keeps entries assigned to one of `selected`. An empty selection keeps
/// everything.
pub fn filter_by_resource(entries: Vec<Entry>, selected: &[String]) -> Vec<Entry> {
    if selected.is_empty() {
        return entries;
    }

    let before = entries.len();
    let kept: Vec<Entry> = entries
        .into_iter()
        .filter(|entry| {
            entry
                .resource_id
                .as_ref()
                .is_some_and(|id| selected.contains(id))
        })
        .collect();
    debug!(before, after = kept.len(), "filtered entries by resource");
    kept
}

/// Blocked entries on `date` whose span covers the slot starting at
/// `slot_minutes`, optionally limited to one resource.
pub fn blocked_at<'a>(
    entries: &'a [Entry],
    date: NaiveDate,
    slot_minutes: i64,
    resource_id: Option<&str>,
) -> Vec<&'a Entry> {
    entries
        .iter()
        .filter(|entry| entry.is_blocked)
        .filter(|entry| entry.calendar_date() == Some(date))
        .filter(|entry| match resource_id {
            Some(id) => entry.resource_id.as_deref() == Some(id),
            None => true,
        })
        .filter(|entry| {
            let start = parse_time_minutes(entry.start_time.as_deref()).minutes();
            let end = parse_time_minutes(entry.end_time.as_deref()).minutes();
            slot_minutes >= start && slot_minutes < end
        })
        .collect()
}
