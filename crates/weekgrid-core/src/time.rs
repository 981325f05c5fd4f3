use std::sync::OnceLock;

use anyhow::anyhow;
use regex::Regex;
use tracing::debug;

/// Result of reading a `HH:MM` / `HH:MM:SS` clock string.
///
/// A malformed reading still carries a usable value: it counts as
/// minute 0, so callers can keep going and report the condition.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ParsedTime {
  Valid(i64),
  Malformed
}

impl ParsedTime {
  #[must_use]
  pub fn minutes(self) -> i64 {
    match self {
      | ParsedTime::Valid(minutes) => {
        minutes
      }
      | ParsedTime::Malformed => 0
    }
  }

  #[must_use]
  pub fn is_malformed(self) -> bool {
    matches!(
      self,
      ParsedTime::Malformed
    )
  }
}

fn leading_int_re()
-> Option<&'static Regex> {
  static LEADING_INT: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  LEADING_INT
    .get_or_init(|| {
      Regex::new(r"^\s*(?P<num>\d+)")
        .ok()
    })
    .as_ref()
}

fn leading_int(
  part: &str
) -> Option<i64> {
  let captures =
    leading_int_re()?.captures(part)?;
  captures
    .name("num")?
    .as_str()
    .parse::<i64>()
    .ok()
}

/// Parses a clock string into minutes since midnight. Seconds are
/// ignored, and so is anything trailing the leading digits of the hour
/// and minute fields.
#[must_use]
pub fn parse_time_minutes(
  raw: Option<&str>
) -> ParsedTime {
  let Some(raw) = raw else {
    return ParsedTime::Malformed;
  };

  let mut parts = raw.split(':');
  let hours = parts
    .next()
    .and_then(leading_int);
  let minutes = parts
    .next()
    .and_then(leading_int);

  match (hours, minutes) {
    | (Some(h), Some(m)) => {
      h.checked_mul(60)
        .and_then(|h| h.checked_add(m))
        .map_or(
          ParsedTime::Malformed,
          ParsedTime::Valid
        )
    }
    | _ => ParsedTime::Malformed
  }
}

#[must_use]
pub fn format_minutes(
  minutes: i64
) -> String {
  format!(
    "{:02}:{:02}",
    minutes.div_euclid(60),
    minutes.rem_euclid(60)
  )
}

/// The vertical axis of the week grid.
///
/// The first slot is the geometry origin: every vertical offset is
/// measured in intervals from `first_slot_minutes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
  first_slot_minutes: i64,
  interval:           i64,
  labels:             Vec<String>
}

impl TimeGrid {
  pub fn new(
    start_minutes: i64,
    end_minutes: i64,
    interval: i64
  ) -> anyhow::Result<Self> {
    if interval <= 0 {
      return Err(anyhow!(
        "block interval must be \
         positive, got {interval}"
      ));
    }
    if start_minutes >= end_minutes {
      return Err(anyhow!(
        "grid start {} must be before \
         grid end {}",
        format_minutes(start_minutes),
        format_minutes(end_minutes)
      ));
    }
    if end_minutes - start_minutes
      < interval
    {
      return Err(anyhow!(
        "block interval {interval} \
         does not fit a single slot \
         between {} and {}",
        format_minutes(start_minutes),
        format_minutes(end_minutes)
      ));
    }

    let labels = slot_labels(
      start_minutes,
      end_minutes,
      interval
    );
    debug!(
      slots = labels.len(),
      interval, "built time grid"
    );

    Ok(Self {
      first_slot_minutes: start_minutes,
      interval,
      labels
    })
  }

  #[must_use]
  pub fn first_slot_minutes(
    &self
  ) -> i64 {
    self.first_slot_minutes
  }

  #[must_use]
  pub fn interval(&self) -> i64 {
    self.interval
  }

  #[must_use]
  pub fn labels(&self) -> &[String] {
    &self.labels
  }
}

/// Slot labels from `start` in `interval` steps, including `end` when
/// a step lands on it exactly.
#[must_use]
pub fn slot_labels(
  start_minutes: i64,
  end_minutes: i64,
  interval: i64
) -> Vec<String> {
  if interval <= 0 {
    return Vec::new();
  }

  let mut labels = Vec::new();
  let mut current = start_minutes;
  while current <= end_minutes {
    labels.push(format_minutes(current));
    current += interval;
  }
  labels
}
