use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::config::LayoutMetrics;
use crate::entry::Entry;
use crate::time::{
  ParsedTime,
  TimeGrid,
  parse_time_minutes
};
use crate::window::WeekWindow;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
  Start,
  End
}

/// A time string that could not be
/// read and was counted as minute 0.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct MalformedTime {
  pub field: TimeField,
  pub raw:   Option<String>
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UnplaceableReason {
  /// The date is not `YYYY-MM-DD`.
  InvalidDate,
  /// Start and end both read as
  /// minute 0.
  DegenerateTimes,
  /// End is not after start.
  InvertedRange
}

/// Why an entry produced no placement.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(
  tag = "kind",
  rename_all = "snake_case"
)]
pub enum SkipReason {
  OutOfWindow,
  Unplaceable {
    cause: UnplaceableReason
  }
}

/// Geometry of one entry before
/// collision handling.
#[derive(
  Debug, Clone, Copy, PartialEq,
)]
pub struct Position {
  pub day_index:     usize,
  pub date:          NaiveDate,
  pub start_minutes: i64,
  pub end_minutes:   i64,
  pub top:           f64,
  pub height:        f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
  pub outcome:  Result<Position, SkipReason>,
  pub warnings: Vec<MalformedTime>
}

/// Places single entries on the grid.
#[derive(Debug, Clone, Copy)]
pub struct PositionCalculator<'a> {
  grid:    &'a TimeGrid,
  window:  &'a WeekWindow,
  metrics: &'a LayoutMetrics
}

impl<'a> PositionCalculator<'a> {
  #[must_use]
  pub fn new(
    grid: &'a TimeGrid,
    window: &'a WeekWindow,
    metrics: &'a LayoutMetrics
  ) -> Self {
    Self {
      grid,
      window,
      metrics
    }
  }

  pub fn locate(
    &self,
    entry: &Entry
  ) -> Attempt {
    let Some(date) = entry.calendar_date()
    else {
      warn!(
        entry = %entry.id,
        date = %entry.date,
        "entry date is not YYYY-MM-DD"
      );
      return skipped(
        SkipReason::Unplaceable {
          cause:
            UnplaceableReason::InvalidDate
        },
        Vec::new()
      );
    };

    let Some(day_index) =
      self.window.day_index(date)
    else {
      return skipped(
        SkipReason::OutOfWindow,
        Vec::new()
      );
    };

    let mut warnings = Vec::new();
    let start = read_time(
      entry,
      TimeField::Start,
      entry.start_time.as_deref(),
      &mut warnings
    );
    let end = read_time(
      entry,
      TimeField::End,
      entry.end_time.as_deref(),
      &mut warnings
    );

    if start == 0 && end == 0 {
      warn!(
        entry = %entry.id,
        "entry times collapse to \
         midnight; skipping"
      );
      return skipped(
        SkipReason::Unplaceable {
          cause:
            UnplaceableReason::DegenerateTimes
        },
        warnings
      );
    }
    if end <= start {
      warn!(
        entry = %entry.id,
        start,
        end,
        "entry ends before it starts; \
         skipping"
      );
      return skipped(
        SkipReason::Unplaceable {
          cause:
            UnplaceableReason::InvertedRange
        },
        warnings
      );
    }

    Attempt {
      outcome: Ok(Position {
        day_index,
        date,
        start_minutes: start,
        end_minutes: end,
        top: self.top_offset(start),
        height: self.height(start, end)
      }),
      warnings
    }
  }

  /// Distance from the grid origin,
  /// clamped at the top edge.
  #[must_use]
  pub fn top_offset(
    &self,
    start_minutes: i64
  ) -> f64 {
    let interval =
      self.grid.interval() as f64;
    let slots = (start_minutes
      - self.grid.first_slot_minutes())
      as f64
      / interval;
    (slots * self.metrics.slot_height)
      .max(0.0)
  }

  /// Short entries use the enlarged
  /// per-slot height; long ones use the
  /// grid height and gain one extra slot
  /// when they end on an interval
  /// boundary.
  #[must_use]
  pub fn height(
    &self,
    start_minutes: i64,
    end_minutes: i64
  ) -> f64 {
    let interval = self.grid.interval();
    let duration =
      end_minutes - start_minutes;
    let duration_slots =
      duration as f64 / interval as f64;

    let is_short = duration
      <= self
        .metrics
        .short_entry_max_minutes;
    let per_slot = if is_short {
      self.metrics.short_entry_slot_height
    } else {
      self.metrics.slot_height
    };

    let mut height =
      duration_slots * per_slot;
    if !is_short
      && end_minutes.rem_euclid(interval)
        == 0
    {
      height += per_slot;
    }
    height
  }
}

fn skipped(
  reason: SkipReason,
  warnings: Vec<MalformedTime>
) -> Attempt {
  Attempt {
    outcome: Err(reason),
    warnings
  }
}

fn read_time(
  entry: &Entry,
  field: TimeField,
  raw: Option<&str>,
  warnings: &mut Vec<MalformedTime>
) -> i64 {
  let parsed = parse_time_minutes(raw);
  if let ParsedTime::Malformed = parsed
  {
    warn!(
      entry = %entry.id,
      ?field,
      raw = ?raw,
      "malformed entry time; using 00:00"
    );
    warnings.push(MalformedTime {
      field,
      raw: raw.map(str::to_string)
    });
  }
  parsed.minutes()
}
