use anyhow::anyhow;
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Weekday
};
use tracing::{
  debug,
  warn
};

/// Maps a configured working-day label to a weekday.
///
/// Accepts English names and abbreviations as well as the Portuguese
/// labels clinics store in their schedule settings.
#[must_use]
pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  let lower = token.trim().to_lowercase();
  match lower.as_str() {
    | "monday" | "mon"
    | "segunda-feira" | "segunda" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues"
    | "terça-feira" | "terca-feira"
    | "terça" | "terca" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed"
    | "quarta-feira" | "quarta" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" | "quinta-feira"
    | "quinta" => Some(Weekday::Thu),
    | "friday" | "fri"
    | "sexta-feira" | "sexta" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" | "sábado"
    | "sabado" => Some(Weekday::Sat),
    | "sunday" | "sun" | "domingo" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Weekday that opens the visible window. Unknown labels fall back to
/// Monday.
#[must_use]
pub fn first_working_day(
  working_days: &[String]
) -> Weekday {
  let Some(first) = working_days.first()
  else {
    warn!(
      "no working days configured; \
       starting weeks on monday"
    );
    return Weekday::Mon;
  };

  parse_weekday_name(first)
    .unwrap_or_else(|| {
      warn!(
        day = %first,
        "unknown working day name; \
         starting weeks on monday"
      );
      Weekday::Mon
    })
}

/// The dates visible in one render pass: `days` consecutive columns
/// starting at `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekWindow {
  start: NaiveDate,
  days:  usize
}

impl WeekWindow {
  /// Finds the most recent `first_day` on or before `today`, then moves
  /// it by `week_offset` whole weeks.
  #[tracing::instrument]
  pub fn resolve(
    today: NaiveDate,
    first_day: Weekday,
    week_offset: i64,
    days: usize
  ) -> anyhow::Result<Self> {
    let current = today
      .weekday()
      .num_days_from_sunday()
      as i64;
    let target = first_day
      .num_days_from_sunday()
      as i64;
    let back = (current - target + 7) % 7;

    let shift = week_offset
      .checked_mul(7)
      .and_then(|days| {
        days.checked_sub(back)
      })
      .ok_or_else(|| {
        anyhow!(
          "week offset {week_offset} \
           is out of range"
        )
      })?;

    let start = Duration::try_days(shift)
      .and_then(|delta| {
        today.checked_add_signed(delta)
      })
      .ok_or_else(|| {
        anyhow!(
          "week offset {week_offset} \
           moves past the supported \
           calendar"
        )
      })?;

    debug!(
      %today,
      %start,
      days,
      "resolved week window"
    );
    Ok(Self { start, days })
  }

  #[must_use]
  pub fn start(&self) -> NaiveDate {
    self.start
  }

  /// Column of `date` inside the window, by calendar day.
  #[must_use]
  pub fn day_index(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    let offset = date
      .signed_duration_since(self.start)
      .num_days();
    usize::try_from(offset)
      .ok()
      .filter(|idx| *idx < self.days)
  }

  #[must_use]
  pub fn column_dates(
    &self
  ) -> Vec<NaiveDate> {
    self
      .start
      .iter_days()
      .take(self.days)
      .collect()
  }

  #[must_use]
  pub fn last_date(
    &self
  ) -> NaiveDate {
    self
      .column_dates()
      .last()
      .copied()
      .unwrap_or(self.start)
  }

  /// Header label for the week navigator, e.g. `19 – 23 Oct`.
  #[must_use]
  pub fn label(&self) -> String {
    let end = self.last_date();
    format!(
      "{} – {} {}",
      self.start.day(),
      end.day(),
      end.format("%b")
    )
  }
}
