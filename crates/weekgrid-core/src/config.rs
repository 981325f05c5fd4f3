use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::time::{
  TimeGrid,
  parse_time_minutes
};
use crate::window::{
  first_working_day,
  parse_weekday_name
};

const CONFIG_ENV_VAR: &str =
  "WEEKGRID_CONFIG";
const CONFIG_DIR_NAME: &str =
  "weekgrid";
const CONFIG_FILE_NAME: &str =
  "weekgrid.toml";

/// Pixel and percent constants shared
/// between the layout engine and the
/// grid that draws it.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct LayoutMetrics {
  /// Height of one grid slot.
  pub slot_height:             f64,
  /// Per-slot height for entries no
  /// longer than
  /// `short_entry_max_minutes`.
  pub short_entry_slot_height: f64,
  pub short_entry_max_minutes: i64,
  pub focus_width_percent:     f64,
  pub sibling_strip_width:     f64,
  pub sibling_strip_step:      f64
}

impl Default for LayoutMetrics {
  fn default() -> Self {
    Self {
      slot_height:             40.0,
      short_entry_slot_height: 80.0,
      short_entry_max_minutes: 120,
      focus_width_percent:     85.0,
      sibling_strip_width:     20.0,
      sibling_strip_step:      22.0
    }
  }
}

impl LayoutMetrics {
  /// Rejects metrics that would put
  /// NaN or negative lengths into the
  /// layout.
  pub fn validate(
    &self
  ) -> anyhow::Result<()> {
    let lengths = [
      ("slot_height", self.slot_height),
      (
        "short_entry_slot_height",
        self.short_entry_slot_height
      ),
      (
        "sibling_strip_width",
        self.sibling_strip_width
      ),
      (
        "sibling_strip_step",
        self.sibling_strip_step
      )
    ];
    for (name, value) in lengths {
      if !value.is_finite() || value <= 0.0
      {
        return Err(anyhow!(
          "metrics.{name} must be a \
           positive number, got {value}"
        ));
      }
    }

    let focus = self.focus_width_percent;
    if !focus.is_finite()
      || focus <= 0.0
      || focus > 100.0
    {
      return Err(anyhow!(
        "metrics.focus_width_percent \
         must be in (0, 100], got \
         {focus}"
      ));
    }

    if self.short_entry_max_minutes < 0 {
      return Err(anyhow!(
        "metrics.short_entry_max_minutes \
         must not be negative, got {}",
        self.short_entry_max_minutes
      ));
    }
    Ok(())
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct ScheduleConfig {
  #[serde(
    default = "default_working_days"
  )]
  pub working_days:   Vec<String>,
  #[serde(
    default = "default_start_time"
  )]
  pub start_time:     String,
  #[serde(default = "default_end_time")]
  pub end_time:       String,
  #[serde(
    default = "default_block_interval"
  )]
  pub block_interval: i64,
  #[serde(default)]
  pub timezone:       Option<String>,
  #[serde(default)]
  pub metrics:        LayoutMetrics
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      working_days:   default_working_days(
      ),
      start_time:     default_start_time(),
      end_time:       default_end_time(),
      block_interval:
        default_block_interval(),
      timezone:       None,
      metrics:        LayoutMetrics::default()
    }
  }
}

fn default_working_days()
-> Vec<String> {
  [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday"
  ]
  .iter()
  .map(|day| day.to_string())
  .collect()
}

fn default_start_time() -> String {
  "08:00".to_string()
}

fn default_end_time() -> String {
  "18:00".to_string()
}

fn default_block_interval() -> i64 {
  30
}

impl ScheduleConfig {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(
        config_override
      )?
    else {
      warn!(
        "no schedule config found; \
         using defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading schedule config");
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    Self::from_toml_str(&text)
      .with_context(|| {
        format!(
          "invalid schedule config {}",
          path.display()
        )
      })
  }

  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let cfg: ScheduleConfig =
      toml::from_str(text).context(
        "failed to parse schedule \
         config toml"
      )?;
    debug!(
      days = cfg.working_days.len(),
      start = %cfg.start_time,
      end = %cfg.end_time,
      interval = cfg.block_interval,
      "parsed schedule config"
    );
    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k.trim();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");
      match key {
        | "working_days" => {
          self.working_days = value
            .split(',')
            .map(str::trim)
            .filter(|day| !day.is_empty())
            .map(str::to_string)
            .collect();
        }
        | "start_time" => {
          self.start_time =
            value.to_string();
        }
        | "end_time" => {
          self.end_time =
            value.to_string();
        }
        | "block_interval" => {
          self.block_interval =
            parse_number(key, value)?;
        }
        | "timezone" => {
          self.timezone =
            if value.is_empty() {
              None
            } else {
              Some(value.to_string())
            };
        }
        | "metrics.slot_height" => {
          self.metrics.slot_height =
            parse_number(key, value)?;
        }
        | "metrics.short_entry_slot_height" => {
          self
            .metrics
            .short_entry_slot_height =
            parse_number(key, value)?;
        }
        | "metrics.short_entry_max_minutes" => {
          self
            .metrics
            .short_entry_max_minutes =
            parse_number(key, value)?;
        }
        | "metrics.focus_width_percent" => {
          self
            .metrics
            .focus_width_percent =
            parse_number(key, value)?;
        }
        | "metrics.sibling_strip_width" => {
          self
            .metrics
            .sibling_strip_width =
            parse_number(key, value)?;
        }
        | "metrics.sibling_strip_step" => {
          self
            .metrics
            .sibling_strip_step =
            parse_number(key, value)?;
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }
    Ok(())
  }

  pub fn validate(
    &self
  ) -> anyhow::Result<()> {
    if self.working_days.is_empty() {
      return Err(anyhow!(
        "working_days must list at \
         least one day"
      ));
    }
    if self.working_days.len() > 7 {
      return Err(anyhow!(
        "working_days lists {} days; \
         a week has 7",
        self.working_days.len()
      ));
    }
    for day in &self.working_days {
      if parse_weekday_name(day)
        .is_none()
      {
        warn!(day = %day, "unrecognised working day label");
      }
    }

    self.metrics.validate()?;

    if let Some(tz) = &self.timezone {
      parse_timezone(tz)?;
    }

    self.time_grid().map(|_| ())
  }

  /// Builds the vertical axis. Config
  /// times must be well formed; the
  /// lenient zero fallback only applies
  /// to entries.
  pub fn time_grid(
    &self
  ) -> anyhow::Result<TimeGrid> {
    let start = strict_minutes(
      "start_time",
      &self.start_time
    )?;
    let end = strict_minutes(
      "end_time",
      &self.end_time
    )?;
    TimeGrid::new(
      start,
      end,
      self.block_interval
    )
  }

  #[must_use]
  pub fn first_weekday(
    &self
  ) -> Weekday {
    first_working_day(
      &self.working_days
    )
  }

  /// Today's calendar date in the
  /// configured timezone, or in the
  /// system zone when none is set.
  pub fn today(
    &self
  ) -> anyhow::Result<NaiveDate> {
    match &self.timezone {
      | Some(raw) => {
        let tz = parse_timezone(raw)?;
        Ok(
          Utc::now()
            .with_timezone(&tz)
            .date_naive()
        )
      }
      | None => {
        Ok(Local::now().date_naive())
      }
    }
  }
}

fn strict_minutes(
  field: &str,
  raw: &str
) -> anyhow::Result<i64> {
  let parsed =
    parse_time_minutes(Some(raw));
  if parsed.is_malformed() {
    return Err(anyhow!(
      "{field} is not a HH:MM time: \
       {raw:?}"
    ));
  }
  Ok(parsed.minutes())
}

fn parse_number<T>(
  key: &str,
  value: &str
) -> anyhow::Result<T>
where
  T: std::str::FromStr,
  T::Err: std::error::Error
    + Send
    + Sync
    + 'static
{
  value.parse::<T>().with_context(
    || {
      format!(
        "invalid value for {key}: \
         {value}"
      )
    }
  )
}

fn parse_timezone(
  raw: &str
) -> anyhow::Result<Tz> {
  raw.trim().parse::<Tz>().map_err(
    |err| {
      anyhow!(
        "invalid timezone {raw:?}: \
         {err}"
      )
    }
  )
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(from_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = from_env.trim();
    if trimmed == "/dev/null" {
      return Ok(None);
    }
    if !trimmed.is_empty() {
      return Ok(Some(PathBuf::from(
        trimmed
      )));
    }
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    debug!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}
