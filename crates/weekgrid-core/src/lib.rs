pub mod cli;
pub mod config;
pub mod conflict;
pub mod entry;
pub mod focus;
pub mod layout;
pub mod order;
pub mod position;
pub mod render;
pub mod time;
pub mod window;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use config::{
  LayoutMetrics,
  ScheduleConfig
};
pub use entry::Entry;
pub use layout::{
  LayoutEngine,
  Placement,
  WeekLayout
};
pub use position::{
  SkipReason,
  UnplaceableReason
};
pub use window::WeekWindow;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting weekgrid"
  );
  debug!(overrides = cli.overrides.len(), "cli overrides");

  let mut cfg = config::ScheduleConfig::load(
    cli.config.as_deref()
  )?;
  cfg
    .apply_overrides(
      cli
        .overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
    .context(
      "failed to apply config \
       overrides"
    )?;
  cfg.validate().context(
    "invalid schedule config"
  )?;

  let today = match cli.today {
    | Some(date) => date,
    | None => cfg.today()?
  };
  let grid = cfg.time_grid()?;
  let window = WeekWindow::resolve(
    today,
    cfg.first_weekday(),
    cli.week_offset,
    cfg.working_days.len()
  )?;

  let entries =
    entry::load_entries(&cli.entries)
      .with_context(|| {
        format!(
          "failed to load entries from \
           {}",
          cli.entries.display()
        )
      })?;
  let entries =
    entry::filter_by_resource(
      entries,
      &cli.resources
    );

  let layout = LayoutEngine::new(
    &grid,
    &window,
    &cfg.metrics
  )
  .compute(&entries);
  let frames = focus::focus_frames(
    &layout,
    cli.focus.as_deref(),
    &cfg.metrics
  );

  let stdout = io::stdout();
  let renderer = render::Renderer::new(
    cli.format,
    stdout.is_terminal()
  );
  renderer.write_layout(
    stdout.lock(),
    &layout,
    &frames
  )?;

  info!("done");
  Ok(())
}
