pub mod autoscroll;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod datetime;
pub mod drag;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::io;

use anyhow::{
  Context,
  bail
};
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting weekboard"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  )
  .context(
    "failed to apply config \
     overrides"
  )?;

  let tz = datetime::resolve_timezone(
    cfg.timezone.as_deref()
  );
  let today = datetime::today_in(tz);

  let events = match cli.events.as_deref()
  {
    | Some(path) => {
      dataset::load_events(path)?
    }
    | None => dataset::sample_events()?
  };
  let store = dataset::seed_store(
    &events
  )
  .context(
    "failed to seed task store"
  )?;

  let anchor = match cli.date.as_deref()
  {
    | Some(expr) => {
      datetime::parse_date_arg(
        expr, today
      )?
    }
    | None => cfg.start_date()?
  };

  let mut scheduler =
    scheduler::Scheduler::new(
      store,
      anchor,
      cfg.scheduler_options()
    );
  if let Some(width) = cli.width {
    if !(width.is_finite()
      && width > 0.0)
    {
      bail!(
        "--width must be a positive \
         number of pixels, got \
         {width}"
      );
    }
    scheduler.set_viewport_width(width);
  }
  scheduler.handle_day_change(
    datetime::weekday_index(anchor)
  );

  let renderer =
    render::Renderer::new(&cfg);
  let command =
    cli.command.unwrap_or_default();

  let mut out = io::stdout().lock();
  commands::dispatch(
    &mut scheduler,
    &renderer,
    command,
    today,
    &mut out
  )?;

  info!("done");
  Ok(())
}
