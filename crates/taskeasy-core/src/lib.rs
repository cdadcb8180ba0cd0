pub mod board;
pub mod category;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod edit;
pub mod error;
pub mod filter;
pub mod form;
pub mod render;
pub mod repository;
pub mod search;
pub mod seed;
pub mod sort;
pub mod store;
pub mod task;
pub mod timer;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

use crate::repository::LoadSource;

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
    "starting taskeasy"
  );

  let mut cfg = config::Config::load(
    cli.taskrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  debug!(files = ?cfg.loaded_files, "configuration loaded");

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    store::FileStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open task store at \
           {}",
          data_dir.display()
        )
      })?;

  let tz = datetime::resolve_timezone(
    cfg.timezone().as_deref()
  );
  let now = Utc::now();
  let renderer =
    render::Renderer::new(&cfg, tz)?;

  let (mut board, source) =
    board::TaskBoard::open(
      store,
      cfg.board_settings(),
      now
    );
  match &source {
    | LoadSource::Recovered(err) => {
      warn!(error = %err, "stored tasks unreadable; showing sample tasks");
      renderer.print_warning(&format!(
        "stored tasks could not be \
         read ({err}); showing the \
         default tasks"
      ))?;
    }
    | LoadSource::Unavailable(err) => {
      warn!(error = %err, "task store unavailable");
      renderer.print_warning(&format!(
        "task store unavailable: \
         {err}"
      ))?;
    }
    | LoadSource::Stored
    | LoadSource::Seeded => {}
  }

  commands::dispatch(
    &mut board,
    &cfg,
    &renderer,
    cli.command,
    now.with_timezone(&tz)
  )?;

  info!("done");
  Ok(())
}
