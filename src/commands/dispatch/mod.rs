//! Command dispatch logic for cife

use std::time::Instant;

use crate::cli::Cli;
use cife_core::config::CifeConfig;
use cife_core::error::Result;

mod command;
mod macros;

pub use command::CommandContext;
use command::{Command, NoCommand};
pub(crate) use macros::trace_command;

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    let config = CifeConfig::discover(cli.config.as_deref())?;

    trace_command!(cli, start, "load_config");

    let ctx = CommandContext::new(cli, &config, start);

    match &cli.command {
        None => NoCommand.execute(&ctx),
        Some(cmd) => cmd.execute(&ctx),
    }
}
