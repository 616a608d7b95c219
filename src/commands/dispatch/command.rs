//! Command trait and context for dispatching commands

use std::time::Instant;

use crate::cli::{Cli, Commands};
use cife_core::config::CifeConfig;
use cife_core::error::Result;

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub config: &'a CifeConfig,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    pub fn new(cli: &'a Cli, config: &'a CifeConfig, start: Instant) -> Self {
        Self { cli, config, start }
    }
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            Commands::Judge(args) => crate::commands::judge::execute(ctx, args),
            Commands::Extract(args) => crate::commands::extract::execute(ctx, args),
            Commands::Metrics(args) => crate::commands::metrics::execute(ctx, args),
            Commands::Rank(args) => crate::commands::rank::execute(ctx, args),
            Commands::Filter(args) => crate::commands::filter::execute(ctx, args),
        }
    }
}

/// No-op command (when no subcommand is provided)
pub struct NoCommand;

impl Command for NoCommand {
    fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        println!("cife {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Judge, score and rank constraint-following benchmark runs.");
        println!();
        println!("Run `cife --help` for usage information.");
        Ok(())
    }
}
