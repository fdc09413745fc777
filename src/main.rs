mod analysis;
mod cli;
mod commands;
mod config;
mod display;
mod outputs;
mod paths;
mod progress;
mod provider;
mod schema;
mod state;
mod topology;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Overrides;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Inputs file given with `--config`
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config.clone(),
        overrides: Overrides::from(&cli.inputs),
    };

    match cli.command {
        Command::Validate => commands::topology::validate(&ctx),
        Command::Render { json } => commands::topology::render(&ctx, json),
        Command::Graph => commands::topology::graph(&ctx),
        Command::Plan(args) => commands::topology::plan(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::topology::apply(&ctx, &args),
        Command::Destroy { yes } => commands::topology::destroy(&ctx, yes),
        Command::Output(args) => commands::topology::output(&ctx, &args),
        Command::Analyze { out } => commands::analyze::run(&ctx, &out),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "topoform", &mut io::stdout());
            Ok(())
        }
    }
}
