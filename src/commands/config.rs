use anyhow::{Context as AnyhowContext, Result, bail};
use std::fs;
use std::path::Path;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{STARTER_TOML, load_inputs};
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init { force } => {
            let path = match &ctx.config {
                Some(path) => path.clone(),
                None => paths::config_file()?,
            };
            init(&path, force)?;
            ui::success(&format!("Wrote {}", path.display()));
            Ok(())
        }
    }
}

fn show(ctx: &Context) -> Result<()> {
    let loaded = load_inputs(ctx.config.as_deref(), &ctx.overrides)?;

    ui::header("Locations");
    ui::kv("Config dir", &paths::config_dir()?.display().to_string());
    ui::kv("State file", &paths::state_file()?.display().to_string());
    match &loaded.source {
        Some(path) => ui::kv("Inputs", &path.display().to_string()),
        None => ui::kv("Inputs", "(none, using defaults)"),
    }

    ui::section("Effective inputs");
    let rendered =
        toml::to_string_pretty(&loaded.inputs).context("Failed to render inputs as TOML")?;
    println!("{rendered}");
    Ok(())
}

/// Write the starter inputs file, refusing to overwrite unless `force`
fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    fs::write(path, STARTER_TOML).with_context(|| format!("Failed to write {}", path.display()))
}
