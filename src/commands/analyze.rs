//! AI review of the current plan

use anyhow::{Context as AnyhowContext, Result};
use chrono::Local;
use declarative::compute_diffs;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::analysis::{self, AnalysisError, AnalysisSettings, Analyzer};
use crate::display;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, out: &Path) -> Result<()> {
    let settings = match AnalysisSettings::from_env() {
        Ok(settings) => settings,
        Err(AnalysisError::MissingSetting(var)) => {
            ui::warn(&format!("{var} is not set; skipping plan analysis"));
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    ui::step(1, 3, "Rendering plan");
    let inputs = super::inputs(ctx)?;
    let plan = super::plan(&inputs, None)?;
    let state = StateFile::load()?;
    let text = display::plan_text(&compute_diffs(&plan, &state.snapshot));

    let (text, truncated) = analysis::truncate_plan(&text);
    if truncated {
        ui::warn(&format!(
            "Plan truncated to {} characters for analysis",
            analysis::MAX_PLAN_CHARS
        ));
    }

    ui::step(
        2,
        3,
        &format!("Requesting analysis from deployment {}", settings.deployment),
    );
    let answer = Analyzer::new(settings)
        .analyze(&text)
        .context("Plan analysis failed")?;

    if !ctx.quiet {
        ui::header("Plan Analysis");
        println!("{answer}");
    }

    ui::step(3, 3, "Saving report");
    save_report(out, &analysis::report(&answer, Local::now()))?;
    ui::success(&format!("Analysis saved to {}", out.display()));

    if analysis::has_critical_findings(&answer) {
        ui::warn("Critical issues detected; review before applying");
    }
    Ok(())
}

fn save_report(path: &Path, report: &str) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    fs::write(path, report).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_report_creates_parent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reports").join("analysis.txt");

        save_report(&path, "Topology Plan Analysis\n\nok").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Topology Plan Analysis\n\nok"
        );
    }
}
