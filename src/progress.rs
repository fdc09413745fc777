//! Progress display while applying

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}";

/// Symbol for a finished resource
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created
        | ApplyResult::Modified
        | ApplyResult::Replaced
        | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// Progress bar over every pending change, one tick per resource
pub struct ApplyProgress {
    bar: ProgressBar,
    verbose: bool,
}

impl ApplyProgress {
    pub fn new(total: usize, verbose: bool, quiet: bool) -> Self {
        let bar = ProgressBar::new(total as u64);
        if quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar, verbose }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_stage_start(&mut self, stage: usize, count: usize) {
        self.bar
            .set_message(format!("stage {stage} ({count} resources)"));
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        self.bar.set_message(id.to_string());
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let symbol = result_symbol(result);
        match result {
            ApplyResult::Failed { error } => {
                self.bar
                    .println(format!("  {} {} {}", symbol.red(), id, error.dimmed()));
            }
            _ if self.verbose => {
                self.bar
                    .println(format!("  {} {} {}", symbol.green(), id, format!("{result:?}").dimmed()));
            }
            _ => {}
        }
        self.bar.set_message(format!("{symbol} {id}"));
        self.bar.inc(1);
    }

    fn on_stage_complete(&mut self) {}
}
