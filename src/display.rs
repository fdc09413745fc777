//! Plan, descriptor and summary rendering
//!
//! Lines are built as plain text with a tone, then colored only when printed
//! to the terminal, so the same rendering feeds plan analysis.

use colored::{ColoredString, Colorize};
use declarative::{
    AttributeChange, ChangeAction, DiffSummary, ExecuteSummary, ExecutionPlan, ResourceDiff,
    ResourceExt, group_by_type,
};
use serde_json::{Value, json};
use similar::{ChangeTag, TextDiff};

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Heading,
    Add,
    Remove,
    Change,
    Replace,
    Dim,
}

/// One rendered line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub tone: Tone,
    pub text: String,
}

impl Line {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }

    fn colored(&self) -> ColoredString {
        let text = self.text.as_str();
        match self.tone {
            Tone::Plain => text.normal(),
            Tone::Heading => text.bold(),
            Tone::Add => text.green(),
            Tone::Remove => text.red(),
            Tone::Change => text.yellow(),
            Tone::Replace => text.magenta(),
            Tone::Dim => text.dimmed(),
        }
    }
}

/// Friendly heading for a resource type
pub fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "azurerm_resource_group" => "Resource groups",
        "azurerm_virtual_network" => "Virtual networks",
        "azurerm_subnet" => "Subnets",
        "azurerm_network_security_group" => "Network security groups",
        "azurerm_subnet_network_security_group_association" => "Subnet associations",
        "azurerm_network_interface" => "Network interfaces",
        "azurerm_linux_virtual_machine" => "Virtual machines",
        other => other,
    }
}

fn action_tone(action: ChangeAction) -> Tone {
    match action {
        ChangeAction::Create => Tone::Add,
        ChangeAction::Update => Tone::Change,
        ChangeAction::Replace => Tone::Replace,
        ChangeAction::Delete => Tone::Remove,
    }
}

fn is_nested(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Object(_) | Value::Array(_)))
}

fn pretty(value: Option<&Value>) -> String {
    value
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_default()
}

/// Lines for one attribute change
fn change_lines(change: &AttributeChange, width: usize) -> Vec<Line> {
    let marker = if change.forces_replacement {
        " # forces replacement"
    } else {
        ""
    };
    let key = &change.key;

    match (&change.before, &change.after) {
        (None, Some(after)) => vec![Line::new(
            Tone::Add,
            format!("      + {key} = {}", ui::truncate(&ui::format_value(after), width)),
        )],
        (Some(before), None) => vec![Line::new(
            Tone::Remove,
            format!("      - {key} = {}{marker}", ui::truncate(&ui::format_value(before), width)),
        )],
        (Some(_), Some(_))
            if is_nested(change.before.as_ref()) || is_nested(change.after.as_ref()) =>
        {
            let before = pretty(change.before.as_ref());
            let after = pretty(change.after.as_ref());
            let mut lines = vec![Line::new(Tone::Change, format!("      ~ {key}{marker}"))];
            let diff = TextDiff::from_lines(&before, &after);
            for change in diff.iter_all_changes() {
                let text = change.value().trim_end();
                let line = match change.tag() {
                    ChangeTag::Delete => Line::new(Tone::Remove, format!("          - {text}")),
                    ChangeTag::Insert => Line::new(Tone::Add, format!("          + {text}")),
                    ChangeTag::Equal => Line::new(Tone::Dim, format!("            {text}")),
                };
                lines.push(line);
            }
            lines
        }
        (Some(before), Some(after)) => vec![Line::new(
            Tone::Change,
            format!(
                "      ~ {key} = {} → {}{marker}",
                ui::truncate(&ui::format_value(before), width / 2),
                ui::truncate(&ui::format_value(after), width / 2)
            ),
        )],
        (None, None) => Vec::new(),
    }
}

/// Render diffs grouped by resource type
pub fn plan_lines(diffs: &[ResourceDiff], width: usize) -> Vec<Line> {
    let mut lines = Vec::new();
    for (resource_type, type_diffs) in group_by_type(diffs) {
        lines.push(Line::new(Tone::Heading, type_heading(&resource_type)));
        for diff in type_diffs {
            lines.push(Line::new(
                action_tone(diff.action),
                format!(
                    "  {:<3} {}  ({})",
                    diff.action.symbol(),
                    diff.resource_id,
                    diff.description
                ),
            ));
            if diff.action != ChangeAction::Delete {
                for change in &diff.changes {
                    lines.extend(change_lines(change, width));
                }
            }
        }
        lines.push(Line::new(Tone::Plain, ""));
    }

    let summary = DiffSummary::from_diffs(diffs);
    lines.push(Line::new(
        Tone::Heading,
        format!(
            "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
            summary.additions, summary.modifications, summary.replacements, summary.removals
        ),
    ));
    lines
}

/// Plain-text plan, for files and analysis
pub fn plan_text(diffs: &[ResourceDiff]) -> String {
    if diffs.is_empty() {
        return "No changes. Infrastructure matches the configuration.\n".to_string();
    }
    let mut out = String::new();
    for line in plan_lines(diffs, 120) {
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}

/// Print the plan in a box
pub fn print_plan(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!(
            "  {} No changes. Infrastructure matches the configuration.",
            "✓".green()
        );
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");
    for line in plan_lines(diffs, ui::value_width()) {
        if line.text.is_empty() {
            println!("│");
        } else {
            println!("│ {}", line.colored());
        }
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print dependency stages
pub fn print_graph(plan: &ExecutionPlan) {
    ui::header("Dependency Stages");
    for (i, stage) in plan.stages.iter().enumerate() {
        println!();
        println!("  {}", format!("Stage {i}").cyan().bold());
        for resource in stage {
            let deps = resource.depends_on();
            if deps.is_empty() {
                println!("    • {}", resource.id());
            } else {
                println!(
                    "    • {} {}",
                    resource.id(),
                    format!("← {}", deps.join(", ")).dimmed()
                );
            }
        }
    }
}

/// Descriptor as JSON: resources in stage order with edges, secrets redacted
pub fn descriptor_json(plan: &ExecutionPlan) -> Value {
    let resources: Vec<Value> = plan
        .stages
        .iter()
        .enumerate()
        .flat_map(|(stage, resources)| {
            resources.iter().map(move |r| {
                json!({
                    "address": r.id(),
                    "type": r.resource_type(),
                    "stage": stage,
                    "depends_on": r.depends_on(),
                    "attributes": r.display_attributes(),
                })
            })
        })
        .collect();
    json!({ "resources": resources })
}

/// Print the descriptor as text
pub fn print_descriptor(plan: &ExecutionPlan) {
    for resource in plan.resources() {
        println!();
        println!(
            "{} {}",
            resource.id().bold(),
            format!("({})", resource.description()).dimmed()
        );
        for (key, value) in resource.display_attributes() {
            let rendered = match value {
                Value::Object(_) | Value::Array(_) if value.to_string().len() > 60 => {
                    serde_json::to_string_pretty(&value)
                        .unwrap_or_default()
                        .replace('\n', "\n      ")
                }
                other => ui::format_value(&other),
            };
            println!("    {} = {}", key.dimmed(), rendered);
        }
    }
}

/// Print the result of an apply or destroy
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.removed > 0 {
        println!("    • {} resources destroyed", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} resources unchanged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
        for (address, error) in &summary.failures {
            println!("      {} {}: {}", "✗".red(), address, error);
        }
    }
}
