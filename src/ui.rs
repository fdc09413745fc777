use colored::Colorize;
use serde_json::Value;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

// ============================================================================
// Value Formatting
// ============================================================================

/// Render an attribute value on one line
///
/// Strings are quoted, everything else is compact JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

/// Shorten a string to `max_len` characters, keeping the start
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Usable width for value columns in the current terminal
pub fn value_width() -> usize {
    let (_, cols) = console::Term::stdout().size();
    (cols as usize).saturating_sub(40).max(30)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("East US")), "\"East US\"");
        assert_eq!(format_value(&json!(3)), "3");
        assert_eq!(format_value(&json!(["10.0.0.0/16"])), "[\"10.0.0.0/16\"]");
        assert_eq!(format_value(&json!(null)), "null");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exact", 5), "exact");
        assert_eq!(truncate("ssh-rsa AAAAB3NzaC1yc2E", 12), "ssh-rsa A...");
        assert_eq!(truncate("abc", 2), "...");
    }
}
