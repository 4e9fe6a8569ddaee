/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Review color:
/// flagged → yellow
/// open entry (no checkout) → red
/// otherwise → reset
pub fn color_for_entry(flagged: bool, open: bool) -> &'static str {
    if open {
        RED
    } else if flagged {
        YELLOW
    } else {
        RESET
    }
}

/// Returns a colored rendering of an optional value, grey placeholder when absent.
pub fn colorize_optional(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => format!("{GREY}--:--{RESET}"),
    }
}
