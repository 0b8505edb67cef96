/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

/// Worked hours per person:
/// 0 → grey, above `long_shift` → yellow, otherwise green.
pub fn color_for_hours(hours: f64, long_shift: f64) -> &'static str {
    if hours <= 0.0 {
        GREY
    } else if hours > long_shift {
        YELLOW
    } else {
        GREEN
    }
}

pub fn color_for_role(role: &str) -> &'static str {
    match role {
        "admin" => MAGENTA,
        "manager" => CYAN,
        _ => RESET,
    }
}

/// Green "inside" / red "outside".
pub fn colorize_inside(inside: bool) -> String {
    if inside {
        format!("{GREEN}inside{RESET}")
    } else {
        format!("{RED}outside{RESET}")
    }
}
