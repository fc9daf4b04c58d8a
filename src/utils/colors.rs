// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Terminal color utilities
//!
//! Provides consistent color schemes across the CLI.

use colored::Colorize;

/// Turn colors off when `NO_COLOR` is set
///
/// `colored` already honors `NO_COLOR` and `CLICOLOR`; this also covers
/// an explicitly empty value.
pub fn init_colors() {
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }
}

/// Mark for a step outcome
pub fn outcome_mark(success: bool, recovered: bool) -> colored::ColoredString {
    match (success, recovered) {
        (false, _) => "✗".red(),
        (true, true) => "↺".yellow(),
        (true, false) => "✓".green(),
    }
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    eprintln!("  {} {}", "⚠".yellow(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_mark() {
        colored::control::set_override(false);
        assert_eq!(outcome_mark(true, false).to_string(), "✓");
        assert_eq!(outcome_mark(true, true).to_string(), "↺");
        assert_eq!(outcome_mark(false, true).to_string(), "✗");
    }
}
