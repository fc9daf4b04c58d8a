// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Progress spinner utilities
//!
//! Provides progress indicators for pipeline runs.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.blue} {msg} {elapsed:.dim}";

/// Create a spinner for indeterminate progress
///
/// Draws to stderr and stays hidden when stderr is not a terminal.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
