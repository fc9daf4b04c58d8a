// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Utility modules
//!
//! Terminal helpers for the opchain CLI.

pub mod colors;
pub mod spinner;

pub use colors::*;
pub use spinner::*;
