// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Utility modules
//!
//! Common utilities for the shipflow CLI.

pub mod spinner;

pub use spinner::*;
