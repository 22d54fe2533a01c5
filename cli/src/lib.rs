// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface of davsync.

mod cli;
mod cmd_account;
mod cmd_collections;
mod cmd_discover;
mod cmd_refresh;
mod config;
mod report;
mod util;

pub use crate::cli::{Cli, Commands, run};
