// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use davsync_core::Davsync;
use davsync_dav::Url;

use crate::report::DiscoveryReport;
use crate::util::{ArgOutputFormat, arg_input, cancel_on_ctrl_c, get_input};

#[derive(Debug, Clone)]
pub struct CmdDiscover {
    pub input: Url,
    pub output_format: ArgOutputFormat,
}

impl CmdDiscover {
    pub const NAME: &str = "discover";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Discover CalDAV and CardDAV services without saving them")
            .arg(arg_input())
            .arg(ArgOutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            input: get_input(matches)?,
            output_format: ArgOutputFormat::from(matches),
        })
    }

    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "discovering services...");

        let config = cancel_on_ctrl_c(|cancel| davsync.discover(&self.input, cancel)).await?;
        let report = DiscoveryReport::new(&config);
        print!("{}", report.format(self.output_format)?);
        Ok(())
    }
}
