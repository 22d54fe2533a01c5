// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command, arg, value_parser};
use davsync_core::Davsync;

use crate::report::AccountReport;
use crate::util::{ArgOutputFormat, arg_account, get_account};

#[derive(Debug, Clone)]
pub struct CmdCollections {
    pub account: String,
    pub output_format: ArgOutputFormat,
}

impl CmdCollections {
    pub const NAME: &str = "collections";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("ls")
            .about("List the stored collections of an account")
            .arg(arg_account())
            .arg(ArgOutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            account: get_account(matches)?,
            output_format: ArgOutputFormat::from(matches),
        })
    }

    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "listing collections...");

        let services = davsync.collections(&self.account).await?;
        let report = AccountReport::new(&self.account, &services);
        print!("{}", report.format(self.output_format)?);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdSync {
    pub ids: Vec<i64>,
    pub enabled: bool,
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Select collections for synchronization")
            .arg(
                arg!(<ID> ... "Collection ids, as shown by `collections`")
                    .value_parser(value_parser!(i64)),
            )
            .arg(arg!(--off "Deselect instead"))
    }

    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        let ids = matches
            .get_many::<i64>("ID")
            .ok_or("ID is required")?
            .copied()
            .collect();
        Ok(Self {
            ids,
            enabled: !matches.get_flag("off"),
        })
    }

    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "setting sync flags...");

        for id in &self.ids {
            davsync.set_sync(*id, self.enabled).await?;
        }
        let state = if self.enabled { "selected" } else { "deselected" };
        println!("{} collection(s) {state}", self.ids.len());
        Ok(())
    }
}
