// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use colored::Colorize;
use davsync_core::Davsync;
use davsync_dav::{ServiceType, Url};

use crate::report::DiscoveryReport;
use crate::util::{
    ArgOutputFormat, arg_account, arg_input, cancel_on_ctrl_c, get_account, get_input,
};

#[derive(Debug, Clone)]
pub struct CmdAccountAdd {
    pub account: String,
    pub input: Url,
    pub output_format: ArgOutputFormat,
}

impl CmdAccountAdd {
    pub const NAME: &str = "add";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Discover the services of an account and save them")
            .arg(arg_account())
            .arg(arg_input())
            .arg(ArgOutputFormat::arg())
    }

    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            account: get_account(matches)?,
            input: get_input(matches)?,
            output_format: ArgOutputFormat::from(matches),
        })
    }

    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "adding account...");

        let config = cancel_on_ctrl_c(|cancel| {
            davsync.add_account(&self.account, &self.input, cancel)
        })
        .await?;

        let report = DiscoveryReport::new(&config);
        print!("{}", report.format(self.output_format)?);

        let found = ServiceType::ALL
            .into_iter()
            .any(|service| config.service(service).is_some());
        if self.output_format == ArgOutputFormat::Table {
            if found {
                println!("\nSaved account {}", self.account.bold());
            } else {
                println!("\n{}", "No service found, nothing saved".italic());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdAccountList;

impl CmdAccountList {
    pub const NAME: &str = "list";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("List stored accounts")
    }

    pub fn from(_matches: &ArgMatches) -> Self {
        Self
    }

    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "listing accounts...");

        let accounts = davsync.accounts().await?;
        if accounts.is_empty() {
            println!("{}", "No accounts".italic());
        }
        for account in accounts {
            println!("{account}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CmdAccountRemove {
    pub account: String,
}

impl CmdAccountRemove {
    pub const NAME: &str = "remove";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("rm")
            .about("Forget an account and its collections")
            .arg(arg_account())
    }

    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            account: get_account(matches)?,
        })
    }

    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "removing account...");

        davsync.remove_account(&self.account).await?;
        println!("Removed account {}", self.account.bold());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_account_add() {
        let cmd = CmdAccountAdd::command();
        let matches = cmd
            .try_get_matches_from(["add", "work", "https://dav.example.com/"])
            .unwrap();
        let parsed = CmdAccountAdd::from(&matches).unwrap();
        assert_eq!(parsed.account, "work");
        assert_eq!(parsed.input.as_str(), "https://dav.example.com/");
        assert_eq!(parsed.output_format, ArgOutputFormat::Table);
    }

    #[test]
    fn parse_account_remove() {
        let cmd = CmdAccountRemove::command();
        let matches = cmd.try_get_matches_from(["remove", "work"]).unwrap();
        let parsed = CmdAccountRemove::from(&matches).unwrap();
        assert_eq!(parsed.account, "work");
    }
}
