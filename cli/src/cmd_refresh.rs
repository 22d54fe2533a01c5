// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use colored::Colorize;
use davsync_core::{Davsync, RefreshStats};
use davsync_dav::ServiceType;

use crate::report::service_title;
use crate::util::{arg_account, arg_service, cancel_on_ctrl_c, get_account, get_service};

#[derive(Debug, Clone)]
pub struct CmdRefresh {
    pub account: String,
    pub service: Option<ServiceType>,
}

impl CmdRefresh {
    pub const NAME: &str = "refresh";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Refresh the home-sets and collections of an account")
            .arg(arg_account())
            .arg(arg_service())
    }

    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            account: get_account(matches)?,
            service: get_service(matches),
        })
    }

    pub async fn run(self, davsync: &Davsync) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "refreshing account...");

        let results =
            cancel_on_ctrl_c(|cancel| davsync.refresh(&self.account, self.service, cancel))
                .await?;

        for (service, stats) in results {
            println!("{} {}", service_title(service).bold(), summary(&stats));
        }
        Ok(())
    }
}

fn summary(stats: &RefreshStats) -> String {
    let mut parts = vec![
        format!("{} home-sets", stats.home_sets),
        format!("{} collections", stats.collections),
    ];
    let removals: [(u64, &str); 4] = [
        (stats.home_sets_removed as u64, "home-sets removed"),
        (stats.collections_orphaned as u64, "collections orphaned"),
        (stats.homeless_removed as u64, "homeless collections removed"),
        (stats.principals_removed, "principals removed"),
    ];
    for (count, what) in removals {
        if count > 0 {
            parts.push(format!("{count} {what}"));
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_refresh() {
        let cmd = CmdRefresh::command();
        let matches = cmd
            .try_get_matches_from(["refresh", "work", "-s", "caldav"])
            .unwrap();
        let parsed = CmdRefresh::from(&matches).unwrap();
        assert_eq!(parsed.account, "work");
        assert_eq!(parsed.service, Some(ServiceType::CalDav));
    }

    #[test]
    fn summary_skips_zero_counts() {
        let stats = RefreshStats {
            home_sets: 2,
            collections: 5,
            collections_orphaned: 1,
            ..RefreshStats::default()
        };
        assert_eq!(
            summary(&stats),
            "2 home-sets, 5 collections, 1 collections orphaned"
        );
    }
}
