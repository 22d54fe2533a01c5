// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, ffi::OsString, path::PathBuf};

use clap::{ArgMatches, Command, ValueHint, arg, builder::styling, crate_version, value_parser};
use colored::Colorize;
use davsync_core::{APP_NAME, Davsync};
use futures::{FutureExt, future::BoxFuture};
use tracing_subscriber::EnvFilter;

use crate::cmd_account::{CmdAccountAdd, CmdAccountList, CmdAccountRemove};
use crate::cmd_collections::{CmdCollections, CmdSync};
use crate::cmd_discover::CmdDiscover;
use crate::cmd_refresh::CmdRefresh;
use crate::config::parse_config;
use crate::util::{arg_verbose, get_verbose};

/// Run the davsync command-line interface.
pub async fn run() -> Result<(), Box<dyn Error>> {
    match Cli::parse() {
        Ok(cli) => {
            init_tracing(cli.verbose);
            if let Err(e) = cli.run().await {
                println!("{} {}", "Error:".red(), e);
            }
        }
        Err(e) => println!("{} {}", "Error:".red(), e),
    };
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Command-line interface
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file
    pub config: Option<PathBuf>,

    /// Show debug logs
    pub verbose: bool,

    /// The command to execute
    pub command: Commands,
}

impl Cli {
    /// Create the command-line interface
    pub fn command() -> Command {
        const STYLES: styling::Styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default().bold())
            .usage(styling::AnsiColor::Green.on_default().bold())
            .literal(styling::AnsiColor::Blue.on_default().bold())
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new(APP_NAME)
            .about("Discover CalDAV and CardDAV accounts and keep their collection lists current.")
            .version(crate_version!())
            .styles(STYLES)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                arg!(-c --config [CONFIG] "Path to the configuration file")
                    .long_help(
                        "\
Path to the configuration file. Defaults to $DAVSYNC_CONFIG, then \
$XDG_CONFIG_HOME/davsync/config.toml on Linux and MacOS, \
%APPDATA%/davsync/config.toml on Windows.",
                    )
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath),
            )
            .arg(arg_verbose())
            .subcommand(CmdDiscover::command())
            .subcommand(
                Command::new("account")
                    .about("Manage accounts")
                    .arg_required_else_help(true)
                    .subcommand_required(true)
                    .subcommand(CmdAccountAdd::command())
                    .subcommand(CmdAccountList::command())
                    .subcommand(CmdAccountRemove::command()),
            )
            .subcommand(CmdRefresh::command())
            .subcommand(CmdCollections::command())
            .subcommand(CmdSync::command())
    }

    /// Parse the command-line arguments
    pub fn parse() -> Result<Self, Box<dyn Error>> {
        let commands = Self::command();
        let matches = commands.get_matches();
        Self::from(matches)
    }

    /// Parse the specified arguments
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let commands = Self::command();
        let matches = commands.try_get_matches_from(args)?;
        Self::from(matches)
    }

    /// Create a CLI instance from the `ArgMatches`
    pub fn from(matches: ArgMatches) -> Result<Self, Box<dyn Error>> {
        use Commands::*;
        let command = match matches.subcommand() {
            Some((CmdDiscover::NAME, matches)) => Discover(CmdDiscover::from(matches)?),
            Some(("account", matches)) => match matches.subcommand() {
                Some((CmdAccountAdd::NAME, matches)) => AccountAdd(CmdAccountAdd::from(matches)?),
                Some((CmdAccountList::NAME, matches)) => AccountList(CmdAccountList::from(matches)),
                Some((CmdAccountRemove::NAME, matches)) => {
                    AccountRemove(CmdAccountRemove::from(matches)?)
                }
                _ => return Err("unknown account command".into()),
            },
            Some((CmdRefresh::NAME, matches)) => Refresh(CmdRefresh::from(matches)?),
            Some((CmdCollections::NAME, matches)) => {
                Collections(CmdCollections::from(matches)?)
            }
            Some((CmdSync::NAME, matches)) => Sync(CmdSync::from(matches)?),
            _ => return Err("no command given".into()),
        };

        let config = matches.get_one("config").cloned();
        let verbose = get_verbose(&matches);
        Ok(Cli {
            config,
            verbose,
            command,
        })
    }

    /// Run the command
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        self.command.run(self.config).await
    }
}

/// The commands available in the CLI
#[derive(Debug, Clone)]
pub enum Commands {
    /// Discover services without saving them
    Discover(CmdDiscover),

    /// Discover and save an account
    AccountAdd(CmdAccountAdd),

    /// List stored accounts
    AccountList(CmdAccountList),

    /// Forget an account
    AccountRemove(CmdAccountRemove),

    /// Refresh the collections of an account
    Refresh(CmdRefresh),

    /// List stored collections
    Collections(CmdCollections),

    /// Select or deselect collections
    Sync(CmdSync),
}

impl Commands {
    /// Run the command with the given configuration
    #[rustfmt::skip]
    pub async fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        match self {
            Discover(a)      => Self::run_with(config, |x| a.run(x).boxed()).await,
            AccountAdd(a)    => Self::run_with(config, |x| a.run(x).boxed()).await,
            AccountList(a)   => Self::run_with(config, |x| a.run(x).boxed()).await,
            AccountRemove(a) => Self::run_with(config, |x| a.run(x).boxed()).await,
            Refresh(a)       => Self::run_with(config, |x| a.run(x).boxed()).await,
            Collections(a)   => Self::run_with(config, |x| a.run(x).boxed()).await,
            Sync(a)          => Self::run_with(config, |x| a.run(x).boxed()).await,
        }
    }

    async fn run_with<F>(config: Option<PathBuf>, f: F) -> Result<(), Box<dyn Error>>
    where
        F: for<'a> FnOnce(&'a Davsync) -> BoxFuture<'a, Result<(), Box<dyn Error>>>,
    {
        tracing::debug!("parsing configuration...");
        let core_config = parse_config(config).await?;
        let davsync = Davsync::new(core_config).await?;

        let result = f(&davsync).await;
        davsync.close().await;
        result
    }
}
