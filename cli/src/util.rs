// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::str::FromStr;

use clap::{Arg, ArgMatches, arg, value_parser};
use davsync_dav::{Cancellation, ServiceType, Url};

/// The output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ArgOutputFormat {
    Json,
    Table,
}

impl ArgOutputFormat {
    pub fn arg() -> Arg {
        arg!(--"output-format" <FORMAT> "Output format")
            .value_parser(value_parser!(ArgOutputFormat))
            .default_value("table")
    }

    pub fn from(matches: &ArgMatches) -> Self {
        matches
            .get_one("output-format")
            .copied()
            .unwrap_or(ArgOutputFormat::Table)
    }
}

pub fn arg_verbose() -> Arg {
    arg!(-v --verbose "Show debug logs").global(true)
}

pub fn get_verbose(matches: &ArgMatches) -> bool {
    matches.get_flag("verbose")
}

pub fn arg_account() -> Arg {
    arg!(<account> "Account name")
}

pub fn get_account(matches: &ArgMatches) -> Result<String, Box<dyn Error>> {
    matches
        .get_one::<String>("account")
        .cloned()
        .ok_or_else(|| "account is required".into())
}

pub fn arg_input() -> Arg {
    arg!(<input> "Server URL, host name or email address")
        .long_help(
            "\
Where to start discovery: an http(s) URL, a bare host name (https is assumed) \
or an email address (mailto: is assumed).",
        )
        .value_parser(parse_input)
}

pub fn get_input(matches: &ArgMatches) -> Result<Url, Box<dyn Error>> {
    matches
        .get_one::<Url>("input")
        .cloned()
        .ok_or_else(|| "input is required".into())
}

pub fn arg_service() -> Arg {
    arg!(-s --service <SERVICE> "Only this service: caldav or carddav")
        .value_parser(ServiceType::from_str)
}

pub fn get_service(matches: &ArgMatches) -> Option<ServiceType> {
    matches.get_one("service").copied()
}

/// Turns user input into a discovery URL.
pub fn parse_input(input: &str) -> Result<Url, String> {
    let input = input.trim();
    let candidate = if input.contains("://") || input.starts_with("mailto:") {
        input.to_string()
    } else if input.contains('@') {
        format!("mailto:{input}")
    } else {
        format!("https://{input}")
    };

    let url = Url::parse(&candidate).map_err(|e| format!("Invalid URL {input}: {e}"))?;
    match url.scheme() {
        "http" | "https" | "mailto" => Ok(url),
        scheme => Err(format!("Unsupported scheme: {scheme}")),
    }
}

/// Runs `f` with a cancellation that fires on Ctrl-C.
pub async fn cancel_on_ctrl_c<F, Fut>(f: F) -> Fut::Output
where
    F: FnOnce(Cancellation) -> Fut,
    Fut: Future,
{
    let cancel = Cancellation::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling");
                cancel.cancel();
            }
        })
    };

    let output = f(cancel).await;
    watcher.abort();
    output
}
