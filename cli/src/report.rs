// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::fmt::Write;

use colored::Colorize;
use davsync_core::{Collection, Configuration, Service, ServiceInfo};
use davsync_dav::ServiceType;

use crate::util::ArgOutputFormat;

#[derive(Debug, serde::Serialize)]
pub struct DiscoveryReport {
    pub services: Vec<ServiceReport>,
    pub encountered_401: bool,
    pub logs: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ServiceReport {
    pub service: &'static str,
    pub found: bool,
    pub principal: Option<String>,
    pub home_sets: Vec<String>,
    pub emails: Vec<String>,
    pub collections: Vec<CollectionReport>,
}

#[derive(Debug, serde::Serialize)]
pub struct CollectionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub kind: &'static str,
    pub title: String,
    pub url: String,
    pub color: Option<String>,
    pub read_only: bool,
    pub sync: bool,
    pub homeless: bool,
}

impl DiscoveryReport {
    pub fn new(config: &Configuration) -> Self {
        let services = ServiceType::ALL
            .into_iter()
            .map(|service| match config.service(service) {
                Some(info) => ServiceReport::found(service, info),
                None => ServiceReport::missing(service),
            })
            .collect();

        Self {
            services,
            encountered_401: config.encountered_401,
            logs: config.logs.clone(),
        }
    }

    pub fn format(&self, format: ArgOutputFormat) -> Result<String, Box<dyn Error>> {
        match format {
            ArgOutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ArgOutputFormat::Table => Ok(self.format_table()?),
        }
    }

    fn format_table(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        for (i, service) in self.services.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{}", service.service.bold())?;
            if !service.found {
                writeln!(out, "  {}", "not found".italic())?;
                continue;
            }

            if let Some(principal) = &service.principal {
                writeln!(out, "  Principal  {principal}")?;
            }
            for (j, home_set) in service.home_sets.iter().enumerate() {
                let label = if j == 0 { "Home-sets" } else { "" };
                writeln!(out, "  {label:<9}  {home_set}")?;
            }
            if !service.emails.is_empty() {
                writeln!(out, "  Emails     {}", service.emails.join(", "))?;
            }
            if !service.collections.is_empty() {
                writeln!(out, "  Collections")?;
                write_collections(&mut out, &service.collections, false)?;
            }
        }

        if self.encountered_401 {
            writeln!(out)?;
            writeln!(
                out,
                "{} some requests were rejected with 401 Unauthorized, check the credentials",
                "Warning:".yellow()
            )?;
        }
        Ok(out)
    }
}

impl ServiceReport {
    fn found(service: ServiceType, info: &ServiceInfo) -> Self {
        Self {
            service: service_title(service),
            found: true,
            principal: info.principal.as_ref().map(ToString::to_string),
            home_sets: info.home_sets.iter().map(ToString::to_string).collect(),
            emails: info.emails.clone(),
            collections: info.collections.iter().map(CollectionReport::new).collect(),
        }
    }

    fn missing(service: ServiceType) -> Self {
        Self {
            service: service_title(service),
            found: false,
            principal: None,
            home_sets: Vec::new(),
            emails: Vec::new(),
            collections: Vec::new(),
        }
    }
}

impl CollectionReport {
    pub fn new(collection: &Collection) -> Self {
        Self {
            id: (collection.id != 0).then_some(collection.id),
            kind: collection.collection_type.as_str(),
            title: collection.title(),
            url: collection.url.to_string(),
            color: collection.color.map(format_color),
            read_only: collection.is_read_only(),
            sync: collection.sync,
            homeless: collection.homeset_id.is_none(),
        }
    }
}

/// Stored collections of one account, grouped by service.
#[derive(Debug, serde::Serialize)]
pub struct AccountReport {
    pub account: String,
    pub services: Vec<StoredServiceReport>,
}

#[derive(Debug, serde::Serialize)]
pub struct StoredServiceReport {
    pub service: &'static str,
    pub principal: Option<String>,
    pub collections: Vec<CollectionReport>,
}

impl AccountReport {
    pub fn new(account: &str, services: &[(Service, Vec<Collection>)]) -> Self {
        let services = services
            .iter()
            .map(|(service, collections)| StoredServiceReport {
                service: service_title(service.service_type),
                principal: service.principal.as_ref().map(ToString::to_string),
                collections: collections.iter().map(CollectionReport::new).collect(),
            })
            .collect();

        Self {
            account: account.to_string(),
            services,
        }
    }

    pub fn format(&self, format: ArgOutputFormat) -> Result<String, Box<dyn Error>> {
        match format {
            ArgOutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ArgOutputFormat::Table => Ok(self.format_table()?),
        }
    }

    fn format_table(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        if self.services.is_empty() {
            writeln!(out, "{}", "No services stored for this account".italic())?;
            return Ok(out);
        }

        for (i, service) in self.services.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            match &service.principal {
                Some(principal) => writeln!(out, "{} {}", service.service.bold(), principal)?,
                None => writeln!(out, "{}", service.service.bold())?,
            }
            if service.collections.is_empty() {
                writeln!(out, "  {}", "no collections".italic())?;
            } else {
                write_collections(&mut out, &service.collections, true)?;
            }
        }
        Ok(out)
    }
}

fn write_collections(
    out: &mut String,
    collections: &[CollectionReport],
    with_state: bool,
) -> Result<(), std::fmt::Error> {
    let id_width = collections
        .iter()
        .map(|c| c.id.map_or(0, |id| id.to_string().len()))
        .max()
        .unwrap_or(0);
    let kind_width = collections.iter().map(|c| c.kind.len()).max().unwrap_or(0);
    let title_width = collections
        .iter()
        .map(|c| c.title.chars().count())
        .max()
        .unwrap_or(0);

    for c in collections {
        write!(out, "    ")?;
        if with_state {
            let id = c.id.map(|id| id.to_string()).unwrap_or_default();
            let mark = if c.sync { "[x]".green() } else { "[ ]".normal() };
            write!(out, "{id:>id_width$} {mark} ")?;
        }
        write!(
            out,
            "{:<kind_width$}  {:<title_width$}  {}",
            c.kind,
            c.title,
            c.url.dimmed()
        )?;
        if c.read_only {
            write!(out, " {}", "(read-only)".yellow())?;
        }
        if with_state && c.homeless {
            write!(out, " {}", "(homeless)".italic())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn service_title(service: ServiceType) -> &'static str {
    match service {
        ServiceType::CalDav => "CalDAV",
        ServiceType::CardDav => "CardDAV",
    }
}

/// Formats ARGB as `#RRGGBB`, or `#RRGGBBAA` if not opaque.
fn format_color(argb: u32) -> String {
    let alpha = argb >> 24;
    let rgb = argb & 0x00FF_FFFF;
    if alpha == 0xFF {
        format!("#{rgb:06X}")
    } else {
        format!("#{rgb:06X}{alpha:02X}")
    }
}
