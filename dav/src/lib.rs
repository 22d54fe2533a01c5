// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! `WebDAV` protocol layer for `CalDAV`/`CardDAV` service discovery (RFC 4918, RFC 4791,
//! RFC 6352, RFC 6764).
//!
//! Only the subset needed to locate principals, home-sets and collections is
//! implemented: PROPFIND with depth 0/1, OPTIONS capability detection, and
//! DNS SRV/TXT lookups.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool,
    clippy::struct_excessive_bools
)]

mod cancel;
mod client;
mod config;
mod dns;
mod error;
mod http;
mod request;
mod response;
mod transport;
mod types;
mod xml;

pub use crate::cancel::Cancellation;
pub use crate::client::DavClient;
pub use crate::config::{AuthMethod, DavConfig};
pub use crate::dns::{
    DnsResolver, HickoryResolver, ServiceLocation, SrvRecord, initial_context_paths,
    locate_service, paths_from_txt_records, select_srv_record,
};
pub use crate::error::DavError;
pub use crate::request::{Prop, PropFindRequest};
pub use crate::response::{
    MultiStatusResponse, Privileges, PropStat, Properties, ResourceKind, ResponseItem,
};
pub use crate::transport::{Capabilities, DavResponse, DavTransport, Depth, HrefRelation};
pub use crate::types::{
    Href, ServiceType, parent_url, resolve_href, same_url, url_key, with_trailing_slash,
};
pub use crate::xml::ns;

pub use reqwest::Url;
