// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV/CardDAV processing.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;

use crate::error::DavError;

/// XML namespaces used in discovery.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

    /// Apple calendar server namespace (proxies, subscriptions).
    pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";

    /// Apple iCal namespace (calendar colour).
    pub const APPLE_ICAL: &str = "http://apple.com/ns/ical/";
}

/// Reads the text content of the element whose start tag was just consumed,
/// up to and including its end tag. Nested markup is skipped.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, DavError> {
    let mut text = String::new();
    let mut depth = 1usize;

    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Text(e) => text.push_str(&e.decode()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                if let Some(ch) = e.resolve_char_ref()? {
                    text.push(ch);
                } else if let Some(resolved) = resolve_predefined_entity(&e.decode()?) {
                    text.push_str(resolved);
                }
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

/// Skips to the end of the element whose start tag was just consumed.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), DavError> {
    let mut depth = 1usize;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }
}
