// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Multi-status response parser.
//!
//! Each `<response>` is decoded into an explicit [`Properties`] struct, one
//! field per property discovery understands. Unknown properties are skipped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::DavError;
use crate::types::Href;
use crate::xml::{read_text, skip_element};

/// `WebDAV` multistatus response.
#[derive(Debug, Clone, Default)]
pub struct MultiStatusResponse {
    /// The response items.
    pub responses: Vec<ResponseItem>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone)]
pub struct ResponseItem {
    /// Href of the described resource, as sent by the server.
    pub href: Href,
    /// Response-level status line, if the server sent one.
    pub status: Option<String>,
    /// Property groups with their status.
    pub prop_stats: Vec<PropStat>,
}

/// Property stat with status and value.
#[derive(Debug, Clone)]
pub struct PropStat {
    /// Properties reported with this status.
    pub props: Properties,
    /// Status line, e.g. `HTTP/1.1 200 OK`.
    pub status: String,
}

/// Resource types found in `DAV:resourcetype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `DAV:collection`.
    Collection,
    /// `DAV:principal`.
    Principal,
    /// `CALDAV:calendar`.
    Calendar,
    /// `CARDDAV:addressbook`.
    Addressbook,
    /// `CS:subscribed` (`WebCal` subscription).
    Subscribed,
    /// `CS:calendar-proxy-read`.
    CalendarProxyRead,
    /// `CS:calendar-proxy-write`.
    CalendarProxyWrite,
}

impl ResourceKind {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"collection" => Some(Self::Collection),
            b"principal" => Some(Self::Principal),
            b"calendar" => Some(Self::Calendar),
            b"addressbook" => Some(Self::Addressbook),
            b"subscribed" => Some(Self::Subscribed),
            b"calendar-proxy-read" => Some(Self::CalendarProxyRead),
            b"calendar-proxy-write" => Some(Self::CalendarProxyWrite),
            _ => None,
        }
    }
}

/// Privileges from `DAV:current-user-privilege-set` (RFC 3744 §5.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Privileges {
    /// Privilege names, e.g. `read`, `write-content`, `bind`.
    pub names: Vec<String>,
}

impl Privileges {
    fn has(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Whether the current user may change resource contents.
    #[must_use]
    pub fn may_write_content(&self) -> bool {
        self.has("all") || self.has("write") || self.has("write-content")
    }

    /// Whether the current user may create members.
    #[must_use]
    pub fn may_bind(&self) -> bool {
        self.has("all") || self.has("write") || self.has("bind")
    }

    /// Whether the current user may remove members.
    #[must_use]
    pub fn may_unbind(&self) -> bool {
        self.has("all") || self.has("write") || self.has("unbind")
    }
}

/// Decoded WebDAV/CalDAV/CardDAV properties of one resource.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// `DAV:displayname`.
    pub display_name: Option<String>,
    /// `DAV:resourcetype`; `None` if the property was not returned.
    pub resource_type: Option<Vec<ResourceKind>>,
    /// `DAV:current-user-principal`.
    pub current_user_principal: Option<Href>,
    /// `DAV:current-user-privilege-set`.
    pub current_user_privilege_set: Option<Privileges>,
    /// `DAV:group-membership`.
    pub group_membership: Vec<Href>,
    /// `DAV:owner`.
    pub owner: Option<Href>,
    /// `CALDAV:calendar-home-set`.
    pub calendar_home_set: Vec<Href>,
    /// `CARDDAV:addressbook-home-set`.
    pub addressbook_home_set: Vec<Href>,
    /// `CALDAV:calendar-user-address-set`.
    pub calendar_user_address_set: Vec<Href>,
    /// `CS:calendar-proxy-read-for`.
    pub calendar_proxy_read_for: Vec<Href>,
    /// `CS:calendar-proxy-write-for`.
    pub calendar_proxy_write_for: Vec<Href>,
    /// `CALDAV:calendar-description`.
    pub calendar_description: Option<String>,
    /// `CARDDAV:addressbook-description`.
    pub addressbook_description: Option<String>,
    /// `CALDAV:calendar-timezone`, a VTIMEZONE component.
    pub calendar_timezone: Option<String>,
    /// `ICAL:calendar-color`, as sent.
    pub calendar_color: Option<String>,
    /// Component names from `CALDAV:supported-calendar-component-set`, upper case.
    pub supported_calendar_components: Option<Vec<String>>,
    /// `CS:source` of a `WebCal` subscription.
    pub source: Option<Href>,
}

impl Properties {
    /// Whether `DAV:resourcetype` lists `kind`.
    #[must_use]
    pub fn has_type(&self, kind: ResourceKind) -> bool {
        self.resource_type
            .as_ref()
            .is_some_and(|types| types.contains(&kind))
    }

    fn merge(&mut self, other: Self) {
        fn take<T>(dst: &mut Option<T>, src: Option<T>) {
            if src.is_some() {
                *dst = src;
            }
        }

        take(&mut self.display_name, other.display_name);
        take(&mut self.resource_type, other.resource_type);
        take(&mut self.current_user_principal, other.current_user_principal);
        take(
            &mut self.current_user_privilege_set,
            other.current_user_privilege_set,
        );
        take(&mut self.owner, other.owner);
        take(&mut self.calendar_description, other.calendar_description);
        take(
            &mut self.addressbook_description,
            other.addressbook_description,
        );
        take(&mut self.calendar_timezone, other.calendar_timezone);
        take(&mut self.calendar_color, other.calendar_color);
        take(
            &mut self.supported_calendar_components,
            other.supported_calendar_components,
        );
        take(&mut self.source, other.source);
        self.group_membership.extend(other.group_membership);
        self.calendar_home_set.extend(other.calendar_home_set);
        self.addressbook_home_set.extend(other.addressbook_home_set);
        self.calendar_user_address_set
            .extend(other.calendar_user_address_set);
        self.calendar_proxy_read_for
            .extend(other.calendar_proxy_read_for);
        self.calendar_proxy_write_for
            .extend(other.calendar_proxy_write_for);
    }
}

/// Extracts the numeric code from a status line like `HTTP/1.1 404 Not Found`.
#[must_use]
pub fn status_code(status: &str) -> Option<u16> {
    status.split_whitespace().nth(1)?.parse().ok()
}

fn is_success_line(status: &str) -> bool {
    status_code(status).is_some_and(|code| (200..300).contains(&code))
}

impl ResponseItem {
    /// Response-level status code, if present and well-formed.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status.as_deref().and_then(status_code)
    }

    /// Whether the response as a whole reports success.
    ///
    /// A response without a response-level status is successful; its
    /// properties carry their own status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code()
            .is_none_or(|code| (200..300).contains(&code))
    }

    /// Properties from all propstats with a 2xx status, merged.
    #[must_use]
    pub fn properties(&self) -> Properties {
        let mut props = Properties::default();
        for prop_stat in &self.prop_stats {
            if is_success_line(&prop_stat.status) {
                props.merge(prop_stat.props.clone());
            }
        }
        props
    }
}

fn local_name<'a>(e: &'a BytesStart<'_>) -> &'a [u8] {
    e.local_name().into_inner()
}

impl MultiStatusResponse {
    /// Parses multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns an error if XML parsing fails.
    pub fn from_xml(xml: &str) -> Result<Self, DavError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().check_end_names = true;

        let mut responses = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(ref e) if local_name(e) == b"response" => {
                    responses.push(parse_response(&mut reader)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { responses })
    }
}

fn parse_response(reader: &mut Reader<&[u8]>) -> Result<ResponseItem, DavError> {
    let mut href: Option<Href> = None;
    let mut status = None;
    let mut prop_stats = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match local_name(e) {
                b"href" => {
                    let text = read_text(reader)?;
                    // a response may repeat <href> when it reports a bare status
                    if href.is_none() {
                        href = Some(Href::new(text));
                    }
                }
                b"status" => status = Some(read_text(reader)?),
                b"propstat" => prop_stats.push(parse_propstat(reader)?),
                _ => skip_element(reader)?,
            },
            Event::End(ref e) if e.local_name().into_inner() == b"response" => break,
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    let href = href.ok_or_else(|| DavError::Xml("response without href".to_string()))?;
    Ok(ResponseItem {
        href,
        status,
        prop_stats,
    })
}

fn parse_propstat(reader: &mut Reader<&[u8]>) -> Result<PropStat, DavError> {
    let mut props = Properties::default();
    let mut status = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match local_name(e) {
                b"prop" => props = parse_prop(reader)?,
                b"status" => status = read_text(reader)?,
                _ => skip_element(reader)?,
            },
            Event::End(ref e) if e.local_name().into_inner() == b"propstat" => break,
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(PropStat { props, status })
}

fn parse_prop(reader: &mut Reader<&[u8]>) -> Result<Properties, DavError> {
    let mut props = Properties::default();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match local_name(e) {
                b"displayname" => props.display_name = Some(read_text(reader)?),
                b"resourcetype" => props.resource_type = Some(parse_resource_type(reader)?),
                b"current-user-principal" => {
                    props.current_user_principal = read_hrefs(reader)?.into_iter().next();
                }
                b"current-user-privilege-set" => {
                    props.current_user_privilege_set = Some(parse_privileges(reader)?);
                }
                b"group-membership" => props.group_membership = read_hrefs(reader)?,
                b"owner" => props.owner = read_hrefs(reader)?.into_iter().next(),
                b"calendar-home-set" => props.calendar_home_set = read_hrefs(reader)?,
                b"addressbook-home-set" => props.addressbook_home_set = read_hrefs(reader)?,
                b"calendar-user-address-set" => {
                    props.calendar_user_address_set = read_hrefs(reader)?;
                }
                b"calendar-proxy-read-for" => props.calendar_proxy_read_for = read_hrefs(reader)?,
                b"calendar-proxy-write-for" => {
                    props.calendar_proxy_write_for = read_hrefs(reader)?;
                }
                b"calendar-description" => props.calendar_description = Some(read_text(reader)?),
                b"addressbook-description" => {
                    props.addressbook_description = Some(read_text(reader)?);
                }
                b"calendar-timezone" => props.calendar_timezone = Some(read_text(reader)?),
                b"calendar-color" => props.calendar_color = Some(read_text(reader)?),
                b"supported-calendar-component-set" => {
                    props.supported_calendar_components = Some(parse_components(reader)?);
                }
                b"source" => props.source = read_hrefs(reader)?.into_iter().next(),
                _ => skip_element(reader)?,
            },
            Event::Empty(ref e) => {
                if local_name(e) == b"resourcetype" {
                    props.resource_type = Some(Vec::new());
                }
            }
            Event::End(ref e) if e.local_name().into_inner() == b"prop" => break,
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(props)
}

/// Reads every `<href>` directly or indirectly inside the current element.
fn read_hrefs(reader: &mut Reader<&[u8]>) -> Result<Vec<Href>, DavError> {
    let mut hrefs = Vec::new();
    let mut depth = 1usize;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if local_name(e) == b"href" => {
                let text = read_text(reader)?;
                if !text.is_empty() {
                    hrefs.push(Href::new(text));
                }
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(hrefs)
}

fn parse_resource_type(reader: &mut Reader<&[u8]>) -> Result<Vec<ResourceKind>, DavError> {
    let mut kinds = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                kinds.extend(ResourceKind::from_local_name(local_name(e)));
                skip_element(reader)?;
            }
            Event::Empty(ref e) => kinds.extend(ResourceKind::from_local_name(local_name(e))),
            Event::End(_) => break,
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(kinds)
}

fn parse_privileges(reader: &mut Reader<&[u8]>) -> Result<Privileges, DavError> {
    let mut names = Vec::new();
    let mut in_privilege = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if !in_privilege && local_name(e) == b"privilege" => {
                in_privilege = true;
            }
            Event::Start(ref e) => {
                if in_privilege {
                    names.push(String::from_utf8_lossy(local_name(e)).into_owned());
                }
                skip_element(reader)?;
            }
            Event::Empty(ref e) => {
                if in_privilege {
                    names.push(String::from_utf8_lossy(local_name(e)).into_owned());
                }
            }
            Event::End(_) if in_privilege => in_privilege = false,
            Event::End(_) => break,
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(Privileges { names })
}

fn parse_components(reader: &mut Reader<&[u8]>) -> Result<Vec<String>, DavError> {
    let mut components = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                components.extend(component_name(e)?);
                skip_element(reader)?;
            }
            Event::Empty(ref e) => components.extend(component_name(e)?),
            Event::End(_) => break,
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
    }

    Ok(components)
}

fn component_name(e: &BytesStart<'_>) -> Result<Option<String>, DavError> {
    if local_name(e) != b"comp" {
        return Ok(None);
    }
    match e.try_get_attribute("name") {
        Ok(Some(name_attr)) => {
            let name = std::str::from_utf8(&name_attr.value)
                .map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))?;
            Ok(Some(name.to_ascii_uppercase()))
        }
        _ => Ok(None),
    }
}
