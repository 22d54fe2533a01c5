// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! PROPFIND request bodies.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::error::DavError;
use crate::xml::ns;

/// PROPFIND request builder.
#[derive(Debug, Clone, Default)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

/// Properties that discovery asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// `DAV:displayname`.
    DisplayName,
    /// `DAV:resourcetype`.
    ResourceType,
    /// `DAV:current-user-principal` (RFC 5397).
    CurrentUserPrincipal,
    /// `DAV:current-user-privilege-set` (RFC 3744).
    CurrentUserPrivilegeSet,
    /// `DAV:group-membership` (RFC 3744).
    GroupMembership,
    /// `DAV:owner`.
    Owner,
    /// `CALDAV:calendar-home-set`.
    CalendarHomeSet,
    /// `CALDAV:calendar-user-address-set` (RFC 6638).
    CalendarUserAddressSet,
    /// `CALDAV:calendar-description`.
    CalendarDescription,
    /// `CALDAV:calendar-timezone`.
    CalendarTimezone,
    /// `CALDAV:supported-calendar-component-set`.
    SupportedCalendarComponentSet,
    /// `CARDDAV:addressbook-home-set`.
    AddressbookHomeSet,
    /// `CARDDAV:addressbook-description`.
    AddressbookDescription,
    /// `CS:calendar-proxy-read-for`.
    CalendarProxyReadFor,
    /// `CS:calendar-proxy-write-for`.
    CalendarProxyWriteFor,
    /// `CS:source` of a subscribed calendar.
    Source,
    /// `ICAL:calendar-color`.
    CalendarColor,
}

impl Prop {
    const fn name(self) -> &'static str {
        match self {
            Self::DisplayName => "displayname",
            Self::ResourceType => "resourcetype",
            Self::CurrentUserPrincipal => "current-user-principal",
            Self::CurrentUserPrivilegeSet => "current-user-privilege-set",
            Self::GroupMembership => "group-membership",
            Self::Owner => "owner",
            Self::CalendarHomeSet => "calendar-home-set",
            Self::CalendarUserAddressSet => "calendar-user-address-set",
            Self::CalendarDescription => "calendar-description",
            Self::CalendarTimezone => "calendar-timezone",
            Self::SupportedCalendarComponentSet => "supported-calendar-component-set",
            Self::AddressbookHomeSet => "addressbook-home-set",
            Self::AddressbookDescription => "addressbook-description",
            Self::CalendarProxyReadFor => "calendar-proxy-read-for",
            Self::CalendarProxyWriteFor => "calendar-proxy-write-for",
            Self::Source => "source",
            Self::CalendarColor => "calendar-color",
        }
    }

    /// Namespace prefix used in the request body.
    const fn prefix(self) -> &'static str {
        match self {
            Self::DisplayName
            | Self::ResourceType
            | Self::CurrentUserPrincipal
            | Self::CurrentUserPrivilegeSet
            | Self::GroupMembership
            | Self::Owner => "D",
            Self::CalendarHomeSet
            | Self::CalendarUserAddressSet
            | Self::CalendarDescription
            | Self::CalendarTimezone
            | Self::SupportedCalendarComponentSet => "C",
            Self::AddressbookHomeSet | Self::AddressbookDescription => "CARD",
            Self::CalendarProxyReadFor | Self::CalendarProxyWriteFor | Self::Source => "CS",
            Self::CalendarColor => "ICAL",
        }
    }
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        if !self.props.contains(&prop) {
            self.props.push(prop);
        }
        self
    }

    /// Properties in request order.
    #[must_use]
    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <D:propfind xmlns:D="DAV:" ...>
        let mut propfind = BytesStart::new("D:propfind");
        propfind.push_attribute(("xmlns:D", ns::DAV));
        for (prefix, uri) in [
            ("C", ns::CALDAV),
            ("CARD", ns::CARDDAV),
            ("CS", ns::CALENDARSERVER),
            ("ICAL", ns::APPLE_ICAL),
        ] {
            if self.props.iter().any(|p| p.prefix() == prefix) {
                propfind.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
            }
        }
        writer.write_event(Event::Start(propfind))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        for prop in &self.props {
            let qname = format!("{}:{}", prop.prefix(), prop.name());
            writer.write_event(Event::Empty(BytesStart::new(qname)))?;
        }
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
    }
}

impl FromIterator<Prop> for PropFindRequest {
    fn from_iter<I: IntoIterator<Item = Prop>>(iter: I) -> Self {
        let mut request = Self::new();
        for prop in iter {
            request.add_property(prop);
        }
        request
    }
}
