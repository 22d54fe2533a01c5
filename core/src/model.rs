// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Persisted entities: services, home-sets, collections and principals.

use std::fmt;
use std::str::FromStr;

use davsync_dav::{DavResponse, ResourceKind, ServiceType, Url, resolve_href, with_trailing_slash};

/// One protocol (`CalDAV` or `CardDAV`) of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Row id.
    pub id: i64,
    /// Account name.
    pub account: String,
    /// Protocol.
    pub service_type: ServiceType,
    /// The account's current-user-principal, if discovered.
    pub principal: Option<Url>,
}

/// A collection whose members are the user's calendars or address books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeSet {
    /// Row id.
    pub id: i64,
    /// Owning service.
    pub service_id: i64,
    /// URL, always with a trailing slash.
    pub url: Url,
    /// Reached as a direct home-set of the account's own principal.
    pub personal: bool,
    /// `DAV:displayname`.
    pub display_name: Option<String>,
    /// Whether collections may be created in it.
    pub priv_bind: bool,
}

/// An identity that owns collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Row id.
    pub id: i64,
    /// Owning service.
    pub service_id: i64,
    /// Principal URL.
    pub url: Url,
    /// `DAV:displayname`.
    pub display_name: Option<String>,
}

/// Kind of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionType {
    /// `CardDAV` address book.
    AddressBook,
    /// `CalDAV` calendar (events, tasks and journals).
    Calendar,
    /// Read-only `WebCal` subscription.
    WebCal,
}

impl CollectionType {
    /// Stable name, also used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddressBook => "address-book",
            Self::Calendar => "calendar",
            Self::WebCal => "webcal",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address-book" => Ok(Self::AddressBook),
            "calendar" => Ok(Self::Calendar),
            "webcal" => Ok(Self::WebCal),
            _ => Err(format!("unknown collection type: {s}")),
        }
    }
}

/// A calendar, address book or `WebCal` subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Row id; 0 until stored.
    pub id: i64,
    /// Owning service.
    pub service_id: i64,
    /// Home-set that lists this collection; `None` means homeless.
    pub homeset_id: Option<i64>,
    /// Owning principal.
    pub owner_id: Option<i64>,
    /// Kind.
    pub collection_type: CollectionType,
    /// URL, always with a trailing slash.
    pub url: Url,
    /// `DAV:displayname`.
    pub display_name: Option<String>,
    /// Calendar or address book description.
    pub description: Option<String>,
    /// Colour as ARGB.
    pub color: Option<u32>,
    /// `VTIMEZONE` of the calendar.
    pub timezone: Option<String>,
    /// The user may change members.
    pub priv_write_content: bool,
    /// The user may remove members.
    pub priv_unbind: bool,
    /// Read-only regardless of privileges, set by the user.
    pub force_read_only: bool,
    /// Accepts `VEVENT`; `None` for address books.
    pub supports_vevent: Option<bool>,
    /// Accepts `VTODO`; `None` for address books.
    pub supports_vtodo: Option<bool>,
    /// Accepts `VJOURNAL`; `None` for address books.
    pub supports_vjournal: Option<bool>,
    /// Source of a `WebCal` subscription.
    pub source: Option<Url>,
    /// Whether the collection is synchronized.
    pub sync: bool,
}

impl Collection {
    /// Builds a collection from one multi-status response.
    ///
    /// Returns `None` if the response failed or does not describe a
    /// calendar, address book or subscription.
    #[must_use]
    pub fn from_response(service_id: i64, response: &DavResponse) -> Option<Self> {
        if !response.is_success() {
            return None;
        }

        let props = &response.props;
        let collection_type = if props.has_type(ResourceKind::Addressbook) {
            CollectionType::AddressBook
        } else if props.has_type(ResourceKind::Calendar) {
            CollectionType::Calendar
        } else if props.has_type(ResourceKind::Subscribed) {
            CollectionType::WebCal
        } else {
            return None;
        };

        let url = with_trailing_slash(&response.url);

        let (priv_write_content, priv_unbind) = match &props.current_user_privilege_set {
            Some(privileges) => (privileges.may_write_content(), privileges.may_unbind()),
            None => (true, true),
        };

        let description = match collection_type {
            CollectionType::AddressBook => props.addressbook_description.clone(),
            CollectionType::Calendar | CollectionType::WebCal => {
                props.calendar_description.clone()
            }
        };

        let (supports_vevent, supports_vtodo, supports_vjournal) = match collection_type {
            CollectionType::AddressBook => (None, None, None),
            CollectionType::Calendar | CollectionType::WebCal => {
                match &props.supported_calendar_components {
                    Some(components) => {
                        let has = |name: &str| Some(components.iter().any(|c| c == name));
                        (has("VEVENT"), has("VTODO"), has("VJOURNAL"))
                    }
                    None => (Some(true), Some(true), Some(true)),
                }
            }
        };

        let source = match collection_type {
            CollectionType::WebCal => props
                .source
                .as_ref()
                .and_then(|href| resolve_href(&url, href).ok()),
            _ => None,
        };

        Some(Self {
            id: 0,
            service_id,
            homeset_id: None,
            owner_id: None,
            collection_type,
            url,
            display_name: non_blank(props.display_name.as_deref()),
            description: non_blank(description.as_deref()),
            color: props.calendar_color.as_deref().and_then(parse_color),
            timezone: non_blank(props.calendar_timezone.as_deref()),
            priv_write_content,
            priv_unbind,
            force_read_only: false,
            supports_vevent,
            supports_vtodo,
            supports_vjournal,
            source,
            sync: false,
        })
    }

    /// Whether a refresh of a `service_type` service keeps this collection.
    #[must_use]
    pub fn is_usable_for(&self, service_type: ServiceType) -> bool {
        match service_type {
            ServiceType::CardDav => self.collection_type == CollectionType::AddressBook,
            ServiceType::CalDav => match self.collection_type {
                CollectionType::Calendar => true,
                CollectionType::WebCal => self.source.is_some(),
                CollectionType::AddressBook => false,
            },
        }
    }

    /// Whether members must not be changed.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.force_read_only || !self.priv_write_content
    }

    /// Display name, or the last path segment of the URL.
    #[must_use]
    pub fn title(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        self.url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .unwrap_or("/")
            .to_string()
    }
}

/// Owner href of a response, resolved against the response URL.
#[must_use]
pub fn owner_url(response: &DavResponse) -> Option<Url> {
    let owner = response.props.owner.as_ref()?;
    resolve_href(&response.url, owner).ok()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Parses `#RRGGBB` or `#RRGGBBAA` into ARGB.
fn parse_color(value: &str) -> Option<u32> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => u32::from_str_radix(hex, 16).ok().map(|rgb| 0xFF00_0000 | rgb),
        8 => {
            let rgba = u32::from_str_radix(hex, 16).ok()?;
            Some(rgba.rotate_right(8))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use davsync_dav::{HrefRelation, Privileges, Properties};

    use super::*;

    fn response(url: &str, props: Properties) -> DavResponse {
        DavResponse {
            url: Url::parse(url).unwrap(),
            relation: HrefRelation::Member,
            status: None,
            props,
        }
    }

    #[test]
    fn parse_color_formats() {
        assert_eq!(parse_color("#FF0000"), Some(0xFFFF_0000));
        assert_eq!(parse_color("#3366FFCC"), Some(0xCC33_66FF));
        assert_eq!(parse_color("#abc"), None);
        assert_eq!(parse_color("red"), None);
    }

    #[test]
    fn calendar_without_component_set_supports_everything() {
        let props = Properties {
            resource_type: Some(vec![ResourceKind::Collection, ResourceKind::Calendar]),
            display_name: Some("  ".to_string()),
            ..Properties::default()
        };
        let collection =
            Collection::from_response(1, &response("https://dav.example.com/cal/work", props))
                .unwrap();

        assert_eq!(collection.collection_type, CollectionType::Calendar);
        assert_eq!(collection.url.as_str(), "https://dav.example.com/cal/work/");
        assert_eq!(collection.display_name, None);
        assert_eq!(collection.title(), "work");
        assert_eq!(collection.supports_vevent, Some(true));
        assert_eq!(collection.supports_vtodo, Some(true));
        assert_eq!(collection.supports_vjournal, Some(true));
        assert!(collection.is_usable_for(ServiceType::CalDav));
        assert!(!collection.is_usable_for(ServiceType::CardDav));
    }

    #[test]
    fn task_list_and_privileges() {
        let props = Properties {
            resource_type: Some(vec![ResourceKind::Collection, ResourceKind::Calendar]),
            supported_calendar_components: Some(vec!["VTODO".to_string()]),
            current_user_privilege_set: Some(Privileges {
                names: vec!["read".to_string()],
            }),
            ..Properties::default()
        };
        let collection =
            Collection::from_response(1, &response("https://dav.example.com/tasks/", props))
                .unwrap();

        assert_eq!(collection.supports_vevent, Some(false));
        assert_eq!(collection.supports_vtodo, Some(true));
        assert!(!collection.priv_write_content);
        assert!(collection.is_read_only());
    }

    #[test]
    fn webcal_needs_source_to_be_usable() {
        let props = Properties {
            resource_type: Some(vec![ResourceKind::Collection, ResourceKind::Subscribed]),
            source: Some("https://example.com/holidays.ics".into()),
            ..Properties::default()
        };
        let webcal =
            Collection::from_response(1, &response("https://dav.example.com/subs/h/", props))
                .unwrap();
        assert_eq!(webcal.collection_type, CollectionType::WebCal);
        assert!(webcal.is_usable_for(ServiceType::CalDav));

        let mut without_source = webcal.clone();
        without_source.source = None;
        assert!(!without_source.is_usable_for(ServiceType::CalDav));
    }

    #[test]
    fn plain_collection_and_failed_response_are_not_collections() {
        let props = Properties {
            resource_type: Some(vec![ResourceKind::Collection]),
            ..Properties::default()
        };
        assert!(
            Collection::from_response(1, &response("https://dav.example.com/x/", props)).is_none()
        );

        let mut failed = response(
            "https://dav.example.com/ab/",
            Properties {
                resource_type: Some(vec![ResourceKind::Addressbook]),
                ..Properties::default()
            },
        );
        failed.status = Some(404);
        assert!(Collection::from_response(1, &failed).is_none());
    }

    #[test]
    fn owner_is_resolved_against_response() {
        let props = Properties {
            owner: Some("/principals/bob/".into()),
            ..Properties::default()
        };
        let owner = owner_url(&response("https://dav.example.com/cal/shared/", props)).unwrap();
        assert_eq!(owner.as_str(), "https://dav.example.com/principals/bob/");
    }
}
