// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Locating principals, home-sets and collections from what a user typed in.

mod finder;
mod homesets;
mod principal;

use davsync_dav::{
    Href, Prop, Properties, ServiceType, Url, resolve_href, same_url, with_trailing_slash,
};

pub use crate::discovery::finder::{Configuration, find_initial_configuration};
pub use crate::discovery::homesets::{FoundHomeSet, discover_homesets};
pub use crate::discovery::principal::current_user_principal;
use crate::model::Collection;

/// What discovery found for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    /// The account's current-user-principal.
    pub principal: Option<Url>,
    /// Home-sets, with trailing slashes, without duplicates.
    pub home_sets: Vec<Url>,
    /// Collections found directly at the given URL.
    pub collections: Vec<Collection>,
    /// Mailboxes from `calendar-user-address-set`; `CalDAV` only.
    pub emails: Vec<String>,
}

impl ServiceInfo {
    /// Whether nothing usable was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.principal.is_none() && self.home_sets.is_empty() && self.collections.is_empty()
    }

    fn add_home_set(&mut self, url: Url) {
        if !self.home_sets.iter().any(|h| same_url(h, &url)) {
            self.home_sets.push(url);
        }
    }

    fn add_collection(&mut self, collection: Collection) {
        if !self.collections.iter().any(|c| same_url(&c.url, &collection.url)) {
            self.collections.push(collection);
        }
    }
}

/// The property naming the home-sets of `service`.
pub(crate) const fn home_set_prop(service: ServiceType) -> Prop {
    match service {
        ServiceType::CalDav => Prop::CalendarHomeSet,
        ServiceType::CardDav => Prop::AddressbookHomeSet,
    }
}

pub(crate) fn home_set_hrefs(props: &Properties, service: ServiceType) -> &[Href] {
    match service {
        ServiceType::CalDav => &props.calendar_home_set,
        ServiceType::CardDav => &props.addressbook_home_set,
    }
}

/// Properties needed to build a [`Collection`] of `service`.
pub(crate) fn collection_props(service: ServiceType) -> Vec<Prop> {
    let mut props = vec![
        Prop::ResourceType,
        Prop::DisplayName,
        Prop::Owner,
        Prop::CurrentUserPrivilegeSet,
    ];
    match service {
        ServiceType::CardDav => props.push(Prop::AddressbookDescription),
        ServiceType::CalDav => props.extend([
            Prop::CalendarDescription,
            Prop::CalendarColor,
            Prop::CalendarTimezone,
            Prop::SupportedCalendarComponentSet,
            Prop::Source,
        ]),
    }
    props
}

/// Resolves `hrefs` against `base` with trailing slashes. Unresolvable hrefs are skipped.
pub(crate) fn resolve_collection_hrefs(base: &Url, hrefs: &[Href]) -> Vec<Url> {
    hrefs
        .iter()
        .filter_map(|href| match resolve_href(base, href) {
            Ok(url) => Some(with_trailing_slash(&url)),
            Err(err) => {
                tracing::warn!(%base, %href, %err, "ignoring invalid href");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_props_depend_on_service() {
        let caldav = collection_props(ServiceType::CalDav);
        assert!(caldav.contains(&Prop::SupportedCalendarComponentSet));
        assert!(!caldav.contains(&Prop::AddressbookDescription));

        let carddav = collection_props(ServiceType::CardDav);
        assert!(carddav.contains(&Prop::AddressbookDescription));
        assert!(!carddav.contains(&Prop::Source));
    }

    #[test]
    fn hrefs_resolve_with_trailing_slash() {
        let base = Url::parse("https://dav.example.com/principals/alice/").unwrap();
        let urls = resolve_collection_hrefs(
            &base,
            &[Href::from("/calendars/alice"), Href::from("https://other.example.com/h/")],
        );
        assert_eq!(urls[0].as_str(), "https://dav.example.com/calendars/alice/");
        assert_eq!(urls[1].as_str(), "https://other.example.com/h/");
    }
}
