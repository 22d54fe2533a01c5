// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashSet, VecDeque};

use davsync_dav::{Depth, Prop, ResourceKind, ServiceType, Url, parent_url, same_url, url_key};

use crate::discovery::{home_set_hrefs, home_set_prop, resolve_collection_hrefs};
use crate::{DiscoverySession, Error};

/// Deepest level whose related principals are still followed.
const MAX_FOLLOW_LEVEL: u8 = 1;

/// A home-set reached from a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundHomeSet {
    /// URL with a trailing slash.
    pub url: Url,
    /// Listed by the principal discovery started from.
    pub personal: bool,
}

/// Finds the home-sets reachable from `principal`.
///
/// The principal itself is level 0. Its proxy-for and group memberships are
/// level 1, and so on. A principal URL is queried at most once, so cyclic
/// group and proxy graphs terminate. When a home-set is reachable from several
/// principals, the first (lowest level) occurrence wins.
///
/// # Errors
///
/// Returns 401 (also flagged on the session), cancellation, transport and 5xx
/// errors. Other 4xx answers are logged and the principal is skipped.
#[tracing::instrument(skip(session))]
pub async fn discover_homesets(
    session: &DiscoverySession,
    service: ServiceType,
    principal: &Url,
) -> Result<Vec<FoundHomeSet>, Error> {
    let mut props = vec![
        Prop::DisplayName,
        Prop::ResourceType,
        Prop::GroupMembership,
        home_set_prop(service),
    ];
    if service == ServiceType::CalDav {
        props.extend([Prop::CalendarProxyReadFor, Prop::CalendarProxyWriteFor]);
    }

    let mut queue = VecDeque::from([(principal.clone(), 0u8)]);
    let mut visited: HashSet<String> = HashSet::new();
    let mut found: Vec<FoundHomeSet> = Vec::new();

    while let Some((url, level)) = queue.pop_front() {
        session.check_cancelled()?;
        if !visited.insert(url_key(&url)) {
            tracing::warn!(%url, "principal already queried, skipping");
            continue;
        }

        let responses = match session.propfind(&url, Depth::Zero, &props).await {
            Ok(responses) => responses,
            Err(err) if err.is_unauthorized() => {
                session.flag_unauthorized();
                return Err(err);
            }
            Err(err) if err.is_client_error() => {
                session
                    .log()
                    .note(format!("{url} does not offer {service}: {err}"));
                continue;
            }
            Err(err) => return Err(err),
        };

        for response in responses.iter().filter(|r| r.is_success()) {
            visited.insert(url_key(&response.url));
            let props = &response.props;

            for home_set in resolve_collection_hrefs(&response.url, home_set_hrefs(props, service)) {
                if found.iter().all(|h| !same_url(&h.url, &home_set)) {
                    session.log().note(format!("found home-set {home_set}"));
                    found.push(FoundHomeSet {
                        url: home_set,
                        personal: level == 0,
                    });
                }
            }

            if level > MAX_FOLLOW_LEVEL {
                continue;
            }

            let mut related = Vec::new();
            if level == 0 {
                for hrefs in [
                    &props.calendar_proxy_read_for,
                    &props.calendar_proxy_write_for,
                    &props.group_membership,
                ] {
                    related.extend(resolve_collection_hrefs(&response.url, hrefs));
                }
            }
            // proxy groups live below the principal they act for
            if props.has_type(ResourceKind::CalendarProxyRead)
                || props.has_type(ResourceKind::CalendarProxyWrite)
            {
                related.push(parent_url(&response.url));
            }

            for next in related {
                tracing::debug!(from = %response.url, to = %next, "following related principal");
                queue.push_back((next, level + 1));
            }
        }
    }

    Ok(found)
}
