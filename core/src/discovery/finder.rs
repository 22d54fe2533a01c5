// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::{
    Depth, Prop, ResourceKind, ServiceType, Url, locate_service, resolve_href,
    with_trailing_slash,
};

use crate::discovery::{
    ServiceInfo, collection_props, current_user_principal, home_set_hrefs, home_set_prop,
    resolve_collection_hrefs,
};
use crate::model::Collection;
use crate::{DiscoverySession, Error};

/// Result of discovery from one user-supplied URL.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    /// `CardDAV` findings, `None` if the service was not found.
    pub carddav: Option<ServiceInfo>,
    /// `CalDAV` findings, `None` if the service was not found.
    pub caldav: Option<ServiceInfo>,
    /// Some server answered 401, so the credentials may be wrong.
    pub encountered_401: bool,
    /// What discovery tried, for showing to the user.
    pub logs: Vec<String>,
}

impl Configuration {
    /// Findings for `service`.
    #[must_use]
    pub fn service(&self, service: ServiceType) -> Option<&ServiceInfo> {
        match service {
            ServiceType::CalDav => self.caldav.as_ref(),
            ServiceType::CardDav => self.carddav.as_ref(),
        }
    }
}

/// Discovers both services from an `http(s)` URL or a `mailto:` URI.
///
/// Failures are noted in [`Configuration::logs`] and do not stop discovery of
/// the other service. A 401 anywhere sets [`Configuration::encountered_401`].
///
/// # Errors
///
/// Returns an error only if the session was cancelled.
#[tracing::instrument(skip(session), fields(input = %input))]
pub async fn find_initial_configuration(
    session: &DiscoverySession,
    input: &Url,
) -> Result<Configuration, Error> {
    let mut config = Configuration::default();

    for service in ServiceType::ALL {
        let info = match find_service(session, input, service).await {
            Ok(info) => info,
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                absorb(session, &err);
                session
                    .log()
                    .note(format!("{service} discovery failed: {err}"));
                None
            }
        };
        match service {
            ServiceType::CalDav => config.caldav = info,
            ServiceType::CardDav => config.carddav = info,
        }
    }

    config.encountered_401 = session.encountered_401();
    config.logs = session.log().take();
    Ok(config)
}

async fn find_service(
    session: &DiscoverySession,
    input: &Url,
    service: ServiceType,
) -> Result<Option<ServiceInfo>, Error> {
    let mut info = ServiceInfo::default();

    let domain = match input.scheme() {
        "http" | "https" => {
            if let Err(err) = scan(session, input, service, &mut info).await {
                fail_soft::<()>(session, err, input)?;
            }

            if info.principal.is_none() {
                let well_known = format!("/.well-known/{}", service.well_known_name());
                match input.join(&well_known) {
                    Ok(url) => {
                        info.principal = current_user_principal(session, &url, Some(service))
                            .await
                            .or_else(|err| fail_soft(session, err, &url))?;
                    }
                    Err(err) => tracing::warn!(%input, %err, "cannot build well-known URL"),
                }
            }
            input.host_str().map(ToString::to_string)
        }
        "mailto" => input
            .path()
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string()),
        scheme => {
            session
                .log()
                .note(format!("unsupported URL scheme {scheme}"));
            None
        }
    };

    if info.principal.is_none()
        && let Some(domain) = domain.filter(|d| !d.is_empty())
    {
        info.principal = from_domain(session, &domain, service).await?;
    }

    if let Some(principal) = info.principal.clone() {
        if info.home_sets.is_empty()
            && let Err(err) = scan(session, &principal, service, &mut info).await
        {
            fail_soft::<()>(session, err, &principal)?;
        }

        if service == ServiceType::CalDav {
            match harvest_emails(session, &principal).await {
                Ok(emails) => info.emails = emails,
                Err(err) => fail_soft(session, err, &principal)?,
            }
        }
    }

    Ok((!info.is_empty()).then_some(info))
}

/// Looks at `url` itself: it may be a collection, a principal, or name one.
async fn scan(
    session: &DiscoverySession,
    url: &Url,
    service: ServiceType,
    info: &mut ServiceInfo,
) -> Result<(), Error> {
    let mut props = collection_props(service);
    props.extend([Prop::CurrentUserPrincipal, home_set_prop(service)]);

    let responses = session.propfind(url, Depth::Zero, &props).await?;
    for response in responses.iter().filter(|r| r.is_success()) {
        if let Some(collection) = Collection::from_response(0, response)
            && collection.is_usable_for(service)
        {
            session
                .log()
                .note(format!("{} is a {}", collection.url, collection.collection_type));
            info.add_collection(collection);
        }

        for home_set in resolve_collection_hrefs(&response.url, home_set_hrefs(&response.props, service))
        {
            session.log().note(format!("found home-set {home_set}"));
            info.add_home_set(home_set);
        }

        if info.principal.is_none() {
            if let Some(href) = &response.props.current_user_principal {
                match resolve_href(&response.url, href) {
                    Ok(principal) => info.principal = Some(principal),
                    Err(err) => tracing::warn!(%url, %href, %err, "invalid current-user-principal"),
                }
            } else if response.props.has_type(ResourceKind::Principal) {
                info.principal = Some(with_trailing_slash(&response.url));
            }
        }
    }
    Ok(())
}

/// Tries the DNS candidates of `domain` until one yields a principal.
async fn from_domain(
    session: &DiscoverySession,
    domain: &str,
    service: ServiceType,
) -> Result<Option<Url>, Error> {
    let location = locate_service(session.dns(), domain, service, session.cancellation()).await?;
    let candidates = match location.urls() {
        Ok(candidates) => candidates,
        Err(err) => {
            session
                .log()
                .note(format!("no usable {service} location for {domain}: {err}"));
            return Ok(None);
        }
    };

    for candidate in candidates {
        match current_user_principal(session, &candidate, Some(service)).await {
            Ok(Some(principal)) => return Ok(Some(principal)),
            Ok(None) => {}
            Err(err) => fail_soft(session, err, &candidate)?,
        }
    }
    Ok(None)
}

/// Mailboxes the principal may use as calendar user (RFC 6638).
async fn harvest_emails(session: &DiscoverySession, principal: &Url) -> Result<Vec<String>, Error> {
    let responses = session
        .propfind(principal, Depth::Zero, &[Prop::CalendarUserAddressSet])
        .await?;

    let mut emails: Vec<String> = Vec::new();
    for response in responses.iter().filter(|r| r.is_success()) {
        for href in &response.props.calendar_user_address_set {
            let href = href.trim();
            let Some((scheme, mailbox)) = href.split_once(':') else {
                continue;
            };
            if scheme.eq_ignore_ascii_case("mailto")
                && !mailbox.is_empty()
                && !emails.iter().any(|e| e == mailbox)
            {
                emails.push(mailbox.to_string());
            }
        }
    }
    Ok(emails)
}

/// Notes a failed step. Only cancellation is passed on.
fn fail_soft<T: Default>(session: &DiscoverySession, err: Error, url: &Url) -> Result<T, Error> {
    if err.is_cancelled() {
        return Err(err);
    }
    absorb(session, &err);
    session.log().note(format!("{url}: {err}"));
    Ok(T::default())
}

fn absorb(session: &DiscoverySession, err: &Error) {
    if err.is_unauthorized() {
        session.flag_unauthorized();
    }
}
