// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::{Depth, Prop, ServiceType, Url, resolve_href};

use crate::{DiscoverySession, Error};

/// Asks `url` for the current-user-principal (RFC 5397).
///
/// If `service` is given, the principal must announce the service in its
/// `DAV:` header, otherwise it is discarded. A 4xx answer means "not found";
/// a 401 is also remembered by the session.
///
/// # Errors
///
/// Returns cancellation, transport and 5xx errors.
pub async fn current_user_principal(
    session: &DiscoverySession,
    url: &Url,
    service: Option<ServiceType>,
) -> Result<Option<Url>, Error> {
    let responses = match session
        .propfind(url, Depth::Zero, &[Prop::CurrentUserPrincipal])
        .await
    {
        Ok(responses) => responses,
        Err(err) => return not_found_on_client_error(session, url, err),
    };

    let principal = responses
        .iter()
        .filter(|response| response.is_success())
        .find_map(|response| {
            let href = response.props.current_user_principal.as_ref()?;
            match resolve_href(&response.url, href) {
                Ok(principal) => Some(principal),
                Err(err) => {
                    tracing::warn!(%url, %href, %err, "invalid current-user-principal");
                    None
                }
            }
        });

    let Some(principal) = principal else {
        session
            .log()
            .note(format!("{url} has no current-user-principal"));
        return Ok(None);
    };

    if let Some(service) = service {
        let capabilities = match session.options(&principal).await {
            Ok(capabilities) => capabilities,
            Err(err) => return not_found_on_client_error(session, &principal, err),
        };
        if !capabilities.contains(service.capability()) {
            session.log().note(format!(
                "{principal} is a principal but does not support {service}"
            ));
            return Ok(None);
        }
    }

    session
        .log()
        .note(format!("found current-user-principal {principal}"));
    Ok(Some(principal))
}

fn not_found_on_client_error<T>(
    session: &DiscoverySession,
    url: &Url,
    err: Error,
) -> Result<Option<T>, Error> {
    if err.is_unauthorized() {
        session.flag_unauthorized();
    }
    if err.is_client_error() {
        session
            .log()
            .note(format!("no principal at {url}: {err}"));
        Ok(None)
    } else {
        Err(err)
    }
}
