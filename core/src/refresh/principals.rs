// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::{Depth, HrefRelation, Prop};

use crate::db::Db;
use crate::model::Service;
use crate::refresh::RefreshStats;
use crate::{DiscoverySession, Error};

/// Updates principal display names, then deletes principals owning nothing.
pub(super) async fn refresh(
    db: &Db,
    session: &DiscoverySession,
    service: &Service,
    stats: &mut RefreshStats,
) -> Result<(), Error> {
    for principal in db.principals.by_service(service.id).await? {
        session.check_cancelled()?;

        let responses = match session
            .propfind(
                &principal.url,
                Depth::Zero,
                &[Prop::DisplayName, Prop::ResourceType],
            )
            .await
        {
            Ok(responses) => responses,
            Err(err) if err.is_http_status() && !err.is_unauthorized() => {
                session
                    .log()
                    .note(format!("cannot refresh principal {}: {err}", principal.url));
                continue;
            }
            Err(err) => return Err(err),
        };

        if let Some(response) = responses
            .iter()
            .find(|r| r.relation == HrefRelation::SelfRef && r.is_success())
        {
            let display_name = response
                .props
                .display_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty());
            db.principals
                .update_display_name(principal.id, display_name)
                .await?;
        }
    }

    stats.principals_removed = db.principals.delete_without_collections(service.id).await?;
    Ok(())
}
