// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::{Depth, HrefRelation};

use crate::db::Db;
use crate::discovery::collection_props;
use crate::model::{Collection, Service};
use crate::refresh::{RefreshStats, resolve_owner};
use crate::{DiscoverySession, Error};

/// Checks every collection of `service` that no home-set lists.
///
/// A collection that is gone, failed, missing from the answer or no longer
/// usable is deleted; the others are updated in place.
pub(super) async fn refresh(
    db: &Db,
    session: &DiscoverySession,
    service: &Service,
    stats: &mut RefreshStats,
) -> Result<(), Error> {
    let props = collection_props(service.service_type);

    for stored in db.collections.homeless(service.id).await? {
        session.check_cancelled()?;

        let responses = match session.propfind(&stored.url, Depth::Zero, &props).await {
            Ok(responses) => responses,
            Err(err) if err.is_gone() => {
                session
                    .log()
                    .note(format!("homeless collection {} is gone: {err}", stored.url));
                db.collections.delete(stored.id).await?;
                stats.homeless_removed += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        // a Depth-0 answer describes only the requested resource
        let response = responses
            .iter()
            .find(|r| r.relation == HrefRelation::SelfRef)
            .or_else(|| responses.first());
        let rebuilt = response.and_then(|response| {
            Collection::from_response(service.id, response)
                .filter(|c| c.is_usable_for(service.service_type))
                .map(|c| (response, c))
        });
        let Some((response, mut collection)) = rebuilt else {
            session
                .log()
                .note(format!("homeless collection {} is no longer usable", stored.url));
            db.collections.delete(stored.id).await?;
            stats.homeless_removed += 1;
            continue;
        };

        // the stored URL stays the key even if the server redirected
        collection.url = stored.url;
        collection.homeset_id = None;
        collection.sync = stored.sync;
        collection.owner_id = resolve_owner(db, service.id, response).await?;
        db.collections
            .upsert_by_url_remembering_flags(&collection)
            .await?;
    }

    Ok(())
}
