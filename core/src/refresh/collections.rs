// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};

use davsync_dav::{Depth, HrefRelation, url_key};

use crate::db::Db;
use crate::discovery::collection_props;
use crate::model::{Collection, Service};
use crate::refresh::{RefreshStats, resolve_owner};
use crate::{DiscoverySession, Error};

/// Lists every stored home-set of `service` and reconciles its collections.
///
/// Collections a home-set no longer lists become homeless. A home-set the
/// server reports as gone is deleted together with its collections. Listed
/// members are matched to stored rows by [`url_key`], and a matched row keeps
/// its stored URL.
pub(super) async fn refresh(
    db: &Db,
    session: &DiscoverySession,
    service: &Service,
    stats: &mut RefreshStats,
) -> Result<(), Error> {
    let props = collection_props(service.service_type);

    for home_set in db.homesets.by_service(service.id).await? {
        session.check_cancelled()?;
        stats.home_sets += 1;

        let responses = match session.propfind(&home_set.url, Depth::One, &props).await {
            Ok(responses) => responses,
            Err(err) if err.is_gone() => {
                session
                    .log()
                    .note(format!("home-set {} is gone: {err}", home_set.url));
                db.homesets.delete(home_set.id).await?;
                stats.home_sets_removed += 1;
                continue;
            }
            Err(err) if err.is_client_error() && !err.is_unauthorized() => {
                session
                    .log()
                    .note(format!("skipping home-set {}: {err}", home_set.url));
                continue;
            }
            Err(err) => return Err(err),
        };

        let known = db.collections.by_homeset(home_set.id).await?;
        let stored_urls: HashMap<String, _> = db
            .collections
            .by_service(service.id)
            .await?
            .into_iter()
            .map(|c| (url_key(&c.url), c.url))
            .collect();
        let mut seen = HashSet::new();

        for response in &responses {
            match response.relation {
                HrefRelation::SelfRef => {
                    if response.is_success() {
                        let priv_bind = response
                            .props
                            .current_user_privilege_set
                            .as_ref()
                            .is_none_or(|p| p.may_bind());
                        db.homesets
                            .update_self_props(
                                home_set.id,
                                response.props.display_name.as_deref(),
                                priv_bind,
                            )
                            .await?;
                    }
                }
                HrefRelation::Member => {
                    let Some(mut collection) = Collection::from_response(service.id, response)
                    else {
                        continue;
                    };
                    if !collection.is_usable_for(service.service_type) {
                        tracing::debug!(url = %collection.url, "collection not usable for service");
                        continue;
                    }

                    let key = url_key(&collection.url);
                    if let Some(url) = stored_urls.get(&key) {
                        collection.url = url.clone();
                    }
                    collection.homeset_id = Some(home_set.id);
                    collection.sync = session
                        .settings()
                        .should_preselect(&collection.url, home_set.personal);
                    collection.owner_id = resolve_owner(db, service.id, response).await?;
                    db.collections
                        .upsert_by_url_remembering_flags(&collection)
                        .await?;

                    stats.collections += 1;
                    seen.insert(key);
                }
                HrefRelation::Other => {
                    tracing::debug!(url = %response.url, "ignoring response outside home-set");
                }
            }
        }

        for collection in known
            .into_iter()
            .filter(|c| !seen.contains(&url_key(&c.url)))
        {
            tracing::info!(url = %collection.url, "collection left its home-set");
            db.collections.set_homeset(collection.id, None).await?;
            stats.collections_orphaned += 1;
        }
    }

    Ok(())
}
