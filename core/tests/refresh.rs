// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

mod common;

use std::sync::Arc;

use davsync_core::{Collection, Davsync, Db, PreselectPolicy, RefreshJob};
use davsync_dav::{Cancellation, Depth, Properties, ResourceKind, ServiceType};

use crate::common::{
    FakeDns, FakeTransport, calendar, config, principal_with_calendar_homes, session, setup_db,
    typed, url,
};

const ALICE: &str = "https://dav.example.com/principals/alice/";
const HOME: &str = "https://dav.example.com/homes/alice/";
const CAL1: &str = "https://dav.example.com/homes/alice/cal1/";
const CAL2: &str = "https://dav.example.com/homes/alice/cal2/";

async fn caldav_service_with_home(db: &Db) -> (i64, i64) {
    let service_id = db
        .services
        .upsert("alice", ServiceType::CalDav, None)
        .await
        .unwrap();
    let home_id = db
        .homesets
        .upsert_by_url(service_id, &url(HOME), true, None)
        .await
        .unwrap();
    (service_id, home_id)
}

async fn stored(db: &Db, service_id: i64, u: &str) -> Option<Collection> {
    db.collections.get_by_url(service_id, &url(u)).await.unwrap()
}

fn home_props() -> Properties {
    Properties {
        display_name: Some("Alice's calendars".to_string()),
        ..typed(&[ResourceKind::Collection])
    }
}

#[tokio::test]
async fn collection_missing_from_listing_becomes_homeless() {
    let db = setup_db().await;
    let (service_id, home_id) = caldav_service_with_home(&db).await;

    let transport = FakeTransport::new();
    transport.on_propfind(
        HOME,
        Depth::One,
        vec![
            ("", home_props()),
            ("cal1/", calendar("One")),
            ("cal2/", calendar("Two")),
        ],
    );
    let session = session(transport.clone(), FakeDns::new(), PreselectPolicy::All);
    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.collections, 2);

    let cal2 = stored(&db, service_id, CAL2).await.unwrap();
    assert_eq!(cal2.homeset_id, Some(home_id));
    assert!(cal2.sync);

    let home_set = db.homesets.get(home_id).await.unwrap().unwrap();
    assert_eq!(home_set.display_name.as_deref(), Some("Alice's calendars"));

    // second pass: cal2 is no longer listed but still exists on its own
    transport.on_propfind(
        HOME,
        Depth::One,
        vec![("", home_props()), ("cal1/", calendar("One"))],
    );
    transport.on_propfind(CAL2, Depth::Zero, vec![("", calendar("Two"))]);
    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.collections_orphaned, 1);

    let cal2 = stored(&db, service_id, CAL2).await.unwrap();
    assert_eq!(cal2.homeset_id, None);
    assert_eq!(
        stored(&db, service_id, CAL1).await.unwrap().homeset_id,
        Some(home_id)
    );
}

#[tokio::test]
async fn refresh_keeps_sync_chosen_before() {
    let db = setup_db().await;
    let (service_id, home_id) = caldav_service_with_home(&db).await;

    let mut existing =
        Collection::from_response(service_id, &single_response(CAL1, calendar("Old"))).unwrap();
    existing.homeset_id = Some(home_id);
    existing.sync = true;
    db.collections.upsert_by_url(&existing).await.unwrap();

    let transport = FakeTransport::new();
    transport.on_propfind(
        HOME,
        Depth::One,
        vec![("", home_props()), ("cal1/", calendar("Renamed"))],
    );
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);
    RefreshJob::new(&db, &session).run(service_id).await.unwrap();

    let cal1 = stored(&db, service_id, CAL1).await.unwrap();
    assert!(cal1.sync);
    assert_eq!(cal1.display_name.as_deref(), Some("Renamed"));
}

fn single_response(u: &str, props: Properties) -> davsync_dav::DavResponse {
    davsync_dav::DavResponse {
        url: url(u),
        relation: davsync_dav::HrefRelation::SelfRef,
        status: None,
        props,
    }
}

#[tokio::test]
async fn homeless_collection_gone_is_deleted() {
    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;

    let orphan = Collection::from_response(service_id, &single_response(CAL2, calendar("Two")))
        .unwrap();
    db.collections.upsert_by_url(&orphan).await.unwrap();

    let transport = FakeTransport::new();
    transport.on_propfind(HOME, Depth::One, vec![("", home_props())]);
    transport.fail_propfind(CAL2, Depth::Zero, 404);
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.homeless_removed, 1);
    assert!(stored(&db, service_id, CAL2).await.is_none());
}

#[tokio::test]
async fn homeless_collection_with_failed_response_or_wrong_type_is_deleted() {
    const BOOK: &str = "https://dav.example.com/books/contacts/";

    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;
    for u in [CAL2, BOOK] {
        let orphan =
            Collection::from_response(service_id, &single_response(u, calendar("x"))).unwrap();
        db.collections.upsert_by_url(&orphan).await.unwrap();
    }

    let transport = FakeTransport::new();
    transport.on_propfind(HOME, Depth::One, vec![("", home_props())]);
    transport.on_propfind_status_item(CAL2, Depth::Zero, 404);
    transport.on_propfind(
        BOOK,
        Depth::Zero,
        vec![("", typed(&[ResourceKind::Collection, ResourceKind::Addressbook]))],
    );
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.homeless_removed, 2);
    assert!(db.collections.by_service(service_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn members_spelled_with_other_percent_encoding_stay_in_home_set() {
    const ENCODED_HOME: &str = "https://dav.example.com/calendars/alice%40example.com/";
    const ENCODED_WORK: &str = "https://dav.example.com/calendars/alice%40example.com/work/";

    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;
    let home_id = db
        .homesets
        .upsert_by_url(service_id, &url(ENCODED_HOME), true, None)
        .await
        .unwrap();
    let mut work =
        Collection::from_response(service_id, &single_response(ENCODED_WORK, calendar("Work")))
            .unwrap();
    work.homeset_id = Some(home_id);
    work.sync = true;
    db.collections.upsert_by_url(&work).await.unwrap();

    let transport = FakeTransport::new();
    transport.on_propfind(HOME, Depth::One, vec![("", home_props())]);
    transport.on_propfind(
        ENCODED_HOME,
        Depth::One,
        vec![
            ("/calendars/alice@example.com/", home_props()),
            ("/calendars/alice@example.com/work/", calendar("Work renamed")),
            ("/calendars/alice@example.com/new/", calendar("New")),
        ],
    );
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.collections, 2);
    assert_eq!(stats.collections_orphaned, 0);

    let work = stored(&db, service_id, ENCODED_WORK).await.unwrap();
    assert_eq!(work.homeset_id, Some(home_id));
    assert!(work.sync);
    assert_eq!(work.display_name.as_deref(), Some("Work renamed"));

    let new = stored(&db, service_id, "https://dav.example.com/calendars/alice@example.com/new/")
        .await
        .unwrap();
    assert_eq!(new.homeset_id, Some(home_id));
    assert_eq!(db.collections.by_service(service_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn homeless_answer_with_other_href_spelling() {
    const OLD: &str = "https://dav.example.com/calendars/alice%40example.com/old/";
    const KEPT: &str = "https://dav.example.com/calendars/alice%40example.com/kept/";

    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;
    for u in [OLD, KEPT] {
        let orphan =
            Collection::from_response(service_id, &single_response(u, calendar("x"))).unwrap();
        db.collections.upsert_by_url(&orphan).await.unwrap();
    }

    let transport = FakeTransport::new();
    transport.on_propfind(HOME, Depth::One, vec![("", home_props())]);
    transport.on_propfind(
        OLD,
        Depth::Zero,
        vec![(
            "/calendars/alice@example.com/old/",
            typed(&[ResourceKind::Collection]),
        )],
    );
    transport.on_propfind(
        KEPT,
        Depth::Zero,
        vec![("/calendars/alice@example.com/kept/", calendar("Kept"))],
    );
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.homeless_removed, 1);
    assert!(stored(&db, service_id, OLD).await.is_none());

    let kept = stored(&db, service_id, KEPT).await.unwrap();
    assert_eq!(kept.display_name.as_deref(), Some("Kept"));
    assert_eq!(db.collections.by_service(service_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn homeless_collection_without_answer_is_deleted() {
    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;
    let orphan = Collection::from_response(service_id, &single_response(CAL2, calendar("Two")))
        .unwrap();
    db.collections.upsert_by_url(&orphan).await.unwrap();

    let transport = FakeTransport::new();
    transport.on_propfind(HOME, Depth::One, vec![("", home_props())]);
    transport.on_propfind(CAL2, Depth::Zero, vec![]);
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.homeless_removed, 1);
    assert!(stored(&db, service_id, CAL2).await.is_none());
}

#[tokio::test]
async fn homeless_collection_server_error_fails_refresh() {
    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;
    let orphan = Collection::from_response(service_id, &single_response(CAL2, calendar("Two")))
        .unwrap();
    db.collections.upsert_by_url(&orphan).await.unwrap();

    let transport = FakeTransport::new();
    transport.on_propfind(HOME, Depth::One, vec![("", home_props())]);
    transport.fail_propfind(CAL2, Depth::Zero, 500);
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let err = RefreshJob::new(&db, &session)
        .run(service_id)
        .await
        .unwrap_err();
    assert!(err.is_http_status());
    assert!(stored(&db, service_id, CAL2).await.is_some());
}

#[tokio::test]
async fn home_set_gone_is_deleted_with_its_collections() {
    let db = setup_db().await;
    let (service_id, home_id) = caldav_service_with_home(&db).await;
    let mut listed =
        Collection::from_response(service_id, &single_response(CAL1, calendar("One"))).unwrap();
    listed.homeset_id = Some(home_id);
    db.collections.upsert_by_url(&listed).await.unwrap();

    let transport = FakeTransport::new();
    transport.fail_propfind(HOME, Depth::One, 410);
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.home_sets_removed, 1);
    assert!(db.homesets.get(home_id).await.unwrap().is_none());
    assert!(db.collections.by_service(service_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unauthorized_home_set_fails_refresh() {
    let db = setup_db().await;
    let (service_id, home_id) = caldav_service_with_home(&db).await;

    let transport = FakeTransport::new();
    transport.fail_propfind(HOME, Depth::One, 401);
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let err = RefreshJob::new(&db, &session)
        .run(service_id)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(db.homesets.get(home_id).await.unwrap().is_some());
}

#[tokio::test]
async fn refresh_discovers_home_sets_from_principal() {
    let db = setup_db().await;
    let service_id = db
        .services
        .upsert("alice", ServiceType::CalDav, Some(&url(ALICE)))
        .await
        .unwrap();

    let transport = FakeTransport::new();
    transport.on_propfind(
        ALICE,
        Depth::Zero,
        vec![("", principal_with_calendar_homes(&["/homes/alice/"]))],
    );
    transport.on_propfind(
        HOME,
        Depth::One,
        vec![("", home_props()), ("cal1/", calendar("One"))],
    );
    let session = session(transport, FakeDns::new(), PreselectPolicy::Personal);

    RefreshJob::new(&db, &session).run(service_id).await.unwrap();

    let home_sets = db.homesets.by_service(service_id).await.unwrap();
    assert_eq!(home_sets.len(), 1);
    assert!(home_sets[0].personal);
    assert!(stored(&db, service_id, CAL1).await.unwrap().sync);
}

#[tokio::test]
async fn principals_are_refreshed_and_collected() {
    const BOB: &str = "https://dav.example.com/principals/bob/";
    const CAROL: &str = "https://dav.example.com/principals/carol/";

    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;
    db.principals
        .get_or_create(service_id, &url(CAROL))
        .await
        .unwrap();

    let mut shared = calendar("Shared");
    shared.owner = Some("/principals/bob/".into());

    let transport = FakeTransport::new();
    transport.on_propfind(
        HOME,
        Depth::One,
        vec![("", home_props()), ("cal1/", shared)],
    );
    transport.on_propfind(
        BOB,
        Depth::Zero,
        vec![(
            "",
            Properties {
                display_name: Some("Bob".to_string()),
                ..typed(&[ResourceKind::Principal])
            },
        )],
    );
    transport.fail_propfind(CAROL, Depth::Zero, 403);
    let session = session(transport, FakeDns::new(), PreselectPolicy::None);

    let stats = RefreshJob::new(&db, &session).run(service_id).await.unwrap();
    assert_eq!(stats.principals_removed, 1);

    let principals = db.principals.by_service(service_id).await.unwrap();
    assert_eq!(principals.len(), 1);
    assert_eq!(principals[0].url, url(BOB));
    assert_eq!(principals[0].display_name.as_deref(), Some("Bob"));

    let cal1 = stored(&db, service_id, CAL1).await.unwrap();
    assert_eq!(cal1.owner_id, Some(principals[0].id));
}

#[tokio::test]
async fn cancelled_refresh_stops() {
    let db = setup_db().await;
    let (service_id, _) = caldav_service_with_home(&db).await;

    let transport = FakeTransport::new();
    transport.on_propfind(HOME, Depth::One, vec![("", home_props())]);
    let session = session(transport.clone(), FakeDns::new(), PreselectPolicy::None);
    session.cancellation().cancel();

    let err = RefreshJob::new(&db, &session)
        .run(service_id)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn account_setup_and_refresh_through_engine() {
    const BASE: &str = "https://dav.example.com/";

    let transport = FakeTransport::new();
    transport.on_propfind(
        BASE,
        Depth::Zero,
        vec![(
            "/",
            Properties {
                current_user_principal: Some("/principals/alice/".into()),
                ..Properties::default()
            },
        )],
    );
    transport.on_propfind(
        ALICE,
        Depth::Zero,
        vec![("", principal_with_calendar_homes(&["/homes/alice/"]))],
    );
    transport.on_propfind(
        HOME,
        Depth::One,
        vec![("", home_props()), ("cal1/", calendar("One"))],
    );

    let db = setup_db().await;
    let davsync = Davsync::with_backends(
        config(PreselectPolicy::All),
        db,
        transport,
        Arc::new(FakeDns::new()),
    )
    .unwrap();

    let found = davsync
        .add_account("alice", &url(BASE), Cancellation::new())
        .await
        .unwrap();
    assert!(found.caldav.is_some());

    let results = davsync
        .refresh("alice", Some(ServiceType::CalDav), Cancellation::new())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1.collections, 1);

    let listing = davsync.collections("alice").await.unwrap();
    let (_, collections) = listing
        .iter()
        .find(|(s, _)| s.service_type == ServiceType::CalDav)
        .unwrap();
    assert_eq!(collections.len(), 1);
    assert!(collections[0].sync);

    davsync.set_sync(collections[0].id, false).await.unwrap();
    davsync
        .refresh("alice", Some(ServiceType::CalDav), Cancellation::new())
        .await
        .unwrap();
    let cal1 = davsync
        .db()
        .collections
        .get(collections[0].id)
        .await
        .unwrap()
        .unwrap();
    assert!(!cal1.sync);

    assert!(
        davsync
            .refresh("nobody", None, Cancellation::new())
            .await
            .is_err()
    );

    assert_eq!(davsync.accounts().await.unwrap(), vec!["alice".to_string()]);
    davsync.remove_account("alice").await.unwrap();
    assert!(davsync.accounts().await.unwrap().is_empty());
    assert!(davsync.collections("alice").await.unwrap().is_empty());
    assert!(davsync.remove_account("alice").await.is_err());
}
