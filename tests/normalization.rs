// tests/normalization.rs
//! A recorded `flickr.photos.search` page, normalized and stored.

use chrono::{TimeZone, Utc};
use flickr_history::api::SearchPage;
use flickr_history::{
    EntityKind, GeoPoint, Nsid, PhotoId, PhotoRecord, Record, RecordStore, SqliteStore,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn recorded_page() -> SearchPage {
    let body: Value = serde_json::from_str(include_str!("fixtures/search_page.json")).unwrap();
    serde_json::from_value(body["photos"].clone()).unwrap()
}

#[test]
fn test_recorded_page_normalizes_leniently() {
    let page = recorded_page();
    assert_eq!((page.page, page.pages, page.total), (1, 1, 4));

    let results: Vec<_> = page
        .photo
        .iter()
        .map(PhotoRecord::from_search_result)
        .collect();
    assert_eq!(results.len(), 4);
    assert!(results[3].is_err(), "a result without id is unusable");

    let harbour = results[0].as_ref().unwrap();
    assert_eq!(harbour.id, PhotoId::new(49851312512));
    assert_eq!(harbour.title.as_deref(), Some("Harbour at dusk"));
    assert_eq!(
        harbour.description.as_deref(),
        Some("Long exposure from the pier")
    );
    assert_eq!(
        harbour.date_posted,
        Some(Utc.with_ymd_and_hms(2020, 5, 1, 10, 0, 0).unwrap())
    );
    assert!(harbour.date_taken.is_some());
    assert_eq!(
        harbour.location,
        Some(GeoPoint {
            longitude: 24.9524,
            latitude: 60.1695
        })
    );
    assert_eq!(harbour.geo_accuracy, Some(16));
    assert_eq!(harbour.license, Some(4));
    assert_eq!(harbour.tags, vec!["harbour", "dusk", "longexposure"]);
    let owner = harbour.owner.as_ref().unwrap();
    assert_eq!(owner.nsid, Nsid::parse("12345678@N01").unwrap());
    assert_eq!(owner.name.as_deref(), Some("harbourwatcher"));

    let on_equator = results[1].as_ref().unwrap();
    assert_eq!(on_equator.location, None);
    assert_eq!(on_equator.date_taken, None);
    assert!(on_equator.tags.is_empty());

    let orphan = results[2].as_ref().unwrap();
    assert_eq!(orphan.owner, None);
    assert_eq!(orphan.secret, None);
    assert!(orphan.location.is_some());
}

#[tokio::test]
async fn test_recorded_page_stores_photos_and_owners() {
    let store = SqliteStore::open_in_memory().unwrap();

    for data in &recorded_page().photo {
        let Ok(photo) = PhotoRecord::from_search_result(data) else {
            continue;
        };
        store.upsert(&Record::Photo(photo)).await.unwrap();
    }

    assert_eq!(store.count(EntityKind::Photo).unwrap(), 3);
    assert_eq!(store.count(EntityKind::User).unwrap(), 1);
    assert_eq!(
        store.find_incomplete_profiles().await.unwrap(),
        vec![Nsid::from_parts(12345678, 1)]
    );

    let stored = store
        .load_photo(PhotoId::new(49851312512))
        .unwrap()
        .unwrap();
    assert_eq!(stored.tags.len(), 3);
    assert_eq!(
        stored.owner.map(|o| o.nsid),
        Some(Nsid::from_parts(12345678, 1))
    );
}
