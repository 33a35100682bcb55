use chrono::{TimeZone, Utc};
use trend_digest::collect::providers::FeedProvider;
use trend_digest::collect::types::{PublishTime, SourceProvider};
use trend_digest::PipelineError;

const RSS_XML: &str = include_str!("fixtures/feed_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/feed_atom.xml");
const MEDIA_RSS_XML: &str = include_str!("fixtures/feed_media_rss.xml");

#[tokio::test]
async fn rss_fixture_parses_into_normalized_items() {
    let provider = FeedProvider::from_fixture("wire", RSS_XML);

    let items = provider.fetch_latest().await.expect("rss parse ok");
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.source == "Tech Wire"));

    assert_eq!(items[0].title, "Open-source model tops coding benchmark");
    assert_eq!(
        items[0].summary,
        "The release ships weights and an Apache-2.0 license."
    );
    assert_eq!(items[1].title, "Chipmaker \"doubles\" fab capacity");
}

#[tokio::test]
async fn rss_dates_become_utc_calendar_tuples() {
    let items = FeedProvider::from_fixture("wire", RSS_XML)
        .fetch_latest()
        .await
        .unwrap();

    let first = items[0].published_at.expect("dated");
    assert!(matches!(first, PublishTime::Calendar(_)));
    assert_eq!(
        first.resolve(),
        Some(Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap())
    );
    assert_eq!(
        items[1].published_at.and_then(|p| p.resolve()),
        Some(Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap())
    );
    assert!(items[2].published_at.is_none(), "undated item stays undated");
}

#[tokio::test]
async fn namespaced_elements_do_not_shadow_rss_fields() {
    let items = FeedProvider::from_fixture("media", MEDIA_RSS_XML)
        .fetch_latest()
        .await
        .expect("media rss parse ok");

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.source == "Media Wire"));
    assert_eq!(items[0].title, "Robotics startup raises Series B");
    assert_eq!(items[0].link, "https://media.example.com/robotics");
    assert_eq!(items[0].summary, "Funding goes to warehouse automation.");
    assert_eq!(
        items[0].published_at.and_then(|p| p.resolve()),
        Some(Utc.with_ymd_and_hms(2025, 3, 17, 7, 15, 0).unwrap())
    );
    assert_eq!(items[1].title, "Browser ships WebGPU by default");
    assert_eq!(items[1].link, "https://media.example.com/webgpu");
}

#[tokio::test]
async fn per_feed_limit_applies() {
    let items = FeedProvider::from_fixture("wire", RSS_XML)
        .with_limit(1)
        .fetch_latest()
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn atom_feed_is_accepted() {
    let items = FeedProvider::from_fixture("notes", ATOM_XML)
        .fetch_latest()
        .await
        .expect("atom parse ok");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source, "Dev Notes");
    assert_eq!(items[0].link, "https://notes.example.com/compiler-2");
    assert_eq!(items[0].summary, "Faster builds and a new borrow checker mode.");
    // `published` wins over `updated`
    assert_eq!(
        items[0].published_at.and_then(|p| p.resolve()),
        Some(Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap())
    );

    // rel="self" is skipped; `updated` used when `published` is absent
    assert_eq!(items[1].link, "https://notes.example.com/edited");
    assert_eq!(items[1].summary, "Only an updated stamp here.");
    assert_eq!(
        items[1].published_at.and_then(|p| p.resolve()),
        Some(Utc.with_ymd_and_hms(2025, 3, 13, 16, 45, 0).unwrap())
    );
}

#[tokio::test]
async fn non_feed_document_is_a_data_format_error() {
    let err = FeedProvider::from_fixture("html", "<html><head><title>x</title></head></html>")
        .fetch_latest()
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::DataFormat(_)), "got {err:?}");
}

#[tokio::test]
async fn provider_name_is_the_label() {
    let p = FeedProvider::from_fixture("https://wire.example.com/rss", RSS_XML);
    assert_eq!(p.name(), "https://wire.example.com/rss");
}
