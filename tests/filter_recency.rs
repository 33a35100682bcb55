use chrono::{DateTime, Duration, TimeZone, Utc};
use trend_digest::collect::types::{CalendarTuple, CandidateItem, PublishTime};
use trend_digest::filter::{cutoff, filter_recent, filter_recent_at};

fn at(title: &str, t: DateTime<Utc>) -> CandidateItem {
    CandidateItem {
        title: title.into(),
        link: format!("https://x.test/{title}"),
        summary: String::new(),
        published_at: Some(PublishTime::Instant(t)),
        source: "test".into(),
        implications: None,
    }
}

fn titles(items: &[CandidateItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
}

#[test]
fn keeps_recent_items_in_input_order() {
    let now = Utc::now();
    let items = vec![
        at("two-hours", now - Duration::hours(2)),
        at("thirty-hours", now - Duration::hours(30)),
        at("five-minutes", now - Duration::minutes(5)),
    ];
    let kept = filter_recent(items, 1, 10);
    assert_eq!(titles(&kept), vec!["two-hours", "five-minutes"]);
}

#[test]
fn truncation_is_positional_not_by_recency() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
    let items = vec![
        at("older-first", now - Duration::hours(20)),
        at("newest", now - Duration::minutes(1)),
        at("middle", now - Duration::hours(3)),
    ];
    let kept = filter_recent_at(now, items, 1, 2);
    assert_eq!(titles(&kept), vec!["older-first", "newest"]);
}

#[test]
fn output_never_exceeds_capacity() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
    for n in [0usize, 1, 5, 25] {
        let items: Vec<_> = (0..n)
            .map(|i| at(&format!("i{i}"), now - Duration::minutes(i as i64)))
            .collect();
        for cap in [0usize, 1, 3, 10] {
            let kept = filter_recent_at(now, items.clone(), 1, cap);
            assert!(kept.len() <= cap);
            assert_eq!(kept.len(), n.min(cap));
        }
    }
}

#[test]
fn item_exactly_at_cutoff_is_excluded() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
    let c = cutoff(now, 2);
    assert_eq!(c, Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap());
    let kept = filter_recent_at(
        now,
        vec![at("edge", c), at("inside", c + Duration::milliseconds(1))],
        2,
        10,
    );
    assert_eq!(titles(&kept), vec!["inside"]);
}

#[test]
fn calendar_tuples_and_bad_dates() {
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
    let tuple = |day: u32, hour: u32| CalendarTuple {
        year: 2025,
        month: 3,
        day,
        hour,
        minute: 0,
        second: 0,
    };
    let mut fresh = at("tuple-fresh", now);
    fresh.published_at = Some(PublishTime::Calendar(tuple(14, 6)));
    let mut stale = at("tuple-stale", now);
    stale.published_at = Some(PublishTime::Calendar(tuple(12, 6)));
    let mut impossible = at("tuple-impossible", now);
    impossible.published_at = Some(PublishTime::Calendar(tuple(31, 25)));
    let mut undated = at("undated", now);
    undated.published_at = None;

    let kept = filter_recent_at(now, vec![fresh, stale, impossible, undated], 1, 10);
    assert_eq!(titles(&kept), vec!["tuple-fresh"]);
}
