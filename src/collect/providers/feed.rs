// src/collect/providers/feed.rs
//! RSS 2.0 / Atom feed provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::collect::normalize_text;
use crate::collect::types::{CalendarTuple, CandidateItem, PublishTime, SourceProvider};
use crate::error::{PipelineError, Result};

pub const DEFAULT_PER_FEED_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<AtomText>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

/// RFC 2822 (RSS) or RFC 3339 (Atom) to UTC.
pub(crate) fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let parsed = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()?;
    DateTime::from_timestamp(parsed.unix_timestamp(), 0)
}

fn to_publish_time(raw: Option<&str>) -> Option<PublishTime> {
    raw.and_then(parse_feed_date)
        .map(|dt| PublishTime::Calendar(CalendarTuple::from_datetime(&dt)))
}

pub struct FeedProvider {
    label: String,
    per_feed_limit: usize,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl FeedProvider {
    /// Parse a fixed XML document instead of fetching; `label` stands in for the URL.
    pub fn from_fixture(label: &str, xml: &str) -> Self {
        Self {
            label: label.to_string(),
            per_feed_limit: DEFAULT_PER_FEED_LIMIT,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(url: &str, client: reqwest::Client) -> Self {
        Self {
            label: url.to_string(),
            per_feed_limit: DEFAULT_PER_FEED_LIMIT,
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    pub fn with_limit(mut self, per_feed_limit: usize) -> Self {
        self.per_feed_limit = per_feed_limit;
        self
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<CandidateItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = drop_prefixed_elements(&scrub_html_entities_for_xml(s)).map_err(|e| {
            PipelineError::DataFormat(format!("feed {}: malformed XML ({e})", self.label))
        })?;

        let out = match from_str::<Rss>(&xml_clean) {
            Ok(rss) => self.items_from_rss(rss),
            Err(rss_err) if !xml_clean.contains("<feed") => {
                return Err(PipelineError::DataFormat(format!(
                    "feed {}: not RSS ({rss_err})",
                    self.label
                )))
            }
            Err(rss_err) => match from_str::<AtomFeed>(&xml_clean) {
                Ok(feed) => self.items_from_atom(feed),
                Err(atom_err) => {
                    return Err(PipelineError::DataFormat(format!(
                        "feed {}: not RSS ({rss_err}) nor Atom ({atom_err})",
                        self.label
                    )))
                }
            },
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("collect_parse_ms").record(ms);
        Ok(out)
    }

    fn source_name(&self, title: Option<&str>) -> String {
        title
            .map(normalize_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.label.clone())
    }

    fn items_from_rss(&self, rss: Rss) -> Vec<CandidateItem> {
        let source = self.source_name(rss.channel.title.as_deref());
        rss.channel
            .item
            .into_iter()
            .take(self.per_feed_limit)
            .map(|it| CandidateItem {
                title: normalize_text(it.title.as_deref().unwrap_or_default()),
                link: it.link.unwrap_or_default().trim().to_string(),
                summary: normalize_text(it.description.as_deref().unwrap_or_default()),
                published_at: to_publish_time(it.pub_date.as_deref()),
                source: source.clone(),
                implications: None,
            })
            .collect()
    }

    fn items_from_atom(&self, feed: AtomFeed) -> Vec<CandidateItem> {
        let source = self.source_name(feed.title.as_ref().map(|t| t.value.as_str()));
        feed.entry
            .into_iter()
            .take(self.per_feed_limit)
            .map(|e| {
                let link = e
                    .link
                    .iter()
                    .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                    .and_then(|l| l.href.clone())
                    .unwrap_or_default();
                let summary = e.summary.or(e.content).map(|t| t.value).unwrap_or_default();
                CandidateItem {
                    title: normalize_text(&e.title.map(|t| t.value).unwrap_or_default()),
                    link,
                    summary: normalize_text(&summary),
                    published_at: to_publish_time(e.published.as_deref().or(e.updated.as_deref())),
                    source: source.clone(),
                    implications: None,
                }
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for FeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .map_err(|e| PipelineError::fetch(url.as_str(), e))?;
                if !resp.status().is_success() {
                    return Err(PipelineError::fetch(
                        url.as_str(),
                        format!("HTTP {}", resp.status()),
                    ));
                }
                let body = resp
                    .text()
                    .await
                    .map_err(|e| PipelineError::fetch(url.as_str(), e))?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

/// Removes every namespace-prefixed element (`media:title`, `atom:link`, ...) with its
/// subtree. Serde matches on local names, so these would otherwise collide with the
/// plain `title`/`link`/`description` fields.
fn drop_prefixed_elements(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut skipping = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        let keep = match &event {
            Event::Eof => break,
            Event::Start(e) => {
                if skipping > 0 || e.name().prefix().is_some() {
                    skipping += 1;
                }
                skipping == 0
            }
            Event::End(_) if skipping > 0 => {
                skipping -= 1;
                false
            }
            Event::Empty(e) => skipping == 0 && e.name().prefix().is_none(),
            _ => skipping == 0,
        };
        if keep {
            writer.write_event(event).map_err(|e| e.to_string())?;
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rfc2822_and_rfc3339_dates_parse_to_utc() {
        let expect = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        assert_eq!(parse_feed_date("Fri, 14 Mar 2025 10:30:00 +0100"), Some(expect));
        assert_eq!(parse_feed_date("2025-03-14T09:30:00Z"), Some(expect));
        assert_eq!(parse_feed_date("yesterday-ish"), None);
    }

    #[test]
    fn rss_items_are_capped_per_feed() {
        let mut xml = String::from("<rss><channel><title>Feed</title>");
        for i in 0..8 {
            xml.push_str(&format!(
                "<item><title>T{i}</title><link>https://x.test/{i}</link></item>"
            ));
        }
        xml.push_str("</channel></rss>");

        let p = FeedProvider::from_fixture("fixture", &xml);
        let items = p.parse_items_from_str(&xml).unwrap();
        assert_eq!(items.len(), DEFAULT_PER_FEED_LIMIT);
        assert_eq!(items[0].title, "T0");
        assert_eq!(items[0].source, "Feed");
        assert!(items[0].published_at.is_none());
    }

    #[test]
    fn prefixed_elements_are_dropped_with_their_children() {
        let xml = r#"<item><title>Real</title><media:group><title>x</title></media:group><media:thumbnail url="u"/><link>l</link></item>"#;
        assert_eq!(
            drop_prefixed_elements(xml).unwrap(),
            "<item><title>Real</title><link>l</link></item>"
        );
    }

    #[test]
    fn garbage_is_a_data_format_error() {
        let p = FeedProvider::from_fixture("broken", "<html><body>nope");
        let err = p.parse_items_from_str("<html><body>nope").unwrap_err();
        assert!(matches!(err, PipelineError::DataFormat(_)));
    }
}
