use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::models::Paper;

/// The export API refuses pages larger than this in a single request.
const PAGE_SIZE: usize = 100;

/// One `<entry>` of an arXiv Atom feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivEntry {
    pub entry_id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub categories: Vec<String>,
}

impl ArxivEntry {
    /// Short identifier with version, e.g. `2501.01234v1`.
    pub fn short_id(&self) -> &str {
        match self.entry_id.split_once("arxiv.org/abs/") {
            Some((_, id)) => id,
            None => self.entry_id.rsplit('/').next().unwrap_or(&self.entry_id),
        }
    }

    pub fn into_paper(self, topic: &str) -> Paper {
        Paper {
            id: self.short_id().to_string(),
            title: collapse_whitespace(&self.title),
            authors: self.authors,
            url: self.entry_id,
            summary: collapse_whitespace(&self.summary),
            published_at: self.published,
            updated_at: self.updated,
            topic: topic.to_string(),
            raw_categories: self.categories,
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct ArxivClient {
    client: Client,
    base_url: String,
    page_delay: Duration,
}

impl ArxivClient {
    pub fn new(base_url: impl Into<String>, page_delay: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("arxiv-digest/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            page_delay,
        })
    }

    /// Fetch up to `max_results` entries, most recently updated first.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArxivEntry>> {
        let mut entries = Vec::new();
        let mut start = 0;

        while entries.len() < max_results {
            let page_size = (max_results - entries.len()).min(PAGE_SIZE);
            if start > 0 {
                tokio::time::sleep(self.page_delay).await;
            }

            let page = self.fetch_page(query, start, page_size).await?;
            let received = page.len();
            entries.extend(page);

            if received < page_size {
                break;
            }
            start += received;
        }

        entries.truncate(max_results);
        Ok(entries)
    }

    async fn fetch_page(&self, query: &str, start: usize, page_size: usize) -> Result<Vec<ArxivEntry>> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("search_query", query.to_string()),
                ("start", start.to_string()),
                ("max_results", page_size.to_string()),
                ("sortBy", "lastUpdatedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ],
        )
        .with_context(|| format!("Invalid arXiv API URL: {}", self.base_url))?;

        tracing::debug!(%url, "requesting arXiv page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to query the arXiv API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("arXiv API returned error: {} - {}", status, error_text.trim());
        }

        let body = response
            .text()
            .await
            .context("Failed to read arXiv API response")?;

        parse_feed(&body)
    }
}

#[derive(Clone, Copy)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
    AuthorName,
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    updated: String,
    authors: Vec<String>,
    categories: Vec<String>,
}

impl EntryBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        match field {
            Field::Id => self.id.push_str(text),
            Field::Title => self.title.push_str(text),
            Field::Summary => self.summary.push_str(text),
            Field::Published => self.published.push_str(text),
            Field::Updated => self.updated.push_str(text),
            Field::AuthorName => {
                if let Some(last) = self.authors.last_mut() {
                    last.push_str(text);
                }
            }
        }
    }

    fn build(self) -> Result<ArxivEntry> {
        // The API reports query errors as a feed with a single error entry
        if self.id.contains("/api/errors") {
            anyhow::bail!("arXiv API rejected the query: {}", self.summary.trim());
        }

        Ok(ArxivEntry {
            published: parse_timestamp(&self.published)
                .with_context(|| format!("Bad published date on {}", self.id))?,
            updated: parse_timestamp(&self.updated)
                .with_context(|| format!("Bad updated date on {}", self.id))?,
            entry_id: self.id.trim().to_string(),
            title: self.title.trim().to_string(),
            summary: self.summary.trim().to_string(),
            authors: self.authors.into_iter().map(|a| a.trim().to_string()).collect(),
            categories: self.categories,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw.trim())?.with_timezone(&Utc))
}

fn local_name(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|b| *b == b':') {
        Some(ix) => &raw[ix + 1..],
        None => raw,
    }
}

fn category_term(tag: &BytesStart) -> Option<String> {
    tag.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"term")
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Parse an arXiv Atom feed into entries, in feed order.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"entry" {
                    current = Some(EntryBuilder::default());
                } else if let Some(entry) = current.as_mut() {
                    match local {
                        b"id" => field = Some(Field::Id),
                        b"title" => field = Some(Field::Title),
                        b"summary" => field = Some(Field::Summary),
                        b"published" => field = Some(Field::Published),
                        b"updated" => field = Some(Field::Updated),
                        b"name" => {
                            entry.authors.push(String::new());
                            field = Some(Field::AuthorName);
                        }
                        b"category" => entry.categories.extend(category_term(&e)),
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"category" {
                    if let Some(entry) = current.as_mut() {
                        entry.categories.extend(category_term(&e));
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let text = t.unescape().context("Invalid text in arXiv feed")?;
                    entry.push_text(f, &text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    entry.push_text(f, &String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(e)) => {
                field = None;
                if local_name(e.name().as_ref()) == b"entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry.build()?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("XML parse error at position {}: {}", reader.buffer_position(), e),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}
