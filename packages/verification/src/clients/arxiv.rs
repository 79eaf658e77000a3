//! arXiv export API client.
//!
//! The API answers with an Atom feed. The first `<entry>` is read with a
//! streaming `quick_xml` reader; everything outside it is skipped.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use super::{http_client, PreprintRecord, PreprintSource, DEFAULT_USER_AGENT};
use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "arxiv";

/// Client for `GET /query?id_list={id}`.
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArxivClient {
    pub fn new() -> Self {
        Self {
            client: http_client(DEFAULT_USER_AGENT, Duration::from_secs(10)),
            base_url: "http://export.arxiv.org/api".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(DEFAULT_USER_AGENT, timeout);
        self
    }
}

/// Text collected from the first feed entry.
#[derive(Debug, Default)]
struct EntryText {
    id: String,
    title: String,
    published: String,
    authors: Vec<String>,
}

impl EntryText {
    fn into_record(self, arxiv_id: &str) -> Option<PreprintRecord> {
        let title = collapse(&self.title);
        if self.id.contains("/api/errors") || title.is_empty() || title == "Error" {
            return None;
        }
        Some(PreprintRecord {
            arxiv_id: arxiv_id.to_string(),
            title,
            authors: self
                .authors
                .iter()
                .map(|a| collapse(a))
                .filter(|a| !a.is_empty())
                .collect(),
            year: self.published.get(..4).and_then(|y| y.parse().ok()),
        })
    }
}

fn malformed(e: impl fmt::Display) -> ClientError {
    ClientError::Parse {
        service: SERVICE,
        message: e.to_string(),
    }
}

/// Read the first entry of an Atom feed. `Ok(None)` when the feed has no
/// entry or only arXiv's error entry; malformed XML is a parse error.
pub fn parse_feed(arxiv_id: &str, feed: &str) -> ClientResult<Option<PreprintRecord>> {
    let mut reader = Reader::from_str(feed);
    reader.config_mut().trim_text(true);

    // Local names of the open elements, outermost first.
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut entry: Option<EntryText> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                let name = start.local_name().as_ref().to_vec();
                if entry.is_none() && name == b"entry" {
                    entry = Some(EntryText::default());
                } else if let (Some(fields), b"author") = (entry.as_mut(), name.as_slice()) {
                    fields.authors.push(String::new());
                }
                path.push(name);
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some(b"entry".as_slice()) && entry.is_some() {
                    break;
                }
            }
            Event::Text(text) => {
                let Some(fields) = entry.as_mut() else {
                    continue;
                };
                let value = text.unescape().map_err(malformed)?;
                let target = match path.as_slice() {
                    [.., parent, leaf] if parent.as_slice() == b"entry" => match leaf.as_slice() {
                        b"id" => Some(&mut fields.id),
                        b"title" => Some(&mut fields.title),
                        b"published" => Some(&mut fields.published),
                        _ => None,
                    },
                    [.., parent, leaf] if parent.as_slice() == b"author" && leaf.as_slice() == b"name" => {
                        fields.authors.last_mut()
                    }
                    _ => None,
                };
                if let Some(target) = target {
                    target.push(' ');
                    target.push_str(&value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entry.and_then(|e| e.into_record(arxiv_id)))
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl PreprintSource for ArxivClient {
    async fn preprint_by_id(&self, arxiv_id: &str) -> ClientResult<PreprintRecord> {
        let url = format!("{}/query", self.base_url);
        debug!(arxiv_id = %arxiv_id, "querying arxiv");

        let response = self
            .client
            .get(&url)
            .query(&[("id_list", arxiv_id)])
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(arxiv_id = %arxiv_id, status = status.as_u16(), "arxiv lookup failed");
            return Err(ClientError::from_status(SERVICE, status.as_u16()));
        }

        let feed = response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        parse_feed(arxiv_id, &feed)?.ok_or(ClientError::NotFound {
            service: SERVICE,
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=&amp;id_list=2005.14165</title>
  <entry>
    <id>http://arxiv.org/abs/2005.14165v4</id>
    <published>2020-05-28T17:29:03Z</published>
    <title>Language Models are Few-Shot
      Learners</title>
    <author><name>Tom B. Brown</name></author>
    <author><name>Benjamin Mann</name></author>
  </entry>
</feed>"#;

    #[test]
    fn parses_entry_not_feed_title() {
        let record = parse_feed("2005.14165", FEED).unwrap().unwrap();
        assert_eq!(record.title, "Language Models are Few-Shot Learners");
        assert_eq!(record.year, Some(2020));
        assert_eq!(record.surnames(), vec!["Brown", "Mann"]);
    }

    #[test]
    fn empty_feed_is_not_found() {
        let feed = r#"<feed><title>ArXiv Query</title></feed>"#;
        assert_eq!(parse_feed("9999.99999", feed).unwrap(), None);
    }

    #[test]
    fn error_entry_is_not_found() {
        let feed = r#"<feed><entry><id>http://arxiv.org/api/errors#incorrect_id_format</id><title>Error</title></entry></feed>"#;
        assert_eq!(parse_feed("bogus", feed).unwrap(), None);
    }

    #[test]
    fn entities_are_decoded() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <id>http://arxiv.org/abs/2101.00001v1</id>
            <published>2021-01-01T00:00:00Z</published>
            <title>Q&amp;A with x &lt; y</title>
            <author><name>Ana O&apos;Neil</name></author>
        </entry></feed>"#;
        let record = parse_feed("2101.00001", feed).unwrap().unwrap();
        assert_eq!(record.title, "Q&A with x < y");
        assert_eq!(record.authors, vec!["Ana O'Neil"]);
    }

    #[test]
    fn prefixed_elements_are_ignored() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom"><entry>
            <id>http://arxiv.org/abs/2005.14165v4</id>
            <title>Language Models are Few-Shot Learners</title>
            <author><name>Tom B. Brown</name><arxiv:affiliation>OpenAI</arxiv:affiliation></author>
            <arxiv:comment>40+32 pages</arxiv:comment>
        </entry></feed>"#;
        let record = parse_feed("2005.14165", feed).unwrap().unwrap();
        assert_eq!(record.authors, vec!["Tom B. Brown"]);
        assert_eq!(record.year, None);
    }

    #[test]
    fn malformed_feed_is_a_parse_error() {
        let feed = "<feed><entry><title>Broken</entry></feed>";
        assert!(matches!(
            parse_feed("2005.14165", feed),
            Err(ClientError::Parse { .. })
        ));
    }
}
