//! Core value types: articles and the feed sources they come from.

use chrono::{DateTime, FixedOffset};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::util::format_display;

/// A single normalized news article.
///
/// Immutable once constructed by the parser. Articles carry no identity
/// beyond value equality; the same story appearing in two feeds yields two
/// articles.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Article headline; `"No Title"` when the source omits it
    pub title: String,
    /// Article URL; `"#"` when the source omits it
    pub link: String,
    /// Name of the feed this article came from
    pub source: String,
    /// Canonical publication instant. Timezone-aware when the feed supplied
    /// an offset, UTC otherwise; "now at parse time" when absent
    pub published_at: DateTime<FixedOffset>,
    /// Markup-stripped, truncated, whitespace-trimmed summary
    pub summary: String,
}

impl Article {
    /// ISO-8601 form of the publication instant, produced only at the
    /// serialization boundary.
    pub fn date(&self) -> String {
        self.published_at.to_rfc3339()
    }

    /// Short display form, e.g. "Jan 01, 2024". Derived from the same
    /// stored instant as [`Article::date`] — the raw string is parsed once.
    pub fn date_formatted(&self) -> String {
        format_display(&self.published_at)
    }
}

/// Wire shape: `{title, link, source, date, date_formatted, description}`.
impl Serialize for Article {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Article", 6)?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("link", &self.link)?;
        s.serialize_field("source", &self.source)?;
        s.serialize_field("date", &self.date())?;
        s.serialize_field("date_formatted", &self.date_formatted())?;
        s.serialize_field("description", &self.summary)?;
        s.end()
    }
}

/// A configured feed: display name plus fetch URL. Read-only after startup.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}
