use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::model::Article;
use crate::util::{parse_date, strip_markup, truncate};

/// Atom namespace URI; a root `feed` element bound to it selects the Atom path
const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";

/// Substituted when an item carries no usable title
const FALLBACK_TITLE: &str = "No Title";
/// Substituted when an item carries no usable link
const FALLBACK_LINK: &str = "#";

/// Maximum summary length in characters, before the ellipsis marker
pub const SUMMARY_LIMIT: usize = 200;

/// Errors that make an entire feed body unusable.
///
/// Field-level problems (missing title, bad date) never reach this level —
/// they are absorbed locally via sentinel defaults. A `ParseError` means the
/// bytes were not a feed at all, and the fetcher treats it like any other
/// per-source failure.
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML that cannot be tokenized (unclosed tags, bad syntax)
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Input with no root element at all (empty or whitespace-only body)
    #[error("document has no root element")]
    NoRootElement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Atom,
    Rss,
}

/// Parses raw feed bytes into at most `limit` normalized articles.
///
/// Pure function of its input: identical bytes yield identical output
/// (modulo the "now" fallback for items that carry no date).
///
/// The root element picks the dialect — `feed` in the Atom namespace is
/// parsed as Atom, anything else as RSS 2.0. Per item the usual fallback
/// chains apply (`published` else `updated`, `description` else
/// `content:encoded`, ...), missing titles and links become sentinels, and
/// summaries are markup-stripped, truncated and trimmed. The item cap is
/// enforced while scanning, so oversized feeds never cost more than `limit`
/// items of normalization work.
///
/// # Errors
///
/// Returns [`ParseError`] only for malformed XML or an empty document.
pub fn parse_feed(feed_name: &str, bytes: &[u8], limit: usize) -> Result<Vec<Article>, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let kind = loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => break detect_kind(e),
            Event::Eof => return Err(ParseError::NoRootElement),
            _ => {}
        }
    };

    let entries = collect_entries(&mut reader, kind, limit)?;
    Ok(entries
        .into_iter()
        .map(|fields| fields.into_article(feed_name, kind))
        .collect())
}

/// Atom requires both the `feed` local name and an `xmlns` (default or
/// prefixed) binding the Atom namespace; everything else goes down the RSS
/// path.
fn detect_kind(root: &BytesStart<'_>) -> FeedKind {
    if root.name().local_name().as_ref() != b"feed" {
        return FeedKind::Rss;
    }
    let bound_to_atom = root.attributes().flatten().any(|attr| {
        let key = attr.key.as_ref();
        (key == b"xmlns" || key.starts_with(b"xmlns:")) && attr.value.as_ref() == ATOM_NS
    });
    if bound_to_atom {
        FeedKind::Atom
    } else {
        FeedKind::Rss
    }
}

/// Raw per-item fields as they appear in the document, before any
/// normalization. The RSS equivalents land in the same slots: `pubDate` →
/// `published`, `dc:date` → `updated`, `description` → `summary`,
/// `content:encoded` → `content`.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link_text: Option<String>,
    links: Vec<LinkRef>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}

/// `rel`/`href` attribute pair of an Atom `link` element.
#[derive(Debug)]
struct LinkRef {
    rel: Option<String>,
    href: Option<String>,
}

/// Scans the remaining document for item elements — `item` at any depth for
/// RSS, `entry` for Atom — stopping as soon as `limit` of them are read.
fn collect_entries(
    reader: &mut Reader<&[u8]>,
    kind: FeedKind,
    limit: usize,
) -> Result<Vec<RawEntry>, ParseError> {
    let entry_tag: &[u8] = match kind {
        FeedKind::Atom => b"entry",
        FeedKind::Rss => b"item",
    };

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    while entries.len() < limit {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().local_name().as_ref() == entry_tag => {
                entries.push(read_entry(reader, kind, entry_tag)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

/// Reads one `item`/`entry` element, capturing the first non-empty
/// occurrence of each known child. Unknown children are skipped wholesale;
/// an empty child counts as absent so fallback chains keep looking.
fn read_entry(
    reader: &mut Reader<&[u8]>,
    kind: FeedKind,
    entry_tag: &[u8],
) -> Result<RawEntry, ParseError> {
    let mut entry = RawEntry::default();
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                if depth > 0 {
                    depth += 1;
                    continue;
                }
                let name = e.name();
                if kind == FeedKind::Atom && name.local_name().as_ref() == b"link" {
                    entry.links.push(link_ref(e, reader));
                    depth += 1;
                } else if let Some(slot) = field_slot(kind, &mut entry, name.as_ref()) {
                    let end = e.to_end().into_owned();
                    let text = read_text_content(reader, end)?;
                    if slot.is_none() && !text.is_empty() {
                        *slot = Some(text);
                    }
                } else {
                    depth += 1;
                }
            }
            Event::Empty(ref e) if depth == 0 => {
                if kind == FeedKind::Atom && e.name().local_name().as_ref() == b"link" {
                    entry.links.push(link_ref(e, reader));
                }
            }
            Event::End(ref e) => {
                if depth == 0 {
                    if e.name().local_name().as_ref() == entry_tag {
                        break;
                    }
                } else {
                    depth -= 1;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entry)
}

/// Maps a child element name to the field it fills. Atom children match on
/// local name so any prefix works; the RSS extension elements match the
/// conventional `dc:`/`content:` prefixes.
fn field_slot<'e>(
    kind: FeedKind,
    entry: &'e mut RawEntry,
    qname: &[u8],
) -> Option<&'e mut Option<String>> {
    match kind {
        FeedKind::Atom => match local_part(qname) {
            b"title" => Some(&mut entry.title),
            b"published" => Some(&mut entry.published),
            b"updated" => Some(&mut entry.updated),
            b"summary" => Some(&mut entry.summary),
            b"content" => Some(&mut entry.content),
            _ => None,
        },
        FeedKind::Rss => match qname {
            b"title" => Some(&mut entry.title),
            b"link" => Some(&mut entry.link_text),
            b"pubDate" => Some(&mut entry.published),
            b"dc:date" => Some(&mut entry.updated),
            b"description" => Some(&mut entry.summary),
            b"content:encoded" => Some(&mut entry.content),
            _ => None,
        },
    }
}

fn local_part(qname: &[u8]) -> &[u8] {
    match qname.iter().position(|&b| b == b':') {
        Some(colon) => &qname[colon + 1..],
        None => qname,
    }
}

/// Concatenated text of an element: character data unescaped, CDATA taken
/// raw, markup nested inside the element contributing only its text.
/// Fragments separated by markup are joined with a single space, since the
/// reader trims the whitespace that sat between them.
fn read_text_content(
    reader: &mut Reader<&[u8]>,
    end: BytesEnd<'static>,
) -> Result<String, ParseError> {
    let mut text = String::new();
    let mut depth = 0usize;
    let mut buf = Vec::new();

    fn append(text: &mut String, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(fragment);
    }

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Text(ref t) => append(&mut text, &decode_text(t)),
            Event::CData(ref c) => append(&mut text, &String::from_utf8_lossy(c)),
            Event::Start(_) => depth += 1,
            Event::End(ref e) if depth == 0 && e.name() == end.name() => break,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

fn decode_text(t: &BytesText<'_>) -> String {
    match t.unescape() {
        Ok(s) => s.into_owned(),
        // Unknown entities (e.g. HTML's &nbsp;) keep the raw text
        Err(_) => String::from_utf8_lossy(t).into_owned(),
    }
}

fn link_ref(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> LinkRef {
    let decoder = reader.decoder();
    let mut rel = None;
    let mut href = None;

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping malformed link attribute");
                continue;
            }
        };
        match attr.key.as_ref() {
            b"rel" => {
                rel = attr
                    .decode_and_unescape_value(decoder)
                    .ok()
                    .map(|v| v.into_owned());
            }
            b"href" => {
                href = attr
                    .decode_and_unescape_value(decoder)
                    .ok()
                    .map(|v| v.into_owned());
            }
            _ => {}
        }
    }

    LinkRef { rel, href }
}

impl RawEntry {
    fn into_article(self, feed_name: &str, kind: FeedKind) -> Article {
        let title = self.title.unwrap_or_else(|| FALLBACK_TITLE.to_string());

        let link = match kind {
            // Prefer rel="alternate", else the first link element
            FeedKind::Atom => self
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("alternate"))
                .or_else(|| self.links.first())
                .and_then(|l| l.href.clone())
                .filter(|href| !href.is_empty()),
            FeedKind::Rss => self.link_text,
        }
        .unwrap_or_else(|| FALLBACK_LINK.to_string());

        let published_at = parse_date(self.published.or(self.updated).as_deref());

        let raw_summary = self.summary.or(self.content).unwrap_or_default();
        let summary = truncate(&strip_markup(&raw_summary), SUMMARY_LIMIT)
            .trim()
            .to_string();

        Article {
            title,
            link,
            source: feed_name.to_string(),
            published_at,
            summary,
        }
    }
}
