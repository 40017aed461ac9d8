use std::borrow::Cow;

/// Ellipsis string appended when a summary is truncated
const ELLIPSIS: &str = "...";

/// Strips markup tags from feed text.
///
/// Removes every `<...>` tag-shaped substring using a non-greedy scan: each
/// `<` is closed by the *first* following `>`. A tag never spans a line
/// break, so a lone `<` with no `>` on the same line is kept as literal text.
///
/// XML entities that survive in the text (e.g. `&amp;`) are NOT decoded —
/// callers must not assume entity-decoded output.
///
/// Returns `Cow::Borrowed` when the input contains no `<` (common case for
/// plain-text summaries).
///
/// # Examples
///
/// ```
/// use newswire::util::strip_markup;
///
/// assert_eq!(strip_markup("<p>Hi there</p>"), "Hi there");
/// assert_eq!(strip_markup("no tags here"), "no tags here");
/// assert_eq!(strip_markup("a < b"), "a < b");
/// ```
pub fn strip_markup(s: &str) -> Cow<'_, str> {
    if !s.contains('<') {
        return Cow::Borrowed(s);
    }

    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            // Candidate tag: find the first '>' before the end of the line
            let close = bytes[i + 1..]
                .iter()
                .position(|&b| b == b'>' || b == b'\n');
            if let Some(off) = close {
                if bytes[i + 1 + off] == b'>' {
                    i += off + 2;
                    continue;
                }
            }
            // No closing '>' on this line: the '<' is literal text
        }

        // Copy the run of non-tag bytes up to the next '<'.
        // '<' is ASCII, so the slice boundaries are valid UTF-8 cuts.
        let start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        out.push_str(&s[start..i]);
    }

    Cow::Owned(out)
}

/// Truncates text to at most `limit` characters, appending `"..."` when
/// anything was cut.
///
/// Counts characters, not bytes, and cuts on a char boundary so multi-byte
/// text never panics. Text at or under the limit is returned unchanged —
/// surrounding whitespace is deliberately left alone; trimming is a separate
/// final step for callers.
///
/// # Examples
///
/// ```
/// use newswire::util::truncate;
///
/// assert_eq!(truncate("short", 10), "short");
/// assert_eq!(truncate("hello world", 5), "hello...");
/// ```
pub fn truncate(s: &str, limit: usize) -> Cow<'_, str> {
    match s.char_indices().nth(limit) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS)),
        None => Cow::Borrowed(s),
    }
}
