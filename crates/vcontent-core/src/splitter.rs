#![forbid(unsafe_code)]

//! Content segmentation into fixed-size chunks.
//!
//! A chunk is the atomic mount/unmount unit. Chunks are stored as byte ranges
//! into the owned source string, are contiguous, never overlap, and cover the
//! whole source, so concatenating them always reproduces it exactly.
//!
//! Chunk size is measured in `char`s, and every boundary sits on a char
//! boundary.
//!
//! # Markup
//!
//! For [`ContentType::Html`] the naive boundary is checked against the chunk
//! being built: if the last `<` before the boundary has no `>` between it and
//! the boundary, the boundary is inside a tag and moves forward to just past
//! the next `>`. When a chunk would end on an opening tag that is immediately
//! followed by a closing tag (an empty element such as `<a href="/u"></a>`),
//! the closing tag moves along with it, whether or not the boundary had to
//! move first. A `<` that is never closed keeps the naive boundary. The scanner
//! does not understand quoted attribute values or comments.

use std::ops::Range;

/// How chunk text is interpreted by the splitter and the render host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ContentType {
    Text,
    #[default]
    Html,
}

impl ContentType {
    #[must_use]
    pub fn is_html(self) -> bool {
        matches!(self, Self::Html)
    }

    /// Parse the configuration spelling (`text` / `html`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "html" => Some(Self::Html),
            _ => None,
        }
    }
}

/// A borrowed view of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub index: usize,
    pub text: &'a str,
}

/// Splits source strings into chunk ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSplitter {
    chunk_size: usize,
}

impl ContentSplitter {
    /// Create a splitter. A zero chunk size is treated as one.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn split(&self, source: &str, content_type: ContentType) -> Vec<Range<usize>> {
        match content_type {
            ContentType::Text => self.split_text(source),
            ContentType::Html => self.split_markup(source),
        }
    }

    /// Fixed-size slicing: chunk `i` holds chars `[i * size, (i + 1) * size)`.
    #[must_use]
    pub fn split_text(&self, source: &str) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        while start < source.len() {
            let end = advance_chars(source, start, self.chunk_size);
            ranges.push(start..end);
            start = end;
        }
        ranges
    }

    /// Fixed-size slicing that never leaves a boundary inside a `<...>` tag.
    #[must_use]
    pub fn split_markup(&self, source: &str) -> Vec<Range<usize>> {
        let bytes = source.as_bytes();
        let mut ranges = Vec::new();
        let mut start = 0;
        while start < source.len() {
            let naive = advance_chars(source, start, self.chunk_size);
            let mut end = if naive < source.len() && inside_tag(&bytes[start..naive]) {
                tag_end(bytes, naive).unwrap_or(naive)
            } else {
                naive
            };
            // An empty element stays whole: `<a ...>` keeps its `</a>`.
            if ends_with_opening_tag(&bytes[start..end]) && bytes[end..].starts_with(b"</") {
                end = tag_end(bytes, end).unwrap_or(end);
            }
            ranges.push(start..end);
            start = end;
        }
        ranges
    }
}

/// Whether a boundary placed right after `prefix` would split an open tag.
fn inside_tag(prefix: &[u8]) -> bool {
    match prefix.iter().rposition(|&b| b == b'<') {
        Some(open) => !prefix[open..].contains(&b'>'),
        None => false,
    }
}

/// Whether `chunk` ends with an opening tag such as `<a href="/u">`.
///
/// Closing tags (`</b>`) and self-closing tags (`<br/>`) do not count.
fn ends_with_opening_tag(chunk: &[u8]) -> bool {
    let Some(body) = chunk.strip_suffix(b">") else {
        return false;
    };
    match body.iter().rposition(|&b| b == b'<') {
        Some(open) => !body[open + 1..].starts_with(b"/") && !body.ends_with(b"/"),
        None => false,
    }
}

/// Offset just past the first `>` at or after `from`.
///
/// `>` is ASCII, so the returned offset is always a char boundary.
fn tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    bytes[from..]
        .iter()
        .position(|&b| b == b'>')
        .map(|close| from + close + 1)
}

/// Byte offset reached after advancing `count` chars from `from`.
fn advance_chars(source: &str, from: usize, count: usize) -> usize {
    source[from..]
        .char_indices()
        .nth(count)
        .map_or(source.len(), |(offset, _)| from + offset)
}

/// An owned content generation: the coerced source plus its chunk ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedContent {
    source: String,
    content_type: ContentType,
    ranges: Vec<Range<usize>>,
}

impl ChunkedContent {
    #[must_use]
    pub fn new(source: String, content_type: ContentType, splitter: &ContentSplitter) -> Self {
        let ranges = splitter.split(&source, content_type);
        Self {
            source,
            content_type,
            ranges,
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Chunk<'_>> {
        self.ranges.get(index).map(|range| Chunk {
            index,
            text: &self.source[range.clone()],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Chunk<'_>> + '_ {
        self.ranges.iter().enumerate().map(|(index, range)| Chunk {
            index,
            text: &self.source[range.clone()],
        })
    }
}
