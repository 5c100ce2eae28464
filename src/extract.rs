//! Source-level heading scan.
//!
//! This is a line-oriented pattern match over the raw markdown, not a parse.
//! It runs independently of the renderer so that ids can be allocated before
//! anything is laid out.

use std::str::Lines;
use std::sync::LazyLock;

use regex::Regex;

use crate::slug::normalize_text;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

/// A heading line found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedHeading {
    /// Depth 1-6, the number of leading `#`.
    pub level: u8,
    /// Whitespace-normalized text after the hashes.
    pub text: String,
}

/// Iterator over the heading lines of a document, in document order.
///
/// The scan is cheap to clone; clone it (or call [`extract_headings`] again) to
/// walk the same source twice.
///
/// Lines inside fenced code blocks are not skipped: a `# comment` inside a
/// shell snippet is reported as a heading.
#[derive(Debug, Clone)]
pub struct HeadingScan<'a> {
    lines: Lines<'a>,
}

impl Iterator for HeadingScan<'_> {
    type Item = ExtractedHeading;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if let Some(caps) = HEADING_RE.captures(line) {
                return Some(ExtractedHeading {
                    level: caps[1].len() as u8,
                    text: normalize_text(&caps[2]),
                });
            }
        }
        None
    }
}

/// Scan `content` for ATX-style heading lines.
pub fn extract_headings(content: &str) -> HeadingScan<'_> {
    HeadingScan {
        lines: content.lines(),
    }
}
