//! Markdown parsing utilities using pulldown-cmark
//!
//! Finds inline code spans, whose content must never be treated as
//! references, and strips the line markers the converter drops.

use std::ops::Range;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Byte ranges of inline code spans and code blocks in `content`
pub fn code_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut block_start: Option<usize> = None;

    for (event, range) in Parser::new(content).into_offset_iter() {
        match event {
            Event::Code(_) => ranges.push(range),
            Event::Start(Tag::CodeBlock(_)) => block_start = Some(range.start),
            Event::End(TagEnd::CodeBlock) => {
                if let Some(start) = block_start.take() {
                    ranges.push(start..range.end);
                }
            }
            _ => {}
        }
    }

    ranges
}

/// Whether `range` overlaps any of `code`
pub fn overlaps_code(code: &[Range<usize>], range: &Range<usize>) -> bool {
    code.iter()
        .any(|c| c.start < range.end && range.start < c.end)
}

/// Drop markdown heading markers: `## Title` is `Title`
pub fn strip_heading_marker(line: &str) -> &str {
    let hashes = line.len() - line.trim_start_matches('#').len();
    if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
        line[hashes..].trim_start()
    } else {
        line
    }
}

/// Drop the `>` marker of a quote line and one following space
pub fn strip_quote_marker(line: &str) -> &str {
    let line = line.strip_prefix('>').unwrap_or(line);
    line.strip_prefix(' ').unwrap_or(line)
}
