//! Reference scanning and resolution
//!
//! Recognized inline forms:
//! - `[[page]]`, `[[page|alias]]`, `[alias]([[page]])`
//! - `((block))`, `[alias](((block)))`
//! - `{{embed [[page]]}}`, `{{embed ((block))}}`
//! - `#tag`, `#[[multi word tag]]`
//! - markdown links and images `[text](url)`, `![alt](url)`
//!
//! Nothing inside inline code or code blocks is a reference. Block content
//! is scanned one line at a time, see [`span_lines`].

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::constants as C;
use crate::error::{ConvertError, ConvertResult};
use crate::index::{ReferenceIndex, StableId};
use crate::markdown;
use crate::outline::{ContentKind, ContentSpan};

/// Alternatives are ordered: at one position the first match wins.
static INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r##"(?mx)
          \{\{embed\s+\[\[(?P<embed_page>[^\[\]\n]*)\]\]\s*\}\}
        | \{\{embed\s+\(\((?P<embed_block>[^()\n]*)\)\)\s*\}\}
        | \[(?P<page_label>[^\[\]\n]*)\]\(\[\[(?P<page_labeled>[^\[\]\n]*)\]\]\)
        | \[(?P<block_label>[^\[\]\n]*)\]\(\(\((?P<block_labeled>[^()\n]*)\)\)\)
        | \#\[\[(?P<tag_page>[^\[\]\n]*)\]\]
        | \[\[(?P<page>[^\[\]\n]*)\]\]
        | \(\((?P<block>[^()\n]*)\)\)
        | (?P<image>!)?\[(?P<link_text>[^\[\]\n]*)\]\((?P<link_url>[^()\s]+)\)
        | (?:^|[\s(,])\#(?P<tag>[^\s\#\[\](),;!?"'`]+)
        "##,
    )
    .expect("inline pattern is valid")
});

/// What a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Page,
    Block,
}

/// How a reference is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Link,
    Tag,
    Embed,
}

/// A page link, block reference or embed found in block text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: RefKind,
    pub target_kind: TargetKind,
    /// Target text as written
    pub target: String,
    pub alias: Option<String>,
    /// Source text of the whole construct
    pub raw: String,
    pub range: Range<usize>,
}

impl Reference {
    /// Target text, validated
    pub fn target_name(&self) -> ConvertResult<&str> {
        let target = self.target.trim();
        if target.is_empty() {
            return Err(self.unresolvable("empty target"));
        }
        if self.target_kind == TargetKind::Block && target.contains(char::is_whitespace) {
            return Err(self.unresolvable("block identifier contains whitespace"));
        }
        Ok(target)
    }

    fn unresolvable(&self, reason: &'static str) -> ConvertError {
        ConvertError::UnresolvableReference {
            text: self.raw.clone(),
            reason,
        }
    }
}

/// A markdown link or image that is not a reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownLink {
    pub text: String,
    pub url: String,
    pub image: bool,
    pub range: Range<usize>,
}

/// Inline construct found by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Reference(Reference),
    Link(MarkdownLink),
}

impl Inline {
    pub fn range(&self) -> &Range<usize> {
        match self {
            Inline::Reference(r) => &r.range,
            Inline::Link(l) => &l.range,
        }
    }
}

/// All inline constructs of `text` in order, skipping code
pub fn scan_inline(text: &str) -> Vec<Inline> {
    let code = markdown::code_ranges(text);
    INLINE_RE
        .captures_iter(text)
        .filter_map(|caps| inline_from(text, &caps))
        .filter(|item| !markdown::overlaps_code(&code, item.range()))
        .collect()
}

/// References of `text` in order, skipping code
pub fn scan_references(text: &str) -> Vec<Reference> {
    scan_inline(text)
        .into_iter()
        .filter_map(|item| match item {
            Inline::Reference(r) => Some(r),
            Inline::Link(_) => None,
        })
        .collect()
}

/// One line of block content in the form it is scanned and written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanLine<'a> {
    pub text: &'a str,
    /// Part of a fence inside a quote: written as is, never scanned
    pub verbatim: bool,
}

/// Lines of `span` as the index scans them and the converter rewrites them
///
/// Text lines lose their heading marker and quote lines their `>`. Code
/// spans have no scannable lines.
pub fn span_lines(span: &ContentSpan) -> Vec<SpanLine<'_>> {
    match span.kind {
        ContentKind::Code { .. } => Vec::new(),
        ContentKind::Text => span
            .text
            .lines()
            .map(|line| SpanLine {
                text: markdown::strip_heading_marker(line),
                verbatim: false,
            })
            .collect(),
        ContentKind::Table => span
            .text
            .lines()
            .map(|text| SpanLine { text, verbatim: false })
            .collect(),
        ContentKind::Quote => {
            let mut fenced = false;
            let mut lines = Vec::new();
            for line in span.text.lines() {
                let text = markdown::strip_quote_marker(line);
                let fence = text.trim_start().starts_with(C::CODE_FENCE);
                lines.push(SpanLine {
                    text,
                    verbatim: fenced || fence,
                });
                if fence {
                    fenced = !fenced;
                }
            }
            lines
        }
    }
}

fn inline_from(text: &str, caps: &Captures) -> Option<Inline> {
    let whole = caps.get(0)?;
    let reference = |kind, target_kind, target: &str, alias: Option<&str>, range: Range<usize>| {
        Inline::Reference(Reference {
            kind,
            target_kind,
            target: target.to_string(),
            alias: alias.map(str::to_string),
            raw: text[range.clone()].to_string(),
            range,
        })
    };

    if let Some(m) = caps.name("embed_page") {
        return Some(reference(RefKind::Embed, TargetKind::Page, m.as_str(), None, whole.range()));
    }
    if let Some(m) = caps.name("embed_block") {
        return Some(reference(RefKind::Embed, TargetKind::Block, m.as_str(), None, whole.range()));
    }
    if let Some(m) = caps.name("page_labeled") {
        let label = caps.name("page_label").map(|l| l.as_str());
        return Some(reference(RefKind::Link, TargetKind::Page, m.as_str(), label, whole.range()));
    }
    if let Some(m) = caps.name("block_labeled") {
        let label = caps.name("block_label").map(|l| l.as_str());
        return Some(reference(RefKind::Link, TargetKind::Block, m.as_str(), label, whole.range()));
    }
    if let Some(m) = caps.name("tag_page") {
        return Some(reference(RefKind::Tag, TargetKind::Page, m.as_str(), None, whole.range()));
    }
    if let Some(m) = caps.name("page") {
        let (target, alias) = match m.as_str().split_once('|') {
            Some((target, alias)) => (target, Some(alias)),
            None => (m.as_str(), None),
        };
        return Some(reference(RefKind::Link, TargetKind::Page, target, alias, whole.range()));
    }
    if let Some(m) = caps.name("block") {
        return Some(reference(RefKind::Link, TargetKind::Block, m.as_str(), None, whole.range()));
    }
    if let Some(url) = caps.name("link_url") {
        return Some(Inline::Link(MarkdownLink {
            text: caps.name("link_text").map(|t| t.as_str().to_string()).unwrap_or_default(),
            url: url.as_str().to_string(),
            image: caps.name("image").is_some(),
            range: whole.range(),
        }));
    }
    if let Some(m) = caps.name("tag") {
        // Sentence punctuation is not part of a tag
        let tag = m.as_str().trim_end_matches(|c| c == '.' || c == ':');
        // `#+KEYWORD` is Org syntax
        if tag.is_empty() || tag.starts_with('+') {
            return None;
        }
        let start = m.start() - 1;
        return Some(reference(RefKind::Tag, TargetKind::Page, tag, None, start..m.start() + tag.len()));
    }
    None
}

/// A reference bound to its target identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub target_id: StableId,
    pub display_text: String,
    pub embed: bool,
    pub target_kind: TargetKind,
}

/// Resolves references against a built index
pub struct LinkResolver<'a> {
    index: &'a ReferenceIndex,
}

impl<'a> LinkResolver<'a> {
    pub fn new(index: &'a ReferenceIndex) -> Self {
        Self { index }
    }

    /// Resolve a reference found in the note named `context`
    ///
    /// Display text is the alias when one is given, `#name` for tags, the
    /// page name as written for page links and the block excerpt for
    /// block references.
    pub fn resolve(&self, reference: &Reference, context: &str) -> ConvertResult<ResolvedReference> {
        let target = reference.target_name()?;
        let target_id = match reference.target_kind {
            TargetKind::Page => self.index.page_id(target),
            TargetKind::Block => self.index.block_id(target, context),
        }
        .ok_or_else(|| reference.unresolvable("target is not indexed"))?
        .clone();

        let alias = reference
            .alias
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        let display_text = match (alias, reference.kind, reference.target_kind) {
            (Some(alias), _, _) => alias.to_string(),
            (None, RefKind::Tag, _) => format!("#{}", target),
            (None, _, TargetKind::Page) => target.to_string(),
            (None, _, TargetKind::Block) => self
                .index
                .record(&target_id)
                .map(|record| record.display.clone())
                .unwrap_or_else(|| target.to_string()),
        };

        Ok(ResolvedReference {
            target_id,
            display_text,
            embed: reference.kind == RefKind::Embed,
            target_kind: reference.target_kind,
        })
    }
}

/// Plain-text excerpt of block text, at most `max_chars` characters
/// before the ellipsis
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut plain = String::new();
    let mut last = 0;
    for item in scan_inline(text) {
        let range = item.range();
        plain.push_str(&text[last..range.start]);
        match &item {
            Inline::Reference(r) if r.kind == RefKind::Tag => {
                plain.push('#');
                plain.push_str(r.target.trim());
            }
            Inline::Reference(r) => {
                plain.push_str(r.alias.as_deref().unwrap_or(&r.target).trim())
            }
            Inline::Link(l) => plain.push_str(&l.text),
        }
        last = range.end;
    }
    plain.push_str(&text[last..]);

    let plain = plain
        .trim_start_matches('#')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if plain.chars().count() <= max_chars {
        return plain;
    }
    let cut: String = plain.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
