//! Structural converter
//!
//! Writes one [`Document`] as an org-roam file. The layout is:
//!
//! ```text
//! :PROPERTIES:
//! :ID: <page id>
//! :<KEY>: <page property>
//! :ROAM_ALIASES: "alias" ...
//! :END:
//! #+TITLE: <title>
//! #+FILETAGS: :tag:...:
//! #+TODO: <active keywords> | <closed keywords>
//!
//! * heading blocks, level = depth + 1
//!   - list item blocks below them
//! ```
//!
//! Once a heading is written at depth d, every later block at depth d or
//! less is a heading too. A list item there would fall into the section of
//! the heading before it.

use std::collections::{BTreeSet, HashSet};

use crate::config::{HeadingPolicy, MigrateConfig};
use crate::constants as C;
use crate::index::{self, IdRecord, ReferenceIndex, StableId};
use crate::markdown;
use crate::outline::{Block, ContentKind, ContentSpan, Document, TaskState};
use crate::resolve::{self, Inline, LinkResolver, MarkdownLink, SpanLine, TargetKind};
use crate::summary::Issue;

/// Rewrites asset links to their location in the output tree
pub trait AssetResolver {
    /// Corrected path of `original`, or `None` when it is not an asset link
    fn asset_path(&self, original: &str) -> Option<String>;
}

/// Leaves every link untouched
pub struct NoAssets;

impl AssetResolver for NoAssets {
    fn asset_path(&self, _original: &str) -> Option<String> {
        None
    }
}

/// Output text of one document plus what happened while writing it
#[derive(Debug, Clone, Default)]
pub struct Converted {
    pub text: String,
    pub references_resolved: usize,
    pub issues: Vec<Issue>,
}

/// Output buffer of one document
struct Emitter<'d> {
    source: &'d str,
    out: String,
    resolved: usize,
    issues: Vec<Issue>,
    /// Depth of the last heading written
    heading_depth: Option<usize>,
    /// Identifiers already written in an `:ID:` property
    ids: HashSet<StableId>,
}

impl<'d> Emitter<'d> {
    fn new(source: &'d str) -> Self {
        Self {
            source,
            out: String::new(),
            resolved: 0,
            issues: Vec::new(),
            heading_depth: None,
            ids: HashSet::new(),
        }
    }

    fn line(&mut self, indent: usize, text: &str) {
        if !text.is_empty() {
            self.out.extend(std::iter::repeat(' ').take(indent));
            self.out.push_str(text);
        }
        self.out.push_str(C::NEWLINE);
    }

    fn finish(mut self) -> Converted {
        let trimmed = self.out.trim_end().len();
        self.out.truncate(trimmed);
        self.out.push_str(C::NEWLINE);
        Converted {
            text: self.out,
            references_resolved: self.resolved,
            issues: self.issues,
        }
    }
}

/// Writes documents and placeholder pages as Org text
pub struct StructuralConverter<'a> {
    index: &'a ReferenceIndex,
    resolver: LinkResolver<'a>,
    config: &'a MigrateConfig,
    assets: &'a dyn AssetResolver,
}

impl<'a> StructuralConverter<'a> {
    pub fn new(index: &'a ReferenceIndex, config: &'a MigrateConfig, assets: &'a dyn AssetResolver) -> Self {
        Self {
            index,
            resolver: LinkResolver::new(index),
            config,
            assets,
        }
    }

    /// Convert a document whose page identifier is `page_id`
    pub fn convert(&self, doc: &Document, page_id: &StableId, title: &str) -> Converted {
        let mut em = Emitter::new(&doc.name);
        self.write_header(&mut em, doc, page_id, title);
        em.ids.insert(page_id.clone());
        for block in &doc.blocks {
            self.write_block(&mut em, doc, block);
        }
        em.finish()
    }

    /// Text of the placeholder page for a target no note backs
    pub fn placeholder(&self, id: &StableId, record: &IdRecord) -> String {
        format!(
            "{}\n:{}: {}\n{}\n#+TITLE: {}\n#+FILETAGS: :{}:\n",
            C::ORG_PROPERTIES_BEGIN,
            C::ORG_ID_PROPERTY,
            id,
            C::ORG_PROPERTIES_END,
            placeholder_title(record),
            self.config.placeholder_tag,
        )
    }

    /// Whether `block` is a heading on its own account
    ///
    /// Tasks are headings so that the agenda sees them. Ancestors of a
    /// heading are headings too, so the outline nesting survives in the Org
    /// tree. Later siblings are promoted while writing.
    pub fn is_heading(&self, block: &Block) -> bool {
        match self.config.heading_policy {
            HeadingPolicy::EveryBlock => true,
            HeadingPolicy::Addressable => {
                block.is_ref_target
                    || block.task.is_some()
                    || !block.properties.is_empty()
                    || block.children.iter().any(|child| self.is_heading(child))
            }
        }
    }

    fn write_header(&self, em: &mut Emitter, doc: &Document, page_id: &StableId, title: &str) {
        em.line(0, C::ORG_PROPERTIES_BEGIN);
        em.line(0, &format!(":{}: {}", C::ORG_ID_PROPERTY, page_id));
        for (key, value) in &doc.frontmatter {
            if index::is_page_level_key(key) || key == C::BLOCK_ID_PROPERTY || value.trim().is_empty() {
                continue;
            }
            let (value, _) = self.render_inline(em, value);
            em.line(0, &property_line(key, &value));
        }
        if !doc.aliases.is_empty() {
            let aliases: Vec<String> = doc
                .aliases
                .iter()
                .map(|alias| format!("\"{}\"", alias.replace('"', "'")))
                .collect();
            em.line(0, &format!(":{}: {}", C::ORG_ALIASES_PROPERTY, aliases.join(" ")));
        }
        em.line(0, C::ORG_PROPERTIES_END);
        em.line(0, &format!("#+TITLE: {}", title));
        if !doc.tags.is_empty() {
            let tags: Vec<String> = doc.tags.iter().map(|t| org_tag(t)).collect();
            em.line(0, &format!("#+FILETAGS: :{}:", tags.join(":")));
        }
        if let Some(todo) = todo_line(doc) {
            em.line(0, &todo);
        }
        em.line(0, "");
    }

    fn write_block(&self, em: &mut Emitter, doc: &Document, block: &Block) {
        let (title, directives) = self.render_inline(em, markdown::strip_heading_marker(block.title()));
        let mut headline = String::new();
        if let Some(task) = &block.task {
            headline.push_str(&self.task_keyword(em, task));
        }
        if !title.trim().is_empty() {
            if !headline.is_empty() {
                headline.push(' ');
            }
            headline.push_str(title.trim_end());
        }

        let promoted = em.heading_depth.map_or(false, |depth| block.depth <= depth);
        if promoted || self.is_heading(block) {
            em.heading_depth = Some(block.depth);
            em.line(0, &format!("{} {}", "*".repeat(block.depth + 1), headline));
            for planning in &block.planning {
                em.line(0, planning);
            }
            self.write_drawer(em, doc, block);
            for directive in &directives {
                em.line(0, directive);
            }
            self.write_body(em, block, 0);
            for child in &block.children {
                self.write_block(em, doc, child);
            }
        } else {
            // Deeper than the last heading, so that heading is an ancestor
            let level = match em.heading_depth {
                Some(parent) => block.depth - parent - 1,
                None => block.depth,
            };
            let indent = level * C::INDENT_WIDTH;
            if headline.is_empty() {
                em.line(indent, C::BULLET.trim_end());
            } else {
                em.line(indent, &format!("{}{}", C::BULLET, headline));
            }
            let body_indent = indent + C::BULLET.len();
            for planning in &block.planning {
                em.line(body_indent, planning);
            }
            for directive in &directives {
                em.line(body_indent, directive);
            }
            self.write_body(em, block, body_indent);
            for child in &block.children {
                self.write_block(em, doc, child);
            }
        }
    }

    fn write_drawer(&self, em: &mut Emitter, doc: &Document, block: &Block) {
        let id = block
            .local_id
            .as_deref()
            .and_then(|token| self.index.declared_block_id(token, &doc.name))
            .filter(|id| em.ids.insert((*id).clone()));
        if id.is_none() && block.properties.is_empty() {
            return;
        }
        em.line(0, C::ORG_PROPERTIES_BEGIN);
        if let Some(id) = id {
            em.line(0, &format!(":{}: {}", C::ORG_ID_PROPERTY, id));
        }
        for (key, value) in &block.properties {
            let (value, _) = self.render_inline(em, value);
            em.line(0, &property_line(key, &value));
        }
        em.line(0, C::ORG_PROPERTIES_END);
    }

    /// Everything of a block after its title line
    fn write_body(&self, em: &mut Emitter, block: &Block, indent: usize) {
        for (position, span) in block.content.iter().enumerate() {
            match &span.kind {
                ContentKind::Text => {
                    let skip = if position == 0 { 1 } else { 0 };
                    for line in resolve::span_lines(span).into_iter().skip(skip) {
                        let (rendered, directives) = self.render_inline(em, line.text);
                        em.line(indent, &body_line(&rendered));
                        for directive in &directives {
                            em.line(indent, directive);
                        }
                    }
                }
                ContentKind::Code { lang } => write_code(em, span, lang.as_deref(), indent),
                ContentKind::Table => {
                    for row in span.text.lines() {
                        match table_hline(row) {
                            Some(hline) => em.line(indent, &hline),
                            None => {
                                let (rendered, _) = self.render_inline(em, row);
                                em.line(indent, &rendered);
                            }
                        }
                    }
                }
                ContentKind::Quote => {
                    em.line(indent, "#+BEGIN_QUOTE");
                    for SpanLine { text, verbatim } in resolve::span_lines(span) {
                        if verbatim {
                            em.line(indent, &escape_code_line(text));
                        } else {
                            let (rendered, _) = self.render_inline(em, text);
                            em.line(indent, &body_line(&rendered));
                        }
                    }
                    em.line(indent, "#+END_QUOTE");
                }
            }
        }
    }

    /// Rewrite references and links of one line of text
    ///
    /// Returns the rewritten text and the inclusion directives of any
    /// embeds, which stand on lines of their own.
    fn render_inline(&self, em: &mut Emitter, text: &str) -> (String, Vec<String>) {
        let mut out = String::with_capacity(text.len());
        let mut directives = Vec::new();
        let mut last = 0;

        for item in resolve::scan_inline(text) {
            let range = item.range().clone();
            out.push_str(&text[last..range.start]);
            match item {
                Inline::Reference(reference) => match self.resolver.resolve(&reference, em.source) {
                    Ok(resolved) => {
                        em.resolved += 1;
                        let link = id_link(&resolved.target_id, &resolved.display_text);
                        if resolved.embed {
                            directives.push(format!("{} {}", C::ORG_TRANSCLUDE_KEYWORD, link));
                        } else {
                            out.push_str(&link);
                        }
                    }
                    Err(e) => {
                        em.issues.push(Issue::from_error(em.source, &e));
                        out.push_str(&reference.raw);
                    }
                },
                Inline::Link(link) => out.push_str(&self.markdown_link(&link)),
            }
            last = range.end;
        }
        out.push_str(&text[last..]);

        (out, directives)
    }

    fn markdown_link(&self, link: &MarkdownLink) -> String {
        let target = match self.assets.asset_path(&link.url) {
            Some(path) => format!("file:{}", path),
            None => link.url.clone(),
        };
        if link.image || link.text.trim().is_empty() {
            format!("[[{}]]", target)
        } else {
            format!("[[{}][{}]]", target, link_description(&link.text))
        }
    }

    fn task_keyword(&self, em: &Emitter, task: &TaskState) -> String {
        if let TaskState::Custom(token) = task {
            log::info!("{}: task keyword {} has no mapping, kept as is", em.source, token);
        }
        task.token().to_string()
    }
}

/// Title of the placeholder page for `record`
pub fn placeholder_title(record: &IdRecord) -> String {
    match record.kind {
        TargetKind::Page => record.display.clone(),
        TargetKind::Block => format!("Missing block {}", record.key),
    }
}

fn id_link(id: &StableId, display: &str) -> String {
    if display.trim().is_empty() {
        format!("[[id:{}]]", id)
    } else {
        format!("[[id:{}][{}]]", id, link_description(display))
    }
}

// Brackets would close the link early
fn link_description(text: &str) -> String {
    text.replace('[', "(").replace(']', ")")
}

fn property_line(key: &str, value: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| if c.is_whitespace() || c == ':' { '_' } else { c })
        .collect();
    let value = value.lines().collect::<Vec<_>>().join(" ");
    format!(":{}: {}", key.to_uppercase(), value.trim())
}

/// Org tags only allow letters, digits and `_@#%`
fn org_tag(tag: &str) -> String {
    tag.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || "_@#%".contains(c) { c } else { '_' })
        .collect()
}

/// Keyword declaration covering every task state the document uses
fn todo_line(doc: &Document) -> Option<String> {
    let mut used = BTreeSet::new();
    doc.walk_blocks(&mut |block| {
        if let Some(task) = &block.task {
            used.insert(task.token().to_string());
        }
    });
    if used.is_empty() {
        return None;
    }

    let mut active: Vec<&str> = TaskState::BUILTIN
        .iter()
        .filter(|(_, state)| !state.is_done())
        .map(|(token, _)| *token)
        .collect();
    let done: Vec<&str> = TaskState::BUILTIN
        .iter()
        .filter(|(_, state)| state.is_done())
        .map(|(token, _)| *token)
        .collect();
    for token in &used {
        if !active.contains(&token.as_str()) && !done.contains(&token.as_str()) {
            active.push(token);
        }
    }
    Some(format!("#+TODO: {} | {}", active.join(" "), done.join(" ")))
}

fn write_code(em: &mut Emitter, span: &ContentSpan, lang: Option<&str>, indent: usize) {
    let (begin, end) = match lang {
        Some(lang) => (format!("#+BEGIN_SRC {}", lang), "#+END_SRC"),
        None => ("#+BEGIN_EXAMPLE".to_string(), "#+END_EXAMPLE"),
    };
    em.line(indent, &begin);
    if !span.text.is_empty() {
        for line in span.text.split('\n') {
            em.line(indent, &escape_code_line(line));
        }
    }
    em.line(indent, end);
}

/// Comma-escape lines Org would read as headings or keywords
fn escape_code_line(line: &str) -> String {
    let trimmed = line.trim_start();
    let escape = ["*", "#+", ",*", ",#+"].iter().any(|p| trimmed.starts_with(p));
    if escape {
        let lead = line.len() - trimmed.len();
        format!("{},{}", &line[..lead], trimmed)
    } else {
        line.to_string()
    }
}

/// Markdown table separator row as an Org horizontal rule
fn table_hline(row: &str) -> Option<String> {
    let inner = row.trim().strip_prefix('|')?.strip_suffix('|')?;
    let cells: Vec<&str> = inner.split('|').collect();
    let separator = cells.iter().all(|cell| {
        let cell = cell.trim();
        cell.contains('-') && cell.chars().all(|c| c == '-' || c == ':')
    });
    if !separator {
        return None;
    }
    let dashes: Vec<String> = cells.iter().map(|cell| "-".repeat(cell.len().max(1))).collect();
    Some(format!("|{}|", dashes.join("+")))
}

/// Body text line; a leading `* ` would open an Org heading and `#+` a
/// keyword
fn body_line(line: &str) -> String {
    if let Some(rest) = line.strip_prefix("* ") {
        return format!("{}{}", C::BULLET, rest);
    }
    if line.trim_start().starts_with("#+") {
        return escape_code_line(line);
    }
    line.to_string()
}
