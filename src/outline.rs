//! Outline parser
//!
//! Turns the text of one Logseq note into a [`Document`]: frontmatter and page
//! properties first, then a tree of [`Block`]s built from bullet indentation.
//!
//! Layout rules:
//! - a bullet is a line whose first non-blank characters are `- `
//! - indentation counts a tab as two columns, two columns per level
//! - any other line continues the most recent block
//! - inside a fenced code block every line belongs to the fence

use std::collections::{BTreeMap, BTreeSet};

use crate::constants as C;
use crate::error::{ConvertError, ConvertResult};
use crate::frontmatter;

/// Kind of an input note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Page,
    Journal,
}

/// Task state of a block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskState {
    Todo,
    Doing,
    Done,
    Later,
    Now,
    Waiting,
    Wait,
    Canceled,
    Cancelled,
    InProgress,
    Overdue,
    /// Keyword configured by the user, outside the built-in set
    Custom(String),
}

impl TaskState {
    /// Built-in keywords, case-sensitive
    pub const BUILTIN: &'static [(&'static str, TaskState)] = &[
        ("TODO", TaskState::Todo),
        ("DOING", TaskState::Doing),
        ("DONE", TaskState::Done),
        ("LATER", TaskState::Later),
        ("NOW", TaskState::Now),
        ("WAITING", TaskState::Waiting),
        ("WAIT", TaskState::Wait),
        ("CANCELED", TaskState::Canceled),
        ("CANCELLED", TaskState::Cancelled),
        ("IN-PROGRESS", TaskState::InProgress),
        ("OVERDUE", TaskState::Overdue),
    ];

    /// Keyword as written in the source note
    pub fn token(&self) -> &str {
        match self {
            TaskState::Custom(token) => token,
            builtin => TaskState::BUILTIN
                .iter()
                .find(|(_, state)| state == builtin)
                .map(|(token, _)| *token)
                .unwrap_or("TODO"),
        }
    }

    /// Whether the state closes the task
    pub fn is_done(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Canceled | TaskState::Cancelled)
    }

    fn from_token(token: &str, extra: &[String]) -> Option<TaskState> {
        TaskState::BUILTIN
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, state)| state.clone())
            .or_else(|| {
                extra
                    .iter()
                    .find(|t| t.as_str() == token)
                    .map(|t| TaskState::Custom(t.clone()))
            })
    }
}

/// Kind of a content span inside a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Code { lang: Option<String> },
    Table,
    Quote,
}

/// A run of block content of one kind
///
/// Atomic spans (code, table, quote) are never split into blocks. For code
/// the text is the fence content without the fence lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSpan {
    pub kind: ContentKind,
    pub text: String,
}

impl ContentSpan {
    fn new(kind: ContentKind, lines: &[String]) -> Self {
        Self {
            kind,
            text: lines.join(C::NEWLINE),
        }
    }
}

/// One node of an outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub content: Vec<ContentSpan>,
    pub depth: usize,
    pub children: Vec<Block>,
    /// Identifier declared with `id::`
    pub local_id: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub task: Option<TaskState>,
    /// `SCHEDULED:` / `DEADLINE:` lines
    pub planning: Vec<String>,
    /// Set by the index when some reference points at this block
    pub is_ref_target: bool,
    /// 1-based source line of the bullet
    pub line: usize,
}

impl Block {
    /// First line of text content, the heading title of the block
    pub fn title(&self) -> &str {
        match self.content.first() {
            Some(span) if span.kind == ContentKind::Text => {
                span.text.lines().next().unwrap_or("")
            }
            _ => "",
        }
    }

    /// Visit this block and all descendants, depth first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Block)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Mutable depth-first visit
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut Block)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

/// Parsed representation of one input note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Logical name, namespace segments separated by `/`
    pub name: String,
    pub kind: DocumentKind,
    /// YAML frontmatter merged with leading page properties
    pub frontmatter: BTreeMap<String, String>,
    pub blocks: Vec<Block>,
    pub tags: BTreeSet<String>,
    pub aliases: Vec<String>,
}

impl Document {
    /// Visit every block of the document, depth first
    pub fn walk_blocks<'a>(&'a self, visit: &mut dyn FnMut(&'a Block)) {
        for block in &self.blocks {
            block.walk(visit);
        }
    }

    pub fn walk_blocks_mut(&mut self, visit: &mut dyn FnMut(&mut Block)) {
        for block in &mut self.blocks {
            block.walk_mut(visit);
        }
    }
}

/// Parse result with the non-fatal warnings met on the way
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub document: Document,
    pub warnings: Vec<String>,
}

/// Block lines before span and property extraction
struct RawBlock {
    depth: usize,
    line: usize,
    lines: Vec<String>,
    in_fence: bool,
    /// Column where the block's content starts
    content_column: usize,
}

/// Parse a note into a document
///
/// Fails with [`ConvertError::MalformedOutline`] when a bullet is nested
/// more than one level below the previous bullet.
pub fn parse_document(
    name: &str,
    kind: DocumentKind,
    text: &str,
    extra_task_keywords: &[String],
) -> ConvertResult<ParseOutcome> {
    let mut warnings = Vec::new();
    let mut properties = BTreeMap::new();

    let (yaml, body) = frontmatter::split_frontmatter(text);
    let line_offset = text[..text.len() - body.len()].lines().count();
    if let Some(yaml) = yaml {
        match frontmatter::parse_frontmatter(yaml) {
            Ok(parsed) => properties = parsed,
            Err(e) => warnings.push(format!("frontmatter ignored: {}", e)),
        }
    }

    let (page_properties, raw_blocks) = split_blocks(body, line_offset)?;
    for (key, value) in page_properties {
        properties.entry(key).or_insert(value);
    }

    let flat: Vec<Block> = raw_blocks
        .into_iter()
        .map(|raw| build_block(raw, extra_task_keywords))
        .collect();

    let tags: BTreeSet<String> = properties
        .get(C::TAGS_PROPERTY)
        .map(|v| frontmatter::split_list(v).into_iter().collect())
        .unwrap_or_default();
    let aliases = properties
        .get(C::ALIAS_PROPERTY)
        .map(|v| frontmatter::split_list(v))
        .unwrap_or_default();

    let name = match (kind, properties.get(C::TITLE_PROPERTY)) {
        (DocumentKind::Page, Some(title)) if !title.trim().is_empty() => title.trim().to_string(),
        _ => name.trim().to_string(),
    };

    Ok(ParseOutcome {
        document: Document {
            name,
            kind,
            frontmatter: properties,
            blocks: nest(flat),
            tags,
            aliases,
        },
        warnings,
    })
}

/// Group lines into raw blocks and collect leading page properties
fn split_blocks(
    body: &str,
    line_offset: usize,
) -> ConvertResult<(Vec<(String, String)>, Vec<RawBlock>)> {
    let mut page_properties = Vec::new();
    let mut blocks: Vec<RawBlock> = Vec::new();

    for (index, line) in body.lines().enumerate() {
        let line_no = line_offset + index + 1;
        let (width, rest) = measure_indent(line);

        if let Some(current) = blocks.last_mut() {
            if current.in_fence || !is_bullet(rest) {
                let content = strip_indent(line, current.content_column);
                if content.trim_start().starts_with(C::CODE_FENCE) {
                    current.in_fence = !current.in_fence;
                }
                current.lines.push(content.to_string());
                continue;
            }
        } else if !is_bullet(rest) {
            // Preamble: page properties, then free text as a root block
            if line.trim().is_empty() {
                continue;
            }
            if let Some(property) = frontmatter::parse_property_line(line) {
                page_properties.push(property);
                continue;
            }
            blocks.push(RawBlock {
                depth: 0,
                line: line_no,
                lines: vec![line.to_string()],
                in_fence: line.trim_start().starts_with(C::CODE_FENCE),
                content_column: 0,
            });
            continue;
        }

        let depth = width / C::INDENT_WIDTH;
        let parent_depth = blocks.last().map(|b| b.depth);
        let max_depth = parent_depth.map(|d| d + 1).unwrap_or(0);
        if depth > max_depth {
            return Err(ConvertError::MalformedOutline {
                line: line_no,
                parent_depth: parent_depth.unwrap_or(0),
                depth,
            });
        }

        let first = rest.strip_prefix(C::BULLET).unwrap_or("").to_string();
        blocks.push(RawBlock {
            depth,
            line: line_no,
            in_fence: first.trim_start().starts_with(C::CODE_FENCE),
            lines: vec![first],
            content_column: width + C::BULLET.len(),
        });
    }

    Ok((page_properties, blocks))
}

/// Turn raw lines into a block: properties, task, planning, spans
fn build_block(raw: RawBlock, extra_task_keywords: &[String]) -> Block {
    let mut properties = BTreeMap::new();
    let mut local_id = None;
    let mut planning = Vec::new();
    let mut content: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in raw.lines {
        if line.trim_start().starts_with(C::CODE_FENCE) {
            in_fence = !in_fence;
            content.push(line);
            continue;
        }
        if in_fence {
            content.push(line);
            continue;
        }
        if let Some((key, value)) = frontmatter::parse_property_line(&line) {
            if key == C::BLOCK_ID_PROPERTY {
                if !value.is_empty() {
                    local_id = Some(value);
                }
            } else if !C::VIEWER_PROPERTIES.contains(&key.as_str()) {
                properties.insert(key, value);
            }
            continue;
        }
        let trimmed = line.trim_start();
        if C::PLANNING_KEYWORDS.iter().any(|k| trimmed.starts_with(k)) {
            planning.push(trimmed.to_string());
            continue;
        }
        content.push(line);
    }

    // Drop blank lines left at the edges by removed properties
    while content.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        content.pop();
    }
    while content.len() > 1 && content[0].trim().is_empty() {
        content.remove(0);
    }

    let mut task = None;
    if let Some(first) = content.first_mut() {
        if let Some((state, rest)) = split_task(first, extra_task_keywords) {
            task = Some(state);
            *first = rest;
        }
    }

    Block {
        content: group_spans(&content),
        depth: raw.depth,
        children: Vec::new(),
        local_id,
        properties,
        task,
        planning,
        is_ref_target: false,
        line: raw.line,
    }
}

/// Split a leading task keyword or markdown checkbox from the first line
fn split_task(line: &str, extra: &[String]) -> Option<(TaskState, String)> {
    let checkbox = std::iter::once((C::CHECKBOX_OPEN, TaskState::Todo))
        .chain(C::CHECKBOX_DONE.iter().map(|b| (*b, TaskState::Done)));
    for (marker, state) in checkbox {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.is_empty() || rest.starts_with(' ') {
                return Some((state, rest.trim_start().to_string()));
            }
        }
    }
    let (token, rest) = match line.split_once(' ') {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (line.trim_end(), ""),
    };
    TaskState::from_token(token, extra).map(|state| (state, rest.to_string()))
}

/// Group content lines into text and atomic spans
fn group_spans(lines: &[String]) -> Vec<ContentSpan> {
    let mut spans = Vec::new();
    let mut text: Vec<String> = Vec::new();
    let mut i = 0;

    let flush = |text: &mut Vec<String>, spans: &mut Vec<ContentSpan>| {
        if !text.is_empty() {
            spans.push(ContentSpan::new(ContentKind::Text, text));
            text.clear();
        }
    };

    while i < lines.len() {
        let trimmed = lines[i].trim_start();

        if let Some(info) = trimmed.strip_prefix(C::CODE_FENCE) {
            flush(&mut text, &mut spans);
            let lang = info.trim();
            let lang = (!lang.is_empty()).then(|| lang.to_string());
            let mut body = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with(C::CODE_FENCE) {
                body.push(lines[i].clone());
                i += 1;
            }
            // Skip the closing fence (absent when the fence is left open)
            i += 1;
            spans.push(ContentSpan::new(ContentKind::Code { lang }, &body));
            continue;
        }

        let atomic = if trimmed.starts_with('|') {
            Some(ContentKind::Table)
        } else if trimmed.starts_with('>') {
            Some(ContentKind::Quote)
        } else {
            None
        };

        match atomic {
            Some(kind) => {
                flush(&mut text, &mut spans);
                let marker = if kind == ContentKind::Table { '|' } else { '>' };
                let mut body = Vec::new();
                while i < lines.len() && lines[i].trim_start().starts_with(marker) {
                    body.push(lines[i].trim_start().to_string());
                    i += 1;
                }
                spans.push(ContentSpan::new(kind, &body));
            }
            None => {
                text.push(lines[i].clone());
                i += 1;
            }
        }
    }
    flush(&mut text, &mut spans);

    if spans.is_empty() {
        spans.push(ContentSpan::new(ContentKind::Text, &[String::new()]));
    }
    spans
}

/// Build the tree from blocks in document order
///
/// Depths were validated while splitting, so every block's parent is on
/// the stack.
fn nest(flat: Vec<Block>) -> Vec<Block> {
    let mut roots = Vec::new();
    let mut stack: Vec<Block> = Vec::new();

    for block in flat {
        while stack.len() > block.depth {
            close_top(&mut stack, &mut roots);
        }
        stack.push(block);
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

fn close_top(stack: &mut Vec<Block>, roots: &mut Vec<Block>) {
    if let Some(done) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}

fn is_bullet(rest: &str) -> bool {
    rest.starts_with(C::BULLET) || rest.trim_end() == "-"
}

/// Indent width in columns and the line with indentation removed
fn measure_indent(line: &str) -> (usize, &str) {
    let mut width = 0;
    for (pos, c) in line.char_indices() {
        match c {
            ' ' => width += 1,
            '\t' => width += C::TAB_WIDTH,
            _ => return (width, &line[pos..]),
        }
    }
    (width, "")
}

/// Remove up to `column` columns of leading whitespace
fn strip_indent(line: &str, column: usize) -> &str {
    let mut width = 0;
    for (pos, c) in line.char_indices() {
        if width >= column {
            return &line[pos..];
        }
        match c {
            ' ' => width += 1,
            '\t' => width += C::TAB_WIDTH,
            _ => return &line[pos..],
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Document {
        parse_document("Test", DocumentKind::Page, text, &[]).unwrap().document
    }

    #[test]
    fn test_nesting_follows_indentation() {
        let doc = parse("- a\n\t- b\n\t\t- c\n\t- d\n- e\n");
        assert_eq!(doc.blocks.len(), 2);
        let a = &doc.blocks[0];
        assert_eq!(a.title(), "a");
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[0].children[0].title(), "c");
        assert_eq!(a.children[0].children[0].depth, 2);
        assert_eq!(doc.blocks[1].title(), "e");
    }

    #[test]
    fn test_space_indentation() {
        let doc = parse("- a\n  - b\n    - c\n");
        assert_eq!(doc.blocks[0].children[0].children[0].title(), "c");
    }

    #[test]
    fn test_depth_invariant_holds() {
        let doc = parse("- a\n\t- b\n\t\t- c\n\t\t\t- d\n\t- e\n- f\n\t- g\n");
        fn check(block: &Block) {
            for child in &block.children {
                assert_eq!(child.depth, block.depth + 1);
                check(child);
            }
        }
        for root in &doc.blocks {
            assert_eq!(root.depth, 0);
            check(root);
        }
    }

    #[test]
    fn test_malformed_indentation() {
        let err = parse_document("Bad", DocumentKind::Page, "- a\n\t\t- too deep\n", &[]).unwrap_err();
        assert_eq!(
            err,
            ConvertError::MalformedOutline { line: 2, parent_depth: 0, depth: 2 }
        );
    }

    #[test]
    fn test_malformed_first_bullet() {
        let err = parse_document("Bad", DocumentKind::Page, "\t- indented root\n", &[]).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedOutline { line: 1, depth: 1, .. }));
    }

    #[test]
    fn test_properties_and_id_are_extracted() {
        let doc = parse("- Important block\n  id:: abc123\n  status:: open\n  collapsed:: true\n");
        let block = &doc.blocks[0];
        assert_eq!(block.local_id.as_deref(), Some("abc123"));
        assert_eq!(block.properties.get("status").map(String::as_str), Some("open"));
        assert!(!block.properties.contains_key("collapsed"));
        assert_eq!(block.content.len(), 1);
        assert_eq!(block.content[0].text, "Important block");
    }

    #[test]
    fn test_task_tokens() {
        let doc = parse("- TODO write docs\n- DONE ship\n- todo lowercase\n- NOW\n");
        assert_eq!(doc.blocks[0].task, Some(TaskState::Todo));
        assert_eq!(doc.blocks[0].title(), "write docs");
        assert_eq!(doc.blocks[1].task, Some(TaskState::Done));
        assert_eq!(doc.blocks[2].task, None);
        assert_eq!(doc.blocks[3].task, Some(TaskState::Now));
        assert_eq!(doc.blocks[3].title(), "");
    }

    #[test]
    fn test_checkboxes_and_overdue() {
        let doc = parse("- [ ] buy milk\n- [x] paid\n- [X] filed\n- OVERDUE taxes\n- [x](https://x.org)\n- [ ]\n");
        assert_eq!(doc.blocks[0].task, Some(TaskState::Todo));
        assert_eq!(doc.blocks[0].title(), "buy milk");
        assert_eq!(doc.blocks[1].task, Some(TaskState::Done));
        assert_eq!(doc.blocks[2].task, Some(TaskState::Done));
        assert_eq!(doc.blocks[2].title(), "filed");
        assert_eq!(doc.blocks[3].task, Some(TaskState::Overdue));
        assert!(!TaskState::Overdue.is_done());
        assert_eq!(doc.blocks[4].task, None);
        assert_eq!(doc.blocks[5].task, Some(TaskState::Todo));
        assert_eq!(doc.blocks[5].title(), "");
    }

    #[test]
    fn test_custom_task_keyword() {
        let extra = vec!["SOMEDAY".to_string()];
        let outcome = parse_document("T", DocumentKind::Page, "- SOMEDAY learn elisp\n", &extra).unwrap();
        let block = &outcome.document.blocks[0];
        assert_eq!(block.task, Some(TaskState::Custom("SOMEDAY".to_string())));
        assert_eq!(block.task.as_ref().unwrap().token(), "SOMEDAY");
    }

    #[test]
    fn test_planning_lines() {
        let doc = parse("- TODO call\n  SCHEDULED: <2024-03-05 Tue>\n");
        assert_eq!(doc.blocks[0].planning, vec!["SCHEDULED: <2024-03-05 Tue>"]);
        assert_eq!(doc.blocks[0].content[0].text, "call");
    }

    #[test]
    fn test_code_fence_is_atomic() {
        let text = "- Example\n  ```rust\n  fn main() {\n  - not a bullet\n  }\n  ```\n- next\n";
        let doc = parse(text);
        assert_eq!(doc.blocks.len(), 2);
        let spans = &doc.blocks[0].content;
        assert_eq!(spans[0].kind, ContentKind::Text);
        assert_eq!(spans[1].kind, ContentKind::Code { lang: Some("rust".to_string()) });
        assert_eq!(spans[1].text, "fn main() {\n- not a bullet\n}");
    }

    #[test]
    fn test_table_and_quote_spans() {
        let doc = parse("- data\n  | a | b |\n  |---|---|\n  | 1 | 2 |\n  > quoted\n  > more\n");
        let spans = &doc.blocks[0].content;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].kind, ContentKind::Table);
        assert_eq!(spans[1].text, "| a | b |\n|---|---|\n| 1 | 2 |");
        assert_eq!(spans[2].kind, ContentKind::Quote);
        assert_eq!(spans[2].text, "> quoted\n> more");
    }

    #[test]
    fn test_page_properties_and_frontmatter() {
        let text = "---\ntitle: Renamed\n---\ntags:: rust, [[Org Mode]]\nalias:: rn\n- body\n";
        let outcome = parse_document("file-name", DocumentKind::Page, text, &[]).unwrap();
        let doc = outcome.document;
        assert_eq!(doc.name, "Renamed");
        assert!(doc.tags.contains("rust"));
        assert!(doc.tags.contains("Org Mode"));
        assert_eq!(doc.aliases, vec!["rn".to_string()]);
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].line, 6);
    }

    #[test]
    fn test_invalid_frontmatter_is_a_warning() {
        let text = "---\ntitle: [oops\n---\n- body\n";
        let outcome = parse_document("x", DocumentKind::Page, text, &[]).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.document.blocks.len(), 1);
    }

    #[test]
    fn test_preamble_becomes_root_block() {
        let doc = parse("Some intro text\n- bullet\n");
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].title(), "Some intro text");
    }

    #[test]
    fn test_multiline_block_text() {
        let doc = parse("- first line\n  second line\n\t- child\n");
        assert_eq!(doc.blocks[0].content[0].text, "first line\nsecond line");
        assert_eq!(doc.blocks[0].children.len(), 1);
    }
}
