//! Reference index
//!
//! Maps every page name, alias and block identifier seen in the corpus to a
//! stable identifier. Built in one pass over all documents before any output
//! is written, so forward references resolve to the same identifier their
//! target is eventually written with.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::config::{IdStrategy, MigrateConfig};
use crate::frontmatter;
use crate::outline::{Document, DocumentKind};
use crate::path;
use crate::resolve::{self, TargetKind};
use crate::summary::{Issue, IssueKind};
use crate::util;

/// Globally unique identifier of a page or block in the output corpus
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StableId(String);

impl StableId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the index knows about one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRecord {
    pub kind: TargetKind,
    /// No input note backs this target; a placeholder page is written
    pub placeholder: bool,
    /// Name of the note declaring the target
    pub owner: Option<String>,
    /// Page display name, or excerpt of the block text
    pub display: String,
    /// Page key or block token the identifier was allocated for
    pub key: String,
}

/// Normalized lookup key of a page name
///
/// Case-insensitive like Logseq: `Rust` and `rust` are one page.
pub fn page_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Index of every addressable target
#[derive(Debug)]
pub struct ReferenceIndex {
    strategy: IdStrategy,
    pages: HashMap<String, StableId>,
    /// (owner page key, token) to id; undeclared tokens use an empty owner
    blocks: HashMap<(String, String), StableId>,
    /// Token to owner page keys, in declaration order
    declarations: HashMap<String, Vec<String>>,
    records: HashMap<StableId, IdRecord>,
    /// Allocation order, for deterministic placeholder output
    order: Vec<StableId>,
}

impl ReferenceIndex {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            pages: HashMap::new(),
            blocks: HashMap::new(),
            declarations: HashMap::new(),
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Identifier of a page, allocating a placeholder the first time
    ///
    /// Idempotent: repeated calls for the same name (in any case) return the
    /// same identifier.
    pub fn ensure_page(&mut self, name: &str) -> StableId {
        let key = page_key(name);
        if let Some(id) = self.pages.get(&key) {
            return id.clone();
        }
        let id = self.allocate(
            &format!("page:{}", key),
            IdRecord {
                kind: TargetKind::Page,
                placeholder: true,
                owner: None,
                display: name.trim().to_string(),
                key: key.clone(),
            },
        );
        self.pages.insert(key, id.clone());
        id
    }

    /// Register a page backed by an input note
    ///
    /// A placeholder allocated earlier under the same name is taken over.
    /// Fails with the display name of the existing note when another note
    /// already claims the name.
    pub fn register_document(&mut self, name: &str) -> Result<StableId, String> {
        let id = self.ensure_page(name);
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| name.to_string())?;
        if !record.placeholder {
            return Err(record.display.clone());
        }
        record.placeholder = false;
        record.owner = Some(name.trim().to_string());
        record.display = name.trim().to_string();
        Ok(id)
    }

    /// Make `alias` another name of the page `id`
    ///
    /// Returns false when the alias already names a different page; the
    /// existing mapping is kept.
    pub fn register_alias(&mut self, alias: &str, id: &StableId) -> bool {
        let key = page_key(alias);
        if key.is_empty() {
            return true;
        }
        match self.pages.get(&key) {
            Some(existing) => existing == id,
            None => {
                self.pages.insert(key, id.clone());
                true
            }
        }
    }

    /// Identifier of a block token
    ///
    /// With an owner the block is declared by that note. Without one the
    /// token is being referenced: the first declaration wins, and a
    /// placeholder is allocated when nothing declares it. Idempotent.
    pub fn ensure_block(&mut self, local_id: &str, owner: Option<&str>, display: &str) -> StableId {
        let token = local_id.trim();
        match owner {
            Some(owner) => {
                let owner_key = page_key(owner);
                let slot = (owner_key.clone(), token.to_string());
                if let Some(id) = self.blocks.get(&slot) {
                    return id.clone();
                }
                let display = if display.trim().is_empty() { token } else { display };
                let id = self.allocate(
                    &format!("block:{}:{}", owner_key, token),
                    IdRecord {
                        kind: TargetKind::Block,
                        placeholder: false,
                        owner: Some(owner.trim().to_string()),
                        display: display.to_string(),
                        key: token.to_string(),
                    },
                );
                self.blocks.insert(slot, id.clone());
                self.declarations
                    .entry(token.to_string())
                    .or_default()
                    .push(owner_key);
                id
            }
            None => {
                if let Some(id) = self.first_declaration(token) {
                    return id.clone();
                }
                let slot = (String::new(), token.to_string());
                if let Some(id) = self.blocks.get(&slot) {
                    return id.clone();
                }
                let id = self.allocate(
                    &format!("block::{}", token),
                    IdRecord {
                        kind: TargetKind::Block,
                        placeholder: true,
                        owner: None,
                        display: token.to_string(),
                        key: token.to_string(),
                    },
                );
                self.blocks.insert(slot, id.clone());
                id
            }
        }
    }

    pub fn page_id(&self, name: &str) -> Option<&StableId> {
        self.pages.get(&page_key(name))
    }

    /// Identifier a block reference made from `context` resolves to
    ///
    /// A declaration in the referencing note wins over declarations
    /// elsewhere.
    pub fn block_id(&self, token: &str, context: &str) -> Option<&StableId> {
        let token = token.trim();
        self.blocks
            .get(&(page_key(context), token.to_string()))
            .or_else(|| self.first_declaration(token))
            .or_else(|| self.blocks.get(&(String::new(), token.to_string())))
    }

    /// Identifier of a block declared by `owner`
    pub fn declared_block_id(&self, token: &str, owner: &str) -> Option<&StableId> {
        self.blocks.get(&(page_key(owner), token.trim().to_string()))
    }

    pub fn record(&self, id: &StableId) -> Option<&IdRecord> {
        self.records.get(id)
    }

    /// Placeholder targets in allocation order
    pub fn placeholders(&self) -> impl Iterator<Item = (&StableId, &IdRecord)> {
        self.order.iter().filter_map(move |id| {
            self.records
                .get(id)
                .filter(|record| record.placeholder)
                .map(|record| (id, record))
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index a whole corpus
    ///
    /// Documents must be in a deterministic order. Notes whose name is
    /// already taken are removed from `documents`. Blocks some reference
    /// points at get `is_ref_target` set.
    pub fn build(documents: &mut Vec<Document>, config: &MigrateConfig) -> (Self, Vec<Issue>) {
        let mut index = Self::new(config.id_strategy);
        let mut issues = Vec::new();

        // Pages backed by notes
        let mut kept = Vec::with_capacity(documents.len());
        for doc in documents.drain(..) {
            match index.register_document(&doc.name) {
                Ok(_) => kept.push(doc),
                Err(existing) => issues.push(Issue::new(
                    &doc.name,
                    IssueKind::DuplicatePage,
                    format!("page name already used by '{}'; note skipped", existing),
                )),
            }
        }
        *documents = kept;

        // Aliases, including the date names of journals
        for doc in documents.iter() {
            let id = match index.page_id(&doc.name) {
                Some(id) => id.clone(),
                None => continue,
            };
            let mut aliases = doc.aliases.clone();
            if doc.kind == DocumentKind::Journal {
                if let Ok(date) = path::journal_date(&doc.name) {
                    aliases.extend(path::journal_titles(date));
                }
            }
            for alias in aliases {
                if !index.register_alias(&alias, &id) {
                    issues.push(Issue::new(
                        &doc.name,
                        IssueKind::AliasConflict,
                        format!("alias '{}' already names another page", alias),
                    ));
                }
            }
        }

        // Declared blocks
        for doc in documents.iter() {
            doc.walk_blocks(&mut |block| {
                if let Some(token) = &block.local_id {
                    let owner = page_key(&doc.name);
                    let owners = index.declarations.get(token.trim());
                    let here = owners.map_or(false, |owners| owners.contains(&owner));
                    let elsewhere = owners.map_or(false, |owners| owners.iter().any(|o| *o != owner));
                    let detail = if here {
                        Some(format!(
                            "block id '{}' is declared twice in this note; line {} loses it",
                            token, block.line
                        ))
                    } else if elsewhere {
                        Some(format!("block id '{}' is also declared in another note", token))
                    } else {
                        None
                    };
                    if let Some(detail) = detail {
                        issues.push(Issue::new(&doc.name, IssueKind::BlockIdCollision, detail));
                    }
                    let display = resolve::excerpt(block.title(), config.excerpt_len);
                    index.ensure_block(token, Some(&doc.name), &display);
                }
            });
        }

        // References: unknown pages and blocks become placeholders
        let mut targeted: HashSet<StableId> = HashSet::new();
        for doc in documents.iter() {
            let mut visit = |text: &str| {
                for reference in resolve::scan_references(text) {
                    let target = match reference.target_name() {
                        Ok(target) => target.to_string(),
                        Err(_) => continue,
                    };
                    match reference.target_kind {
                        TargetKind::Page => {
                            index.ensure_page(&target);
                        }
                        TargetKind::Block => {
                            let id = match index.block_id(&target, &doc.name) {
                                Some(id) => id.clone(),
                                None => index.ensure_block(&target, None, ""),
                            };
                            targeted.insert(id);
                        }
                    }
                }
            };

            for (key, value) in &doc.frontmatter {
                if !is_page_level_key(key) {
                    visit(value);
                }
            }
            doc.walk_blocks(&mut |block| {
                for span in &block.content {
                    for line in resolve::span_lines(span) {
                        if !line.verbatim {
                            visit(line.text);
                        }
                    }
                }
                for value in block.properties.values() {
                    visit(value);
                }
            });
        }

        // Only the first declaration of a token in a note is a target
        for doc in documents.iter_mut() {
            let owner = doc.name.clone();
            let index = &index;
            let mut seen: HashSet<String> = HashSet::new();
            doc.walk_blocks_mut(&mut |block| {
                if let Some(token) = &block.local_id {
                    if !seen.insert(token.trim().to_string()) {
                        return;
                    }
                    if let Some(id) = index.declared_block_id(token, &owner) {
                        block.is_ref_target = targeted.contains(id);
                    }
                }
            });
        }

        log::debug!(
            "indexed {} identifiers, {} placeholders",
            index.len(),
            index.placeholders().count()
        );
        (index, issues)
    }

    fn first_declaration(&self, token: &str) -> Option<&StableId> {
        let owner = self.declarations.get(token)?.first()?;
        self.blocks.get(&(owner.clone(), token.to_string()))
    }

    fn allocate(&mut self, seed: &str, record: IdRecord) -> StableId {
        let mut id = self.generate(seed);
        let mut attempt = 0;
        while self.records.contains_key(&id) {
            attempt += 1;
            id = self.generate(&format!("{}#{}", seed, attempt));
        }
        self.records.insert(id.clone(), record);
        self.order.push(id.clone());
        id
    }

    fn generate(&self, seed: &str) -> StableId {
        let uuid = match self.strategy {
            IdStrategy::Random => Uuid::new_v4(),
            IdStrategy::Hashed => uuid::Builder::from_random_bytes(util::digest16(seed)).into_uuid(),
        };
        StableId(uuid.to_string())
    }
}

/// Page properties carried into the file header rather than rendered as text
pub fn is_page_level_key(key: &str) -> bool {
    frontmatter::is_list_property(key) || key == crate::constants::TITLE_PROPERTY
}
