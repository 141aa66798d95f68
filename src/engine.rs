//! MigrationEngine - two-pass conversion of a whole corpus
//!
//! Pass 1 parses every note and builds the reference index. Pass 2 converts
//! each document against the finished index, then materializes the
//! placeholder pages the index accumulated. The engine performs no I/O: it
//! takes [`SourceNote`]s and returns [`OutputFile`]s.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::MigrateConfig;
use crate::constants as C;
use crate::convert::{self, AssetResolver, StructuralConverter};
use crate::index::ReferenceIndex;
use crate::outline::{self, Document, DocumentKind};
use crate::path;
use crate::resolve::TargetKind;
use crate::summary::{Issue, IssueKind, MigrationSummary};
use crate::util;

/// One input note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNote {
    /// Logical name, namespace segments separated by `/`
    pub name: String,
    pub kind: DocumentKind,
    pub text: String,
}

impl SourceNote {
    pub fn new(name: &str, kind: DocumentKind, text: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            text: text.to_string(),
        }
    }
}

/// One file to write, path relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub text: String,
}

/// Everything a run produces
#[derive(Debug, Clone, Default)]
pub struct MigrationOutput {
    pub files: Vec<OutputFile>,
    pub summary: MigrationSummary,
}

// === MigrationEngine ===

/// Converts a corpus of notes in two passes
pub struct MigrationEngine<'a> {
    config: &'a MigrateConfig,
    assets: &'a dyn AssetResolver,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(config: &'a MigrateConfig, assets: &'a dyn AssetResolver) -> Self {
        Self { config, assets }
    }

    /// Migrate every note
    ///
    /// Never fails as a whole: a note that cannot be converted is recorded
    /// in the summary and skipped.
    pub fn run(&self, mut notes: Vec<SourceNote>) -> MigrationOutput {
        let mut summary = MigrationSummary::default();

        // === Pass 1: parse and index ===

        notes.sort_by(|a, b| a.name.cmp(&b.name));
        let mut documents: Vec<Document> = notes
            .into_iter()
            .filter_map(|note| self.parse_note(note, &mut summary))
            .collect();
        documents.sort_by(|a, b| a.name.cmp(&b.name));

        let (index, issues) = ReferenceIndex::build(&mut documents, self.config);
        summary.extend(issues);
        log::info!(
            "indexed {} documents, {} placeholder targets",
            documents.len(),
            index.placeholders().count()
        );

        // === Pass 2: convert ===

        let converter = StructuralConverter::new(&index, self.config, self.assets);
        let mut used_paths = HashSet::new();
        let mut files = Vec::with_capacity(documents.len());

        for doc in &documents {
            let page_id = match index.page_id(&doc.name) {
                Some(id) => id.clone(),
                None => continue,
            };
            let identity = match path::output_identity(&doc.name, doc.kind) {
                Ok(identity) => identity,
                Err(e) => {
                    summary.record(Issue::from_error(&doc.name, &e));
                    path::page_identity(&doc.name)
                }
            };

            let converted = converter.convert(doc, &page_id, &identity.title);
            summary.references_resolved += converted.references_resolved;
            summary.extend(converted.issues);

            let path = claim_path(&mut used_paths, identity.path, &doc.name, &mut summary);
            log::debug!("{} -> {}", doc.name, util::display_path(&path));
            match identity.kind {
                DocumentKind::Page => summary.pages_converted += 1,
                DocumentKind::Journal => summary.journals_converted += 1,
            }
            files.push(OutputFile {
                path,
                text: converted.text,
            });
        }

        for (id, record) in index.placeholders() {
            let identity = match record.kind {
                TargetKind::Page => path::page_identity(&record.display),
                TargetKind::Block => path::page_identity(&format!(
                    "missing-block{}{}",
                    C::NAMESPACE_SEPARATOR,
                    record.key
                )),
            };
            let title = convert::placeholder_title(record);
            let path = claim_path(&mut used_paths, identity.path, &title, &mut summary);
            log::debug!("placeholder {} -> {}", title, util::display_path(&path));
            files.push(OutputFile {
                path,
                text: converter.placeholder(id, record),
            });
            summary.placeholders_created += 1;
        }

        log::info!(
            "converted {} pages, {} journals, {} placeholders",
            summary.pages_converted,
            summary.journals_converted,
            summary.placeholders_created
        );
        MigrationOutput { files, summary }
    }

    /// Parse one note; `None` when it has to be skipped
    fn parse_note(&self, note: SourceNote, summary: &mut MigrationSummary) -> Option<Document> {
        let mut kind = note.kind;
        if kind == DocumentKind::Journal {
            if let Err(e) = path::journal_date(&note.name) {
                summary.record(Issue::from_error(&note.name, &e));
                kind = DocumentKind::Page;
            }
        }

        match outline::parse_document(&note.name, kind, &note.text, &self.config.extra_task_keywords) {
            Ok(outcome) => {
                for warning in outcome.warnings {
                    summary.record(Issue::new(&note.name, IssueKind::Frontmatter, warning));
                }
                Some(outcome.document)
            }
            Err(e) => {
                summary.record(Issue::from_error(&note.name, &e));
                None
            }
        }
    }
}

/// Reserve an output path, suffixing `-N` when it is taken
///
/// Paths compare case-insensitively so the output survives case-folding
/// file systems.
fn claim_path(
    used: &mut HashSet<String>,
    path: PathBuf,
    source: &str,
    summary: &mut MigrationSummary,
) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut candidate = path.clone();
    let mut attempt = 1;
    while !used.insert(util::display_path(&candidate).to_lowercase()) {
        candidate = path.with_file_name(format!("{}-{}{}", stem, attempt, C::ORG_EXTENSION));
        attempt += 1;
    }
    if candidate != path {
        summary.record(Issue::new(
            source,
            IssueKind::PathCollision,
            format!(
                "{} is already taken, written to {}",
                util::display_path(&path),
                util::display_path(&candidate)
            ),
        ));
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::NoAssets;

    fn run(notes: Vec<SourceNote>) -> MigrationOutput {
        let config = MigrateConfig::default();
        MigrationEngine::new(&config, &NoAssets).run(notes)
    }

    fn file<'o>(output: &'o MigrationOutput, path: &str) -> &'o OutputFile {
        output
            .files
            .iter()
            .find(|f| f.path == PathBuf::from(path))
            .unwrap_or_else(|| panic!("no output file {}", path))
    }

    #[test]
    fn test_counts_and_paths() {
        let output = run(vec![
            SourceNote::new("proj/design", DocumentKind::Page, "- see [[Missing]]\n"),
            SourceNote::new("2024_03_05", DocumentKind::Journal, "- entry\n"),
        ]);
        assert_eq!(output.summary.pages_converted, 1);
        assert_eq!(output.summary.journals_converted, 1);
        assert_eq!(output.summary.placeholders_created, 1);
        assert_eq!(output.summary.references_resolved, 1);
        assert!(output.summary.issues.is_empty());

        file(&output, "pages/proj___design.org");
        let journal = file(&output, "journals/2024-03-05.org");
        assert!(journal.text.contains("#+TITLE: 2024-03-05\n"));
        let stub = file(&output, "pages/Missing.org");
        assert!(stub.text.contains("#+FILETAGS: :stub:"));
    }

    #[test]
    fn test_invalid_journal_falls_back_to_page() {
        let output = run(vec![SourceNote::new("not_a_date", DocumentKind::Journal, "- x\n")]);
        assert_eq!(output.summary.pages_converted, 1);
        assert_eq!(output.summary.count(IssueKind::InvalidJournalDate), 1);
        file(&output, "pages/not_a_date.org");
    }

    #[test]
    fn test_malformed_note_is_skipped() {
        let output = run(vec![
            SourceNote::new("bad", DocumentKind::Page, "- a\n\t\t- b\n"),
            SourceNote::new("good", DocumentKind::Page, "- links [[bad]]\n"),
        ]);
        assert_eq!(output.summary.pages_converted, 1);
        assert_eq!(output.summary.count(IssueKind::MalformedOutline), 1);
        // The skipped note is still a link target
        assert_eq!(output.summary.placeholders_created, 1);
        file(&output, "pages/bad.org");
    }

    #[test]
    fn test_path_collision_gets_suffix() {
        let output = run(vec![
            SourceNote::new("a?b", DocumentKind::Page, "- one\n"),
            SourceNote::new("ab", DocumentKind::Page, "- two\n"),
        ]);
        assert_eq!(output.files.len(), 2);
        file(&output, "pages/ab.org");
        file(&output, "pages/ab-1.org");
        assert_eq!(output.summary.count(IssueKind::PathCollision), 1);
    }

    #[test]
    fn test_missing_block_placeholder() {
        let output = run(vec![SourceNote::new("p", DocumentKind::Page, "- see ((nowhere))\n")]);
        let stub = file(&output, "pages/missing-block___nowhere.org");
        assert!(stub.text.contains("#+TITLE: Missing block nowhere\n"));
        assert_eq!(output.summary.placeholders_created, 1);
    }
}
