//! Migration summary and per-note issues

use serde::Serialize;

use crate::error::ConvertError;

/// Category of a recorded issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MalformedOutline,
    UnresolvableReference,
    InvalidJournalDate,
    /// Frontmatter that could not be parsed and was ignored
    Frontmatter,
    /// Two notes claim the same page name
    DuplicatePage,
    /// An alias already names another page
    AliasConflict,
    /// A block identifier declared in more than one note
    BlockIdCollision,
    /// Two notes map to the same output file
    PathCollision,
}

/// A problem met while migrating one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Logical name of the note the issue belongs to
    pub source: String,
    pub kind: IssueKind,
    pub detail: String,
}

impl Issue {
    pub fn new(source: &str, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn from_error(source: &str, error: &ConvertError) -> Self {
        let kind = match error {
            ConvertError::MalformedOutline { .. } => IssueKind::MalformedOutline,
            ConvertError::UnresolvableReference { .. } => IssueKind::UnresolvableReference,
            ConvertError::InvalidJournalDate { .. } => IssueKind::InvalidJournalDate,
        };
        Self::new(source, kind, error.to_string())
    }
}

/// Counts and issues of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub pages_converted: usize,
    pub journals_converted: usize,
    pub placeholders_created: usize,
    pub references_resolved: usize,
    pub issues: Vec<Issue>,
}

impl MigrationSummary {
    /// Record an issue and log it
    pub fn record(&mut self, issue: Issue) {
        log::warn!("{}: {}", issue.source, issue.detail);
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.record(issue);
        }
    }

    /// Number of issues of one kind
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Human readable report
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("Migration complete\n");
        out.push_str(&format!("  Pages converted:      {}\n", self.pages_converted));
        out.push_str(&format!("  Journals converted:   {}\n", self.journals_converted));
        out.push_str(&format!("  Placeholders created: {}\n", self.placeholders_created));
        out.push_str(&format!("  References resolved:  {}\n", self.references_resolved));

        if self.issues.is_empty() {
            out.push_str("  Issues:               none\n");
        } else {
            out.push_str(&format!("  Issues:               {}\n", self.issues.len()));
            for issue in &self.issues {
                out.push_str(&format!("    - {}: {}\n", issue.source, issue.detail));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_from_error() {
        let err = ConvertError::InvalidJournalDate { name: "2024_13_40".to_string() };
        let issue = Issue::from_error("2024_13_40", &err);
        assert_eq!(issue.kind, IssueKind::InvalidJournalDate);
        assert!(issue.detail.contains("2024_13_40"));
    }

    #[test]
    fn test_report_lists_issues() {
        let mut summary = MigrationSummary {
            pages_converted: 2,
            ..Default::default()
        };
        summary.record(Issue::new("a", IssueKind::DuplicatePage, "skipped"));
        let report = summary.render_report();
        assert!(report.contains("Pages converted:      2"));
        assert!(report.contains("- a: skipped"));
        assert_eq!(summary.count(IssueKind::DuplicatePage), 1);
    }

    #[test]
    fn test_summary_serializes_kebab_case_kinds() {
        let mut summary = MigrationSummary::default();
        summary.record(Issue::new("x", IssueKind::BlockIdCollision, "dup"));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"block-id-collision\""));
        assert!(json.contains("\"placeholders_created\":0"));
    }
}
