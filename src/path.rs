//! Output identities
//!
//! Maps a logical note name to the file it is written to:
//! - pages: `pages/<stem>.org`, namespace `/` joined with `___`
//! - journals: `journals/<yyyy-mm-dd>.org`, from a `yyyy_mm_dd` name

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};

use crate::constants as C;
use crate::error::{ConvertError, ConvertResult};
use crate::outline::DocumentKind;

/// Where and under which title a note is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputIdentity {
    pub kind: DocumentKind,
    /// File name without extension
    pub stem: String,
    /// Title written to the file header
    pub title: String,
    /// Path relative to the output directory
    pub path: PathBuf,
}

/// Output identity of a note
pub fn output_identity(name: &str, kind: DocumentKind) -> ConvertResult<OutputIdentity> {
    match kind {
        DocumentKind::Page => Ok(page_identity(name)),
        DocumentKind::Journal => journal_identity(name),
    }
}

/// Output identity of a page; never fails
pub fn page_identity(name: &str) -> OutputIdentity {
    let stem = file_stem(name);
    OutputIdentity {
        kind: DocumentKind::Page,
        path: PathBuf::from(C::PAGES_SUBDIR).join(format!("{}{}", stem, C::ORG_EXTENSION)),
        title: name.trim().to_string(),
        stem,
    }
}

/// Output identity of a journal
pub fn journal_identity(name: &str) -> ConvertResult<OutputIdentity> {
    let date = journal_date(name)?;
    let stem = date.format(C::JOURNAL_OUTPUT_FORMAT).to_string();
    Ok(OutputIdentity {
        kind: DocumentKind::Journal,
        path: PathBuf::from(C::JOURNALS_SUBDIR).join(format!("{}{}", stem, C::ORG_EXTENSION)),
        title: stem.clone(),
        stem,
    })
}

/// Parse a `yyyy_mm_dd` journal name
pub fn journal_date(name: &str) -> ConvertResult<NaiveDate> {
    NaiveDate::parse_from_str(name.trim(), C::JOURNAL_INPUT_FORMAT).map_err(|_| {
        ConvertError::InvalidJournalDate {
            name: name.to_string(),
        }
    })
}

/// Names a journal is referred to by: `2024-03-05` and `Mar 5th, 2024`
pub fn journal_titles(date: NaiveDate) -> Vec<String> {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    vec![
        date.format(C::JOURNAL_OUTPUT_FORMAT).to_string(),
        format!("{} {}{}, {}", date.format("%b"), day, suffix, date.year()),
    ]
}

/// File stem of a page name
///
/// Namespace separators become `___`; characters that are unsafe in file
/// names are dropped. A name with nothing usable left maps to `untitled`.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .split(C::NAMESPACE_SEPARATOR)
        .map(|segment| {
            segment
                .chars()
                .filter(|c| !C::FORBIDDEN_FILENAME_CHARS.contains(c) && !c.is_control())
                .collect::<String>()
                .trim()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(C::NAMESPACE_JOINER);

    let stem = stem.trim_matches('.');
    if stem.is_empty() || stem.chars().all(|c| c == '_') {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_stem() {
        let identity = output_identity("proj/design", DocumentKind::Page).unwrap();
        assert_eq!(identity.stem, "proj___design");
        assert_eq!(identity.path, PathBuf::from("pages/proj___design.org"));
        assert_eq!(identity.title, "proj/design");
    }

    #[test]
    fn test_forbidden_characters_dropped() {
        assert_eq!(file_stem("what? <now>"), "what now");
        assert_eq!(file_stem("a: b"), "a b");
        assert_eq!(file_stem("???"), "untitled");
        assert_eq!(file_stem(".."), "untitled");
    }

    #[test]
    fn test_journal_identity() {
        let identity = output_identity("2024_03_05", DocumentKind::Journal).unwrap();
        assert_eq!(identity.stem, "2024-03-05");
        assert_eq!(identity.path, PathBuf::from("journals/2024-03-05.org"));
        assert_eq!(identity.title, "2024-03-05");
    }

    #[test]
    fn test_invalid_journal_date() {
        assert_eq!(
            output_identity("2024_13_40", DocumentKind::Journal),
            Err(ConvertError::InvalidJournalDate { name: "2024_13_40".to_string() })
        );
        assert!(journal_date("notes").is_err());
    }

    #[test]
    fn test_journal_titles() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(journal_titles(date), vec!["2024-03-05", "Mar 5th, 2024"]);
        let date = NaiveDate::from_ymd_opt(2024, 1, 22).unwrap();
        assert_eq!(journal_titles(date)[1], "Jan 22nd, 2024");
        let date = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        assert_eq!(journal_titles(date)[1], "Jan 11th, 2024");
    }
}
