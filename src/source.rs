//! Graph directory access: note discovery, assets and output writing

use std::fs;
use std::io;
use std::path::Path;

use crate::constants as C;
use crate::convert::AssetResolver;
use crate::engine::{OutputFile, SourceNote};
use crate::outline::DocumentKind;
use crate::util;

/// Read every note of a Logseq graph
///
/// Pages come from `pages/*.md`, journals from `journals/*.md`. Missing
/// subdirectories are treated as empty; hidden files are ignored.
pub fn discover(input_dir: &Path) -> io::Result<Vec<SourceNote>> {
    if !input_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Graph directory not found: {}", util::display_path(input_dir)),
        ));
    }

    let mut notes = Vec::new();
    for (subdir, kind) in [
        (C::PAGES_SUBDIR, DocumentKind::Page),
        (C::JOURNALS_SUBDIR, DocumentKind::Journal),
    ] {
        let dir = input_dir.join(subdir);
        if !dir.is_dir() {
            log::debug!("no {} directory in graph", subdir);
            continue;
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !path.is_file() || file_name.starts_with('.') {
                continue;
            }
            let stem = match file_name.strip_suffix(C::MARKDOWN_EXTENSION) {
                Some(stem) => stem,
                None => continue,
            };
            let text = fs::read_to_string(&path)?;
            notes.push(SourceNote {
                name: decode_file_stem(stem),
                kind,
                text,
            });
        }
    }

    notes.sort_by(|a, b| a.name.cmp(&b.name));
    log::info!("discovered {} notes in {}", notes.len(), util::display_path(input_dir));
    Ok(notes)
}

/// Logical page name of a Logseq file stem
///
/// `___` and `%2F` stand for the namespace separator; other `%XX`
/// escapes are decoded.
pub fn decode_file_stem(stem: &str) -> String {
    let stem = stem.replace(C::NAMESPACE_JOINER, C::NAMESPACE_SEPARATOR);
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(value);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Assets kept in the graph's `assets/` directory
///
/// Links into `assets/` are rewritten relative to the output note
/// directories, which sit one level below the output root.
pub struct AssetDir;

impl AssetResolver for AssetDir {
    fn asset_path(&self, original: &str) -> Option<String> {
        let mut rest = original.trim();
        loop {
            if let Some(stripped) = rest.strip_prefix("../") {
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("./") {
                rest = stripped;
            } else {
                break;
            }
        }
        let file = rest.strip_prefix(C::ASSETS_SUBDIR)?.strip_prefix('/')?;
        if file.is_empty() {
            return None;
        }
        Some(format!("../{}/{}", C::ASSETS_SUBDIR, file))
    }
}

/// Copy the graph's `assets/` directory into the output root
///
/// Returns the number of files copied; a graph without assets copies
/// nothing.
pub fn copy_assets(input_dir: &Path, output_dir: &Path) -> io::Result<usize> {
    let source = input_dir.join(C::ASSETS_SUBDIR);
    if !source.is_dir() {
        return Ok(0);
    }
    copy_dir(&source, &output_dir.join(C::ASSETS_SUBDIR))
}

fn copy_dir(from: &Path, to: &Path) -> io::Result<usize> {
    fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let path = entry.path();
        let target = to.join(entry.file_name());
        if path.is_dir() {
            copied += copy_dir(&path, &target)?;
        } else {
            fs::copy(&path, &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Write output files below `output_dir`
///
/// Every path goes through [`util::secure_path`], so no file lands outside
/// the output directory.
pub fn write_outputs(output_dir: &Path, files: &[OutputFile]) -> io::Result<usize> {
    fs::create_dir_all(output_dir)?;
    for file in files {
        let target = util::secure_path(output_dir, &util::display_path(&file.path))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.text)?;
    }
    Ok(files.len())
}
