//! Frontmatter and property parsing
//!
//! A note may open with a `---` delimited YAML block and with Logseq
//! page properties (`key:: value` lines before the first bullet). Both end up
//! in one string-to-string mapping on the document.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants as C;

/// Property line: `key:: value` (the value may be empty)
static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_\-]*)::(?:[ \t]+(.*?))?[ \t]*$")
        .expect("property pattern is valid")
});

/// Split a leading `---` delimited block from the rest of the note
///
/// Returns `(Some(yaml), body)` when the note opens with a closed
/// frontmatter block, `(None, content)` otherwise.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let first_line_end = match content.find('\n') {
        Some(pos) => pos,
        None => return (None, content),
    };
    if content[..first_line_end].trim_end() != "---" {
        return (None, content);
    }

    let yaml_start = first_line_end + 1;
    let mut offset = yaml_start;
    for line in content[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, content)
}

/// Parse YAML frontmatter into a flat string mapping
///
/// Scalars are stringified, sequences joined with `, `, nested mappings
/// serialized back to YAML. Keys are lowercased.
pub fn parse_frontmatter(yaml: &str) -> Result<BTreeMap<String, String>, String> {
    if yaml.len() > C::MAX_FRONTMATTER_SIZE {
        return Err(format!(
            "frontmatter exceeds {} bytes",
            C::MAX_FRONTMATTER_SIZE
        ));
    }
    if yaml.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| format!("Invalid YAML: {}", e))?;

    let mut properties = BTreeMap::new();
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let key = to_yaml_string(&key).to_lowercase();
                properties.insert(key, to_yaml_string(&value));
            }
            Ok(properties)
        }
        serde_yaml::Value::Null => Ok(properties),
        _ => Err("frontmatter is not a mapping".to_string()),
    }
}

/// Parse a `key:: value` property line
///
/// Keys are lowercased; `None` for anything that is not a property line
/// (`std::vec` is text, not a property).
pub fn parse_property_line(line: &str) -> Option<(String, String)> {
    let caps = PROPERTY_RE.captures(line.trim())?;
    let key = caps.get(1)?.as_str().to_lowercase();
    let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    Some((key, value.to_string()))
}

/// Split a list-valued property (`tags`, `alias`) into clean names
///
/// Accepts `a, b`, `[[a b]], #c` and the `[a, b]` rendering of YAML
/// sequences.
pub fn split_list(value: &str) -> Vec<String> {
    let value = value.trim();
    let value = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .filter(|v| !v.starts_with('['))
        .unwrap_or(value);

    value
        .split(',')
        .map(|item| {
            item.trim()
                .trim_start_matches('#')
                .trim_start_matches("[[")
                .trim_end_matches("]]")
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Whether the page property holds a list of names (`tags`, `alias`)
pub fn is_list_property(key: &str) -> bool {
    key == C::TAGS_PROPERTY || key == C::ALIAS_PROPERTY
}

/// Convert YAML value to string representation
fn to_yaml_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Sequence(seq) => {
            let items: Vec<String> = seq.iter().map(to_yaml_string).collect();
            items.join(", ")
        }
        serde_yaml::Value::Mapping(_) => serde_yaml::to_string(value)
            .unwrap_or_default()
            .trim()
            .to_string(),
        serde_yaml::Value::Tagged(tagged) => to_yaml_string(&tagged.value),
    }
}
