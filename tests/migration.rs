use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use logseq_roam::{
    source, DocumentKind, HeadingPolicy, IdStrategy, MigrateConfig, MigrationEngine,
    MigrationOutput, NoAssets, SourceNote,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::TempDir;

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[id:([^\]]+)\]").unwrap());
static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^:ID: (\S+)$").unwrap());

fn run_with(config: &MigrateConfig, notes: Vec<SourceNote>) -> MigrationOutput {
    MigrationEngine::new(config, &NoAssets).run(notes)
}

fn run(notes: Vec<SourceNote>) -> MigrationOutput {
    run_with(&MigrateConfig::default(), notes)
}

fn page(name: &str, text: &str) -> SourceNote {
    SourceNote::new(name, DocumentKind::Page, text)
}

fn text_of<'o>(output: &'o MigrationOutput, path: &str) -> &'o str {
    output
        .files
        .iter()
        .find(|f| f.path == PathBuf::from(path))
        .map(|f| f.text.as_str())
        .unwrap_or_else(|| panic!("no output file {}", path))
}

fn id_of(text: &str) -> String {
    ID_RE.captures(text).unwrap()[1].to_string()
}

fn assert_no_dangling_links(output: &MigrationOutput) {
    let ids: HashSet<String> = output
        .files
        .iter()
        .flat_map(|f| ID_RE.captures_iter(&f.text).map(|c| c[1].to_string()).collect::<Vec<_>>())
        .collect();
    for file in &output.files {
        for link in LINK_RE.captures_iter(&file.text) {
            assert!(ids.contains(&link[1]), "dangling link {} in {:?}", &link[1], file.path);
        }
    }
}

#[test]
fn test_aliased_link_to_missing_page() {
    let output = run(vec![page("A", "- see [[B|Beta]]\n")]);
    let stub = text_of(&output, "pages/B.org");
    assert!(stub.contains("#+TITLE: B\n"));
    assert!(stub.contains("#+FILETAGS: :stub:"));

    let a = text_of(&output, "pages/A.org");
    assert!(a.contains(&format!("[[id:{}][Beta]]", id_of(stub))));
    assert_eq!(output.summary.placeholders_created, 1);
    assert!(output.summary.issues.is_empty());
}

#[test]
fn test_journal_and_namespace_identities() {
    let output = run(vec![
        SourceNote::new("2024_03_05", DocumentKind::Journal, "- standup\n"),
        page("proj/design", "- draft\n"),
    ]);
    let journal = text_of(&output, "journals/2024-03-05.org");
    assert!(journal.contains("#+TITLE: 2024-03-05"));
    let design = text_of(&output, "pages/proj___design.org");
    assert!(design.contains("#+TITLE: proj/design"));
}

#[test]
fn test_referenced_block_is_heading() {
    let output = run(vec![
        page("Source", "- Important block\n  id:: abc123\n"),
        page("Other", "- as noted in ((abc123))\n"),
    ]);
    let source = text_of(&output, "pages/Source.org");
    let other = text_of(&output, "pages/Other.org");

    assert!(source.contains("\n* Important block\n:PROPERTIES:\n:ID: "));
    let block_id = ID_RE
        .captures_iter(source)
        .map(|c| c[1].to_string())
        .nth(1)
        .unwrap();
    assert!(other.contains(&format!("[[id:{}][Important block]]", block_id)));
    assert!(!other.contains("abc123"));
    assert!(!source.contains("abc123"));
}

#[test]
fn test_forward_references_and_cycles() {
    let output = run(vec![
        page("Zeta", "- back to [[alpha]]\n"),
        page("Alpha", "- ahead to [[Zeta]] and [[Nowhere]]\n\t- {{embed [[Zeta]]}}\n"),
    ]);
    assert_eq!(output.summary.pages_converted, 2);
    assert_eq!(output.summary.placeholders_created, 1);
    assert_eq!(output.summary.references_resolved, 4);

    let alpha = text_of(&output, "pages/Alpha.org");
    let zeta = text_of(&output, "pages/Zeta.org");
    assert!(zeta.contains(&format!("[[id:{}][alpha]]", id_of(alpha))));
    assert!(alpha.contains(&format!("#+transclude: [[id:{}][Zeta]]", id_of(zeta))));
    assert_no_dangling_links(&output);
}

#[test]
fn test_no_dangling_links_across_corpus() {
    let output = run(vec![
        page("Hub", "tags:: index\n- [[One]] [[two]] #three #[[Four Five]]\n- ((b-1)) ((unknown))\n"),
        page("One", "- first\n  id:: b-1\n- {{embed ((b-1))}}\n"),
        SourceNote::new("2024_01_02", DocumentKind::Journal, "- met [[Hub]] on [[Jan 2nd, 2024]]\n"),
        page("broken", "- a\n\t\t\t- b\n"),
        page("Links broken", "- see [[broken]]\n"),
    ]);
    assert_no_dangling_links(&output);
    assert_eq!(output.summary.count(logseq_roam::IssueKind::MalformedOutline), 1);
}

#[test]
fn test_sibling_of_referenced_block_keeps_its_place() {
    let output = run(vec![
        page("P", "- A\n  id:: x1\n- B sibling of A\n"),
        page("Q", "- see ((x1))\n"),
    ]);
    let p = text_of(&output, "pages/P.org");
    assert!(p.contains("\n* A\n:PROPERTIES:\n:ID: "));
    assert!(p.ends_with(":END:\n* B sibling of A\n"));
    assert_no_dangling_links(&output);
}

#[test]
fn test_reference_in_quoted_fence_does_not_dangle() {
    let output = run(vec![
        page("P", "- Target block\n  id:: q1\n"),
        page("Q", "- quoting\n  > ```\n  > ((q1))\n  > ```\n"),
    ]);
    assert_no_dangling_links(&output);
    let q = text_of(&output, "pages/Q.org");
    assert!(q.contains("((q1))"));
    assert!(!q.contains("[[id:"));
}

#[test]
fn test_duplicate_block_id_in_one_note() {
    let output = run(vec![
        page("P", "- one\n  id:: dup\n  - child\n- two\n  id:: dup\n"),
        page("Q", "- ((dup))\n"),
    ]);
    let p = text_of(&output, "pages/P.org");
    let ids: Vec<&str> = ID_RE.captures_iter(p).map(|c| c.get(1).unwrap().as_str()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    assert_eq!(output.summary.count(logseq_roam::IssueKind::BlockIdCollision), 1);
    assert_no_dangling_links(&output);
}

#[test]
fn test_checkbox_tasks_under_both_policies() {
    let note = "- [ ] buy milk\n- [x] pay rent\n- OVERDUE taxes\n";
    for policy in [HeadingPolicy::Addressable, HeadingPolicy::EveryBlock] {
        let config = MigrateConfig {
            heading_policy: policy,
            ..Default::default()
        };
        let output = run_with(&config, vec![page("Tasks", note)]);
        let text = text_of(&output, "pages/Tasks.org");
        assert!(text.contains("OVERDUE | DONE"), "policy {:?}", policy);
        assert!(
            text.contains("\n* TODO buy milk\n* DONE pay rent\n* OVERDUE taxes\n"),
            "policy {:?}",
            policy
        );
    }
}

#[test]
fn test_code_content_round_trips() {
    let code = "fn main() {\n    let s = \"[[not a link]] ((nor this))\";\n\n    println!(\"{}\", s);\n}";
    let indented: String = code
        .lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("  {}", l) })
        .collect::<Vec<_>>()
        .join("\n");
    let note = format!("- Snippet\n  ```rust\n{}\n  ```\n", indented);

    for policy in [HeadingPolicy::Addressable, HeadingPolicy::EveryBlock] {
        let config = MigrateConfig {
            heading_policy: policy,
            ..Default::default()
        };
        let output = run_with(&config, vec![page("Code", &note)]);
        let text = text_of(&output, "pages/Code.org");

        let begin = text.find("#+BEGIN_SRC rust\n").unwrap();
        let line_start = text[..begin].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let indent = begin - line_start;
        let body_start = begin + "#+BEGIN_SRC rust\n".len();
        let body_end = text.find("#+END_SRC").unwrap();
        let body: Vec<&str> = text[body_start..body_end]
            .trim_end_matches(' ')
            .trim_end_matches('\n')
            .split('\n')
            .map(|l| if l.len() >= indent { &l[indent..] } else { l })
            .collect();
        assert_eq!(body.join("\n"), code, "policy {:?}", policy);
        assert_eq!(output.summary.placeholders_created, 0);
    }
}

#[test]
fn test_heading_policies() {
    let note = "- root\n\t- child\n\t\t- leaf\n- second\n";

    let output = run(vec![page("P", note)]);
    let text = text_of(&output, "pages/P.org");
    assert!(text.contains("\n- root\n  - child\n    - leaf\n- second\n"));

    let config = MigrateConfig {
        heading_policy: HeadingPolicy::EveryBlock,
        ..Default::default()
    };
    let output = run_with(&config, vec![page("P", note)]);
    let text = text_of(&output, "pages/P.org");
    assert!(text.contains("\n* root\n** child\n*** leaf\n* second\n"));
}

#[test]
fn test_hashed_ids_are_reproducible() {
    let config = MigrateConfig {
        id_strategy: IdStrategy::Hashed,
        ..Default::default()
    };
    let notes = || vec![page("A", "- [[B]]\n"), page("C", "- x\n  id:: c1\n- ((c1))\n")];
    let first = run_with(&config, notes());
    let second = run_with(&config, notes());
    assert_eq!(first.files, second.files);

    let random = run(notes());
    assert_ne!(first.files, random.files);
}

#[test]
fn test_graph_directory_end_to_end() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let root = input.path();
    fs::create_dir_all(root.join("pages")).unwrap();
    fs::create_dir_all(root.join("journals")).unwrap();
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(
        root.join("pages/proj___design.md"),
        "title:: proj/design\n- see ![diagram](../assets/d.png)\n- TODO finish [[Spec Doc]]\n",
    )
    .unwrap();
    fs::write(root.join("journals/2024_03_05.md"), "- worked on [[proj/design]]\n").unwrap();
    fs::write(root.join("assets/d.png"), b"png").unwrap();

    let notes = source::discover(root).unwrap();
    let config = MigrateConfig::default();
    let result = MigrationEngine::new(&config, &source::AssetDir).run(notes);
    source::write_outputs(output.path(), &result.files).unwrap();
    source::copy_assets(root, output.path()).unwrap();

    let design = fs::read_to_string(output.path().join("pages/proj___design.org")).unwrap();
    assert!(design.contains("[[file:../assets/d.png]]"));
    assert!(design.contains("\n* TODO finish [[id:"));
    assert!(design.contains("#+TODO: TODO"));

    let journal = fs::read_to_string(output.path().join("journals/2024-03-05.org")).unwrap();
    assert!(journal.contains(&format!("[[id:{}][proj/design]]", id_of(&design))));

    assert!(output.path().join("pages/Spec Doc.org").exists());
    assert!(output.path().join("assets/d.png").exists());
    assert_eq!(result.summary.pages_converted, 1);
    assert_eq!(result.summary.journals_converted, 1);
    assert_eq!(result.summary.placeholders_created, 1);
}
