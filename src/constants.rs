//! Constants for logseq-roam
//!
//! This module contains all magic numbers, format strings, and hardcoded values
//! used throughout the codebase to improve maintainability and avoid duplication.

// === File and Directory Names ===

/// Subdirectory holding regular pages (input and output)
pub const PAGES_SUBDIR: &str = "pages";

/// Subdirectory holding journal notes (input and output)
pub const JOURNALS_SUBDIR: &str = "journals";

/// Subdirectory holding binary assets
pub const ASSETS_SUBDIR: &str = "assets";

/// File extension of Logseq notes
pub const MARKDOWN_EXTENSION: &str = ".md";

/// File extension of org-roam notes
pub const ORG_EXTENSION: &str = ".org";

/// Newline character
pub const NEWLINE: &str = "\n";

// === Namespaces ===

/// Separator between namespace segments in a logical page name
pub const NAMESPACE_SEPARATOR: &str = "/";

/// Joiner substituted for the namespace separator in file identities
pub const NAMESPACE_JOINER: &str = "___";

/// Characters dropped from output file stems
pub const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\'];

// === Date Format Strings ===

/// Journal file stem format in a Logseq graph: %Y_%m_%d
pub const JOURNAL_INPUT_FORMAT: &str = "%Y_%m_%d";

/// Canonical journal date format in org-roam: %Y-%m-%d
pub const JOURNAL_OUTPUT_FORMAT: &str = "%Y-%m-%d";

// === Outline Layout ===

/// Columns a tab counts for when measuring bullet indentation
pub const TAB_WIDTH: usize = 2;

/// Columns per nesting level
pub const INDENT_WIDTH: usize = 2;

/// Bullet marker of an outline block
pub const BULLET: &str = "- ";

/// Fence opening and closing a code block
pub const CODE_FENCE: &str = "```";

/// Block property holding the local block identifier
pub const BLOCK_ID_PROPERTY: &str = "id";

/// Block properties that only describe viewer state and are dropped
pub const VIEWER_PROPERTIES: &[&str] = &["collapsed"];

/// Markdown checkbox opening a task
pub const CHECKBOX_OPEN: &str = "[ ]";

/// Markdown checkboxes closing a task
pub const CHECKBOX_DONE: &[&str] = &["[x]", "[X]"];

/// Planning keywords carried from continuation lines onto the heading
pub const PLANNING_KEYWORDS: &[&str] = &["SCHEDULED:", "DEADLINE:"];

// === Page Properties ===

/// Page property overriding the logical name
pub const TITLE_PROPERTY: &str = "title";

/// Page property listing classification keywords
pub const TAGS_PROPERTY: &str = "tags";

/// Page property listing alternative page names
pub const ALIAS_PROPERTY: &str = "alias";

// === Org Output ===

/// Org property drawer opening line
pub const ORG_PROPERTIES_BEGIN: &str = ":PROPERTIES:";

/// Org property drawer closing line
pub const ORG_PROPERTIES_END: &str = ":END:";

/// Org property holding the stable identifier
pub const ORG_ID_PROPERTY: &str = "ID";

/// org-roam property listing page aliases
pub const ORG_ALIASES_PROPERTY: &str = "ROAM_ALIASES";

/// Inclusion directive understood by org-transclusion
pub const ORG_TRANSCLUDE_KEYWORD: &str = "#+transclude:";

/// Default classification keyword attached to placeholder pages
pub const DEFAULT_PLACEHOLDER_TAG: &str = "stub";

// === Validation Limits ===

/// Maximum size of frontmatter to parse (prevents DoS on malformed files)
pub const MAX_FRONTMATTER_SIZE: usize = 64 * 1024; // 64KB

/// Default length of the excerpt shown for block references
pub const DEFAULT_EXCERPT_LENGTH: usize = 48;

// === Environment Variables ===

/// Heading policy override: addressable | every
pub const ENV_HEADINGS: &str = "LOGSEQ_ROAM_HEADINGS";

/// Identifier strategy override: random | hashed
pub const ENV_IDS: &str = "LOGSEQ_ROAM_IDS";

/// Block excerpt length override
pub const ENV_EXCERPT: &str = "LOGSEQ_ROAM_EXCERPT";

/// Comma separated extra task keywords
pub const ENV_TASK_KEYWORDS: &str = "LOGSEQ_ROAM_TASK_KEYWORDS";
