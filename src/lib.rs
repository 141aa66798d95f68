//! Logseq to org-roam migration
//!
//! The conversion core ([`MigrationEngine`]) is pure: it takes the notes of
//! a graph and returns the files to write plus a [`MigrationSummary`]. The
//! [`source`] module reads and writes directories around it.

pub mod cli;
pub mod config;
pub mod constants;
pub mod convert;
pub mod engine;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod markdown;
pub mod outline;
pub mod path;
pub mod resolve;
pub mod source;
pub mod summary;
pub mod util;

pub use cli::Cli;
pub use config::{HeadingPolicy, IdStrategy, MigrateConfig};
pub use convert::{AssetResolver, NoAssets, StructuralConverter};
pub use engine::{MigrationEngine, MigrationOutput, OutputFile, SourceNote};
pub use error::{ConvertError, ConvertResult};
pub use index::{ReferenceIndex, StableId};
pub use outline::{parse_document, Block, Document, DocumentKind, TaskState};
pub use path::{output_identity, OutputIdentity};
pub use resolve::{LinkResolver, Reference, ResolvedReference};
pub use summary::{Issue, IssueKind, MigrationSummary};
