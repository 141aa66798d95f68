//! Migration configuration
//!
//! Every tunable of a run lives in [`MigrateConfig`]. Values are resolved in
//! priority order:
//! 1. Explicit command line flags (applied by the binary)
//! 2. Environment variables (LOGSEQ_ROAM_HEADINGS, LOGSEQ_ROAM_IDS,
//!    LOGSEQ_ROAM_EXCERPT, LOGSEQ_ROAM_TASK_KEYWORDS)
//! 3. Built-in defaults

use std::str::FromStr;

use crate::constants as C;

/// Which blocks become Org headings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingPolicy {
    /// Heading iff the block is a reference target or declares properties
    #[default]
    Addressable,
    /// Every block becomes a heading
    EveryBlock,
}

impl FromStr for HeadingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "addressable" => Ok(HeadingPolicy::Addressable),
            "every" | "every-block" | "all" => Ok(HeadingPolicy::EveryBlock),
            other => Err(format!("unknown heading policy '{}'", other)),
        }
    }
}

/// How stable identifiers are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Fresh random uuid per target
    #[default]
    Random,
    /// uuid-shaped digest of the target key, reproducible across runs
    Hashed,
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "uuid" => Ok(IdStrategy::Random),
            "hashed" | "stable" => Ok(IdStrategy::Hashed),
            other => Err(format!("unknown id strategy '{}'", other)),
        }
    }
}

/// Tunables of one migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    pub heading_policy: HeadingPolicy,
    pub id_strategy: IdStrategy,
    /// Maximum characters of a block excerpt used as link text
    pub excerpt_len: usize,
    /// FILETAGS keyword attached to placeholder pages
    pub placeholder_tag: String,
    /// Task keywords recognized in addition to the built-in set;
    /// they have no mapping and pass through unchanged
    pub extra_task_keywords: Vec<String>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            heading_policy: HeadingPolicy::default(),
            id_strategy: IdStrategy::default(),
            excerpt_len: C::DEFAULT_EXCERPT_LENGTH,
            placeholder_tag: C::DEFAULT_PLACEHOLDER_TAG.to_string(),
            extra_task_keywords: Vec::new(),
        }
    }
}

impl MigrateConfig {
    /// Defaults overridden by whatever environment variables are set
    ///
    /// Empty or unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = env_value(C::ENV_HEADINGS) {
            match value.parse() {
                Ok(policy) => config.heading_policy = policy,
                Err(e) => log::warn!("{}: {}", C::ENV_HEADINGS, e),
            }
        }
        if let Some(value) = env_value(C::ENV_IDS) {
            match value.parse() {
                Ok(strategy) => config.id_strategy = strategy,
                Err(e) => log::warn!("{}: {}", C::ENV_IDS, e),
            }
        }
        if let Some(value) = env_value(C::ENV_EXCERPT) {
            match value.parse::<usize>() {
                Ok(len) if len > 0 => config.excerpt_len = len,
                _ => log::warn!("{}: expected a positive number, got '{}'", C::ENV_EXCERPT, value),
            }
        }
        if let Some(value) = env_value(C::ENV_TASK_KEYWORDS) {
            config.extra_task_keywords = value
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }

        config
    }
}

// Treat empty strings as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_env() {
        std::env::remove_var(C::ENV_HEADINGS);
        std::env::remove_var(C::ENV_IDS);
        std::env::remove_var(C::ENV_EXCERPT);
        std::env::remove_var(C::ENV_TASK_KEYWORDS);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("addressable".parse::<HeadingPolicy>(), Ok(HeadingPolicy::Addressable));
        assert_eq!("Every".parse::<HeadingPolicy>(), Ok(HeadingPolicy::EveryBlock));
        assert!("sometimes".parse::<HeadingPolicy>().is_err());
        assert_eq!("hashed".parse::<IdStrategy>(), Ok(IdStrategy::Hashed));
        assert!("sequential".parse::<IdStrategy>().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        // Single test touching the environment so parallel tests cannot interleave
        clean_env();
        assert_eq!(MigrateConfig::from_env(), MigrateConfig::default());

        std::env::set_var(C::ENV_HEADINGS, "every");
        std::env::set_var(C::ENV_IDS, "hashed");
        std::env::set_var(C::ENV_EXCERPT, "12");
        std::env::set_var(C::ENV_TASK_KEYWORDS, "SOMEDAY, ");
        let config = MigrateConfig::from_env();
        assert_eq!(config.heading_policy, HeadingPolicy::EveryBlock);
        assert_eq!(config.id_strategy, IdStrategy::Hashed);
        assert_eq!(config.excerpt_len, 12);
        assert_eq!(config.extra_task_keywords, vec!["SOMEDAY".to_string()]);

        std::env::set_var(C::ENV_EXCERPT, "zero");
        assert_eq!(MigrateConfig::from_env().excerpt_len, C::DEFAULT_EXCERPT_LENGTH);

        clean_env();
    }
}
