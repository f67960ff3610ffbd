//! Configuration for constructing a [`crate::parser::MorphologicalParser`].

pub mod env;

use self::env::EnvConfig;
use std::path::PathBuf;

/// Options controlling how a [`crate::parser::MorphologicalParser`] is
/// constructed and how it behaves by default.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// The parent directory under which this parser's workspace
    /// (`morphological_parser_<id>/`) is created.
    pub parent_directory: PathBuf,
    /// Default wall-clock timeout applied to FST/LM toolkit subprocesses.
    pub toolkit_timeout_secs: u64,
    /// Default cap on candidates returned per transcription.
    pub max_candidates: usize,
    /// Whether `parse` persists the cache to durable storage after every
    /// call by default.
    pub persist_cache: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let env_config = EnvConfig::from_env();
        Self {
            parent_directory: env_config.default_workspace_root(),
            toolkit_timeout_secs: env_config.toolkit_timeout_secs,
            max_candidates: env_config.max_candidates,
            persist_cache: env_config.persist_cache,
        }
    }
}

impl ParserConfig {
    /// Build configuration purely from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_nonzero_timeout() {
        let config = ParserConfig::default();
        assert!(config.toolkit_timeout_secs > 0);
        assert!(config.max_candidates > 0);
    }
}
