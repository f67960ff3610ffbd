//! Environment variable configuration for the morphological parser.
//!
//! This module provides environment-based configuration with sensible
//! defaults, mirroring the teacher database's own `config::env` layout.

use std::env;
use std::path::PathBuf;

/// Environment variable names.
pub mod vars {
    /// Root directory under which parser workspaces are created.
    pub const WORKSPACE_ROOT: &str = "MORPHOPARSE_WORKSPACE_ROOT";

    /// Log level (trace, debug, info, warn, error).
    pub const LOG_LEVEL: &str = "MORPHOPARSE_LOG_LEVEL";

    /// Default timeout, in seconds, for FST/LM toolkit subprocesses.
    pub const TOOLKIT_TIMEOUT_SECS: &str = "MORPHOPARSE_TOOLKIT_TIMEOUT_SECS";

    /// Maximum number of candidate parses returned per transcription.
    pub const MAX_CANDIDATES: &str = "MORPHOPARSE_MAX_CANDIDATES";

    /// Whether to persist the cache to durable storage after every parse.
    pub const PERSIST_CACHE: &str = "MORPHOPARSE_PERSIST_CACHE";

    /// Data directory for default workspace placement.
    pub const DATA_DIR: &str = "MORPHOPARSE_DATA_DIR";

    /// Enable debug mode (verbose logging, retained intermediate files).
    pub const DEBUG_MODE: &str = "MORPHOPARSE_DEBUG";
}

/// Runtime configuration sourced from the environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Root directory for parser workspaces, if overridden.
    pub workspace_root: Option<PathBuf>,

    /// Log level.
    pub log_level: String,

    /// Default toolkit subprocess timeout, in seconds.
    pub toolkit_timeout_secs: u64,

    /// Default cap on candidates returned per transcription.
    pub max_candidates: usize,

    /// Whether to persist the cache after every parse by default.
    pub persist_cache: bool,

    /// Data directory used to derive a default workspace root.
    pub data_dir: PathBuf,

    /// Debug mode.
    pub debug_mode: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            log_level: "info".to_string(),
            toolkit_timeout_secs: 60,
            max_candidates: 100,
            persist_cache: true,
            data_dir: default_data_dir(),
            debug_mode: false,
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var(vars::WORKSPACE_ROOT) {
            config.workspace_root = Some(PathBuf::from(path));
        }

        if let Ok(level) = env::var(vars::LOG_LEVEL) {
            config.log_level = level.to_lowercase();
        }

        if let Ok(secs) = env::var(vars::TOOLKIT_TIMEOUT_SECS) {
            if let Ok(secs) = secs.parse::<u64>() {
                config.toolkit_timeout_secs = secs;
            }
        }

        if let Ok(max) = env::var(vars::MAX_CANDIDATES) {
            if let Ok(max) = max.parse::<usize>() {
                config.max_candidates = max;
            }
        }

        if let Ok(persist) = env::var(vars::PERSIST_CACHE) {
            config.persist_cache = persist == "1" || persist.eq_ignore_ascii_case("true");
        }

        if let Ok(dir) = env::var(vars::DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }

        config.debug_mode = env::var(vars::DEBUG_MODE)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        config
    }

    /// The workspace root to use when none is explicitly configured.
    pub fn default_workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| self.data_dir.join("parsers"))
    }

    /// Validate the configuration, returning a human-readable error on the
    /// first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(format!("invalid log level: {}", self.log_level)),
        }

        if self.toolkit_timeout_secs == 0 {
            return Err("toolkit timeout must be greater than 0".to_string());
        }

        if self.max_candidates == 0 {
            return Err("max candidates must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Default data directory, used to derive a workspace root when none is set.
fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("morphoparse")
    } else {
        PathBuf::from("./data")
    }
}
