//! External-toolkit adapter (C9): translates toolkit-specific CLI
//! invocations and verification strings behind a uniform interface, so the
//! FST/LM components never hard-code a particular vendor's argv shape.

use std::path::Path;

/// Direction of an FST apply query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyDirection {
    /// Lower (surface) to upper (analysis).
    Up,
    /// Upper (analysis) to lower (surface).
    Down,
}

/// Adapter over an FST compiler + lookup toolchain (`foma`/`flookup` in the
/// reference implementation).
pub trait FstToolkit: std::fmt::Debug + Send + Sync {
    /// The compiler's executable name, for presence checks.
    fn compiler_executable(&self) -> &str;
    /// The lookup tool's executable name, for presence checks.
    fn lookup_executable(&self) -> &str;
    /// The argv used to run the compile driver script.
    fn compile_command(&self, driver_script: &Path) -> Vec<String>;
    /// The argv used to apply a compiled binary in the given direction.
    fn apply_command(&self, direction: ApplyDirection, binary: &Path) -> Vec<String>;
}

/// The `foma`/`flookup` adapter.
#[derive(Debug, Default)]
pub struct FomaToolkit;

impl FstToolkit for FomaToolkit {
    fn compiler_executable(&self) -> &str {
        "foma"
    }

    fn lookup_executable(&self) -> &str {
        "flookup"
    }

    fn compile_command(&self, driver_script: &Path) -> Vec<String> {
        vec!["sh".to_string(), driver_script.display().to_string()]
    }

    fn apply_command(&self, direction: ApplyDirection, binary: &Path) -> Vec<String> {
        let mut argv = vec!["flookup".to_string()];
        if direction == ApplyDirection::Down {
            argv.push("-i".to_string());
        }
        argv.push(binary.display().to_string());
        argv
    }
}

/// Adapter over an n-gram LM toolkit (`estimate-ngram` in the reference
/// MITLM implementation).
pub trait LmToolkit: std::fmt::Debug + Send + Sync {
    /// The toolkit's executable name, for presence checks.
    fn executable(&self) -> &str;
    /// The argv used to train an ARPA file from a corpus.
    fn write_arpa_command(
        &self,
        order: u32,
        smoothing: &str,
        corpus: &Path,
        arpa_out: &Path,
        vocabulary: Option<&Path>,
    ) -> Vec<String>;
    /// The string that must appear in stdout for a `write_arpa` call to be
    /// considered successful.
    fn verification_string(&self, arpa_out: &Path) -> String;
}

/// The MITLM `estimate-ngram` adapter.
#[derive(Debug, Default)]
pub struct MitlmToolkit;

impl LmToolkit for MitlmToolkit {
    fn executable(&self) -> &str {
        "estimate-ngram"
    }

    fn write_arpa_command(
        &self,
        order: u32,
        smoothing: &str,
        corpus: &Path,
        arpa_out: &Path,
        vocabulary: Option<&Path>,
    ) -> Vec<String> {
        let mut argv = vec![
            "estimate-ngram".to_string(),
            "-o".to_string(),
            order.to_string(),
            "-s".to_string(),
            smoothing.to_string(),
            "-t".to_string(),
            corpus.display().to_string(),
            "-wl".to_string(),
            arpa_out.display().to_string(),
        ];
        if let Some(vocab) = vocabulary {
            argv.push("-v".to_string());
            argv.push(vocab.display().to_string());
        }
        argv
    }

    fn verification_string(&self, arpa_out: &Path) -> String {
        format!("Saving LM to {}", arpa_out.display())
    }
}
