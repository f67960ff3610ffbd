//! `PhonologyFST` (C2): owns a phonology script, compiles it to a binary,
//! applies it up/down, and runs its embedded tests.

use super::{parse_embedded_tests, run_apply, run_compile, EmbeddedTest};
use crate::core::error::Result;
use crate::core::{FileKind, ObjectHandle, ObjectId, ObjectType};
use crate::security;
use crate::toolkit::{ApplyDirection, FstToolkit};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// The verification string a regex-compiled FST must print for `compile`
/// to be considered successful.
pub fn verification_string(object_type: ObjectType) -> String {
    format!("defined {}: ", object_type.file_name())
}

/// A phonology finite-state transducer: the authored source is compiled as
/// written, with no automatic preamble.
#[derive(Debug)]
pub struct PhonologyFst {
    handle: ObjectHandle,
    script: String,
    word_boundary_symbol: String,
    boundaries: bool,
    decombine: bool,
    compile_attempt: Option<Uuid>,
    compile_succeeded: bool,
    compile_message: String,
}

impl PhonologyFst {
    /// Construct a phonology FST over a fresh workspace.
    pub fn new(parent_directory: impl Into<PathBuf>, object_id: ObjectId, script: impl Into<String>) -> Result<Self> {
        let handle = ObjectHandle::new(parent_directory, ObjectType::Phonology, object_id)?;
        Ok(Self {
            handle,
            script: script.into(),
            word_boundary_symbol: "#".to_string(),
            boundaries: false,
            decombine: false,
            compile_attempt: None,
            compile_succeeded: false,
            compile_message: String::new(),
        })
    }

    /// Opt into the combining-character workaround (off by default; see
    /// the open question this resolves).
    pub fn with_decombine(mut self, decombine: bool) -> Self {
        self.decombine = decombine;
        self
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn word_boundary_symbol(&self) -> &str {
        &self.word_boundary_symbol
    }

    pub fn set_word_boundary_symbol(&mut self, symbol: impl Into<String>) {
        self.word_boundary_symbol = symbol.into();
    }

    pub fn boundaries(&self) -> bool {
        self.boundaries
    }

    pub fn set_boundaries(&mut self, boundaries: bool) {
        self.boundaries = boundaries;
    }

    pub fn compile_succeeded(&self) -> bool {
        self.compile_succeeded
    }

    pub fn compile_message(&self) -> &str {
        &self.compile_message
    }

    pub fn compile_attempt(&self) -> Option<Uuid> {
        self.compile_attempt
    }

    /// Write the (optionally decombined) script plus its compile driver to
    /// the workspace.
    pub fn save_script(&self) -> Result<PathBuf> {
        let script_path = self.handle.file_path(FileKind::Script);
        let contents = if self.decombine {
            super::decombine(&self.script)
        } else {
            self.script.clone()
        };
        std::fs::write(&script_path, &contents)?;
        Ok(script_path)
    }

    fn driver_script(&self, script_path: &std::path::Path, binary_path: &std::path::Path) -> String {
        format!(
            "source {source}\nregex phonology;\nsave stack {binary}\nquit\n",
            source = script_path.display(),
            binary = binary_path.display(),
        )
    }

    /// Compile the phonology script to a binary via `toolkit`, recording
    /// the outcome locally.
    pub fn compile(&mut self, toolkit: &dyn FstToolkit, timeout: Duration) -> Result<()> {
        let script_path = self.save_script()?;
        let binary_path = self.handle.file_path(FileKind::Binary);
        let driver = self.driver_script(&script_path, &binary_path);
        let verification = verification_string(ObjectType::Phonology);

        let outcome = run_compile(&self.handle, &driver, toolkit, timeout, &verification)?;
        self.compile_attempt = Some(outcome.attempt);
        self.compile_succeeded = outcome.succeeded;
        self.compile_message = outcome.message;
        Ok(())
    }

    /// Apply the compiled binary to `inputs` in the given direction.
    pub fn apply(
        &self,
        direction: ApplyDirection,
        inputs: &[String],
        toolkit: &dyn FstToolkit,
        timeout: Duration,
    ) -> Result<HashMap<String, Vec<String>>> {
        for input in inputs {
            security::validate_transcription(input)?;
        }
        let binary_path = self.handle.file_path(FileKind::Binary);
        let boundary = self.boundaries.then_some(self.word_boundary_symbol.as_str());
        run_apply(&self.handle, &binary_path, inputs, direction, boundary, toolkit, timeout)
    }

    /// Scan the script for `#test LHS -> RHS` lines and run `apply_down`
    /// on every `LHS`, reporting expected vs. actual outputs.
    pub fn run_tests(
        &self,
        toolkit: &dyn FstToolkit,
        timeout: Duration,
    ) -> Result<HashMap<String, (Vec<String>, Vec<String>)>> {
        let tests: Vec<EmbeddedTest> = parse_embedded_tests(&self.script);
        let mut results = HashMap::new();
        for test in tests {
            let actual = self
                .apply(ApplyDirection::Down, &[test.lhs.clone()], toolkit, timeout)?
                .remove(&test.lhs)
                .unwrap_or_default();
            results.insert(test.lhs, (vec![test.rhs], actual));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_script_writes_file() {
        let temp = TempDir::new().unwrap();
        let fst = PhonologyFst::new(temp.path(), ObjectId(1), "define phonology ?*;\n").unwrap();
        let path = fst.save_script().unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents, "define phonology ?*;\n");
    }

    #[test]
    fn test_decombine_inserts_spaces() {
        let temp = TempDir::new().unwrap();
        let fst = PhonologyFst::new(temp.path(), ObjectId(2), "a\u{0301}b")
            .unwrap()
            .with_decombine(true);
        let path = fst.save_script().unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents, "a  \u{0301}b");
    }
}
