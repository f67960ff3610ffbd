//! `MorphologyFST` (C3): owns a morphology script (lexc or regex form),
//! compiles and applies it, and optionally holds a lexicon/dictionary used
//! for disambiguating impoverished analyses.

use super::{run_apply, run_compile};
use crate::core::error::Result;
use crate::core::{FileKind, ObjectHandle, ObjectId, ObjectType};
use crate::security;
use crate::toolkit::{ApplyDirection, FstToolkit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Whether a morphology script is authored as a foma `lexc` lexicon or as
/// a plain regex definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    Lexc,
    Regex,
}

/// A `form -> [(gloss, category), ...]` dictionary, used to disambiguate
/// impoverished analyses back into rich ones.
pub type Dictionary = HashMap<String, Vec<(String, String)>>;

/// A `category -> [(form, gloss), ...]` lexicon, used to mechanically
/// generate a lexc script via [`MorphologyFst::from_lexicon`].
pub type Lexicon = HashMap<String, Vec<(String, String)>>;

/// Entries persisted to the dictionary artifact on disk.
#[derive(Debug, Serialize, Deserialize, Default)]
struct DictionaryFile {
    entries: Dictionary,
}

/// Load a dictionary artifact previously written by
/// [`MorphologyFst::save_script`].
pub fn load_dictionary(path: &std::path::Path) -> Result<Dictionary> {
    let bytes = std::fs::read(path)?;
    let file: DictionaryFile = bincode::deserialize(&bytes)
        .map_err(|e| crate::core::error::ParserError::Serialization(e.to_string()))?;
    Ok(file.entries)
}

/// A morphology finite-state transducer.
#[derive(Debug)]
pub struct MorphologyFst {
    handle: ObjectHandle,
    script: String,
    script_type: ScriptType,
    word_boundary_symbol: String,
    rare_delimiter: char,
    rich_upper: bool,
    rich_lower: bool,
    rules_generated: String,
    morpheme_delimiters: Vec<char>,
    dictionary: Option<Dictionary>,
    compile_attempt: Option<Uuid>,
    compile_succeeded: bool,
    compile_message: String,
}

impl MorphologyFst {
    /// Construct a morphology FST from a hand-authored script.
    pub fn new(
        parent_directory: impl Into<PathBuf>,
        object_id: ObjectId,
        script: impl Into<String>,
        script_type: ScriptType,
    ) -> Result<Self> {
        let handle = ObjectHandle::new(parent_directory, ObjectType::Morphology, object_id)?;
        Ok(Self {
            handle,
            script: script.into(),
            script_type,
            word_boundary_symbol: "#".to_string(),
            rare_delimiter: '\u{2980}',
            rich_upper: true,
            rich_lower: true,
            rules_generated: String::new(),
            morpheme_delimiters: vec!['-', '='],
            dictionary: None,
            compile_attempt: None,
            compile_succeeded: false,
            compile_message: String::new(),
        })
    }

    /// Mechanically build a lexc script from a structured lexicon, grouping
    /// entries by category into lexc `LEXICON` blocks, rather than
    /// requiring the caller to hand-author lexc text. Each lexicon entry's
    /// form is escaped for any foma-reserved characters it contains.
    pub fn from_lexicon(
        parent_directory: impl Into<PathBuf>,
        object_id: ObjectId,
        lexicon: &Lexicon,
    ) -> Result<Self> {
        let mut script = String::from("Multichar_Symbols\n\nLEXICON Root\n");
        for category in lexicon.keys() {
            script.push_str(&format!("    {category};\n"));
        }
        for (category, entries) in lexicon {
            script.push_str(&format!("\nLEXICON {category}\n"));
            for (form, gloss) in entries {
                let escaped = super::escape_reserved(form);
                script.push_str(&format!("{escaped}{gloss} # ;\n"));
            }
        }
        Self::new(parent_directory, object_id, script, ScriptType::Lexc)
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    pub fn word_boundary_symbol(&self) -> &str {
        &self.word_boundary_symbol
    }

    pub fn rare_delimiter(&self) -> char {
        self.rare_delimiter
    }

    pub fn set_rare_delimiter(&mut self, delimiter: char) {
        self.rare_delimiter = delimiter;
    }

    pub fn rich_upper(&self) -> bool {
        self.rich_upper
    }

    pub fn set_rich_upper(&mut self, rich_upper: bool) {
        self.rich_upper = rich_upper;
    }

    pub fn rich_lower(&self) -> bool {
        self.rich_lower
    }

    pub fn set_rich_lower(&mut self, rich_lower: bool) {
        self.rich_lower = rich_lower;
    }

    pub fn rules_generated(&self) -> &str {
        &self.rules_generated
    }

    pub fn set_rules_generated(&mut self, rules: impl Into<String>) {
        self.rules_generated = rules.into();
    }

    pub fn morpheme_delimiters(&self) -> &[char] {
        &self.morpheme_delimiters
    }

    pub fn set_morpheme_delimiters(&mut self, delimiters: Vec<char>) {
        self.morpheme_delimiters = delimiters;
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    pub fn set_dictionary(&mut self, dictionary: Dictionary) {
        self.dictionary = Some(dictionary);
    }

    pub fn compile_succeeded(&self) -> bool {
        self.compile_succeeded
    }

    pub fn compile_message(&self) -> &str {
        &self.compile_message
    }

    /// The verification string `compile` must find in stdout: `"Done!"`
    /// for a lexc script, `"defined <object_type>: "` for a regex script.
    pub fn verification_string(&self) -> String {
        match self.script_type {
            ScriptType::Lexc => "Done!".to_string(),
            ScriptType::Regex => super::phonology::verification_string(ObjectType::Morphology),
        }
    }

    pub fn save_script(&self) -> Result<PathBuf> {
        let script_path = self.handle.file_path(match self.script_type {
            ScriptType::Lexc => FileKind::Lexicon,
            ScriptType::Regex => FileKind::Script,
        });
        std::fs::write(&script_path, &self.script)?;
        if let Some(dictionary) = &self.dictionary {
            let dict_path = self.handle.file_path(FileKind::Dictionary);
            let encoded = bincode::serialize(&DictionaryFile { entries: dictionary.clone() })
                .map_err(|e| crate::core::error::ParserError::Serialization(e.to_string()))?;
            std::fs::write(dict_path, encoded)?;
        }
        Ok(script_path)
    }

    fn driver_script(&self, script_path: &std::path::Path, binary_path: &std::path::Path) -> String {
        match self.script_type {
            ScriptType::Lexc => format!(
                "read lexc {source}\nsave stack {binary}\nquit\n",
                source = script_path.display(),
                binary = binary_path.display(),
            ),
            ScriptType::Regex => format!(
                "source {source}\nregex morphology;\nsave stack {binary}\nquit\n",
                source = script_path.display(),
                binary = binary_path.display(),
            ),
        }
    }

    pub fn compile(&mut self, toolkit: &dyn FstToolkit, timeout: Duration) -> Result<()> {
        let script_path = self.save_script()?;
        let binary_path = self.handle.file_path(FileKind::Binary);
        let driver = self.driver_script(&script_path, &binary_path);
        let verification = self.verification_string();

        let outcome = run_compile(&self.handle, &driver, toolkit, timeout, &verification)?;
        self.compile_attempt = Some(outcome.attempt);
        self.compile_succeeded = outcome.succeeded;
        self.compile_message = outcome.message;
        Ok(())
    }

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
        run_apply(&self.handle, &binary_path, inputs, direction, None, toolkit, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verification_string_depends_on_script_type() {
        let temp = TempDir::new().unwrap();
        let lexc = MorphologyFst::new(temp.path(), ObjectId(1), "LEXICON Root\n", ScriptType::Lexc).unwrap();
        assert_eq!(lexc.verification_string(), "Done!");

        let regex = MorphologyFst::new(temp.path(), ObjectId(2), "define morphology ?*;", ScriptType::Regex).unwrap();
        assert_eq!(regex.verification_string(), "defined morphology: ");
    }

    #[test]
    fn test_from_lexicon_generates_lexc_blocks() {
        let temp = TempDir::new().unwrap();
        let mut lexicon: Lexicon = HashMap::new();
        lexicon.insert("N".to_string(), vec![("chien".to_string(), "dog".to_string())]);
        let fst = MorphologyFst::from_lexicon(temp.path(), ObjectId(3), &lexicon).unwrap();
        assert!(fst.script().contains("LEXICON N"));
        assert!(fst.script().contains("chien"));
        assert_eq!(fst.script_type(), ScriptType::Lexc);
    }
}
