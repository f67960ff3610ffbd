//! `LanguageModel` (C4): owns a morpheme corpus and vocabulary, trains an
//! ARPA file via the LM toolkit, and loads it into an immutable
//! back-off trie for scoring.

pub mod trie;

use crate::core::error::{ParserError, Result};
use crate::core::{FileKind, ObjectHandle, ObjectId, ObjectType};
use crate::process::ScriptedCommand;
use crate::toolkit::LmToolkit;
use std::path::PathBuf;
use std::time::Duration;
use trie::Trie;

/// An n-gram morpheme language model.
#[derive(Debug)]
pub struct LanguageModel {
    handle: ObjectHandle,
    corpus: String,
    vocabulary: Option<Vec<String>>,
    order: u32,
    smoothing: String,
    start_symbol: String,
    end_symbol: String,
    rare_delimiter: char,
    categorial: bool,
    write_succeeded: bool,
    write_message: String,
    trie: Option<Trie>,
}

impl LanguageModel {
    /// Construct a language model over a fresh workspace, with a corpus
    /// text (one training sentence per line) already in hand.
    pub fn new(parent_directory: impl Into<PathBuf>, object_id: ObjectId, corpus: impl Into<String>) -> Result<Self> {
        let handle = ObjectHandle::new(parent_directory, ObjectType::MorphemeLanguageModel, object_id)?;
        Ok(Self {
            handle,
            corpus: corpus.into(),
            vocabulary: None,
            order: 3,
            smoothing: "ModKN".to_string(),
            start_symbol: "<s>".to_string(),
            end_symbol: "</s>".to_string(),
            rare_delimiter: '\u{2980}',
            categorial: false,
            write_succeeded: false,
            write_message: String::new(),
            trie: None,
        })
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    pub fn smoothing(&self) -> &str {
        &self.smoothing
    }

    pub fn set_smoothing(&mut self, smoothing: impl Into<String>) {
        self.smoothing = smoothing.into();
    }

    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    pub fn end_symbol(&self) -> &str {
        &self.end_symbol
    }

    pub fn categorial(&self) -> bool {
        self.categorial
    }

    pub fn set_categorial(&mut self, categorial: bool) {
        self.categorial = categorial;
    }

    pub fn set_vocabulary(&mut self, vocabulary: Vec<String>) {
        self.vocabulary = Some(vocabulary);
    }

    pub fn write_succeeded(&self) -> bool {
        self.write_succeeded
    }

    pub fn write_message(&self) -> &str {
        &self.write_message
    }

    /// Train an ARPA file via `toolkit`, requiring its verification string
    /// in stdout, a zero exit code, and a changed ARPA modification time.
    pub fn write_arpa(&mut self, toolkit: &dyn LmToolkit, timeout: Duration) -> Result<()> {
        let corpus_path = self.handle.file_path(FileKind::Corpus);
        std::fs::write(&corpus_path, &self.corpus)?;

        let vocab_path = if let Some(vocabulary) = &self.vocabulary {
            let path = self.handle.file_path(FileKind::Vocabulary);
            std::fs::write(&path, vocabulary.join("\n"))?;
            Some(path)
        } else {
            None
        };

        let arpa_path = self.handle.file_path(FileKind::Arpa);
        let mtime_before = ScriptedCommand::modification_time(&arpa_path);

        let argv = toolkit.write_arpa_command(
            self.order,
            &self.smoothing,
            &corpus_path,
            &arpa_path,
            vocab_path.as_deref(),
        );
        let outcome = ScriptedCommand::new(&self.handle).run(&argv, timeout)?;
        let mtime_after = ScriptedCommand::modification_time(&arpa_path);

        let verification = toolkit.verification_string(&arpa_path);
        let changed = match (mtime_before, mtime_after) {
            (None, Some(_)) => true,
            (Some(before), Some(after)) => after > before,
            _ => false,
        };

        self.write_succeeded = !outcome.timed_out
            && outcome.exit_code == 0
            && outcome.log.contains(&verification)
            && changed;
        self.write_message = if self.write_succeeded {
            "wrote ARPA file".to_string()
        } else if outcome.timed_out {
            "process timed out".chars().take(255).collect()
        } else {
            "process failed".chars().take(255).collect()
        };

        Ok(())
    }

    /// Parse the ARPA file produced by [`LanguageModel::write_arpa`] into
    /// an immutable trie and persist it to the workspace.
    pub fn generate_trie(&mut self) -> Result<()> {
        let arpa_path = self.handle.file_path(FileKind::Arpa);
        let text = std::fs::read_to_string(&arpa_path).map_err(|_| {
            ParserError::DependencyMissing("no ARPA file to build a trie from".to_string())
        })?;
        let trie = Trie::parse_arpa(&text)?;
        trie.save(&self.handle.file_path(FileKind::Trie))?;
        self.trie = Some(trie);
        Ok(())
    }

    /// Load the trie from disk if not already resident in memory.
    pub fn trie(&mut self) -> Result<&Trie> {
        if self.trie.is_none() {
            self.trie = Some(Trie::load(&self.handle.file_path(FileKind::Trie))?);
        }
        Ok(self.trie.as_ref().unwrap())
    }

    /// Score a whitespace-separated morpheme sequence, wrapping it with
    /// `start_symbol`/`end_symbol` first.
    pub fn get_probability_one(&mut self, sequence: &str) -> Result<f64> {
        let mut tokens: Vec<String> = vec![self.start_symbol.clone()];
        tokens.extend(sequence.split_whitespace().map(|s| s.to_string()));
        tokens.push(self.end_symbol.clone());
        Ok(self.trie()?.score(&tokens))
    }

    /// Score each of several whitespace-separated morpheme sequences.
    pub fn get_probabilities(&mut self, sequences: &[String]) -> Result<Vec<(String, f64)>> {
        let mut results = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            let score = self.get_probability_one(sequence)?;
            results.push((sequence.clone(), score));
        }
        Ok(results)
    }
}
