//! Core type definitions for the morphological parser.

use std::fmt;

/// Unique identifier for a persisted parser object (phonology, morphology,
/// morpheme language model, or morphophonology parser).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Sentinel for "not yet assigned".
    pub const INVALID: Self = Self(0);

    /// Check if this is a valid, assigned id.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of linguistic object a workspace directory belongs to.
///
/// Each variant maps to the `object_type2directory_name`/`object_type2file_name`
/// conventions of the original implementation: a phonology and a morphology
/// each live in their own directory, while a `Morphophonology` parser
/// composes both plus a language model in its own `morphological_parser_<id>`
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// A standalone phonology FST.
    Phonology,
    /// A standalone morphology FST.
    Morphology,
    /// A morpheme-level n-gram language model.
    MorphemeLanguageModel,
    /// A composed morphophonology: phonology ∘ morphology, plus a language
    /// model, driven by a `MorphologicalParser`.
    Morphophonology,
}

impl ObjectType {
    /// The directory name segment used for this object type's workspace,
    /// e.g. `morphological_parser_<id>` for [`ObjectType::Morphophonology`].
    pub fn directory_name(&self) -> &'static str {
        match self {
            ObjectType::Phonology => "phonology",
            ObjectType::Morphology => "morphology",
            ObjectType::MorphemeLanguageModel => "morpheme_language_model",
            ObjectType::Morphophonology => "morphological_parser",
        }
    }

    /// The base file name (without extension) used for this object type's
    /// generated/compiled artifacts within its workspace.
    pub fn file_name(&self) -> &'static str {
        match self {
            ObjectType::Phonology => "phonology",
            ObjectType::Morphology => "morphology",
            ObjectType::MorphemeLanguageModel => "language_model",
            ObjectType::Morphophonology => "morphophonology",
        }
    }
}

/// A file kind within an object's workspace directory. Each kind maps to a
/// deterministic file name, per the layout fixed in the filesystem-layout
/// contract: `<file_name stem><suffix>`, where the stem is the owning
/// object's [`ObjectType::file_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// The authored or generated FST/LM source script.
    Script,
    /// The compiled FST binary.
    Binary,
    /// The shell script used to invoke the compiler (kept for inspection
    /// after a failed compile).
    Compiler,
    /// Captured stdout+stderr of the last subprocess call.
    Log,
    /// A lexicon artifact backing a morphology FST.
    Lexicon,
    /// A serialized dictionary mapping forms to `(gloss, category)` pairs.
    Dictionary,
    /// A training corpus for the language model.
    Corpus,
    /// The ARPA-format language model produced by the LM toolkit.
    Arpa,
    /// The vocabulary file constraining LM training.
    Vocabulary,
    /// The serialized back-off trie built from an ARPA file.
    Trie,
    /// A file-backed cache of transcription -> (best parse, candidates).
    Cache,
}

impl FileKind {
    /// The deterministic file name for this file kind within an object's
    /// workspace, e.g. `morpheme_language_model_trie.bin`.
    pub fn filename(&self, object_type: ObjectType) -> String {
        let stem = object_type.file_name();
        match self {
            FileKind::Script => format!("{stem}.script"),
            FileKind::Binary => format!("{stem}.foma"),
            FileKind::Compiler => format!("{stem}.sh"),
            FileKind::Log => format!("{stem}.log"),
            FileKind::Lexicon => format!("{stem}.lexc"),
            FileKind::Dictionary => format!("{stem}_dictionary.bin"),
            FileKind::Corpus => format!("{stem}.corpus"),
            FileKind::Arpa => format!("{stem}.lm"),
            FileKind::Vocabulary => format!("{stem}.vocab"),
            FileKind::Trie => format!("{stem}_trie.bin"),
            FileKind::Cache => format!("{stem}_cache.bin"),
        }
    }
}
