//! `MorphologicalParser` (C7): composes a phonology, a morphology, and a
//! language model into a single morphophonology FST, tracks whether any of
//! their attributes or artifacts changed since the last generate, and
//! answers `parse` queries against a transcription cache.

pub mod replicate;

use crate::cache::{Cache, CacheValue};
use crate::core::error::Result;
use crate::core::{FileKind, ObjectId, ObjectType};
use crate::fst::morphology::{Dictionary, MorphologyFst, ScriptType};
use crate::fst::phonology::{verification_string, PhonologyFst};
use crate::fst::{run_apply, run_compile};
use crate::lm::trie::Trie;
use crate::lm::LanguageModel;
use crate::object::ObjectHandle;
use crate::parse::Parse;
use crate::toolkit::{ApplyDirection, FstToolkit};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Composes a phonology, morphology, and language model into one
/// morphophonology transducer and answers `parse` queries against it.
///
/// The parser never holds a live reference back to the `LanguageModel` or
/// `MorphologyFst` it was generated from: every attribute and artifact it
/// needs is replicated into its own workspace at `generate_and_compile`
/// time, so a dropped dependency does not invalidate a parser that has
/// already generated successfully.
#[derive(Debug)]
pub struct MorphologicalParser {
    handle: ObjectHandle,

    generate_attempt: Option<Uuid>,
    generate_succeeded: bool,
    generate_message: String,

    compile_attempt: Option<Uuid>,
    compile_succeeded: bool,
    compile_message: String,

    persist_cache: bool,
    word_boundary_symbol: String,
    boundaries: bool,
    rare_delimiter: char,
    morpheme_delimiters: Vec<char>,
    rich_upper: bool,
    rich_lower: bool,
    rules_generated: String,
    start_symbol: String,
    end_symbol: String,
    categorial: bool,

    dictionary: Option<Dictionary>,
    cache: Cache,
    lm_trie: Option<Trie>,
}

impl MorphologicalParser {
    /// Construct a parser over a fresh workspace, with its own
    /// file-backed cache.
    pub fn new(
        parent_directory: impl Into<PathBuf>,
        object_id: ObjectId,
        cache_capacity: NonZeroUsize,
        persist_cache: bool,
    ) -> Result<Self> {
        let handle = ObjectHandle::new(parent_directory, ObjectType::Morphophonology, object_id)?;
        let cache_path = handle.file_path(FileKind::Cache);
        let cache = Cache::with_file_backend(&cache_path, cache_capacity);
        Ok(Self {
            handle,
            generate_attempt: None,
            generate_succeeded: false,
            generate_message: String::new(),
            compile_attempt: None,
            compile_succeeded: false,
            compile_message: String::new(),
            persist_cache,
            word_boundary_symbol: "#".to_string(),
            boundaries: false,
            rare_delimiter: '\u{2980}',
            morpheme_delimiters: vec!['-', '='],
            rich_upper: true,
            rich_lower: true,
            rules_generated: String::new(),
            start_symbol: "<s>".to_string(),
            end_symbol: "</s>".to_string(),
            categorial: false,
            dictionary: None,
            cache,
            lm_trie: None,
        })
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn generate_succeeded(&self) -> bool {
        self.generate_succeeded
    }

    pub fn generate_message(&self) -> &str {
        &self.generate_message
    }

    pub fn compile_succeeded(&self) -> bool {
        self.compile_succeeded
    }

    pub fn compile_message(&self) -> &str {
        &self.compile_message
    }

    fn parse_codec(&self) -> Parse {
        Parse::new(self.rare_delimiter, self.morpheme_delimiters.clone())
    }

    /// Regenerate the morphophonology FST from its dependencies, replicate
    /// their attributes and artifacts into this parser's own workspace, and
    /// clear the persistent cache if anything actually changed.
    ///
    /// `compile_succeeded` reflects only whether the phonology/morphology
    /// composition compiled; `generate_succeeded` additionally requires the
    /// language model to have replicated successfully, so a parser can
    /// report a working morphophonology binary while still flagging that it
    /// has no usable ranking model yet.
    pub fn generate_and_compile(
        &mut self,
        phonology: Option<&PhonologyFst>,
        morphology: Option<&MorphologyFst>,
        language_model: Option<&LanguageModel>,
        toolkit: &dyn FstToolkit,
        timeout: Duration,
    ) -> Result<()> {
        self.generate_attempt = Some(Uuid::new_v4());
        let mut changed = false;
        let mut generate_succeeded = true;
        let mut generate_message = String::new();

        match (phonology, morphology) {
            (Some(phon), Some(morph)) => {
                let script = build_morphophonology_script(morph, phon)?;
                let script_path = self.handle.file_path(FileKind::Script);
                std::fs::write(&script_path, &script)?;

                let binary_path = self.handle.file_path(FileKind::Binary);
                let driver = format!(
                    "source {source}\nregex morphophonology;\nsave stack {binary}\nquit\n",
                    source = script_path.display(),
                    binary = binary_path.display(),
                );
                let verification = verification_string(ObjectType::Morphophonology);

                let outcome = run_compile(&self.handle, &driver, toolkit, timeout, &verification)?;
                self.compile_attempt = Some(outcome.attempt);
                self.compile_succeeded = outcome.succeeded;
                self.compile_message = outcome.message;
            }
            _ => {
                generate_succeeded = false;
                generate_message.push_str("missing phonology or morphology dependency; ");
            }
        }

        if let Some(morph) = morphology {
            changed |= replicate::set_attr(&mut self.word_boundary_symbol, morph.word_boundary_symbol().to_string());
            changed |= replicate::set_attr(&mut self.rare_delimiter, morph.rare_delimiter());
            changed |= replicate::set_attr(&mut self.rich_upper, morph.rich_upper());
            changed |= replicate::set_attr(&mut self.rich_lower, morph.rich_lower());
            changed |= replicate::set_attr(&mut self.rules_generated, morph.rules_generated().to_string());
            changed |= replicate::set_attr(&mut self.morpheme_delimiters, morph.morpheme_delimiters().to_vec());

            let morph_source = morph.handle().file_path(match morph.script_type() {
                ScriptType::Lexc => FileKind::Lexicon,
                ScriptType::Regex => FileKind::Script,
            });
            let morph_dest = self.handle.file_path(match morph.script_type() {
                ScriptType::Lexc => FileKind::Lexicon,
                ScriptType::Regex => FileKind::Script,
            });
            changed |= replicate::copy_file(&morph_source, &morph_dest)?;

            if !morph.rich_upper() {
                let dict_source = morph.handle().file_path(FileKind::Dictionary);
                let dict_dest = self.handle.file_path(FileKind::Dictionary);
                if replicate::copy_file(&dict_source, &dict_dest)? {
                    changed = true;
                }
                if dict_dest.exists() {
                    self.dictionary = Some(crate::fst::morphology::load_dictionary(&dict_dest)?);
                }
            }
        } else {
            generate_succeeded = false;
            generate_message.push_str("no morphology to replicate attributes from; ");
        }

        if let Some(phon) = phonology {
            // The composed morphophonology script already lives at this
            // parser's own Script path (written above); only attributes are
            // replicated here, not the phonology script itself.
            changed |= replicate::set_attr(&mut self.boundaries, phon.boundaries());
        } else {
            generate_succeeded = false;
            generate_message.push_str("no phonology to replicate attributes from; ");
        }

        if let Some(lm) = language_model {
            let trie_src = lm.handle().file_path(FileKind::Trie);
            let trie_dst = self.handle.file_path(FileKind::Trie);
            changed |= replicate::copy_file(&trie_src, &trie_dst)?;

            let arpa_src = lm.handle().file_path(FileKind::Arpa);
            let arpa_dst = self.handle.file_path(FileKind::Arpa);
            changed |= replicate::copy_file(&arpa_src, &arpa_dst)?;

            changed |= replicate::set_attr(&mut self.start_symbol, lm.start_symbol().to_string());
            changed |= replicate::set_attr(&mut self.end_symbol, lm.end_symbol().to_string());
            changed |= replicate::set_attr(&mut self.categorial, lm.categorial());

            if trie_dst.exists() {
                self.lm_trie = Some(Trie::load(&trie_dst)?);
            } else {
                generate_succeeded = false;
                generate_message.push_str("language model has no trie to replicate; ");
            }
        } else {
            generate_succeeded = false;
            generate_message.push_str("no language model to replicate from; ");
        }

        if changed {
            tracing::info!(parser = %self.handle.object_id(), "dependency change detected, clearing persistent cache");
            self.cache.clear(true)?;
            self.lm_trie = None;
        }

        self.generate_succeeded = generate_succeeded;
        self.generate_message = if generate_succeeded {
            "generated successfully".to_string()
        } else {
            generate_message.trim_end().chars().take(255).collect()
        };

        Ok(())
    }

    /// Parse each transcription, returning a cache hit where available and
    /// otherwise applying the morphophonology binary, disambiguating
    /// impoverished analyses against the replicated dictionary, ranking
    /// surviving candidates by language-model log-probability, and
    /// truncating to `max_candidates`.
    pub fn parse(
        &mut self,
        transcriptions: &[String],
        max_candidates: usize,
        toolkit: &dyn FstToolkit,
        apply_timeout: Duration,
    ) -> Result<HashMap<String, CacheValue>> {
        let max_candidates = crate::security::validate_max_candidates(max_candidates)?;

        let mut ordered: Vec<String> = Vec::new();
        for t in transcriptions {
            if !ordered.contains(t) {
                ordered.push(t.clone());
            }
        }

        let mut results: HashMap<String, CacheValue> = HashMap::new();
        let mut uncached: Vec<String> = Vec::new();
        for t in &ordered {
            if let Some(hit) = self.cache.get(t)? {
                results.insert(t.clone(), hit);
            } else {
                uncached.push(t.clone());
            }
        }

        if !uncached.is_empty() {
            let binary_path = self.handle.file_path(FileKind::Binary);
            let boundary = self.boundaries.then_some(self.word_boundary_symbol.as_str());
            let raw = run_apply(
                &self.handle,
                &binary_path,
                &uncached,
                ApplyDirection::Up,
                boundary,
                toolkit,
                apply_timeout,
            )?;

            for t in &uncached {
                let raw_candidates = raw.get(t).cloned().unwrap_or_default();
                let expanded: Vec<String> = if self.rich_upper {
                    raw_candidates
                } else {
                    raw_candidates
                        .iter()
                        .flat_map(|c| self.disambiguate(c))
                        .collect()
                };

                let mut ranked = self.rank(&expanded)?;
                ranked.truncate(max_candidates);

                let value = CacheValue {
                    best: ranked.first().cloned(),
                    candidates: ranked,
                };
                self.cache.set(t.clone(), value.clone())?;
                results.insert(t.clone(), value);
            }

            if self.persist_cache {
                self.cache.persist()?;
            }
        }

        Ok(results)
    }

    /// Split an impoverished candidate's bare forms, look each up in the
    /// replicated dictionary, take the Cartesian product of its
    /// gloss/category alternatives, and keep only products whose category
    /// sequence is in `rules_generated`. A form absent from the dictionary
    /// drops the entire candidate, per the disambiguation contract.
    fn disambiguate(&self, raw: &str) -> Vec<String> {
        let Some(dictionary) = &self.dictionary else {
            return Vec::new();
        };
        let codec = self.parse_codec();
        let chunks = codec.split_morphemes(raw);

        let mut per_morpheme: Vec<Vec<(String, String)>> = Vec::with_capacity(chunks.len());
        for (form, _) in &chunks {
            match dictionary.get(form) {
                Some(alts) if !alts.is_empty() => per_morpheme.push(alts.clone()),
                _ => return Vec::new(),
            }
        }

        let mut products: Vec<Vec<(String, String)>> = vec![Vec::new()];
        for alts in &per_morpheme {
            let mut next = Vec::with_capacity(products.len() * alts.len());
            for prefix in &products {
                for alt in alts {
                    let mut combo = prefix.clone();
                    combo.push(alt.clone());
                    next.push(combo);
                }
            }
            products = next;
        }

        let whitelist: Vec<&str> = self.rules_generated.split_whitespace().collect();
        let mut out = Vec::new();
        for combo in products {
            let mut sequence = String::new();
            let mut parse = String::new();
            for (i, (form, delim)) in chunks.iter().enumerate() {
                let (gloss, category) = &combo[i];
                sequence.push_str(category);
                parse.push_str(form);
                parse.push(self.rare_delimiter);
                parse.push_str(gloss);
                parse.push(self.rare_delimiter);
                parse.push_str(category);
                if let Some(d) = delim {
                    sequence.push(*d);
                    parse.push(*d);
                }
            }
            if whitelist.is_empty() || whitelist.iter().any(|rule| *rule == sequence) {
                out.push(parse);
            }
        }
        out
    }

    /// Stable-sort `candidates` by descending language-model log
    /// probability of their (optionally category-reduced) token sequence,
    /// keeping ties in enumeration order.
    fn rank(&mut self, candidates: &[String]) -> Result<Vec<String>> {
        let codec = self.parse_codec();
        let mut scored: Vec<(f64, usize, String)> = Vec::with_capacity(candidates.len());
        for (i, candidate) in candidates.iter().enumerate() {
            let morphemes = codec.morphemes(candidate)?;
            let mut tokens: Vec<String> = vec![self.start_symbol.clone()];
            tokens.extend(morphemes.into_iter().map(|m| if self.categorial { m.category } else { m.form }));
            tokens.push(self.end_symbol.clone());

            let score = match &self.lm_trie {
                Some(trie) => trie.score(&tokens),
                None => self.load_trie()?.score(&tokens),
            };
            scored.push((score, i, candidate.clone()));
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().map(|(_, _, c)| c).collect())
    }

    fn load_trie(&mut self) -> Result<&Trie> {
        if self.lm_trie.is_none() {
            self.lm_trie = Some(Trie::load(&self.handle.file_path(FileKind::Trie))?);
        }
        Ok(self.lm_trie.as_ref().unwrap())
    }
}

/// Splice the phonology script's `define phonology <expr>;` statement into
/// `define morphophonology morphology .o. <expr>;`, preserving every other
/// definition the phonology script makes (alphabets, multichar symbols,
/// auxiliary rules) so the composed script remains self-contained. Falls
/// back to an identity phonology (`?*`) when the phonology script does not
/// define `phonology` at all.
fn build_morphophonology_script(morphology: &MorphologyFst, phonology: &PhonologyFst) -> Result<String> {
    let mut out = String::new();
    match morphology.script_type() {
        ScriptType::Lexc => {
            let lexicon_path = morphology.handle().file_path(FileKind::Lexicon);
            out.push_str(&format!(
                "read lexc {}\ndefine morphology;\n",
                lexicon_path.display()
            ));
        }
        ScriptType::Regex => {
            out.push_str(morphology.script());
            out.push('\n');
        }
    }
    out.push_str(&splice_phonology_definition(phonology.script()));
    Ok(out)
}

fn splice_phonology_definition(phonology_script: &str) -> String {
    const KEYWORD: &str = "define phonology";
    if let Some(start) = phonology_script.find(KEYWORD) {
        if let Some(rel_semi) = phonology_script[start..].find(';') {
            let semi = start + rel_semi;
            let expr = phonology_script[start + KEYWORD.len()..semi].trim();
            let mut spliced = String::with_capacity(phonology_script.len() + 32);
            spliced.push_str(&phonology_script[..start]);
            spliced.push_str(&format!("define morphophonology morphology .o. {expr};"));
            spliced.push_str(&phonology_script[semi + 1..]);
            return spliced;
        }
    }
    format!("{phonology_script}\ndefine morphophonology morphology .o. ?*;\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::morphology::ScriptType;
    use crate::toolkit::FstToolkit;
    use tempfile::TempDir;

    #[test]
    fn test_splice_phonology_definition_replaces_expression() {
        let script = "define alphabet [a b c];\ndefine phonology a -> b || _ c;\n#test ac -> bc\n";
        let spliced = splice_phonology_definition(script);
        assert!(spliced.contains("define morphophonology morphology .o. a -> b || _ c;"));
        assert!(spliced.contains("define alphabet"));
        assert!(!spliced.contains("define phonology"));
    }

    #[test]
    fn test_splice_phonology_definition_falls_back_to_identity() {
        let spliced = splice_phonology_definition("define something_else ?*;\n");
        assert!(spliced.contains("define morphophonology morphology .o. ?*;"));
    }

    #[test]
    fn test_build_morphophonology_script_with_lexc_morphology() {
        let temp = TempDir::new().unwrap();
        let morph = MorphologyFst::new(temp.path(), ObjectId(1), "LEXICON Root\n#;", ScriptType::Lexc).unwrap();
        let phon = PhonologyFst::new(temp.path(), ObjectId(2), "define phonology ?*;\n").unwrap();
        let script = build_morphophonology_script(&morph, &phon).unwrap();
        assert!(script.contains("read lexc"));
        assert!(script.contains("define morphology;"));
        assert!(script.contains("define morphophonology morphology .o. ?*;"));
    }

    #[derive(Debug, Default)]
    struct NoopToolkit;
    impl FstToolkit for NoopToolkit {
        fn compiler_executable(&self) -> &str {
            "true"
        }
        fn lookup_executable(&self) -> &str {
            "true"
        }
        fn compile_command(&self, _driver_script: &std::path::Path) -> Vec<String> {
            vec!["true".to_string()]
        }
        fn apply_command(&self, _direction: ApplyDirection, _binary: &std::path::Path) -> Vec<String> {
            vec!["true".to_string()]
        }
    }

    #[test]
    fn test_generate_and_compile_reports_missing_language_model() {
        let temp = TempDir::new().unwrap();
        let mut morph = MorphologyFst::new(temp.path(), ObjectId(10), "define morphology ?*;\n", ScriptType::Regex).unwrap();
        morph.save_script().unwrap();
        let mut phon = PhonologyFst::new(temp.path(), ObjectId(11), "define phonology ?*;\n").unwrap();
        phon.save_script().unwrap();

        let mut parser = MorphologicalParser::new(temp.path(), ObjectId(12), NonZeroUsize::new(8).unwrap(), false).unwrap();
        let toolkit = NoopToolkit;
        // `true` never writes the expected verification string or binary,
        // so compile fails, but generate still proceeds far enough to
        // report the missing language model distinctly.
        parser
            .generate_and_compile(Some(&phon), Some(&morph), None, &toolkit, Duration::from_secs(1))
            .unwrap();
        assert!(!parser.generate_succeeded());
        assert!(parser.generate_message().contains("language model"));
    }

    #[test]
    fn test_disambiguate_drops_forms_absent_from_dictionary() {
        let temp = TempDir::new().unwrap();
        let mut parser = MorphologicalParser::new(temp.path(), ObjectId(20), NonZeroUsize::new(8).unwrap(), false).unwrap();
        parser.dictionary = Some(Dictionary::new());
        parser.rare_delimiter = '\u{2980}';
        parser.morpheme_delimiters = vec!['-'];
        let out = parser.disambiguate("chien-s");
        assert!(out.is_empty());
    }

    #[test]
    fn test_disambiguate_filters_by_rule_whitelist() {
        let temp = TempDir::new().unwrap();
        let mut parser = MorphologicalParser::new(temp.path(), ObjectId(21), NonZeroUsize::new(8).unwrap(), false).unwrap();
        let mut dict = Dictionary::new();
        dict.insert("chien".to_string(), vec![("dog".to_string(), "N".to_string())]);
        dict.insert("s".to_string(), vec![("PL".to_string(), "PL".to_string()), ("STEM".to_string(), "V".to_string())]);
        parser.dictionary = Some(dict);
        parser.rare_delimiter = '\u{2980}';
        parser.morpheme_delimiters = vec!['-'];
        parser.rules_generated = "N-PL".to_string();

        let out = parser.disambiguate("chien-s");
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("PL"));
    }
}
