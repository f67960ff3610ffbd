//! An immutable back-off trie loaded from an ARPA-format n-gram language
//! model file, serialized to disk with `bincode` rather than a
//! language-specific pickle.

use crate::core::error::{ParserError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Log probability assigned to an unseen unigram; keeps scoring total
/// order rather than panicking on out-of-vocabulary tokens.
const OOV_LOG_PROB: f64 = -99.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct NgramEntry {
    log_prob: f64,
    backoff: f64,
}

/// A deterministic n-gram back-off trie: maps an n-gram (as an ordered
/// token sequence) to its ARPA log-probability and back-off weight.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Trie {
    order: usize,
    entries: HashMap<Vec<String>, NgramEntry>,
}

impl Trie {
    /// Parse a textual ARPA file into a trie.
    pub fn parse_arpa(text: &str) -> Result<Self> {
        let mut entries = HashMap::new();
        let mut order = 0usize;
        let mut current_order: Option<usize> = None;

        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() || line == "\\data\\" || line == "\\end\\" {
                continue;
            }
            if let Some(rest) = line.strip_prefix("ngram ") {
                if let Some((n, _count)) = rest.split_once('=') {
                    if let Ok(n) = n.trim().parse::<usize>() {
                        order = order.max(n);
                    }
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix('\\') {
                if let Some(n_str) = rest.strip_suffix("-grams:") {
                    current_order = n_str.parse::<usize>().ok();
                }
                continue;
            }

            let Some(n) = current_order else { continue };
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 1 + n {
                continue;
            }
            let log_prob: f64 = fields[0]
                .parse()
                .map_err(|_| ParserError::ScriptNotWellFormed(format!("malformed ARPA log prob: {line}")))?;
            let tokens: Vec<String> = fields[1..1 + n].iter().map(|s| s.to_string()).collect();
            let backoff = fields
                .get(1 + n)
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);

            entries.insert(tokens, NgramEntry { log_prob, backoff });
        }

        if order == 0 {
            return Err(ParserError::ScriptNotWellFormed(
                "ARPA file declared no n-gram orders".to_string(),
            ));
        }

        Ok(Self { order, entries })
    }

    /// Serialize this trie to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let encoded = bincode::serialize(self).map_err(|e| ParserError::Serialization(e.to_string()))?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Load a trie previously written by [`Trie::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        bincode::deserialize(&bytes).map_err(|e| ParserError::Serialization(e.to_string()))
    }

    /// The maximum n-gram order present in this trie.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Score a full token sequence (already including any start/end
    /// symbols) as the sum of its conditional log probabilities, each
    /// conditioned on up to `order - 1` preceding tokens, with standard
    /// Katz-style back-off when a higher-order context is unseen.
    pub fn score(&self, sequence: &[String]) -> f64 {
        let mut total = 0.0;
        for i in 0..sequence.len() {
            let context_start = i.saturating_sub(self.order.saturating_sub(1));
            let context = &sequence[context_start..i];
            total += self.conditional_log_prob(context, &sequence[i]);
        }
        total
    }

    fn conditional_log_prob(&self, context: &[String], word: &str) -> f64 {
        let mut ngram: Vec<String> = context.to_vec();
        ngram.push(word.to_string());
        if let Some(entry) = self.entries.get(&ngram) {
            return entry.log_prob;
        }
        if context.is_empty() {
            return OOV_LOG_PROB;
        }
        let backoff_weight = self.entries.get(context).map(|e| e.backoff).unwrap_or(0.0);
        backoff_weight + self.conditional_log_prob(&context[1..], word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY_ARPA: &str = "\\data\\\nngram 1=4\nngram 2=2\n\n\\1-grams:\n-1.0\t<s>\t-0.3\n-1.0\t</s>\n-0.5\tfall\t-0.2\n-2.0\tdog\n\n\\2-grams:\n-0.1\t<s>\tfall\n-0.2\tfall\t</s>\n\n\\end\\\n";

    #[test]
    fn test_parse_arpa_and_score_seen_bigram() {
        let trie = Trie::parse_arpa(TOY_ARPA).unwrap();
        assert_eq!(trie.order(), 2);
        let seq = vec!["<s>".to_string(), "fall".to_string(), "</s>".to_string()];
        let score = trie.score(&seq);
        // <s> unigram + fall|<s> bigram (-0.1) + </s>|fall bigram (-0.2)
        assert!((score - (-1.0 + -0.1 + -0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_score_backs_off_for_unseen_bigram() {
        let trie = Trie::parse_arpa(TOY_ARPA).unwrap();
        let seq = vec!["dog".to_string(), "fall".to_string()];
        // dog->fall bigram unseen: backoff(dog)=0.0 (no entry) + fall unigram (-0.5)
        let score = trie.score(&seq);
        assert!((score - (-2.0 + -0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_save_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let trie = Trie::parse_arpa(TOY_ARPA).unwrap();
        let path = temp.path().join("trie.bin");
        trie.save(&path).unwrap();
        let loaded = Trie::load(&path).unwrap();
        assert_eq!(trie, loaded);
    }
}
