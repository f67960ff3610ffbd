//! `Parse` (C5): the bidirectional mapping between a parse string
//! `f₁⟨rd⟩g₁⟨rd⟩c₁ δ₁ f₂⟨rd⟩g₂⟨rd⟩c₂ δ₂ …` and its triple representation
//! `(forms, glosses, categories)`.

use crate::core::error::{ParserError, Result};

/// A single morpheme: form, gloss, and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub form: String,
    pub gloss: String,
    pub category: String,
}

/// A parse codec configured with a parser's delimiters.
#[derive(Debug, Clone)]
pub struct Parse {
    rare_delimiter: char,
    morpheme_delimiters: Vec<char>,
}

impl Parse {
    pub fn new(rare_delimiter: char, morpheme_delimiters: Vec<char>) -> Self {
        Self {
            rare_delimiter,
            morpheme_delimiters,
        }
    }

    pub fn rare_delimiter(&self) -> char {
        self.rare_delimiter
    }

    pub fn morpheme_delimiters(&self) -> &[char] {
        &self.morpheme_delimiters
    }

    /// Split a string by the configured morpheme delimiters, keeping each
    /// delimiter that followed a chunk so the string can be reconstructed.
    /// The final chunk has no trailing delimiter.
    pub(crate) fn split_morphemes(&self, text: &str) -> Vec<(String, Option<char>)> {
        let mut result = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            if self.morpheme_delimiters.contains(&c) {
                result.push((std::mem::take(&mut current), Some(c)));
            } else {
                current.push(c);
            }
        }
        result.push((current, None));
        result
    }

    /// Parse a full parse string into its ordered list of morphemes,
    /// discarding delimiter positions.
    pub fn morphemes(&self, parse: &str) -> Result<Vec<Morpheme>> {
        self.split_morphemes(parse)
            .into_iter()
            .map(|(chunk, _)| self.split_morpheme_chunk(&chunk))
            .collect()
    }

    fn split_morpheme_chunk(&self, chunk: &str) -> Result<Morpheme> {
        let parts: Vec<&str> = chunk.split(self.rare_delimiter).collect();
        if parts.len() != 3 {
            return Err(ParserError::InputInvalid(format!(
                "malformed morpheme chunk (expected form{rd}gloss{rd}category): {chunk}",
                rd = self.rare_delimiter
            )));
        }
        Ok(Morpheme {
            form: parts[0].to_string(),
            gloss: parts[1].to_string(),
            category: parts[2].to_string(),
        })
    }

    /// Convert a parse string into its triple representation: three
    /// parallel strings (forms, glosses, categories) with the same
    /// morpheme-delimiter positions preserved.
    pub fn parse_to_triple(&self, parse: &str) -> Result<(String, String, String)> {
        let chunks = self.split_morphemes(parse);
        let mut forms = String::new();
        let mut glosses = String::new();
        let mut categories = String::new();

        for (chunk, delim) in chunks {
            let morpheme = self.split_morpheme_chunk(&chunk)?;
            forms.push_str(&morpheme.form);
            glosses.push_str(&morpheme.gloss);
            categories.push_str(&morpheme.category);
            if let Some(d) = delim {
                forms.push(d);
                glosses.push(d);
                categories.push(d);
            }
        }

        Ok((forms, glosses, categories))
    }

    /// Convert a triple representation back into a single parse string.
    pub fn triple_to_parse(&self, forms: &str, glosses: &str, categories: &str) -> Result<String> {
        let f_chunks = self.split_morphemes(forms);
        let g_chunks = self.split_morphemes(glosses);
        let c_chunks = self.split_morphemes(categories);

        if f_chunks.len() != g_chunks.len() || f_chunks.len() != c_chunks.len() {
            return Err(ParserError::InputInvalid(
                "triple components have mismatched morpheme counts".to_string(),
            ));
        }

        let mut out = String::new();
        for i in 0..f_chunks.len() {
            let (form, delim) = &f_chunks[i];
            let (gloss, _) = &g_chunks[i];
            let (category, _) = &c_chunks[i];
            out.push_str(form);
            out.push(self.rare_delimiter);
            out.push_str(gloss);
            out.push(self.rare_delimiter);
            out.push_str(category);
            if let Some(d) = delim {
                out.push(*d);
            }
        }

        Ok(out)
    }

    /// Build a category-sequence string for rule-whitelist matching: each
    /// morpheme's category joined by the same delimiter that separated it
    /// from the next morpheme in the original parse.
    pub fn category_sequence(&self, parse: &str) -> Result<String> {
        let chunks = self.split_morphemes(parse);
        let mut out = String::new();
        for (chunk, delim) in chunks {
            let morpheme = self.split_morpheme_chunk(&chunk)?;
            out.push_str(&morpheme.category);
            if let Some(d) = delim {
                out.push(d);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> Parse {
        Parse::new('\u{2980}', vec!['-'])
    }

    #[test]
    fn test_round_trip_through_triple() {
        let p = codec();
        let original = "tombe\u{2980}fall\u{2980}V-ait\u{2980}3SG.IMPV\u{2980}AGR";
        let (forms, glosses, categories) = p.parse_to_triple(original).unwrap();
        let rebuilt = p.triple_to_parse(&forms, &glosses, &categories).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_morphemes() {
        let p = codec();
        let morphemes = p
            .morphemes("tombe\u{2980}fall\u{2980}V-ait\u{2980}3SG.IMPV\u{2980}AGR")
            .unwrap();
        assert_eq!(morphemes.len(), 2);
        assert_eq!(morphemes[0].form, "tombe");
        assert_eq!(morphemes[1].category, "AGR");
    }

    #[test]
    fn test_category_sequence() {
        let p = codec();
        let seq = p
            .category_sequence("le\u{2980}the\u{2980}D-chien\u{2980}dog\u{2980}N")
            .unwrap();
        assert_eq!(seq, "D-N");
    }

    #[test]
    fn test_malformed_chunk_rejected() {
        let p = codec();
        assert!(p.parse_to_triple("onlyoneform").is_err());
    }
}
