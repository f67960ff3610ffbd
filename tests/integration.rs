//! End-to-end coverage of the morphological parser's composed behavior,
//! using fake FST/LM toolkits (plain shell pipelines) so the suite never
//! depends on `foma`/`flookup`/`estimate-ngram` being installed.

use morphoparse::core::ObjectId;
use morphoparse::fst::morphology::{Dictionary, MorphologyFst, ScriptType};
use morphoparse::fst::phonology::PhonologyFst;
use morphoparse::lm::LanguageModel;
use morphoparse::parser::MorphologicalParser;
use morphoparse::toolkit::{ApplyDirection, FstToolkit, LmToolkit};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A stand-in FST toolkit: `compile_command` inspects the driver script it
/// is handed (rather than actually invoking `foma`) and shells out to
/// `touch`/`echo` to fake a successful compile; `apply_command` shells out
/// to `awk` to echo every input line back as its own analysis, which is
/// enough to exercise the disambiguation and ranking stages without a real
/// transducer.
#[derive(Debug, Default)]
struct FakeFstToolkit {
    apply_calls: Arc<AtomicUsize>,
    write_binary: bool,
}

impl FakeFstToolkit {
    fn new() -> Self {
        Self { apply_calls: Arc::new(AtomicUsize::new(0)), write_binary: true }
    }

    fn without_binary_write() -> Self {
        Self { apply_calls: Arc::new(AtomicUsize::new(0)), write_binary: false }
    }
}

impl FstToolkit for FakeFstToolkit {
    fn compiler_executable(&self) -> &str {
        "sh"
    }

    fn lookup_executable(&self) -> &str {
        "sh"
    }

    fn compile_command(&self, driver_script: &Path) -> Vec<String> {
        let contents = std::fs::read_to_string(driver_script).unwrap_or_default();
        let binary = extract_save_stack_path(&contents);
        let verification = if contents.contains("read lexc") {
            "Done!".to_string()
        } else {
            extract_regex_name(&contents)
                .map(|name| format!("defined {name}: "))
                .unwrap_or_default()
        };
        let script = if self.write_binary {
            format!("touch '{binary}'; echo '{verification}'")
        } else {
            format!("echo '{verification}'")
        };
        vec!["sh".to_string(), "-c".to_string(), script]
    }

    fn apply_command(&self, _direction: ApplyDirection, _binary: &Path) -> Vec<String> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        vec!["awk".to_string(), "{print $0\"\\t\"$0}".to_string()]
    }
}

fn extract_save_stack_path(contents: &str) -> String {
    for line in contents.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("save stack ") {
            return rest.trim().to_string();
        }
    }
    String::new()
}

fn extract_regex_name(contents: &str) -> Option<String> {
    for line in contents.lines() {
        if let Some(rest) = line.trim().strip_prefix("regex ") {
            return Some(rest.trim_end_matches(';').trim().to_string());
        }
    }
    None
}

/// A stand-in LM toolkit: writes a minimal valid unigram ARPA file instead
/// of invoking `estimate-ngram`.
#[derive(Debug, Default)]
struct FakeLmToolkit;

impl LmToolkit for FakeLmToolkit {
    fn executable(&self) -> &str {
        "sh"
    }

    fn write_arpa_command(
        &self,
        _order: u32,
        _smoothing: &str,
        _corpus: &Path,
        arpa_out: &Path,
        _vocabulary: Option<&Path>,
    ) -> Vec<String> {
        let arpa = "\\data\\\nngram 1=4\n\n\\1-grams:\n-1.0\t<s>\n-1.0\t</s>\n-0.3\tN\n-0.5\tPL\n\n\\end\\\n";
        let script = format!("printf '%s' '{arpa}' > '{}'; echo 'Saving LM to {}'", arpa_out.display(), arpa_out.display());
        vec!["sh".to_string(), "-c".to_string(), script]
    }

    fn verification_string(&self, arpa_out: &Path) -> String {
        format!("Saving LM to {}", arpa_out.display())
    }
}

/// Builds a toy parser whose upper-side analyses are impoverished bare
/// forms (`"chien-s"`), disambiguated against a hand-built dictionary, with
/// `rules_generated` restricting which category sequences survive.
fn build_toy_parser(root: &Path, toolkit: &FakeFstToolkit) -> MorphologicalParser {
    let mut morphology = MorphologyFst::new(
        root,
        ObjectId(1),
        "define morphology [c h i e n] (\"-\" s);\n",
        ScriptType::Regex,
    )
    .unwrap();
    morphology.set_rich_upper(false);
    morphology.set_rules_generated("N-PL N");
    let mut dictionary = Dictionary::new();
    dictionary.insert("chien".to_string(), vec![("dog".to_string(), "N".to_string())]);
    dictionary.insert(
        "s".to_string(),
        vec![("PL".to_string(), "PL".to_string()), ("STEM".to_string(), "V".to_string())],
    );
    morphology.set_dictionary(dictionary);
    morphology.compile(toolkit, Duration::from_secs(5)).unwrap();
    assert!(morphology.compile_succeeded(), "{}", morphology.compile_message());

    let mut phonology = PhonologyFst::new(root, ObjectId(2), "define phonology ?*;\n").unwrap();
    phonology.compile(toolkit, Duration::from_secs(5)).unwrap();
    assert!(phonology.compile_succeeded(), "{}", phonology.compile_message());

    let mut lm = LanguageModel::new(root, ObjectId(3), "chien\u{2980}dog\u{2980}N chien\u{2980}dog\u{2980}N-s\u{2980}PL\u{2980}PL\n").unwrap();
    let lm_toolkit = FakeLmToolkit;
    lm.write_arpa(&lm_toolkit, Duration::from_secs(5)).unwrap();
    assert!(lm.write_succeeded());
    lm.generate_trie().unwrap();

    let mut parser = MorphologicalParser::new(root, ObjectId(4), NonZeroUsize::new(16).unwrap(), true).unwrap();
    parser
        .generate_and_compile(Some(&phonology), Some(&morphology), Some(&lm), toolkit, Duration::from_secs(5))
        .unwrap();
    assert!(parser.generate_succeeded(), "{}", parser.generate_message());
    assert!(parser.compile_succeeded(), "{}", parser.compile_message());
    parser
}

#[test]
fn test_disambiguation_and_ranking_end_to_end() {
    let temp = TempDir::new().unwrap();
    let toolkit = FakeFstToolkit::new();
    let mut parser = build_toy_parser(temp.path(), &toolkit);

    let results = parser
        .parse(&["chien-s".to_string()], 10, &toolkit, Duration::from_secs(5))
        .unwrap();
    let value = results.get("chien-s").expect("transcription must be present");
    assert!(value.best.is_some());
    // Every surviving candidate's category sequence must be in the
    // whitelist; a V reading of "s" would produce "N-V", which is absent.
    for candidate in &value.candidates {
        assert!(candidate.contains("\u{2980}PL"), "unexpected candidate: {candidate}");
    }
}

#[test]
fn test_cache_hit_skips_second_apply_call() {
    let temp = TempDir::new().unwrap();
    let toolkit = FakeFstToolkit::new();
    let mut parser = build_toy_parser(temp.path(), &toolkit);

    let first = parser
        .parse(&["chien-s".to_string()], 10, &toolkit, Duration::from_secs(5))
        .unwrap();
    let calls_after_first = toolkit.apply_calls.load(Ordering::SeqCst);
    assert!(calls_after_first >= 1);

    let second = parser
        .parse(&["chien-s".to_string()], 10, &toolkit, Duration::from_secs(5))
        .unwrap();
    let calls_after_second = toolkit.apply_calls.load(Ordering::SeqCst);

    assert_eq!(calls_after_first, calls_after_second, "a cached transcription must not re-invoke apply");
    assert_eq!(first.get("chien-s"), second.get("chien-s"));
}

#[test]
fn test_compile_fails_when_verification_string_present_but_binary_missing() {
    let temp = TempDir::new().unwrap();
    let toolkit = FakeFstToolkit::without_binary_write();
    let mut phonology = PhonologyFst::new(temp.path(), ObjectId(1), "define phonology ?*;\n").unwrap();
    phonology.compile(&toolkit, Duration::from_secs(5)).unwrap();
    assert!(!phonology.compile_succeeded());
}

#[test]
fn test_apply_times_out_and_reports_failure() {
    let temp = TempDir::new().unwrap();

    #[derive(Debug, Default)]
    struct SlowApplyToolkit;
    impl FstToolkit for SlowApplyToolkit {
        fn compiler_executable(&self) -> &str {
            "sh"
        }
        fn lookup_executable(&self) -> &str {
            "sh"
        }
        fn compile_command(&self, _driver_script: &Path) -> Vec<String> {
            vec!["sh".to_string(), "-c".to_string(), "true".to_string()]
        }
        fn apply_command(&self, _direction: ApplyDirection, _binary: &Path) -> Vec<String> {
            vec!["sh".to_string(), "-c".to_string(), "sleep 5".to_string()]
        }
    }

    let phonology = PhonologyFst::new(temp.path(), ObjectId(1), "define phonology ?*;\n").unwrap();
    let toolkit = SlowApplyToolkit;
    let result = phonology.apply(
        ApplyDirection::Up,
        &["word".to_string()],
        &toolkit,
        Duration::from_millis(200),
    );
    // The subprocess is killed on timeout; the lookup tool never produces
    // output, so the result is an empty mapping rather than an error.
    let outputs = result.unwrap();
    assert!(outputs.get("word").map(|v| v.is_empty()).unwrap_or(true));
}

#[test]
fn test_dependency_change_clears_persistent_cache() {
    let temp = TempDir::new().unwrap();
    let toolkit = FakeFstToolkit::new();
    let mut parser = build_toy_parser(temp.path(), &toolkit);
    parser
        .parse(&["chien-s".to_string()], 10, &toolkit, Duration::from_secs(5))
        .unwrap();

    // Regenerate with a morphology whose rules_generated differs: this is
    // an attribute change, so the cache must be invalidated even though the
    // transcription itself is unchanged.
    let mut morphology = MorphologyFst::new(
        temp.path(),
        ObjectId(1),
        "define morphology [c h i e n] (\"-\" s);\n",
        ScriptType::Regex,
    )
    .unwrap();
    morphology.set_rich_upper(false);
    morphology.set_rules_generated("N");
    let mut dictionary = Dictionary::new();
    dictionary.insert("chien".to_string(), vec![("dog".to_string(), "N".to_string())]);
    dictionary.insert("s".to_string(), vec![("PL".to_string(), "PL".to_string())]);
    morphology.set_dictionary(dictionary);
    morphology.compile(&toolkit, Duration::from_secs(5)).unwrap();

    let phonology = PhonologyFst::new(temp.path(), ObjectId(2), "define phonology ?*;\n").unwrap();
    let lm = LanguageModel::new(temp.path(), ObjectId(3), "chien\n").unwrap();

    parser
        .generate_and_compile(Some(&phonology), Some(&morphology), Some(&lm), &toolkit, Duration::from_secs(5))
        .unwrap();

    // With the whitelist narrowed to "N" alone, "chien-s" (category "N-PL")
    // no longer survives disambiguation.
    let results = parser
        .parse(&["chien-s".to_string()], 10, &toolkit, Duration::from_secs(5))
        .unwrap();
    let value = results.get("chien-s").unwrap();
    assert!(value.candidates.is_empty());
}
