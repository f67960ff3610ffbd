//! Morphological parser example: generates, compiles, and queries a toy
//! morphophonology over a scratch workspace.

use morphoparse::config::ParserConfig;
use morphoparse::core::ObjectId;
use morphoparse::fst::morphology::{MorphologyFst, ScriptType};
use morphoparse::fst::phonology::PhonologyFst;
use morphoparse::lm::LanguageModel;
use morphoparse::logging;
use morphoparse::parser::MorphologicalParser;
use morphoparse::process::ScriptedCommand;
use morphoparse::toolkit::FomaToolkit;
use std::num::NonZeroUsize;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging()?;

    if !ScriptedCommand::executable_installed("foma") || !ScriptedCommand::executable_installed("flookup") {
        println!("foma/flookup not found on PATH; install the foma toolkit to run this example");
        return Ok(());
    }

    let config = ParserConfig::from_env();
    let root = std::env::temp_dir().join("morphoparse-example");
    std::fs::create_dir_all(&root)?;
    let timeout = Duration::from_secs(config.toolkit_timeout_secs);
    let toolkit = FomaToolkit;

    println!("Building a toy morphology over 'chien-s' (dog-PL) ...");
    let mut morphology = MorphologyFst::new(
        &root,
        ObjectId(1),
        "define morphology [c h i e n] \"-\" [s] | [c h i e n];\n",
        ScriptType::Regex,
    )?;
    morphology.compile(&toolkit, timeout)?;
    if !morphology.compile_succeeded() {
        println!("morphology compile failed: {}", morphology.compile_message());
        return Ok(());
    }

    let mut phonology = PhonologyFst::new(&root, ObjectId(2), "define phonology ?*;\n")?;
    phonology.compile(&toolkit, timeout)?;
    if !phonology.compile_succeeded() {
        println!("phonology compile failed: {}", phonology.compile_message());
        return Ok(());
    }

    let mut language_model = LanguageModel::new(&root, ObjectId(3), "chien-s\nchien\n")?;
    if ScriptedCommand::executable_installed("estimate-ngram") {
        let lm_toolkit = morphoparse::toolkit::MitlmToolkit;
        language_model.write_arpa(&lm_toolkit, timeout)?;
        if language_model.write_succeeded() {
            language_model.generate_trie()?;
        }
    }

    let mut parser = MorphologicalParser::new(
        &root,
        ObjectId(4),
        NonZeroUsize::new(config.max_candidates).unwrap_or(NonZeroUsize::new(100).unwrap()),
        config.persist_cache,
    )?;
    parser.generate_and_compile(
        Some(&phonology),
        Some(&morphology),
        Some(&language_model),
        &toolkit,
        timeout,
    )?;

    println!(
        "generate: succeeded={} message={}",
        parser.generate_succeeded(),
        parser.generate_message()
    );
    println!(
        "compile: succeeded={} message={}",
        parser.compile_succeeded(),
        parser.compile_message()
    );

    if parser.generate_succeeded() {
        let results = parser.parse(
            &["chien-s".to_string()],
            config.max_candidates,
            &toolkit,
            timeout,
        )?;
        if let Some(value) = results.get("chien-s") {
            println!("best parse: {:?}", value.best);
            println!("candidates: {:?}", value.candidates);
        }
    }

    Ok(())
}
