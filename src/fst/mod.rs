//! Shared FST machinery: reserved-symbol escaping, the `decombine`
//! workaround, embedded-test scanning, and lookup-output parsing, used by
//! both [`phonology::PhonologyFst`] and [`morphology::MorphologyFst`].

pub mod morphology;
pub mod phonology;

use crate::core::error::Result;
use crate::core::FileKind;
use crate::object::ObjectHandle;
use crate::process::ScriptedCommand;
use crate::toolkit::FstToolkit;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a single `compile` attempt, per the state machine in
/// `spec.md` §4.2: `UNBUILT -> BUILDING -> COMPILED_OK` or `FAILED`.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub succeeded: bool,
    pub message: String,
    pub attempt: Uuid,
}

/// Write `driver_script` to the object's compiler-script path, run it
/// through `toolkit`, and judge success by the three criteria the spec
/// requires together: verification string present in stdout, zero exit
/// code, and a changed binary modification time. On any failure the binary
/// at the target path is removed and `compile_attempt` still advances.
pub fn run_compile(
    handle: &ObjectHandle,
    driver_script: &str,
    toolkit: &dyn FstToolkit,
    timeout: Duration,
    verification_string: &str,
) -> Result<CompileOutcome> {
    let driver_path = handle.file_path(FileKind::Compiler);
    let binary_path = handle.file_path(FileKind::Binary);

    std::fs::write(&driver_path, driver_script)?;

    let mtime_before = ScriptedCommand::modification_time(&binary_path);
    let argv = toolkit.compile_command(&driver_path);
    let outcome = ScriptedCommand::new(handle).run(&argv, timeout)?;
    let mtime_after = ScriptedCommand::modification_time(&binary_path);

    let attempt = Uuid::new_v4();

    if outcome.timed_out {
        if binary_path.exists() {
            std::fs::remove_file(&binary_path)?;
        }
        return Ok(CompileOutcome {
            succeeded: false,
            message: truncate_message("process timed out"),
            attempt,
        });
    }

    let verification_present = outcome.log.contains(verification_string);
    let binary_changed = match (mtime_before, mtime_after) {
        (None, Some(_)) => true,
        (Some(before), Some(after)) => after > before,
        _ => false,
    };

    let succeeded = verification_present && outcome.exit_code == 0 && binary_changed;

    if succeeded {
        Ok(CompileOutcome {
            succeeded: true,
            message: truncate_message("compiled successfully"),
            attempt,
        })
    } else {
        if binary_path.exists() {
            std::fs::remove_file(&binary_path)?;
        }
        let message = if !verification_present {
            "script not well-formed".to_string()
        } else if outcome.exit_code != 0 {
            "process failed".to_string()
        } else {
            "raised an error".to_string()
        };
        Ok(CompileOutcome {
            succeeded: false,
            message: truncate_message(&message),
            attempt,
        })
    }
}

fn truncate_message(message: &str) -> String {
    message.chars().take(255).collect()
}

/// Apply a compiled binary to `inputs` in the given `direction`, via a
/// shell-driven invocation of the lookup tool: write inputs to a
/// randomly-salted file, redirect it into the lookup tool, capture its
/// output into another randomly-salted file, parse it, and delete all
/// temporary files on every exit path.
pub fn run_apply(
    handle: &ObjectHandle,
    binary_path: &std::path::Path,
    inputs: &[String],
    direction: crate::toolkit::ApplyDirection,
    boundary: Option<&str>,
    toolkit: &dyn FstToolkit,
    timeout: Duration,
) -> Result<HashMap<String, Vec<String>>> {
    let ws = handle.ensure_workspace()?;
    let salt = Uuid::new_v4().simple().to_string();
    let input_path = ws.join(format!("inputs_{salt}.txt"));
    let output_path = ws.join(format!("outputs_{salt}.txt"));
    let script_path = ws.join(format!("apply_{salt}.sh"));

    let prepared: Vec<String> = inputs
        .iter()
        .map(|i| match boundary {
            Some(b) => wrap_with_boundary(i, b),
            None => i.clone(),
        })
        .collect();

    let cleanup = |paths: &[&std::path::Path]| {
        for p in paths {
            let _ = std::fs::remove_file(p);
        }
    };

    if let Err(e) = std::fs::write(&input_path, prepared.join("\n")) {
        cleanup(&[&input_path, &output_path, &script_path]);
        return Err(e.into());
    }

    let lookup_argv = toolkit.apply_command(direction, binary_path);
    let shell_line = format!(
        "{} < {} > {}\n",
        shell_join(&lookup_argv),
        shell_quote(&input_path.display().to_string()),
        shell_quote(&output_path.display().to_string()),
    );
    if let Err(e) = std::fs::write(&script_path, shell_line) {
        cleanup(&[&input_path, &output_path, &script_path]);
        return Err(e.into());
    }

    let run_result = ScriptedCommand::new(handle).run(
        &["sh".to_string(), script_path.display().to_string()],
        timeout,
    );

    let raw_output = std::fs::read_to_string(&output_path).unwrap_or_default();
    cleanup(&[&input_path, &output_path, &script_path]);
    run_result?;

    let mut parsed = parse_lookup_output(&raw_output);
    if let Some(b) = boundary {
        for outputs in parsed.values_mut() {
            for out in outputs.iter_mut() {
                *out = strip_boundary(out, b).to_string();
            }
        }
    }
    // Re-key by the caller's un-wrapped inputs.
    if boundary.is_some() {
        let mut rekeyed = HashMap::new();
        for (original, wrapped) in inputs.iter().zip(prepared.iter()) {
            if let Some(v) = parsed.remove(wrapped) {
                rekeyed.insert(original.clone(), v);
            }
        }
        return Ok(rekeyed);
    }
    Ok(parsed)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn shell_join(argv: &[String]) -> String {
    argv.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ")
}

/// The fixed set of foma-reserved regex symbols that must be `%`-escaped
/// when embedded literally in a generated script.
pub const RESERVED_SYMBOLS: &[char] = &[
    '!', '"', '#', '$', '%', '&', '(', ')', '*', '+', ',', '-', '.', '/', '0', ':', ';', '<', '>',
    '?', '[', '\\', ']', '^', '_', '`', '{', '|', '}', '~', '¬', '¹', '×', 'Σ', 'ε', '⁻', '₁',
    '₂', '→', '↔', '∀', '∃', '∅', '∈', '∘', '∥', '∧', '∨', '∩', '∪', '≤', '≥', '≺', '≻',
];

/// Prefix every reserved symbol in `text` with `%` so it is treated as a
/// literal character rather than a regex operator.
pub fn escape_reserved(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED_SYMBOLS.contains(&c) {
            out.push('%');
        }
        out.push(c);
    }
    out
}

/// Remove every occurrence of a reserved symbol from `text`, ignoring
/// whether it was escaped.
pub fn strip_reserved(text: &str) -> String {
    text.chars().filter(|c| !RESERVED_SYMBOLS.contains(c)).collect()
}

/// Precede every Unicode combining character in `script` with two spaces.
///
/// Workaround for a toolkit issue where composed combining sequences in a
/// composed morphophonology no longer match the alphabet of the component
/// morphology (`spec.md` §9's open question); callers opt in explicitly.
pub fn decombine(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    for c in script.chars() {
        if is_combining(c) {
            out.push(' ');
            out.push(' ');
        }
        out.push(c);
    }
    out
}

fn is_combining(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// One embedded test declared by a `#test LHS -> RHS` line in an FST
/// script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedTest {
    pub lhs: String,
    pub rhs: String,
}

/// Scan `script` for `#test LHS -> RHS` lines.
pub fn parse_embedded_tests(script: &str) -> Vec<EmbeddedTest> {
    let mut tests = Vec::new();
    for line in script.lines() {
        let Some(rest) = line.trim_start().strip_prefix("#test ") else {
            continue;
        };
        if let Some((lhs, rhs)) = rest.split_once("->") {
            tests.push(EmbeddedTest {
                lhs: lhs.trim().to_string(),
                rhs: rhs.trim().to_string(),
            });
        }
    }
    tests
}

/// Parse tab-delimited `input<TAB>output` lines produced by the lookup
/// tool into `input -> [outputs]`, mapping the `+?` sentinel ("no output")
/// to an absent entry rather than a literal string, and preserving the
/// order outputs were seen in for a given input.
pub fn parse_lookup_output(raw: &str) -> HashMap<String, Vec<String>> {
    let mut result: HashMap<String, Vec<String>> = HashMap::new();
    for line in raw.lines() {
        let Some((input, output)) = line.split_once('\t') else {
            continue;
        };
        let entry = result.entry(input.to_string()).or_default();
        if output != "+?" {
            entry.push(output.to_string());
        }
    }
    result
}

/// Wrap `input` with `boundary` on both sides, for FST apply calls that
/// request `boundaries=true`.
pub fn wrap_with_boundary(input: &str, boundary: &str) -> String {
    format!("{boundary}{input}{boundary}")
}

/// Strip a leading/trailing `boundary` from `output`, if present on both
/// ends.
pub fn strip_boundary<'a>(output: &'a str, boundary: &str) -> &'a str {
    if !boundary.is_empty() && output.starts_with(boundary) && output.ends_with(boundary) && output.len() >= 2 * boundary.len() {
        &output[boundary.len()..output.len() - boundary.len()]
    } else {
        output
    }
}
