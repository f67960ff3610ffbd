//! `ScriptedCommand` (C1): run a subprocess against an object's workspace
//! with a wall-clock timeout, killing the whole process tree on expiry.

use crate::core::error::{ParserError, Result};
use crate::object::ObjectHandle;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// The outcome of running a scripted command: exit code (or `-1` if the
/// child could not be launched or reaped) and the captured stdout+stderr.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub log: String,
    pub timed_out: bool,
}

/// Runs an external program against an [`ObjectHandle`]'s workspace,
/// capturing combined stdout+stderr into the object's log file and
/// enforcing a wall-clock timeout.
pub struct ScriptedCommand<'a> {
    handle: &'a ObjectHandle,
}

impl<'a> ScriptedCommand<'a> {
    /// Create a scoped command runner for the given object's workspace.
    pub fn new(handle: &'a ObjectHandle) -> Self {
        Self { handle }
    }

    /// Run `argv` with a wall-clock `timeout`, logging combined output to
    /// the object's log file. Polls the child at a fine enough interval
    /// that termination is observed promptly without busy-spinning.
    pub fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutcome> {
        if argv.is_empty() {
            return Err(ParserError::InputInvalid("empty command".to_string()));
        }

        self.handle.ensure_workspace()?;
        let log_path = self.handle.file_path(crate::core::FileKind::Log);

        crate::log_toolkit!(
            tracing::Level::DEBUG,
            argv.join(" "),
            timeout_secs = timeout.as_secs()
        );

        let log_file = File::create(&log_path)?;
        let log_file_err = log_file.try_clone()?;

        let mut child = match Command::new(&argv[0])
            .args(&argv[1..])
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_err))
            .spawn()
        {
            Ok(child) => child,
            Err(_) => {
                return Ok(CommandOutcome {
                    exit_code: -1,
                    log: String::new(),
                    timed_out: false,
                })
            }
        };

        let pid = child.id();
        let start = Instant::now();
        let poll_interval = Duration::from_millis(50);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        break None;
                    }
                    std::thread::sleep(poll_interval);
                }
                Err(_) => break None,
            }
        };

        let log = read_log(&log_path);

        match status {
            Some(status) => Ok(CommandOutcome {
                exit_code: status.code().unwrap_or(-1),
                log,
                timed_out: false,
            }),
            None => {
                tracing::warn!(command = %argv.join(" "), timeout_secs = timeout.as_secs(), "subprocess exceeded timeout; killing process tree");
                kill_process_tree(pid);
                let _ = child.wait();
                Ok(CommandOutcome {
                    exit_code: -1,
                    log: read_log(&log_path),
                    timed_out: true,
                })
            }
        }
    }

    /// Whether `executable` can be found on `PATH`.
    pub fn executable_installed(executable: &str) -> bool {
        which::which(executable).is_ok()
    }

    /// The last-modified time of a path, if it exists.
    pub fn modification_time(path: &PathBuf) -> Option<std::time::SystemTime> {
        std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
    }
}

fn read_log(path: &PathBuf) -> String {
    let mut buf = String::new();
    if let Ok(mut f) = File::open(path) {
        let _ = f.read_to_string(&mut buf);
    }
    buf
}

/// Enumerate the pids of every descendant of `pid`, by walking `/proc` and
/// matching `PPid` fields. Tolerates a descendant exiting mid-enumeration.
#[cfg(target_os = "linux")]
fn descendant_pids(pid: u32) -> Vec<u32> {
    let mut children_of: std::collections::HashMap<u32, Vec<u32>> = std::collections::HashMap::new();

    if let Ok(entries) = std::fs::read_dir("/proc") {
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(candidate_pid) = file_name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            if let Some(ppid) = read_ppid(candidate_pid) {
                children_of.entry(ppid).or_default().push(candidate_pid);
            }
        }
    }

    let mut result = Vec::new();
    let mut frontier = vec![pid];
    while let Some(current) = frontier.pop() {
        if let Some(children) = children_of.get(&current) {
            for &child in children {
                result.push(child);
                frontier.push(child);
            }
        }
    }
    result
}

#[cfg(target_os = "linux")]
fn read_ppid(pid: u32) -> Option<u32> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // Fields after the process name (which may itself contain spaces/parens)
    // start right after the last ')'.
    let after_name = stat.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_name.split_whitespace().collect();
    // field[0] is state, field[1] is ppid (1-indexed after the name).
    fields.get(1)?.parse::<u32>().ok()
}

#[cfg(not(target_os = "linux"))]
fn descendant_pids(_pid: u32) -> Vec<u32> {
    Vec::new()
}

/// Send `SIGKILL` to `pid` and every descendant discoverable at the moment
/// of the call.
#[cfg(unix)]
fn kill_process_tree(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    for descendant in descendant_pids(pid) {
        let _ = kill(Pid::from_raw(descendant as i32), Signal::SIGKILL);
    }
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill_process_tree(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ObjectId, ObjectType};
    use tempfile::TempDir;

    #[test]
    fn test_run_captures_output_and_exit_code() {
        let temp = TempDir::new().unwrap();
        let handle = ObjectHandle::new(temp.path(), ObjectType::Phonology, ObjectId(1)).unwrap();
        let cmd = ScriptedCommand::new(&handle);
        let outcome = cmd
            .run(
                &["sh".into(), "-c".into(), "echo hello".into()],
                Duration::from_secs(5),
            )
            .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.log.contains("hello"));
        assert!(!outcome.timed_out);
    }

    #[test]
    fn test_run_times_out_and_kills() {
        let temp = TempDir::new().unwrap();
        let handle = ObjectHandle::new(temp.path(), ObjectType::Phonology, ObjectId(2)).unwrap();
        let cmd = ScriptedCommand::new(&handle);
        let outcome = cmd
            .run(
                &["sh".into(), "-c".into(), "sleep 5".into()],
                Duration::from_millis(200),
            )
            .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, -1);
    }

    #[test]
    fn test_executable_installed() {
        assert!(ScriptedCommand::executable_installed("sh"));
        assert!(!ScriptedCommand::executable_installed(
            "definitely-not-a-real-executable-name"
        ));
    }
}
