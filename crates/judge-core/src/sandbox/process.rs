//! Reference `SandboxRuntime`: shells out to a real compiler/interpreter and
//! applies best-effort resource limits itself.
//!
//! Grounded on the teacher's `timeout.rs` (spawn + abandon-on-timeout, no
//! SIGALRM/`process::exit`) translated to its async equivalent
//! (`tokio::time::timeout` around a child's `wait()`), and on `output.rs`'s
//! byte-capped buffer idea, here capturing a child process's piped stdout
//! instead of a VM's stdout callback. Memory limiting avoids `unsafe`
//! `setrlimit`/`libc` calls (matching the teacher's zero-`unsafe` posture) by
//! polling `/proc/<pid>/status` on Linux; on other platforms memory limiting
//! is a no-op and only the wall-clock limit is enforced.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::debug;

use super::{
    checkers, CheckerOutcome, CompileOutcome, CompileRequest, InteractiveOutcome,
    InteractiveVerdictKind, RunCheckerRequest, RunInteractiveRequest, RunProgramOutcome,
    RunProgramRequest, RunStatus, SandboxError, SandboxRuntime,
};

const MEMORY_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct ProcessSandbox {
    cxx: String,
    python: String,
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        ProcessSandbox {
            cxx: "g++".to_string(),
            python: "python3".to_string(),
        }
    }
}

impl ProcessSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn interpreter_for(&self, language: &str) -> Option<&str> {
        match language {
            "python" | "python3" => Some(self.python.as_str()),
            _ => None,
        }
    }
}

#[async_trait]
impl SandboxRuntime for ProcessSandbox {
    async fn compile(&self, req: CompileRequest) -> Result<CompileOutcome, SandboxError> {
        let tmp = tempfile::Builder::new()
            .prefix(&format!("compile-{}-", req.submission_id))
            .tempdir()
            .map_err(SandboxError::Io)?;
        let tmp_path = tmp.path().to_path_buf();

        match req.language.as_str() {
            "cpp" | "c++" => {
                let source_path = tmp_path.join("program.cpp");
                fs::write(&source_path, &req.source_code).await?;
                let exe_path = tmp_path.join("program");
                let output = Command::new(&self.cxx)
                    .arg("-O2")
                    .arg("-std=c++17")
                    .arg("-o")
                    .arg(&exe_path)
                    .arg(&source_path)
                    .output()
                    .await?;
                // Keep the tempdir alive past this call; the caller owns cleanup.
                let tmp_path_owned = tmp.into_path();
                if output.status.success() {
                    Ok(CompileOutcome {
                        success: true,
                        compile_info: String::from_utf8_lossy(&output.stderr).into_owned(),
                        executable_path: Some(tmp_path_owned.join("program")),
                        temp_dir: Some(tmp_path_owned),
                    })
                } else {
                    Ok(CompileOutcome {
                        success: false,
                        compile_info: String::from_utf8_lossy(&output.stderr).into_owned(),
                        executable_path: None,
                        temp_dir: Some(tmp_path_owned),
                    })
                }
            }
            "python" | "python3" => {
                let source_path = tmp_path.join("program.py");
                fs::write(&source_path, &req.source_code).await?;
                let tmp_path_owned = tmp.into_path();
                Ok(CompileOutcome {
                    success: true,
                    compile_info: String::new(),
                    executable_path: Some(tmp_path_owned.join("program.py")),
                    temp_dir: Some(tmp_path_owned),
                })
            }
            other => Err(SandboxError::UnsupportedLanguage(other.to_string())),
        }
    }

    async fn compile_checker(&self, builtin_name: &str) -> Result<PathBuf, SandboxError> {
        if checkers::is_builtin_checker(builtin_name) {
            // Built-in checkers are evaluated natively (see `checkers.rs`) and
            // never actually spawned as a subprocess; this path only exists
            // to satisfy the sandbox contract for implementations that do
            // compile a real testlib-backed checker binary.
            Ok(PathBuf::from(format!("<builtin:{builtin_name}>")))
        } else {
            Err(SandboxError::UnknownBuiltinChecker(builtin_name.to_string()))
        }
    }

    async fn run_program(
        &self,
        req: RunProgramRequest,
    ) -> Result<RunProgramOutcome, SandboxError> {
        let mut command = build_run_command(&req, &self.python)?;
        if req.is_file_input {
            if let Some(input_path) = &req.input_path {
                let dest = req.work_dir.join(&req.input_file_name);
                fs::copy(input_path, &dest).await?;
            }
            command.stdin(Stdio::null());
        } else {
            command.stdin(Stdio::piped());
        }
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.current_dir(&req.work_dir);

        let start = Instant::now();
        let mut child = command.spawn()?;

        if !req.is_file_input {
            if let Some(input_path) = &req.input_path {
                let bytes = fs::read(input_path).await?;
                if let Some(mut stdin) = child.stdin.take() {
                    let _ = stdin.write_all(&bytes).await;
                }
            }
        }

        let (status, exit_code, memory_kb) =
            drive_child(&mut child, req.time_limit_ms, req.memory_limit_kb).await?;
        let elapsed = start.elapsed();

        let mut stdout_buf = Vec::new();
        if let Some(mut out) = child.stdout.take() {
            let _ = out.read_to_end(&mut stdout_buf).await;
        }
        let mut stderr_buf = Vec::new();
        if let Some(mut err) = child.stderr.take() {
            let _ = err.read_to_end(&mut stderr_buf).await;
        }

        let stdout = if req.is_file_input {
            let path = req.work_dir.join(&req.output_file_name);
            fs::read_to_string(&path).await.unwrap_or_default()
        } else {
            String::from_utf8_lossy(&stdout_buf).into_owned()
        };

        Ok(RunProgramOutcome {
            status,
            exit_code,
            time_ms: elapsed.as_millis() as u64,
            memory_kb,
            stdout,
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        })
    }

    async fn run_checker(&self, req: RunCheckerRequest) -> Result<CheckerOutcome, SandboxError> {
        let output = Command::new(&req.checker_path)
            .arg(&req.input_path)
            .arg(&req.output_path)
            .arg(&req.answer_path)
            .output()
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_checker_protocol(stdout.trim()))
    }

    async fn run_interactive(
        &self,
        req: RunInteractiveRequest,
    ) -> Result<InteractiveOutcome, SandboxError> {
        if let Some(input_path) = &req.interactor_input_path {
            let dest = req.work_dir.join("interactor_input.txt");
            fs::copy(input_path, &dest).await?;
        }

        let mut user_cmd = Command::new(&req.user_executable_path);
        user_cmd
            .current_dir(&req.work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut interactor_cmd = Command::new(&req.interactor_executable_path);
        interactor_cmd
            .current_dir(&req.work_dir)
            .arg(req.work_dir.join("interactor_input.txt"))
            .arg(req.work_dir.join(&req.score_file_name))
            .arg(req.work_dir.join(&req.message_file_name))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let user_start = Instant::now();
        let mut user_child = user_cmd.spawn()?;
        let mut interactor_child = interactor_cmd.spawn()?;

        let mut user_stdin = user_child.stdin.take().expect("piped stdin");
        let mut user_stdout = user_child.stdout.take().expect("piped stdout");
        let mut interactor_stdin = interactor_child.stdin.take().expect("piped stdin");
        let mut interactor_stdout = interactor_child.stdout.take().expect("piped stdout");

        let pipe_user_to_interactor = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match user_stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if interactor_stdin.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        let pipe_interactor_to_user = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match interactor_stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if user_stdin.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let interaction_limit = req
            .time_limit_ms
            .max(req.interactor_time_limit_ms)
            .saturating_add(1000);
        let (user_status, user_exit_code, user_memory_kb) = match tokio::time::timeout(
            Duration::from_millis(interaction_limit),
            user_child.wait(),
        )
        .await
        {
            Ok(Ok(status)) => (RunStatus::Exited, status.code().unwrap_or(-1), 0),
            Ok(Err(_)) | Err(_) => {
                let _ = user_child.kill().await;
                (RunStatus::TimeLimitExceeded, -1, 0)
            }
        };
        let _ = interactor_child.kill().await;
        pipe_user_to_interactor.abort();
        pipe_interactor_to_user.abort();

        let user_time_ms = user_start.elapsed().as_millis() as u64;
        let mut user_stderr_buf = Vec::new();
        if let Some(mut err) = user_child.stderr.take() {
            let _ = err.read_to_end(&mut user_stderr_buf).await;
        }
        let mut interactor_stderr_buf = Vec::new();
        if let Some(mut err) = interactor_child.stderr.take() {
            let _ = err.read_to_end(&mut interactor_stderr_buf).await;
        }

        if user_status != RunStatus::Exited {
            return Ok(InteractiveOutcome {
                verdict: InteractiveVerdictKind::UserError,
                score: 0.0,
                normalized_score: 0.0,
                message: None,
                reason: Some("user process timed out".to_string()),
                user_time_ms,
                user_memory_kb,
                interactor_time_ms: 0,
                interactor_memory_kb: 0,
                user_stderr: String::from_utf8_lossy(&user_stderr_buf).into_owned(),
            });
        }
        if user_exit_code != 0 {
            return Ok(InteractiveOutcome {
                verdict: InteractiveVerdictKind::UserError,
                score: 0.0,
                normalized_score: 0.0,
                message: None,
                reason: Some(format!("user process exited with code {user_exit_code}")),
                user_time_ms,
                user_memory_kb,
                interactor_time_ms: 0,
                interactor_memory_kb: 0,
                user_stderr: String::from_utf8_lossy(&user_stderr_buf).into_owned(),
            });
        }

        let score_path = req.work_dir.join(&req.score_file_name);
        let message_path = req.work_dir.join(&req.message_file_name);
        let score_text = fs::read_to_string(&score_path).await.ok();
        let message_text = fs::read_to_string(&message_path).await.ok();

        let normalized_score = match score_text.as_deref().map(|s| s.trim().parse::<f64>()) {
            Some(Ok(v)) => v.clamp(0.0, 1.0),
            _ => {
                return Ok(InteractiveOutcome {
                    verdict: InteractiveVerdictKind::JudgementFailed,
                    score: 0.0,
                    normalized_score: 0.0,
                    message: message_text,
                    reason: Some("interactor did not produce a parseable score file".to_string()),
                    user_time_ms,
                    user_memory_kb,
                    interactor_time_ms: 0,
                    interactor_memory_kb: 0,
                    user_stderr: String::from_utf8_lossy(&user_stderr_buf).into_owned(),
                });
            }
        };

        let verdict = if normalized_score >= 1.0 {
            InteractiveVerdictKind::Accepted
        } else if normalized_score > 0.0 {
            InteractiveVerdictKind::Partial
        } else {
            InteractiveVerdictKind::WrongAnswer
        };

        debug!(interactor_stderr_len = interactor_stderr_buf.len(), "interactive run finished");

        Ok(InteractiveOutcome {
            verdict,
            score: normalized_score * 100.0,
            normalized_score,
            message: message_text,
            reason: None,
            user_time_ms,
            user_memory_kb,
            interactor_time_ms: 0,
            interactor_memory_kb: 0,
            user_stderr: String::from_utf8_lossy(&user_stderr_buf).into_owned(),
        })
    }

    async fn cleanup_temp_dir(&self, path: &PathBuf) {
        let _ = fs::remove_dir_all(path).await;
    }
}

fn build_run_command(req: &RunProgramRequest, python: &str) -> Result<Command, SandboxError> {
    let mut command = match req.language.as_str() {
        "cpp" | "c++" => Command::new(&req.executable_path),
        "python" | "python3" => {
            let mut c = Command::new(python);
            c.arg(&req.executable_path);
            c
        }
        other => return Err(SandboxError::UnsupportedLanguage(other.to_string())),
    };
    command.kill_on_drop(true);
    Ok(command)
}

/// Waits on `child` with a wall-clock timeout, and (on Linux) polls RSS for a
/// memory-limit violation. Returns `(status, exit_code, peak_memory_kb)`.
async fn drive_child(
    child: &mut Child,
    time_limit_ms: u64,
    memory_limit_kb: u64,
) -> Result<(RunStatus, i32, u64), SandboxError> {
    let deadline = Duration::from_millis(time_limit_ms);
    let pid = child.id();

    #[cfg(target_os = "linux")]
    {
        let memory_limit_kb = memory_limit_kb;
        let pid = pid;
        let mut peak_kb = 0u64;
        let wait_future = child.wait();
        tokio::pin!(wait_future);
        let mut ticker = tokio::time::interval(MEMORY_POLL_INTERVAL);
        let started = Instant::now();
        loop {
            tokio::select! {
                result = &mut wait_future => {
                    let status = result?;
                    return Ok((RunStatus::Exited, status.code().unwrap_or(-1), peak_kb));
                }
                _ = ticker.tick() => {
                    if started.elapsed() >= deadline {
                        let _ = child.start_kill();
                        return Ok((RunStatus::TimeLimitExceeded, -1, peak_kb));
                    }
                    if let Some(pid) = pid {
                        if let Some(rss) = read_rss_kb(pid).await {
                            peak_kb = peak_kb.max(rss);
                            if rss > memory_limit_kb {
                                let _ = child.start_kill();
                                return Ok((RunStatus::MemoryLimitExceeded, -1, peak_kb));
                            }
                        }
                    }
                }
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (pid, memory_limit_kb);
        match tokio::time::timeout(deadline, child.wait()).await {
            Ok(Ok(status)) => Ok((RunStatus::Exited, status.code().unwrap_or(-1), 0)),
            Ok(Err(e)) => Err(SandboxError::Io(e)),
            Err(_) => {
                let _ = child.start_kill();
                Ok((RunStatus::TimeLimitExceeded, -1, 0))
            }
        }
    }
}

#[cfg(target_os = "linux")]
async fn read_rss_kb(pid: u32) -> Option<u64> {
    let status_path: PathBuf = Path::new("/proc").join(pid.to_string()).join("status");
    let contents = fs::read_to_string(status_path).await.ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
            return digits.parse::<u64>().ok();
        }
    }
    None
}

/// The custom-checker subprocess protocol: a checker's first stdout line is
/// one of `OK`, `WRONG_ANSWER`, or `PARTIAL <score in [0,1]>`.
fn parse_checker_protocol(first_line: &str) -> CheckerOutcome {
    let mut parts = first_line.splitn(2, ' ');
    match parts.next() {
        Some("OK") => CheckerOutcome {
            score: 100.0,
            normalized_score: 1.0,
            message: "ok".to_string(),
        },
        Some("PARTIAL") => {
            let score = parts
                .next()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            CheckerOutcome {
                score: score * 100.0,
                normalized_score: score,
                message: format!("partial: {score}"),
            }
        }
        _ => CheckerOutcome {
            score: 0.0,
            normalized_score: 0.0,
            message: "wrong answer".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_protocol_line() {
        let outcome = parse_checker_protocol("OK");
        assert_eq!(outcome.normalized_score, 1.0);
    }

    #[test]
    fn parses_partial_protocol_line() {
        let outcome = parse_checker_protocol("PARTIAL 0.5");
        assert_eq!(outcome.normalized_score, 0.5);
    }

    #[test]
    fn parses_wrong_answer_protocol_line() {
        let outcome = parse_checker_protocol("WRONG_ANSWER");
        assert_eq!(outcome.normalized_score, 0.0);
    }

    #[test]
    fn malformed_partial_score_clamps_to_zero() {
        let outcome = parse_checker_protocol("PARTIAL not-a-number");
        assert_eq!(outcome.normalized_score, 0.0);
    }

    #[tokio::test]
    #[ignore = "requires g++ on PATH"]
    async fn compile_cpp_hello_world_succeeds() {
        let sandbox = ProcessSandbox::new();
        let source = b"#include <iostream>\nint main(){std::cout<<\"hi\";}".to_vec();
        let outcome = sandbox
            .compile(CompileRequest {
                source_code: source,
                language: "cpp".to_string(),
                submission_id: uuid::Uuid::new_v4().to_string(),
                is_checker: false,
            })
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.compile_info);
        if let Some(dir) = outcome.temp_dir {
            sandbox.cleanup_temp_dir(&dir).await;
        }
    }
}
