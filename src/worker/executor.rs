use std::process::Stdio;

use tokio::process::Command;

use crate::command::CommandRequest;

/// Outcome of running (or refusing to run) a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: Option<String>,
}

impl ExecutionReport {
    /// Report for a command refused by the allowlist. No process is spawned.
    pub fn rejected(program: &str) -> Self {
        Self {
            success: false,
            exit_code: 1,
            stdout: String::new(),
            stderr: Some(format!("Command \"{program}\" is not in the allowlist")),
        }
    }
}

/// Executes allowlisted commands as local processes with captured output.
///
/// Commands are spawned directly, never through a shell: the program and each
/// argument are passed as discrete tokens, so shell metacharacters in the
/// payload have no effect at the spawn boundary.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run the command to completion and capture its output.
    ///
    /// There is no deadline: a non-terminating command holds its processing
    /// slot until it exits or the worker is killed externally. Spawn failures
    /// (missing binary, invalid working directory, permissions) are converted
    /// into a failed report rather than surfaced as errors.
    pub async fn run(&self, request: &CommandRequest) -> ExecutionReport {
        tracing::info!(
            program = %request.program,
            args = ?request.args,
            working_dir = ?request.working_dir,
            "Executing command"
        );

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }

        match command.output().await {
            Ok(output) => {
                let exit_code = output.status.code().unwrap_or(-1);
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

                tracing::info!(
                    program = %request.program,
                    exit_code,
                    success = output.status.success(),
                    "Command completed"
                );

                ExecutionReport {
                    success: output.status.success(),
                    exit_code,
                    stdout,
                    stderr: if stderr.is_empty() {
                        None
                    } else {
                        Some(stderr)
                    },
                }
            }
            Err(err) => {
                tracing::error!(program = %request.program, error = %err, "Failed to spawn command");
                ExecutionReport {
                    success: false,
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: Some(format!("Failed to spawn \"{}\": {}", request.program, err)),
                }
            }
        }
    }
}
