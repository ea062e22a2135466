use clustertest_core::logging;
use clustertest_executor::{CapturedOutput, ClusterError};
use tokio::process::Command;

fn display(cmd: &Command) -> String {
    cmd.as_std().get_program().to_string_lossy().to_string()
}

/// Runs `cmd` to completion and captures its output whatever the exit code.
///
/// The child is killed if the returned future is dropped.
pub async fn capture(cmd: &mut Command) -> Result<CapturedOutput, ClusterError> {
    logging::log_and_print_command(cmd.as_std());
    let command = display(cmd);
    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ClusterError::CommandFailed {
            command,
            source: e,
        })?;
    Ok(CapturedOutput::from_raw(
        &output.stdout,
        &output.stderr,
        output.status.code(),
    ))
}

/// Like [`capture`], but a nonzero exit is an error.
pub async fn run_checked(cmd: &mut Command) -> Result<String, ClusterError> {
    logging::log_and_print_command(cmd.as_std());
    let command = display(cmd);
    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ClusterError::CommandFailed {
            command: command.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ClusterError::CommandExited {
            command,
            code: output.status.code().unwrap_or(1),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
