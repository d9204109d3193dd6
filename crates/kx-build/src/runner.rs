//! Logged command execution.
//!
//! Build steps shell out to `npm`; stdout and stderr are streamed
//! line-by-line into the theme's build log so the dashboard's log
//! viewer sees output as it happens, not after the process exits.

use crate::error::BuildError;
use crate::logfile::BuildLog;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

fn forward_lines(
    stream: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::UnboundedSender<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}

/// Run `program args..` in `cwd`, appending a `$ command` header and
/// every output line to `log`. Returns [`BuildError::CommandFailed`]
/// on a non-zero exit, after writing a `❌` line.
pub async fn run_logged(
    program: &str,
    args: &[&str],
    cwd: &Path,
    log: &BuildLog,
) -> Result<(), BuildError> {
    let rendered = render_command(program, args);
    tracing::info!(command = %rendered, cwd = %cwd.display(), "running build command");
    log.append_command(&rendered).await?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

    // Funnel both streams through one channel so log lines never
    // interleave mid-write.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let stdout_task = forward_lines(stdout, tx.clone());
    let stderr_task = forward_lines(stderr, tx);

    while let Some(line) = rx.recv().await {
        log.append_line(&line).await?;
    }

    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let status = child.wait().await?;
    if !status.success() {
        let code = status.code().unwrap_or(-1);
        log.append_error(&format!("Command failed: {rendered} (exit code {code})"))
            .await?;
        return Err(BuildError::CommandFailed {
            command: rendered,
            code,
        });
    }

    Ok(())
}
