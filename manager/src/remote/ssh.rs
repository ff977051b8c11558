use super::{CommandTransport, RemoteCommand};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::debug;

/// Runs scripts with the system `ssh` client, feeding the script on stdin
pub struct SshTransport {
    command_timeout: Duration,
}

impl SshTransport {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    /// `ssh` arguments for a command; the script itself goes to stdin
    pub fn ssh_args(command: &RemoteCommand) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-i".to_string(),
            command.key_file.display().to_string(),
            command.target(),
            "bash -s".to_string(),
        ];
        args.extend(command.args.iter().cloned());
        args
    }
}

#[async_trait]
impl CommandTransport for SshTransport {
    async fn execute(&self, command: &RemoteCommand) -> Result<String> {
        let script = tokio::fs::read(&command.script_path)
            .await
            .with_context(|| format!("Failed to read script {}", command.script_path.display()))?;

        debug!("ssh {}", Self::ssh_args(command).join(" "));

        let mut child = AsyncCommand::new("ssh")
            .args(Self::ssh_args(command))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn ssh: {}", e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("ssh stdin unavailable"))?;
        stdin.write_all(&script).await?;
        drop(stdin);

        let output = timeout(self.command_timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow!("ssh timed out after {}s", self.command_timeout.as_secs()))??;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(stdout)
        } else {
            let error_msg = if !stderr.is_empty() { stderr } else { stdout };
            Err(anyhow!("{} exited with {}: {}", command.script, output.status, error_msg.trim()))
        }
    }
}
