//! Subprocess judge.
//!
//! Pipes the rendered comparison to a command's stdin and parses its stdout
//! as a judge reply. With Fabric this is `fabric -p <pattern>`, where the
//! pattern holds any extra judging instructions.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{JudgeBackend, JudgeReply, JudgeRequest};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Judge that runs an external command per comparison
#[derive(Debug, Clone)]
pub struct CommandJudge {
    /// Program to spawn
    program: String,

    /// Arguments passed on every call
    args: Vec<String>,

    /// Per-call timeout
    call_timeout: Duration,
}

impl CommandJudge {
    /// Create a judge for a program and its arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            call_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Parse a whitespace-separated command line such as `fabric -p judge_span`
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .context("Judge command line is empty")?;
        Ok(Self::new(program, parts.collect()))
    }

    /// Judge through a Fabric pattern
    ///
    /// Looks for fabric-ai first (Homebrew install), falls back to fabric
    pub fn fabric(pattern: &str) -> Self {
        let binary = if std::process::Command::new("fabric-ai")
            .arg("--help")
            .output()
            .is_ok()
        {
            "fabric-ai"
        } else {
            "fabric"
        };

        Self::new(binary, vec!["-p".to_string(), pattern.to_string()])
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the command with `input` on stdin and return stdout
    async fn run(&self, input: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn judge command '{}'", self.program))?;

        // Feed stdin from its own task so the timeout also bounds a child
        // that never drains the pipe
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.as_bytes().to_vec();
            tokio::spawn(async move { stdin.write_all(&input).await })
        });

        // Dropping the timed-out future kills the child (kill_on_drop)
        let waited = timeout(self.call_timeout, child.wait_with_output()).await;
        let output = match waited {
            Ok(output) => output
                .with_context(|| format!("Failed to wait for judge command '{}'", self.program))?,
            Err(_) => {
                if let Some(writer) = writer {
                    writer.abort();
                }
                anyhow::bail!(
                    "Judge command '{}' timed out after {:?}",
                    self.program,
                    self.call_timeout
                );
            }
        };

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) => debug!(program = %self.program, error = %e, "Judge command did not read all of stdin"),
                Err(e) => debug!(program = %self.program, error = %e, "Judge stdin writer did not finish"),
                Ok(Ok(())) => {}
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "Judge command '{}' failed with exit code {}: {}",
                self.program,
                exit_code,
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout).context("Judge output is not valid UTF-8")
    }
}

#[async_trait]
impl JudgeBackend for CommandJudge {
    fn name(&self) -> &str {
        "command"
    }

    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeReply> {
        let stdout = self.run(&request.render()).await?;
        Ok(JudgeReply::parse(&stdout)?)
    }

    async fn health_check(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--help")
            .output()
            .await
            .with_context(|| format!("Failed to run judge command '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Judge command health check failed: {}", stderr);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line() {
        let judge = CommandJudge::from_command_line("fabric -p judge_span").unwrap();
        assert_eq!(judge.program(), "fabric");
        assert_eq!(judge.args(), &["-p".to_string(), "judge_span".to_string()]);
        assert!(CommandJudge::from_command_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_fabric_judge_creation() {
        let judge = CommandJudge::fabric("judge_span");
        assert_eq!(judge.name(), "command");
        assert!(judge.program().starts_with("fabric"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echoing_command_is_parsed() {
        // `cat` echoes the prompt, which contains no score, so parsing fails
        // while the process plumbing succeeds.
        let judge = CommandJudge::new("cat", vec![]);
        let request = JudgeRequest::new("a", "b", "L");
        let err = judge.judge(&request).await.unwrap_err();
        assert!(err.to_string().contains("score") || err.to_string().contains("JSON"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_reply() {
        let judge = CommandJudge::new(
            "sh",
            vec![
                "-c".to_string(),
                "cat > /dev/null; echo '{\"score\": 0.9, \"reason\": \"ok\"}'".to_string(),
            ],
        );
        let reply = judge.judge(&JudgeRequest::new("a", "b", "L")).await.unwrap();
        assert_eq!(reply.score, 0.9);
        assert_eq!(reply.reason, "ok");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_failure_and_timeout() {
        let failing = CommandJudge::new("sh", vec!["-c".to_string(), "cat > /dev/null; exit 3".to_string()]);
        let err = failing
            .judge(&JudgeRequest::new("a", "b", "L"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exit code 3"));

        let slow = CommandJudge::new("sh", vec!["-c".to_string(), "cat > /dev/null; sleep 5".to_string()])
            .with_timeout(Duration::from_millis(100));
        let err = slow.judge(&JudgeRequest::new("a", "b", "L")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_covers_unread_large_prompt() {
        // The child never reads stdin, so a prompt larger than the pipe
        // buffer can only be bounded by the call timeout.
        let stuck = CommandJudge::new("sh", vec!["-c".to_string(), "sleep 5".to_string()])
            .with_timeout(Duration::from_millis(200));
        let prediction = "personal data ".repeat(30_000);
        assert!(prediction.len() > 200_000);

        let started = std::time::Instant::now();
        let err = stuck
            .judge(&JudgeRequest::new(&prediction, "b", "L"))
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(err.to_string().contains("timed out"));
    }
}
