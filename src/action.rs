use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use log::info;
use tokio::process::Command;

use crate::config::CommandStep;

/// Executes a configured off action. Wake-on-LAN can only power a device on,
/// so "off" is delegated to whatever the user configured.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    async fn run(&self, steps: &[CommandStep]) -> Result<()>;
}

/// Runs each step as a child process, in order, stopping at the first
/// failure.
pub struct ProcessActionRunner;

#[async_trait]
impl ActionRunner for ProcessActionRunner {
    async fn run(&self, steps: &[CommandStep]) -> Result<()> {
        for step in steps {
            info!("Running off action step: {}", step.command);
            let status = Command::new(&step.command)
                .args(&step.args)
                .status()
                .await
                .with_context(|| format!("spawning {}", step.command))?;
            if !status.success() {
                bail!("{} exited with {}", step.command, status);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(command: &str, args: &[&str]) -> CommandStep {
        CommandStep {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_no_steps_is_ok() {
        assert!(ProcessActionRunner.run(&[]).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_steps_run_in_order() {
        let steps = [step("true", &[]), step("true", &[])];
        assert!(ProcessActionRunner.run(&steps).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_step_propagates() {
        let steps = [step("false", &[])];
        let err = ProcessActionRunner.run(&steps).await.unwrap_err();
        assert!(err.to_string().contains("false exited"));
    }

    #[tokio::test]
    async fn test_missing_command_propagates() {
        let steps = [step("definitely-not-a-real-binary", &[])];
        assert!(ProcessActionRunner.run(&steps).await.is_err());
    }
}
