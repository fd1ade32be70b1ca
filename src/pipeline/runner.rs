// ==============================================================================
// pipeline/runner.rs - Stage Execution
// ==============================================================================
// Description: Launches a stage's external tools and reports success by exit status
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use super::stage::{PipelineStage, ToolInvocation};

#[derive(Error, Debug)]
pub enum StageExecutionError {
    #[error("Stage '{stage}': required input {path:?} does not exist")]
    MissingInput { stage: String, path: PathBuf },

    #[error("Stage '{stage}': failed to launch {program}: {source}")]
    Spawn {
        stage: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage '{stage}': cannot open output {path:?}: {source}")]
    Output {
        stage: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage '{stage}': {program} exited unsuccessfully ({status})")]
    Failed {
        stage: String,
        program: String,
        status: String,
    },
}

impl StageExecutionError {
    /// Name of the stage that failed
    pub fn stage(&self) -> &str {
        match self {
            StageExecutionError::MissingInput { stage, .. }
            | StageExecutionError::Spawn { stage, .. }
            | StageExecutionError::Output { stage, .. }
            | StageExecutionError::Failed { stage, .. } => stage,
        }
    }
}

/// Executes one pipeline stage to completion
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run(&self, stage: &PipelineStage) -> Result<(), StageExecutionError>;
}

/// Runs stages as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    async fn run_invocation(
        stage: &PipelineStage,
        invocation: &ToolInvocation,
    ) -> Result<(), StageExecutionError> {
        let program = invocation.program.display().to_string();
        info!("  Command: {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());

        if let Some(path) = &invocation.stdout {
            let file = std::fs::File::create(path).map_err(|source| StageExecutionError::Output {
                stage: stage.name.clone(),
                path: path.clone(),
                source,
            })?;
            command.stdout(Stdio::from(file));
        }

        let status = command
            .status()
            .await
            .map_err(|source| StageExecutionError::Spawn {
                stage: stage.name.clone(),
                program: program.clone(),
                source,
            })?;

        debug!("  {} exited with {}", program, status);

        if !status.success() {
            return Err(StageExecutionError::Failed {
                stage: stage.name.clone(),
                program,
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl StageRunner for ProcessRunner {
    async fn run(&self, stage: &PipelineStage) -> Result<(), StageExecutionError> {
        for invocation in &stage.invocations {
            Self::run_invocation(stage, invocation).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::StageKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_successful_process() {
        let stage = PipelineStage::new(StageKind::Align).invoke(ToolInvocation::new("true"));
        assert!(ProcessRunner::new().run(&stage).await.is_ok());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let stage = PipelineStage::new(StageKind::Deduplicate).invoke(ToolInvocation::new("false"));

        match ProcessRunner::new().run(&stage).await {
            Err(StageExecutionError::Failed { stage, program, .. }) => {
                assert_eq!(stage, "deduplicate");
                assert_eq!(program, "false");
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let stage = PipelineStage::new(StageKind::Annotate)
            .invoke(ToolInvocation::new("/nonexistent/table_annovar.pl"));

        let err = ProcessRunner::new().run(&stage).await.unwrap_err();
        assert!(matches!(err, StageExecutionError::Spawn { .. }));
        assert_eq!(err.stage(), "annotate");
    }

    #[tokio::test]
    async fn test_stdout_redirect() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("S1.sam");
        let stage = PipelineStage::new(StageKind::Align)
            .invoke(ToolInvocation::new("echo").arg("@HD\tVN:1.6").stdout_to(&out));

        ProcessRunner::new().run(&stage).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "@HD\tVN:1.6\n");
    }

    #[tokio::test]
    async fn test_invocations_stop_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("second_ran");
        let stage = PipelineStage::new(StageKind::SortIndex)
            .invoke(ToolInvocation::new("false"))
            .invoke(ToolInvocation::new("touch").path_arg(&marker));

        assert!(ProcessRunner::new().run(&stage).await.is_err());
        assert!(!marker.exists());
    }
}
