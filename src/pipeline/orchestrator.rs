// ==============================================================================
// pipeline/orchestrator.rs - Pipeline Orchestrator
// ==============================================================================
// Description: Runs the fixed stage sequence for one sample, halting on first failure
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// State machine:
//   Pending -> Running(stage 1) -> ... -> Running(stage n) -> Completed
//                     \-> Failed(stage i)   (later stages never run)
// No retries. Partial artifacts of a failed run are left in place.
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::runner::{StageExecutionError, StageRunner};
use super::stage::{build_stages, PipelineStage, SampleArtifacts, SampleInputs};
use crate::audit::{AuditEvent, AuditEventType, AuditLog};
use crate::config::PanelConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running(String),
    Completed,
    Failed(String),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed(_))
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid pipeline plan: {0}")]
    InvalidPlan(String),

    #[error("Pipeline run is not pending (current state: {0:?})")]
    NotPending(RunState),

    #[error(transparent)]
    Stage(#[from] StageExecutionError),
}

/// One sample's ordered stages and their execution state
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub sample_id: String,
    pub artifacts: SampleArtifacts,
    stages: Vec<PipelineStage>,
    state: RunState,
    executed: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Plan the standard five-stage run for a sample
    pub fn plan(
        inputs: &SampleInputs,
        work_dir: &Path,
        config: &PanelConfig,
    ) -> Result<Self, PipelineError> {
        let artifacts = SampleArtifacts::new(work_dir, &inputs.sample_id, config.reference_build);
        let stages = build_stages(inputs, &artifacts, config);
        Self::from_stages(&inputs.sample_id, stages, artifacts)
    }

    /// Build a run from explicit stages after checking the file contract
    pub fn from_stages(
        sample_id: &str,
        stages: Vec<PipelineStage>,
        artifacts: SampleArtifacts,
    ) -> Result<Self, PipelineError> {
        validate_plan(&stages)?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            sample_id: sample_id.to_string(),
            artifacts,
            stages,
            state: RunState::Pending,
            executed: Vec::new(),
            started_at: None,
            finished_at: None,
        })
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Names of stages that completed successfully, in order
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

/// Every input must be pre-supplied or produced by an earlier stage, and no
/// stage may write over one of its own inputs.
fn validate_plan(stages: &[PipelineStage]) -> Result<(), PipelineError> {
    if stages.is_empty() {
        return Err(PipelineError::InvalidPlan("no stages".to_string()));
    }

    let mut produced: HashSet<&PathBuf> = HashSet::new();

    for stage in stages {
        for input in &stage.inputs {
            if !produced.contains(input) && !input.exists() {
                return Err(PipelineError::InvalidPlan(format!(
                    "stage '{}' input {:?} is neither supplied nor produced by an earlier stage",
                    stage.name, input
                )));
            }
        }

        for output in &stage.outputs {
            if stage.inputs.contains(output) {
                return Err(PipelineError::InvalidPlan(format!(
                    "stage '{}' output {:?} is also one of its inputs",
                    stage.name, output
                )));
            }
        }

        produced.extend(stage.outputs.iter());
    }

    Ok(())
}

/// Drives a PipelineRun through a StageRunner
pub struct PipelineOrchestrator<R> {
    runner: R,
    audit: Option<AuditLog>,
}

impl<R: StageRunner> PipelineOrchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Execute every stage in order. The first failure ends the run.
    pub async fn execute(&self, run: &mut PipelineRun) -> Result<(), PipelineError> {
        if run.state != RunState::Pending {
            return Err(PipelineError::NotPending(run.state.clone()));
        }

        let total = run.stages.len();
        run.started_at = Some(Utc::now());
        info!(
            "Starting pipeline run {} for sample {} ({} stages)",
            run.run_id, run.sample_id, total
        );
        self.audit(run, AuditEventType::RunStarted, None, serde_json::json!({ "stages": total }));

        for idx in 0..total {
            let name = run.stages[idx].name.clone();
            run.state = RunState::Running(name.clone());
            info!("[{}/{}] Running stage: {}", idx + 1, total, name);
            self.audit(run, AuditEventType::StageStarted, Some(&name), serde_json::json!({ "index": idx + 1 }));

            let result = match missing_input(&run.stages[idx]) {
                Some(err) => Err(err),
                None => self.runner.run(&run.stages[idx]).await,
            };

            match result {
                Ok(()) => {
                    info!("[{}/{}] Stage complete: {}", idx + 1, total, name);
                    run.executed.push(name.clone());
                    self.audit(run, AuditEventType::StageCompleted, Some(&name), serde_json::json!({ "index": idx + 1 }));
                }
                Err(err) => {
                    error!("[{}/{}] Stage failed: {}", idx + 1, total, err);
                    run.state = RunState::Failed(name.clone());
                    run.finished_at = Some(Utc::now());
                    let details = serde_json::json!({ "index": idx + 1, "error": err.to_string() });
                    self.audit(run, AuditEventType::StageFailed, Some(&name), details.clone());
                    self.audit(run, AuditEventType::RunFailed, Some(&name), details);
                    return Err(err.into());
                }
            }
        }

        run.state = RunState::Completed;
        run.finished_at = Some(Utc::now());
        info!("Pipeline run {} completed for sample {}", run.run_id, run.sample_id);
        self.audit(
            run,
            AuditEventType::RunCompleted,
            None,
            serde_json::json!({ "executed": run.executed }),
        );

        Ok(())
    }

    fn audit(
        &self,
        run: &PipelineRun,
        event_type: AuditEventType,
        stage: Option<&str>,
        details: serde_json::Value,
    ) {
        let Some(log) = &self.audit else {
            return;
        };

        let event = AuditEvent::new(
            event_type,
            Some(run.sample_id.clone()),
            stage.map(str::to_string),
            details,
        )
        .with_run(run.run_id);

        if let Err(e) = log.record(&event) {
            warn!("Failed to write audit event to {:?}: {}", log.path(), e);
        }
    }
}

fn missing_input(stage: &PipelineStage) -> Option<StageExecutionError> {
    stage
        .inputs
        .iter()
        .find(|input| !input.exists())
        .map(|path| StageExecutionError::MissingInput {
            stage: stage.name.clone(),
            path: path.clone(),
        })
}
