// ==============================================================================
// pipeline/mod.rs - Pipeline Orchestrator Module
// ==============================================================================
// Description: Stage definitions, process runner and fail-fast orchestration
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod orchestrator;
pub mod runner;
pub mod stage;

pub use orchestrator::{PipelineError, PipelineOrchestrator, PipelineRun, RunState};
pub use runner::{ProcessRunner, StageExecutionError, StageRunner};
pub use stage::{build_stages, PipelineStage, SampleArtifacts, SampleInputs, StageKind, ToolInvocation};
