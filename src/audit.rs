// ==============================================================================
// audit.rs - Run Audit Trail
// ==============================================================================
// Description: Append-only JSON-lines record of every panel run and its stages
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// One file per sample: <work_dir>/<sample>.audit.jsonl
// Each line is a single AuditEvent serialized as JSON.
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Panel construction
    GeneUnresolved,
    RegionFileWritten,

    // Pre-flight
    InputValidated,

    // Pipeline execution
    RunStarted,
    StageStarted,
    StageCompleted,
    StageFailed,
    RunCompleted,
    RunFailed,

    // Reporting
    ShortlistWritten,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub sample_id: Option<String>,
    pub run_id: Option<Uuid>,
    pub resource: Option<String>,
    pub details: serde_json::Value,
    pub severity: LogSeverity,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        sample_id: Option<String>,
        resource: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        let severity = match event_type {
            AuditEventType::GeneUnresolved => LogSeverity::Warning,

            AuditEventType::StageFailed => LogSeverity::Error,

            AuditEventType::RunFailed => LogSeverity::Critical,

            _ => LogSeverity::Info,
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            sample_id,
            run_id: None,
            resource,
            details,
            severity,
        }
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

/// JSON-lines audit file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Standard location for a sample's audit trail
    pub fn for_sample(work_dir: &Path, sample_id: &str) -> Self {
        Self::new(work_dir.join(format!("{}.audit.jsonl", sample_id)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event
    pub fn record(&self, event: &AuditEvent) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// Read back every event, in write order
    pub fn read_events(&self) -> std::io::Result<Vec<AuditEvent>> {
        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }
}

/// Convenience function to log an audit event
pub fn log_event(
    log: &AuditLog,
    event_type: AuditEventType,
    sample_id: &str,
    resource: Option<String>,
    details: serde_json::Value,
) -> std::io::Result<()> {
    let event = AuditEvent::new(event_type, Some(sample_id.to_string()), resource, details);

    log.record(&event)
}
