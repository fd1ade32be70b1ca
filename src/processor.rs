// ==============================================================================
// processor.rs - Core Virtual Panel Processing Logic
// ==============================================================================
// Description: Builds the panel region file and runs one sample end to end
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 3.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{self, AuditEventType, AuditLog};
use crate::config::PanelConfig;
use crate::filter::ClinicalVariantFilter;
use crate::models::{GeneSymbol, VariantShortlist};
use crate::output::{ReportFormat, ReportWriter};
use crate::parsers::{AnnotationParser, CallSummarizer, CallSummary};
use crate::pipeline::{PipelineOrchestrator, PipelineRun, SampleInputs, StageRunner};
use crate::region_file::{parse_region_file, RegionFileBuilder};
use crate::resolver::{CoordinateLookup, GeneCoordinateResolver, ResolutionReport};
use crate::validator::InputValidator;

/// Result of filtering one annotation table
#[derive(Debug)]
pub struct FilterOutcome {
    pub annotated_variants: usize,
    pub shortlist: VariantShortlist,
    pub reports: HashMap<ReportFormat, PathBuf>,
}

/// Result of a full sample run
#[derive(Debug)]
pub struct ProcessingOutcome {
    pub run_id: Uuid,
    pub variant_calls: Option<CallSummary>,
    pub filter: FilterOutcome,
}

/// Resolve genes and write the region file
pub async fn build_region_file<L: CoordinateLookup>(
    config: &PanelConfig,
    lookup: L,
    genes: &[GeneSymbol],
    out: &Path,
    audit_log: Option<&AuditLog>,
) -> Result<ResolutionReport> {
    info!(
        "Building virtual panel: {} genes, {} ({})",
        genes.len(),
        config.reference_build,
        config.coordinate_convention
    );

    let resolver = GeneCoordinateResolver::new(lookup, config);
    let report = resolver
        .resolve(genes)
        .await
        .context("Gene coordinate lookup failed")?;

    if let Some(log) = audit_log {
        for gene in &report.unresolved {
            let details = serde_json::json!({ "gene": gene.symbol, "reason": gene.reason.to_string() });
            if let Err(e) = audit::log_event(log, AuditEventType::GeneUnresolved, "panel", None, details) {
                warn!("Failed to write audit event: {}", e);
            }
        }
    }

    let builder = RegionFileBuilder::new(config.coordinate_convention);
    let path = builder
        .write(&report.regions, out)
        .with_context(|| format!("Failed to write region file {:?}", out))?;

    info!(
        "Virtual panel ready: {} regions, {} unresolved genes -> {:?}",
        report.regions.len(),
        report.unresolved.len(),
        path
    );

    if let Some(log) = audit_log {
        let details = serde_json::json!({
            "regions": report.regions.len(),
            "unresolved": report.unresolved.len(),
            "build": config.reference_build.as_str(),
            "convention": config.coordinate_convention.to_string(),
        });
        if let Err(e) = audit::log_event(
            log,
            AuditEventType::RegionFileWritten,
            "panel",
            Some(path.display().to_string()),
            details,
        ) {
            warn!("Failed to write audit event: {}", e);
        }
    }

    Ok(report)
}

/// Filter an annotation table and write the shortlist reports
pub async fn filter_and_report(
    config: &PanelConfig,
    table_path: &Path,
    sample_id: &str,
    report_dir: &Path,
    audit_log: Option<&AuditLog>,
) -> Result<FilterOutcome> {
    info!("Reading annotation table: {:?}", table_path);
    let table = AnnotationParser::parse(table_path)
        .with_context(|| format!("Failed to read annotation table {:?}", table_path))?;

    let shortlist = ClinicalVariantFilter::new(&config.filter)
        .apply(&table)
        .context("Clinical filter failed")?;

    if shortlist.is_empty() {
        info!("No variants passed the clinical filter for sample {}", sample_id);
    }

    let writer = ReportWriter::new(sample_id, &config.report.name, report_dir);
    let reports = writer
        .write(&config.report.formats, &shortlist)
        .await
        .context("Failed to write shortlist report")?;

    if let Some(log) = audit_log {
        for path in reports.values() {
            let details = serde_json::json!({
                "variants": shortlist.len(),
                "annotated": table.rows.len(),
            });
            if let Err(e) = audit::log_event(
                log,
                AuditEventType::ShortlistWritten,
                sample_id,
                Some(path.display().to_string()),
                details,
            ) {
                warn!("Failed to write audit event: {}", e);
            }
        }
    }

    Ok(FilterOutcome {
        annotated_variants: table.rows.len(),
        shortlist,
        reports,
    })
}

pub struct PanelProcessor<R> {
    config: PanelConfig,
    runner: R,
}

impl<R: StageRunner> PanelProcessor<R> {
    pub fn new(config: PanelConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Main processing pipeline for one sample
    pub async fn process(
        self,
        inputs: &SampleInputs,
        work_dir: &Path,
        report_dir: &Path,
    ) -> Result<ProcessingOutcome> {
        info!("Starting virtual panel processing for sample {}", inputs.sample_id);
        info!(
            "Reference build: {}, padding: {} bp",
            self.config.reference_build, self.config.padding_bp
        );

        self.config.validate().context("Invalid panel configuration")?;

        std::fs::create_dir_all(work_dir)
            .with_context(|| format!("Failed to create work directory {:?}", work_dir))?;
        let audit_log = AuditLog::for_sample(work_dir, &inputs.sample_id);

        // 1. Pre-flight validation of every input
        info!("Validating inputs");
        let validated = InputValidator::new(&self.config)
            .validate_inputs(inputs)
            .await
            .context("Input validation failed")?;

        for input in &validated {
            let details = serde_json::json!({
                "kind": input.kind.to_string(),
                "size": input.size,
                "compressed": input.compressed,
                "sha256": input.hash_sha256,
            });
            if let Err(e) = audit::log_event(
                &audit_log,
                AuditEventType::InputValidated,
                &inputs.sample_id,
                Some(input.path.display().to_string()),
                details,
            ) {
                warn!("Failed to write audit event: {}", e);
            }
        }

        // 2. Load the panel and flag overlapping padded regions
        let regions = parse_region_file(&inputs.region_file, self.config.coordinate_convention)
            .context("Failed to load region file")?;
        info!("Panel: {} regions from {:?}", regions.len(), inputs.region_file);

        for (a, b) in regions.overlapping_after_padding(self.config.padding_bp) {
            warn!(
                "Regions {} and {} overlap after {} bp padding; calls there may be reported twice",
                a, b, self.config.padding_bp
            );
        }

        // 3. Plan and run the five external stages
        let mut run = PipelineRun::plan(inputs, work_dir, &self.config)
            .context("Failed to plan pipeline run")?;
        let orchestrator = PipelineOrchestrator::new(self.runner).with_audit(audit_log.clone());
        orchestrator
            .execute(&mut run)
            .await
            .with_context(|| format!("Pipeline failed for sample {}", inputs.sample_id))?;

        // 4. Summarize calls (diagnostic only)
        let variant_calls = match CallSummarizer::new(&regions, self.config.padding_bp)
            .summarize(&run.artifacts.vcf)
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Could not summarize variant calls: {}", e);
                None
            }
        };

        // 5. Filter the annotated table and write reports
        let filter = filter_and_report(
            &self.config,
            &run.artifacts.annotation_table,
            &inputs.sample_id,
            report_dir,
            Some(&audit_log),
        )
        .await?;

        info!(
            "Processing complete for sample {}: {} of {} annotated variants shortlisted",
            inputs.sample_id,
            filter.shortlist.len(),
            filter.annotated_variants
        );

        Ok(ProcessingOutcome {
            run_id: run.run_id,
            variant_calls,
            filter,
        })
    }
}
