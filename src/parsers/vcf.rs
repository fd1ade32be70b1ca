// ==============================================================================
// parsers/vcf.rs - Variant Call Summary
// ==============================================================================
// Description: Counts variant calls and checks them against the padded panel
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// ==============================================================================

use noodles_vcf as vcf;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{normalize_chromosome, RegionSet};

/// VCF summary errors
#[derive(Error, Debug)]
pub enum VCFParseError {
    #[error("Failed to open VCF file: {0}")]
    FileOpenError(String),

    #[error("Failed to read VCF header: {0}")]
    HeaderError(String),

    #[error("Failed to parse VCF record {record}: {details}")]
    RecordError { record: usize, details: String },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Counts over the caller's output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSummary {
    pub total: usize,
    /// Calls that fall outside every padded panel region
    pub outside_panel: usize,
    pub by_chromosome: BTreeMap<String, usize>,
}

/// Reads a called VCF (.vcf or .vcf.gz) and summarizes it against the panel
pub struct CallSummarizer<'a> {
    regions: &'a RegionSet,
    padding_bp: u32,
}

impl<'a> CallSummarizer<'a> {
    pub fn new(regions: &'a RegionSet, padding_bp: u32) -> Self {
        Self { regions, padding_bp }
    }

    pub fn summarize(&self, path: impl AsRef<Path>) -> Result<CallSummary, VCFParseError> {
        let path = path.as_ref();

        let mut reader = vcf::io::reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| VCFParseError::FileOpenError(format!("{}: {}", path.display(), e)))?;

        reader
            .read_header()
            .map_err(|e| VCFParseError::HeaderError(e.to_string()))?;

        let mut summary = CallSummary::default();

        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| VCFParseError::RecordError {
                record: idx + 1,
                details: e.to_string(),
            })?;

            let chromosome = normalize_chromosome(record.reference_sequence_name())
                .ok_or_else(|| VCFParseError::MissingField("CHROM".to_string()))?;

            let position = match record.variant_start() {
                Some(Ok(pos)) => usize::from(pos.get()) as u64,
                Some(Err(e)) => {
                    return Err(VCFParseError::RecordError {
                        record: idx + 1,
                        details: format!("Failed to get position: {}", e),
                    })
                }
                None => return Err(VCFParseError::MissingField("POS".to_string())),
            };

            if !self.regions.contains_padded(&chromosome, position, self.padding_bp) {
                summary.outside_panel += 1;
            }

            summary.total += 1;
            *summary.by_chromosome.entry(chromosome).or_insert(0) += 1;
        }

        info!(
            "Variant calls in {:?}: {} total across {} chromosomes",
            path,
            summary.total,
            summary.by_chromosome.len()
        );
        if summary.outside_panel > 0 {
            warn!(
                "{} calls fall outside the padded panel ({} bp padding)",
                summary.outside_panel, self.padding_bp
            );
        }

        Ok(summary)
    }
}
