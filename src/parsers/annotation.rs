// ==============================================================================
// parsers/annotation.rs - Annotated Variant Table Parser
// ==============================================================================
// Description: Reads ANNOVAR-style tab-separated multianno tables
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format:
//   Chr  Start  End  Ref  Alt  Func.refGene  ...  CLNSIG  ...  Otherinfo1 ...
//   chr10  43114500  43114500  C  T  exonic  ...  Pathogenic  ...
//
// Rows may carry more trailing values than the header names (VCF passthrough
// columns); they are kept verbatim.
// ==============================================================================

use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::models::{AnnotatedVariant, AnnotationTable, VariantLocus};

#[derive(Error, Debug)]
pub enum AnnotationParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Annotation table has no header row")]
    MissingHeader,
}

pub struct AnnotationParser;

impl AnnotationParser {
    /// Parse an annotation table from disk
    pub fn parse(path: impl AsRef<Path>) -> Result<AnnotationTable, AnnotationParseError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::parse_reader(file)
    }

    /// Parse an annotation table from any reader
    pub fn parse_reader<R: Read>(input: R) -> Result<AnnotationTable, AnnotationParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(input);

        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if header.iter().all(|h| h.trim().is_empty()) {
            return Err(AnnotationParseError::MissingHeader);
        }

        let locus_columns = LocusColumns::find(&header);
        let mut rows = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);

            rows.push(AnnotatedVariant {
                line,
                locus: locus_columns.as_ref().and_then(|c| c.extract(&record)),
                values: record.iter().map(str::to_string).collect(),
            });
        }

        debug!("Annotation table: {} columns, {} rows", header.len(), rows.len());

        Ok(AnnotationTable { header, rows })
    }
}

/// Positions of the Chr/Start/Ref/Alt columns
struct LocusColumns {
    chromosome: usize,
    start: usize,
    ref_allele: usize,
    alt_allele: usize,
}

impl LocusColumns {
    fn find(header: &[String]) -> Option<Self> {
        let index = |name: &str| header.iter().position(|h| h == name);
        Some(Self {
            chromosome: index("Chr")?,
            start: index("Start")?,
            ref_allele: index("Ref")?,
            alt_allele: index("Alt")?,
        })
    }

    fn extract(&self, record: &StringRecord) -> Option<VariantLocus> {
        Some(VariantLocus {
            chromosome: record.get(self.chromosome)?.to_string(),
            start: record.get(self.start)?.trim().parse().ok()?,
            ref_allele: record.get(self.ref_allele)?.to_string(),
            alt_allele: record.get(self.alt_allele)?.to_string(),
        })
    }
}
