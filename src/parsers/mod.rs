// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for annotation tables and variant call files
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod annotation;
pub mod vcf;

pub use annotation::{AnnotationParseError, AnnotationParser};
pub use vcf::{CallSummarizer, CallSummary, VCFParseError};
