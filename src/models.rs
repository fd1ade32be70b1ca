// ==============================================================================
// models.rs - Virtual Panel Data Models
// ==============================================================================
// Description: Gene symbols, genomic intervals, region sets and annotated rows
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-18
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Gene identifier as supplied by the user (e.g., "RET", "NKX2-1")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneSymbol(String);

impl GeneSymbol {
    /// Trim and wrap a raw symbol. Returns None for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Reference genome build. One build is chosen per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceBuild {
    #[default]
    Hg38,
    Hg19,
}

impl ReferenceBuild {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceBuild::Hg38 => "hg38",
            ReferenceBuild::Hg19 => "hg19",
        }
    }

    /// Name of the position field in MyGene.info responses for this build
    pub fn position_field(&self) -> &'static str {
        match self {
            ReferenceBuild::Hg38 => "genomic_pos",
            ReferenceBuild::Hg19 => "genomic_pos_hg19",
        }
    }
}

impl fmt::Display for ReferenceBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start-coordinate convention used for every interval of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateConvention {
    /// BED convention: start is 0-based, end is exclusive
    #[default]
    ZeroBasedHalfOpen,
    /// Start and end are both 1-based and inclusive (NCBI / Ensembl style)
    OneBasedInclusive,
}

impl CoordinateConvention {
    /// Convert a 1-based inclusive pair into this convention
    pub fn from_one_based(&self, start: u64, end: u64) -> (u64, u64) {
        match self {
            CoordinateConvention::ZeroBasedHalfOpen => (start.saturating_sub(1), end),
            CoordinateConvention::OneBasedInclusive => (start, end),
        }
    }

    /// Convert a pair in this convention back to 1-based inclusive
    pub fn to_one_based(&self, start: u64, end: u64) -> (u64, u64) {
        match self {
            CoordinateConvention::ZeroBasedHalfOpen => (start.saturating_add(1), end),
            CoordinateConvention::OneBasedInclusive => (start, end),
        }
    }
}

impl fmt::Display for CoordinateConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateConvention::ZeroBasedHalfOpen => f.write_str("0-based half-open"),
            CoordinateConvention::OneBasedInclusive => f.write_str("1-based inclusive"),
        }
    }
}

/// Errors raised when constructing an interval
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntervalError {
    #[error("Invalid chromosome name: '{0}'")]
    InvalidChromosome(String),

    #[error("Interval start {start} is greater than end {end}")]
    InvertedCoordinates { start: u64, end: u64 },
}

/// Normalize a chromosome token to the `chr` prefix convention.
///
/// `10` → `chr10`, `chrX` → `chrX`, `MT` / `M` → `chrM`. Blank input is rejected.
pub fn normalize_chromosome(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bare = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };

    if bare.is_empty() {
        return None;
    }

    if bare.eq_ignore_ascii_case("MT") || bare.eq_ignore_ascii_case("M") {
        return Some("chrM".to_string());
    }

    Some(format!("chr{}", bare))
}

/// True for chr1-chr22, chrX, chrY and chrM (no alt/patch contigs)
pub fn is_primary_chromosome(chromosome: &str) -> bool {
    let Some(normalized) = normalize_chromosome(chromosome) else {
        return false;
    };
    let bare = &normalized[3..];
    match bare {
        "X" | "Y" | "M" => true,
        _ => bare.parse::<u8>().map(|n| (1..=22).contains(&n)).unwrap_or(false),
    }
}

/// One panel region. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicInterval {
    chromosome: String,
    start: u64,
    end: u64,
    label: GeneSymbol,
    convention: CoordinateConvention,
}

impl GenomicInterval {
    /// Build an interval, normalizing the chromosome and checking `start <= end`
    pub fn new(
        chromosome: &str,
        start: u64,
        end: u64,
        label: GeneSymbol,
        convention: CoordinateConvention,
    ) -> Result<Self, IntervalError> {
        let chromosome = normalize_chromosome(chromosome)
            .ok_or_else(|| IntervalError::InvalidChromosome(chromosome.to_string()))?;

        if start > end {
            return Err(IntervalError::InvertedCoordinates { start, end });
        }

        Ok(Self {
            chromosome,
            start,
            end,
            label,
            convention,
        })
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn label(&self) -> &GeneSymbol {
        &self.label
    }

    pub fn convention(&self) -> CoordinateConvention {
        self.convention
    }

    /// 1-based inclusive bounds after symmetric padding
    pub fn padded_one_based(&self, padding_bp: u32) -> (u64, u64) {
        let (start, end) = self.convention.to_one_based(self.start, self.end);
        (
            start.saturating_sub(u64::from(padding_bp)).max(1),
            end.saturating_add(u64::from(padding_bp)),
        )
    }

    /// Whether a 1-based position falls inside the padded interval
    pub fn contains_padded(&self, chromosome: &str, position: u64, padding_bp: u32) -> bool {
        if normalize_chromosome(chromosome).as_deref() != Some(self.chromosome.as_str()) {
            return false;
        }
        let (start, end) = self.padded_one_based(padding_bp);
        (start..=end).contains(&position)
    }
}

/// Ordered set of panel regions for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSet {
    intervals: Vec<GenomicInterval>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interval. Returns false if an identical interval was already present.
    pub fn push(&mut self, interval: GenomicInterval) -> bool {
        if self.intervals.contains(&interval) {
            return false;
        }
        self.intervals.push(interval);
        true
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenomicInterval> {
        self.intervals.iter()
    }

    pub fn labels(&self) -> Vec<&GeneSymbol> {
        self.intervals.iter().map(|i| i.label()).collect()
    }

    /// Whether any padded interval contains the given 1-based position
    pub fn contains_padded(&self, chromosome: &str, position: u64, padding_bp: u32) -> bool {
        self.intervals
            .iter()
            .any(|i| i.contains_padded(chromosome, position, padding_bp))
    }

    /// Label pairs whose intervals overlap once padding is applied.
    ///
    /// The variant caller handles each padded interval on its own, so overlapping
    /// pairs can report the same call twice.
    pub fn overlapping_after_padding(&self, padding_bp: u32) -> Vec<(GeneSymbol, GeneSymbol)> {
        let mut pairs = Vec::new();
        for (idx, a) in self.intervals.iter().enumerate() {
            let (a_start, a_end) = a.padded_one_based(padding_bp);
            for b in &self.intervals[idx + 1..] {
                if a.chromosome() != b.chromosome() {
                    continue;
                }
                let (b_start, b_end) = b.padded_one_based(padding_bp);
                if a_start <= b_end && b_start <= a_end {
                    pairs.push((a.label().clone(), b.label().clone()));
                }
            }
        }
        pairs
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a GenomicInterval;
    type IntoIter = std::slice::Iter<'a, GenomicInterval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

/// Variant position taken from the annotation table's leading columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantLocus {
    pub chromosome: String,
    pub start: u64,
    pub ref_allele: String,
    pub alt_allele: String,
}

impl fmt::Display for VariantLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}>{}",
            self.chromosome, self.start, self.ref_allele, self.alt_allele
        )
    }
}

/// One row of the annotated variant table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedVariant {
    /// 1-based line number in the source table (header is line 1)
    pub line: usize,

    /// Locus, when the table carries Chr/Start/Ref/Alt columns
    pub locus: Option<VariantLocus>,

    /// All raw column values, in file order
    pub values: Vec<String>,
}

impl AnnotatedVariant {
    pub fn value(&self, column: usize) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Annotated variant table as produced by the annotation stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationTable {
    pub header: Vec<String>,
    pub rows: Vec<AnnotatedVariant>,
}

impl AnnotationTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// Rows that passed the clinical filter, with the original header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantShortlist {
    pub header: Vec<String>,
    pub rows: Vec<AnnotatedVariant>,
}

impl VariantShortlist {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Zero qualifying variants is a valid outcome
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
