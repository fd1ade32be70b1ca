// ==============================================================================
// filter.rs - Clinical Variant Filter
// ==============================================================================
// Description: Multi-criteria predicate selecting clinically relevant variants
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// A row is kept when:
//   ( SIFT < sift_threshold
//     OR PolyPhen > polyphen_threshold
//     OR clinical significance contains pathogenic_token )
//   AND population frequency < frequency_threshold
//
// Missing values:
//   SIFT / PolyPhen / clinical flag missing -> that criterion is false
//   frequency missing                       -> MissingFrequencyPolicy
// ==============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FilterConfig;
use crate::models::{AnnotatedVariant, AnnotationTable, VariantShortlist};

/// How a variant with no population frequency is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MissingFrequencyPolicy {
    /// Absent from population databases: counts as frequency 0
    #[default]
    TreatAsRare,
    /// No frequency evidence: the row is dropped
    Exclude,
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Annotation table is missing required column '{field}'")]
    AnnotationFieldMissing { field: String },

    #[error("Line {line}, column '{column}': '{value}' is not a valid number")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
}

/// Column positions resolved once per table
struct FilterColumnIndex {
    sift: usize,
    polyphen: usize,
    clinical_significance: usize,
    population_frequency: usize,
}

pub struct ClinicalVariantFilter {
    config: FilterConfig,
}

impl ClinicalVariantFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Apply the predicate to every row, preserving input order.
    ///
    /// An empty result is a valid outcome.
    pub fn apply(&self, table: &AnnotationTable) -> Result<VariantShortlist, FilterError> {
        let columns = self.resolve_columns(table)?;
        let mut rows = Vec::new();

        for row in &table.rows {
            if self.include(row, &columns)? {
                rows.push(row.clone());
            }
        }

        info!(
            "Clinical filter retained {} of {} variants (SIFT < {}, PolyPhen > {}, '{}' in {}, frequency < {}, missing frequency: {:?})",
            rows.len(),
            table.rows.len(),
            self.config.sift_threshold,
            self.config.polyphen_threshold,
            self.config.pathogenic_token,
            self.config.columns.clinical_significance,
            self.config.frequency_threshold,
            self.config.missing_frequency
        );

        Ok(VariantShortlist {
            header: table.header.clone(),
            rows,
        })
    }

    fn resolve_columns(&self, table: &AnnotationTable) -> Result<FilterColumnIndex, FilterError> {
        let find = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| FilterError::AnnotationFieldMissing {
                    field: name.to_string(),
                })
        };

        let names = &self.config.columns;
        Ok(FilterColumnIndex {
            sift: find(&names.sift)?,
            polyphen: find(&names.polyphen)?,
            clinical_significance: find(&names.clinical_significance)?,
            population_frequency: find(&names.population_frequency)?,
        })
    }

    fn include(&self, row: &AnnotatedVariant, columns: &FilterColumnIndex) -> Result<bool, FilterError> {
        let names = &self.config.columns;
        let sift = self.numeric(row, columns.sift, &names.sift)?;
        let polyphen = self.numeric(row, columns.polyphen, &names.polyphen)?;
        let frequency = self.numeric(row, columns.population_frequency, &names.population_frequency)?;
        let clinical = self.text(row, columns.clinical_significance);

        let deleterious = sift.is_some_and(|s| s < self.config.sift_threshold)
            || polyphen.is_some_and(|p| p > self.config.polyphen_threshold)
            || clinical.is_some_and(|c| c.contains(self.config.pathogenic_token.as_str()));

        let rare = match frequency {
            Some(f) => f < self.config.frequency_threshold,
            None => self.config.missing_frequency == MissingFrequencyPolicy::TreatAsRare,
        };

        let keep = deleterious && rare;
        if !keep {
            debug!("Line {} excluded (deleterious={}, rare={})", row.line, deleterious, rare);
        }

        Ok(keep)
    }

    /// Cell text, or None when absent or a missing-value token
    fn text<'a>(&self, row: &'a AnnotatedVariant, column: usize) -> Option<&'a str> {
        let value = row.value(column)?.trim();
        if self.config.missing_tokens.iter().any(|t| t == value) {
            None
        } else {
            Some(value)
        }
    }

    fn numeric(&self, row: &AnnotatedVariant, column: usize, name: &str) -> Result<Option<f64>, FilterError> {
        let Some(value) = self.text(row, column) else {
            return Ok(None);
        };

        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Some(number)),
            _ => Err(FilterError::InvalidNumber {
                line: row.line,
                column: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::AnnotationParser;

    const HEADER: &str = "Chr\tStart\tEnd\tRef\tAlt\tSIFT_score\tPolyphen2_HVAR_score\tCLNSIG\tgnomAD_exome_ALL";

    fn table(rows: &[&str]) -> AnnotationTable {
        let mut text = format!("{}\n", HEADER);
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        AnnotationParser::parse_reader(text.as_bytes()).unwrap()
    }

    fn row(pos: u32, sift: &str, polyphen: &str, clnsig: &str, freq: &str) -> String {
        format!("chr10\t{}\t{}\tC\tT\t{}\t{}\t{}\t{}", pos, pos, sift, polyphen, clnsig, freq)
    }

    fn default_filter() -> ClinicalVariantFilter {
        ClinicalVariantFilter::new(&FilterConfig::default())
    }

    fn kept(filter: &ClinicalVariantFilter, rows: &[String]) -> Vec<u64> {
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        filter
            .apply(&table(&refs))
            .unwrap()
            .rows
            .iter()
            .map(|r| r.locus.as_ref().unwrap().start)
            .collect()
    }

    #[test]
    fn test_common_variant_excluded() {
        let rows = vec![row(1, "0.01", "0.95", "Benign", "0.5")];
        assert!(kept(&default_filter(), &rows).is_empty());
    }

    #[test]
    fn test_clinical_flag_alone_suffices() {
        let rows = vec![row(2, "0.9", "0.1", "Pathogenic", "0.001")];
        assert_eq!(kept(&default_filter(), &rows), vec![2]);
    }

    #[test]
    fn test_missing_scores_with_pathogenic_flag() {
        let rows = vec![row(3, ".", ".", "Pathogenic/Likely_pathogenic", "0.0001")];
        assert_eq!(kept(&default_filter(), &rows), vec![3]);
    }

    #[test]
    fn test_all_scores_missing_benign_excluded() {
        let rows = vec![row(4, ".", ".", "Benign", ".")];
        assert!(kept(&default_filter(), &rows).is_empty());
    }

    #[test]
    fn test_order_preserved_and_rows_complete() {
        let rows = vec![
            row(10, "0.01", ".", ".", "0.001"),
            row(20, "0.9", "0.1", "Benign", "0.001"),
            row(30, ".", "0.95", ".", "0"),
            row(40, "0.02", "0.99", "Pathogenic", "0.2"),
            row(50, ".", ".", "Likely_pathogenic|Pathogenic", "NA"),
        ];
        let filter = default_filter();
        assert_eq!(kept(&filter, &rows), vec![10, 30, 50]);

        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let input = table(&refs);
        let shortlist = filter.apply(&input).unwrap();
        assert_eq!(shortlist.header, input.header);
        assert_eq!(shortlist.rows[1], input.rows[2]);
    }

    #[test]
    fn test_empty_result_is_valid() {
        let shortlist = default_filter().apply(&table(&[])).unwrap();
        assert!(shortlist.is_empty());
        assert_eq!(shortlist.header.len(), 9);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let rows = vec![
            row(1, "0.05", "0.909", ".", "0.001"),
            row(2, "0.01", ".", ".", "0.01"),
        ];
        assert!(kept(&default_filter(), &rows).is_empty());
    }

    #[test]
    fn test_token_match_is_case_sensitive() {
        let rows = vec![row(1, ".", ".", "pathogenic", "0.001")];
        assert!(kept(&default_filter(), &rows).is_empty());
    }

    #[test]
    fn test_missing_frequency_policy() {
        let rows = vec![row(7, "0.01", ".", ".", ".")];
        assert_eq!(kept(&default_filter(), &rows), vec![7]);

        let config = FilterConfig {
            missing_frequency: MissingFrequencyPolicy::Exclude,
            ..FilterConfig::default()
        };
        assert!(kept(&ClinicalVariantFilter::new(&config), &rows).is_empty());
    }

    #[test]
    fn test_short_row_counts_as_missing() {
        let input = table(&["chr10\t5\t5\tC\tT\t0.01"]);
        let shortlist = default_filter().apply(&input).unwrap();
        assert_eq!(shortlist.len(), 1);
    }

    #[test]
    fn test_missing_column() {
        let input = AnnotationParser::parse_reader("Chr\tStart\tSIFT_score\n".as_bytes()).unwrap();
        match default_filter().apply(&input) {
            Err(FilterError::AnnotationFieldMissing { field }) => assert_eq!(field, "Polyphen2_HVAR_score"),
            other => panic!("Expected AnnotationFieldMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_score() {
        let bad = row(9, "tolerated", ".", ".", "0.001");
        let input = table(&[bad.as_str()]);
        match default_filter().apply(&input) {
            Err(FilterError::InvalidNumber { line, column, value }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "SIFT_score");
                assert_eq!(value, "tolerated");
            }
            other => panic!("Expected InvalidNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_columns() {
        let mut config = FilterConfig::default();
        config.columns.population_frequency = "AF_popmax".to_string();
        let text = "SIFT_score\tPolyphen2_HVAR_score\tCLNSIG\tAF_popmax\n.\t.\tPathogenic\t0.001\n";
        let input = AnnotationParser::parse_reader(text.as_bytes()).unwrap();

        assert_eq!(ClinicalVariantFilter::new(&config).apply(&input).unwrap().len(), 1);
    }
}
