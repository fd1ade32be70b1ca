// ==============================================================================
// config.rs - Run Configuration
// ==============================================================================
// Description: Explicit configuration passed into every component (no globals)
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Example panel.toml:
//   reference_build = "hg38"
//   coordinate_convention = "zero_based_half_open"
//   candidate_policy = "first"
//   padding_bp = 100
//
//   [filter]
//   sift_threshold = 0.05
//   missing_frequency = "treat_as_rare"
//
//   [tools]
//   gatk = "/opt/gatk/gatk"
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filter::MissingFrequencyPolicy;
use crate::models::{CoordinateConvention, ReferenceBuild};
use crate::output::ReportFormat;
use crate::resolver::CandidatePolicy;

/// Default flanking bases added to each side of every panel region
pub const DEFAULT_PADDING_BP: u32 = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub reference_build: ReferenceBuild,
    pub coordinate_convention: CoordinateConvention,
    pub candidate_policy: CandidatePolicy,
    /// Flanking bases applied symmetrically by the variant caller
    pub padding_bp: u32,
    /// Threads passed to the aligner
    pub threads: u32,
    pub lookup: LookupConfig,
    pub tools: ToolPaths,
    pub annotation: AnnotationConfig,
    pub filter: FilterConfig,
    pub report: ReportConfig,
    pub validation: ValidationConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            reference_build: ReferenceBuild::default(),
            coordinate_convention: CoordinateConvention::default(),
            candidate_policy: CandidatePolicy::default(),
            padding_bp: DEFAULT_PADDING_BP,
            threads: 8,
            lookup: LookupConfig::default(),
            tools: ToolPaths::default(),
            annotation: AnnotationConfig::default(),
            filter: FilterConfig::default(),
            report: ReportConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Gene coordinate lookup service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub endpoint: String,
    pub species: String,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://mygene.info/v3/query".to_string(),
            species: "human".to_string(),
            timeout_secs: 30,
        }
    }
}

/// External tool executables (names are resolved on PATH)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub bwa: PathBuf,
    pub samtools: PathBuf,
    pub gatk: PathBuf,
    pub annovar: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            bwa: PathBuf::from("bwa"),
            samtools: PathBuf::from("samtools"),
            gatk: PathBuf::from("gatk"),
            annovar: PathBuf::from("table_annovar.pl"),
        }
    }
}

/// ANNOVAR table_annovar.pl settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub humandb: PathBuf,
    pub protocols: Vec<String>,
    pub operations: Vec<String>,
    pub nastring: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            humandb: PathBuf::from("humandb/"),
            protocols: ["refGene", "cytoBand", "gnomad211_exome", "clinvar_20221231", "dbnsfp42a"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            operations: ["g", "r", "f", "f", "f"].iter().map(|s| s.to_string()).collect(),
            nastring: ".".to_string(),
        }
    }
}

/// Annotation column names read by the clinical filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterColumns {
    pub sift: String,
    pub polyphen: String,
    pub clinical_significance: String,
    pub population_frequency: String,
}

impl Default for FilterColumns {
    fn default() -> Self {
        Self {
            sift: "SIFT_score".to_string(),
            polyphen: "Polyphen2_HVAR_score".to_string(),
            clinical_significance: "CLNSIG".to_string(),
            population_frequency: "gnomAD_exome_ALL".to_string(),
        }
    }
}

/// Clinical filter thresholds and missing-value policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// SIFT below this is deleterious
    pub sift_threshold: f64,
    /// PolyPhen-2 HVAR above this is deleterious
    pub polyphen_threshold: f64,
    /// Population frequency must be below this
    pub frequency_threshold: f64,
    /// Substring of the clinical significance field that flags a variant
    pub pathogenic_token: String,
    pub missing_frequency: MissingFrequencyPolicy,
    /// Cell values treated as missing
    pub missing_tokens: Vec<String>,
    pub columns: FilterColumns,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sift_threshold: 0.05,
            polyphen_threshold: 0.909,
            frequency_threshold: 0.01,
            pathogenic_token: "Pathogenic".to_string(),
            missing_frequency: MissingFrequencyPolicy::default(),
            missing_tokens: vec![".".to_string(), String::new(), "NA".to_string()],
            columns: FilterColumns::default(),
        }
    }
}

/// Shortlist report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// File name suffix: `<sample>_<name>.<ext>`
    pub name: String,
    pub formats: Vec<ReportFormat>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            name: "Thyroid_Panel_Report".to_string(),
            formats: vec![ReportFormat::Tsv],
        }
    }
}

/// Pre-flight input validation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Compute SHA-256 fingerprints of every input (slow for whole-genome FASTA)
    pub checksums: bool,
}

impl PanelConfig {
    /// Load from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let filter = &self.filter;
        for (name, value) in [
            ("sift_threshold", filter.sift_threshold),
            ("polyphen_threshold", filter.polyphen_threshold),
            ("frequency_threshold", filter.frequency_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "filter.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if filter.pathogenic_token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "filter.pathogenic_token must not be empty".to_string(),
            ));
        }

        if self.annotation.protocols.is_empty()
            || self.annotation.protocols.len() != self.annotation.operations.len()
        {
            return Err(ConfigError::Invalid(format!(
                "annotation.protocols ({}) and annotation.operations ({}) must be non-empty and the same length",
                self.annotation.protocols.len(),
                self.annotation.operations.len()
            )));
        }

        // Annotated missing cells must read as missing to the filter
        let nastring = self.annotation.nastring.trim();
        if !filter.missing_tokens.iter().any(|t| t == nastring) {
            return Err(ConfigError::Invalid(format!(
                "annotation.nastring '{}' is not listed in filter.missing_tokens {:?}",
                self.annotation.nastring, filter.missing_tokens
            )));
        }

        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".to_string()));
        }

        if self.report.formats.is_empty() {
            return Err(ConfigError::Invalid(
                "report.formats must list at least one format".to_string(),
            ));
        }

        Ok(())
    }
}
