// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Pre-flight checks on sample inputs before any pipeline stage runs
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Checks per input: exists, non-empty, magic number / first line, optional SHA-256
//   reads        gzip or plain FASTQ (first line starts with '@')
//   reference    gzip or plain FASTA (first line starts with '>')
//   known sites  gzip/bgzip or plain VCF (##fileformat=VCFv4.x)
//   region file  parses as a non-empty region file
// ==============================================================================

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::PanelConfig;
use crate::models::CoordinateConvention;
use crate::pipeline::SampleInputs;
use crate::region_file::parse_region_file;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const MAX_SAMPLE_ID_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Reads,
    Reference,
    KnownSites,
    RegionFile,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputKind::Reads => "reads",
            InputKind::Reference => "reference",
            InputKind::KnownSites => "known sites",
            InputKind::RegionFile => "region file",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub kind: InputKind,
    pub path: PathBuf,
    pub size: u64,
    pub compressed: bool,
    pub hash_sha256: Option<String>,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

/// Sample ids become file names and read-group tags
pub fn validate_sample_id(sample_id: &str) -> Result<()> {
    if sample_id.is_empty() || sample_id.len() > MAX_SAMPLE_ID_LEN {
        anyhow::bail!(
            "Sample id must be 1-{} characters, got {}",
            MAX_SAMPLE_ID_LEN,
            sample_id.len()
        );
    }

    if sample_id.starts_with('.')
        || !sample_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        anyhow::bail!(
            "Invalid sample id '{}': use letters, digits, '_', '-' or '.'",
            sample_id
        );
    }

    Ok(())
}

pub struct InputValidator {
    compute_checksums: bool,
    convention: CoordinateConvention,
}

impl InputValidator {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            compute_checksums: config.validation.checksums,
            convention: config.coordinate_convention,
        }
    }

    /// Validate every supplied input for one sample
    pub async fn validate_inputs(&self, inputs: &SampleInputs) -> Result<Vec<ValidatedInput>> {
        validate_sample_id(&inputs.sample_id)?;

        let checks = [
            (InputKind::Reads, &inputs.reads_1),
            (InputKind::Reads, &inputs.reads_2),
            (InputKind::Reference, &inputs.reference),
            (InputKind::KnownSites, &inputs.known_sites),
            (InputKind::RegionFile, &inputs.region_file),
        ];

        let mut validated = Vec::with_capacity(checks.len());
        for (kind, path) in checks {
            validated.push(self.validate_file(kind, path).await?);
        }

        info!("All {} inputs validated for sample {}", validated.len(), inputs.sample_id);
        Ok(validated)
    }

    pub async fn validate_file(&self, kind: InputKind, path: &Path) -> Result<ValidatedInput> {
        info!("Validating {} file: {:?}", kind, path);

        // 1. Existence and size
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Cannot read {} file {:?}", kind, path))?;
        if !metadata.is_file() {
            anyhow::bail!("{} path {:?} is not a regular file", kind, path);
        }
        if metadata.len() == 0 {
            anyhow::bail!("{} file {:?} is empty", kind, path);
        }
        debug!("Size check passed: {} bytes", metadata.len());

        // 2. Magic number
        let compressed = self.read_magic_number(path)? == GZIP_MAGIC;
        debug!("Compressed: {}", compressed);

        // 3. Content validation (basic format check)
        self.validate_content(kind, path, compressed)
            .with_context(|| format!("Invalid {} file {:?}", kind, path))?;
        debug!("Content validation passed");

        // 4. Optional SHA-256 fingerprint
        let hash_sha256 = if self.compute_checksums {
            let hash = self.compute_sha256(path)?;
            debug!("SHA-256: {}", hash);
            Some(hash)
        } else {
            None
        };

        Ok(ValidatedInput {
            kind,
            path: path.to_path_buf(),
            size: metadata.len(),
            compressed,
            hash_sha256,
            validated_at: chrono::Utc::now(),
        })
    }

    fn read_magic_number(&self, path: &Path) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(GZIP_MAGIC.len());
        File::open(path)?
            .take(GZIP_MAGIC.len() as u64)
            .read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn validate_content(&self, kind: InputKind, path: &Path, compressed: bool) -> Result<()> {
        match kind {
            InputKind::Reads => {
                let line = self.first_line(path, compressed)?;
                if !line.starts_with('@') {
                    anyhow::bail!("Not a FASTQ file: first record does not start with '@'");
                }
            }
            InputKind::Reference => {
                let line = self.first_line(path, compressed)?;
                if !line.starts_with('>') {
                    anyhow::bail!("Not a FASTA file: first line does not start with '>'");
                }
            }
            InputKind::KnownSites => {
                let line = self.first_line(path, compressed)?;
                if !line.starts_with("##fileformat=VCFv4.") {
                    anyhow::bail!("Invalid VCF format: missing fileformat header");
                }
            }
            InputKind::RegionFile => {
                let regions = parse_region_file(path, self.convention)?;
                debug!("Region file lists {} regions", regions.len());
            }
        }

        Ok(())
    }

    /// First non-blank line, decompressing gzip/bgzip when needed
    fn first_line(&self, path: &Path, compressed: bool) -> Result<String> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        for line in reader.lines() {
            let line = line.context("Failed to read file contents")?;
            if !line.trim().is_empty() {
                return Ok(line);
            }
        }

        anyhow::bail!("File has no content")
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
