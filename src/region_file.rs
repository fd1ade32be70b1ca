// ==============================================================================
// region_file.rs - Region File Builder
// ==============================================================================
// Description: Serializes the virtual panel as a tab-separated interval file
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format (no header, one region per line, RegionSet order):
//   chr10    43077068    43130351    RET
//   chr11    64803515    64811294    MEN1
//
// Coordinates follow the configured convention. The default is BED
// (0-based start, exclusive end), which is what `gatk -L targets.bed` expects.
// ==============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::models::{CoordinateConvention, GeneSymbol, GenomicInterval, RegionSet};

#[derive(Error, Debug)]
pub enum RegionFileError {
    #[error("Region set is empty: refusing to restrict variant calling to zero regions")]
    EmptyRegionSet,

    #[error("Interval for {label} uses {found} coordinates, expected {expected}")]
    MixedConventions {
        label: String,
        found: CoordinateConvention,
        expected: CoordinateConvention,
    },

    #[error("Invalid region line {line}: {details}")]
    InvalidLine { line: usize, details: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Writes region sets under a single coordinate convention
#[derive(Debug, Clone, Copy)]
pub struct RegionFileBuilder {
    convention: CoordinateConvention,
}

impl RegionFileBuilder {
    pub fn new(convention: CoordinateConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> CoordinateConvention {
        self.convention
    }

    /// Render the region file contents
    pub fn render(&self, regions: &RegionSet) -> Result<String, RegionFileError> {
        if regions.is_empty() {
            return Err(RegionFileError::EmptyRegionSet);
        }

        let mut out = String::new();
        for interval in regions {
            if interval.convention() != self.convention {
                return Err(RegionFileError::MixedConventions {
                    label: interval.label().to_string(),
                    found: interval.convention(),
                    expected: self.convention,
                });
            }

            // Writing into a String cannot fail
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}",
                interval.chromosome(),
                interval.start(),
                interval.end(),
                interval.label()
            );
        }

        Ok(out)
    }

    /// Render and write the region file, creating parent directories
    pub fn write(&self, regions: &RegionSet, path: impl AsRef<Path>) -> Result<PathBuf, RegionFileError> {
        let path = path.as_ref();
        let contents = self.render(regions)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, contents)?;

        info!(
            "Region file {:?} written with {} regions ({})",
            path,
            regions.len(),
            self.convention
        );

        Ok(path.to_path_buf())
    }
}

/// Parse region file text. Blank, `#`, `track` and `browser` lines are skipped.
pub fn parse_regions(text: &str, convention: CoordinateConvention) -> Result<RegionSet, RegionFileError> {
    let mut regions = RegionSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(RegionFileError::InvalidLine {
                line: line_number,
                details: format!("expected at least 3 tab-separated fields, found {}", fields.len()),
            });
        }

        let parse_coord = |value: &str| {
            value.trim().parse::<u64>().map_err(|_| RegionFileError::InvalidLine {
                line: line_number,
                details: format!("invalid coordinate '{}'", value),
            })
        };
        let start = parse_coord(fields[1])?;
        let end = parse_coord(fields[2])?;

        let label = fields
            .get(3)
            .and_then(|l| GeneSymbol::parse(l))
            .or_else(|| GeneSymbol::parse(&format!("{}:{}-{}", fields[0].trim(), start, end)))
            .ok_or_else(|| RegionFileError::InvalidLine {
                line: line_number,
                details: "missing label".to_string(),
            })?;

        let interval = GenomicInterval::new(fields[0], start, end, label, convention).map_err(|e| {
            RegionFileError::InvalidLine {
                line: line_number,
                details: e.to_string(),
            }
        })?;

        regions.push(interval);
    }

    if regions.is_empty() {
        return Err(RegionFileError::EmptyRegionSet);
    }

    Ok(regions)
}

/// Read a region file back into a RegionSet
pub fn parse_region_file(
    path: impl AsRef<Path>,
    convention: CoordinateConvention,
) -> Result<RegionSet, RegionFileError> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_regions(&text, convention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gene(s: &str) -> GeneSymbol {
        GeneSymbol::parse(s).unwrap()
    }

    fn sample_regions(convention: CoordinateConvention) -> RegionSet {
        let mut regions = RegionSet::new();
        regions.push(GenomicInterval::new("10", 43_077_068, 43_130_351, gene("RET"), convention).unwrap());
        regions.push(GenomicInterval::new("11", 64_803_515, 64_811_294, gene("MEN1"), convention).unwrap());
        regions.push(GenomicInterval::new("14", 36_516_391, 36_520_232, gene("NKX2-1"), convention).unwrap());
        regions
    }

    #[test]
    fn test_render_format() {
        let builder = RegionFileBuilder::new(CoordinateConvention::ZeroBasedHalfOpen);
        let text = builder
            .render(&sample_regions(CoordinateConvention::ZeroBasedHalfOpen))
            .unwrap();

        assert_eq!(
            text,
            "chr10\t43077068\t43130351\tRET\n\
             chr11\t64803515\t64811294\tMEN1\n\
             chr14\t36516391\t36520232\tNKX2-1\n"
        );
    }

    #[test]
    fn test_empty_region_set_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("targets.bed");
        let builder = RegionFileBuilder::new(CoordinateConvention::ZeroBasedHalfOpen);

        assert!(matches!(
            builder.write(&RegionSet::new(), &path),
            Err(RegionFileError::EmptyRegionSet)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_mixed_conventions_rejected() {
        let mut regions = sample_regions(CoordinateConvention::ZeroBasedHalfOpen);
        regions.push(
            GenomicInterval::new("3", 100, 200, gene("CASR"), CoordinateConvention::OneBasedInclusive)
                .unwrap(),
        );

        let builder = RegionFileBuilder::new(CoordinateConvention::ZeroBasedHalfOpen);
        match builder.render(&regions) {
            Err(RegionFileError::MixedConventions { label, .. }) => assert_eq!(label, "CASR"),
            other => panic!("Expected MixedConventions, got {:?}", other),
        }
    }

    #[test]
    fn test_write_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("panel").join("targets.bed");
        let builder = RegionFileBuilder::new(CoordinateConvention::ZeroBasedHalfOpen);
        let regions = sample_regions(CoordinateConvention::ZeroBasedHalfOpen);

        builder.write(&regions, &path).unwrap();
        let first = fs::read(&path).unwrap();
        builder.write(&regions, &path).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_round_trip() {
        for convention in [
            CoordinateConvention::ZeroBasedHalfOpen,
            CoordinateConvention::OneBasedInclusive,
        ] {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("targets.bed");
            let builder = RegionFileBuilder::new(convention);
            let regions = sample_regions(convention);

            builder.write(&regions, &path).unwrap();
            let parsed = parse_region_file(&path, convention).unwrap();

            assert_eq!(parsed, regions);
        }
    }

    #[test]
    fn test_parse_skips_comments_and_tracks() {
        let text = "# panel\ntrack name=panel\nbrowser position chr10\n\nchr10\t1\t100\tRET\r\n3\t5\t9\n";
        let regions = parse_regions(text, CoordinateConvention::ZeroBasedHalfOpen).unwrap();
        let intervals: Vec<_> = regions.iter().collect();

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].label().as_str(), "RET");
        assert_eq!(intervals[1].chromosome(), "chr3");
        assert_eq!(intervals[1].label().as_str(), "3:5-9");
    }

    #[test]
    fn test_parse_invalid_lines() {
        let conv = CoordinateConvention::ZeroBasedHalfOpen;

        match parse_regions("chr1\t100\n", conv) {
            Err(RegionFileError::InvalidLine { line, .. }) => assert_eq!(line, 1),
            other => panic!("Expected InvalidLine, got {:?}", other),
        }

        match parse_regions("# ok\nchr1\tabc\t200\tX\n", conv) {
            Err(RegionFileError::InvalidLine { line, details }) => {
                assert_eq!(line, 2);
                assert!(details.contains("abc"));
            }
            other => panic!("Expected InvalidLine, got {:?}", other),
        }

        assert!(matches!(
            parse_regions("chr1\t300\t200\tX\n", conv),
            Err(RegionFileError::InvalidLine { .. })
        ));

        assert!(matches!(
            parse_regions("# only comments\n", conv),
            Err(RegionFileError::EmptyRegionSet)
        ));
    }
}
