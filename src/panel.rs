// ==============================================================================
// panel.rs - Gene Panel Definition
// ==============================================================================
// Description: Built-in thyroid/parathyroid gene panel and gene list parsing
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Gene list file format: one symbol per line, or comma/whitespace separated.
// Lines starting with '#' are comments.
//   # Parathyroid / MEN
//   RET
//   MEN1, CASR
// ==============================================================================

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::models::GeneSymbol;

/// Parathyroid / MEN genes
const PARATHYROID_GENES: &[&str] = &[
    "RET", "MEN1", "CASR", "CDC73", "GCM2", "GNA11", "AP2S1", "PTH", "AIRE",
];

/// Thyroid dysgenesis / dyshormonogenesis genes
const THYROID_GENES: &[&str] = &[
    "PAX8", "TSHR", "NKX2-1", "TG", "TPO", "SLC26A4", "DUOX2", "DUOXA2",
];

/// Thyroid hormone transport, action and development genes
const ADDITIONAL_GENES: &[&str] = &[
    "IYD", "SLC5A5", "THRA", "THRB", "SECISBP2", "FOXE1", "HHEX",
];

#[derive(Error, Debug)]
pub enum GeneListError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Gene list contains no symbols")]
    Empty,
}

/// The default thyroid/parathyroid panel, in reporting order
pub fn thyroid_parathyroid_panel() -> Vec<GeneSymbol> {
    PARATHYROID_GENES
        .iter()
        .chain(THYROID_GENES)
        .chain(ADDITIONAL_GENES)
        .filter_map(|s| GeneSymbol::parse(s))
        .collect()
}

/// Parse symbols from free text. Order is preserved; duplicates are kept so the
/// resolver can treat each occurrence independently.
pub fn parse_gene_list(text: &str) -> Result<Vec<GeneSymbol>, GeneListError> {
    let genes: Vec<GeneSymbol> = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
        .filter_map(GeneSymbol::parse)
        .collect();

    if genes.is_empty() {
        return Err(GeneListError::Empty);
    }

    Ok(genes)
}

/// Read a gene list file
pub fn read_gene_list(path: impl AsRef<Path>) -> Result<Vec<GeneSymbol>, GeneListError> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_gene_list(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_panel() {
        let panel = thyroid_parathyroid_panel();
        assert_eq!(panel.len(), 24);
        assert_eq!(panel[0].as_str(), "RET");
        assert_eq!(panel[panel.len() - 1].as_str(), "HHEX");
        assert!(panel.iter().any(|g| g.as_str() == "NKX2-1"));
    }

    #[test]
    fn test_parse_mixed_separators() {
        let genes = parse_gene_list("# header\nRET, MEN1\n  CASR\tPTH # trailing comment\n\n").unwrap();
        let names: Vec<&str> = genes.iter().map(|g| g.as_str()).collect();
        assert_eq!(names, vec!["RET", "MEN1", "CASR", "PTH"]);
    }

    #[test]
    fn test_duplicates_preserved() {
        let genes = parse_gene_list("RET\nRET\n").unwrap();
        assert_eq!(genes.len(), 2);
    }

    #[test]
    fn test_empty_list() {
        assert!(matches!(parse_gene_list("# nothing\n\n"), Err(GeneListError::Empty)));
    }

    #[test]
    fn test_read_gene_list_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "TSHR").unwrap();
        writeln!(file, "TPO").unwrap();
        file.flush().unwrap();

        let genes = read_gene_list(file.path()).unwrap();
        assert_eq!(genes.len(), 2);
    }
}
