// ==============================================================================
// output.rs - Multi-Format Shortlist Reports
// ==============================================================================
// Description: Write the filtered variant shortlist in one or more formats
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Files: <output_dir>/<sample>_<report name>.<ext>
//   tsv      original header + rows, byte-for-byte cell values
//   json     array of {column: value} objects
//   parquet  one nullable text column per table column
//   sqlite   `shortlist` table + `metadata` key/value table
// ==============================================================================

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

// Apache Arrow/Parquet for columnar data
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

// SQLite for queryable database
use rusqlite::{params, params_from_iter, Connection};

use crate::models::VariantShortlist;

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Tab-separated text (same layout as the annotation table)
    Tsv,
    /// JSON (best for web APIs and JavaScript)
    Json,
    /// Apache Parquet (best for data science: Python, R, Spark)
    Parquet,
    /// SQLite database (best for querying and exploration)
    Sqlite,
}

impl ReportFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Tsv => "tsv",
            ReportFormat::Json => "json",
            ReportFormat::Parquet => "parquet",
            ReportFormat::Sqlite => "db",
        }
    }
}

/// Column names for structured formats.
///
/// Header names are kept; cells beyond the header become `extra_<n>` (1-based
/// column number). Repeated names get a `_2`, `_3`... suffix, compared
/// case-insensitively because SQLite column names are.
pub fn report_columns(shortlist: &VariantShortlist) -> Vec<String> {
    let width = shortlist
        .rows
        .iter()
        .map(|r| r.values.len())
        .chain(std::iter::once(shortlist.header.len()))
        .max()
        .unwrap_or(0);

    let mut used: HashSet<String> = HashSet::new();
    (0..width)
        .map(|idx| {
            let base = match shortlist.header.get(idx) {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => format!("extra_{}", idx + 1),
            };

            let mut name = base.clone();
            let mut n = 1;
            while !used.insert(name.to_lowercase()) {
                n += 1;
                name = format!("{}_{}", base, n);
            }
            name
        })
        .collect()
}

/// Writes shortlist reports for one sample
pub struct ReportWriter {
    sample_id: String,
    report_name: String,
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(sample_id: &str, report_name: &str, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            report_name: report_name.to_string(),
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, format: ReportFormat) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            self.sample_id,
            self.report_name,
            format.extension()
        ))
    }

    /// Generate the shortlist in every requested format
    ///
    /// # Returns
    /// * HashMap of format -> file path
    pub async fn write(
        &self,
        formats: &[ReportFormat],
        shortlist: &VariantShortlist,
    ) -> Result<HashMap<ReportFormat, PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create report directory {:?}", self.output_dir))?;

        let mut result = HashMap::new();

        for format in formats {
            if result.contains_key(format) {
                continue;
            }

            let path = self.path_for(*format);
            match format {
                ReportFormat::Tsv => self.generate_tsv(&path, shortlist).await?,
                ReportFormat::Json => self.generate_json(&path, shortlist).await?,
                ReportFormat::Parquet => self.generate_parquet(&path, shortlist).await?,
                ReportFormat::Sqlite => self.generate_sqlite(&path, shortlist).await?,
            }
            result.insert(*format, path);
        }

        Ok(result)
    }

    /// Generate TSV output (original header, cells verbatim)
    async fn generate_tsv(&self, path: &Path, shortlist: &VariantShortlist) -> Result<()> {
        info!("Generating TSV report: {:?}", path);

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .quote_style(csv::QuoteStyle::Never)
            .from_path(path)
            .context("Failed to create TSV report file")?;

        writer
            .write_record(&shortlist.header)
            .context("Failed to write TSV header")?;
        for row in &shortlist.rows {
            writer
                .write_record(&row.values)
                .context("Failed to write TSV row")?;
        }
        writer.flush().context("Failed to flush TSV report")?;

        info!("TSV report complete: {} variants", shortlist.len());
        Ok(())
    }

    /// Generate JSON output (array of row objects)
    async fn generate_json(&self, path: &Path, shortlist: &VariantShortlist) -> Result<()> {
        info!("Generating JSON report: {:?}", path);

        let columns = report_columns(shortlist);
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = shortlist
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| {
                        let value = row
                            .value(idx)
                            .map(|v| serde_json::Value::String(v.to_string()))
                            .unwrap_or(serde_json::Value::Null);
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect();

        let file = std::fs::File::create(path).context("Failed to create JSON report file")?;
        serde_json::to_writer_pretty(file, &rows).context("Failed to write JSON report")?;

        info!("JSON report complete: {} variants", rows.len());
        Ok(())
    }

    /// Generate Parquet output (columnar format for data science)
    async fn generate_parquet(&self, path: &Path, shortlist: &VariantShortlist) -> Result<()> {
        info!("Generating Parquet report: {:?}", path);

        let columns = report_columns(shortlist);
        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|name| Field::new(name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ));

        let arrays: Vec<ArrayRef> = (0..columns.len())
            .map(|idx| {
                Arc::new(StringArray::from(
                    shortlist
                        .rows
                        .iter()
                        .map(|row| row.value(idx))
                        .collect::<Vec<_>>(),
                )) as ArrayRef
            })
            .collect();

        let batch = RecordBatch::try_new(schema.clone(), arrays)
            .context("Failed to create Arrow RecordBatch")?;

        // Write to Parquet file with compression
        let file = std::fs::File::create(path).context("Failed to create Parquet file")?;
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .context("Failed to create Parquet writer")?;
        writer.write(&batch).context("Failed to write Parquet data")?;
        writer.close().context("Failed to close Parquet writer")?;

        info!("Parquet report complete: {} variants", shortlist.len());
        Ok(())
    }

    /// Generate SQLite output (queryable shortlist + run metadata)
    async fn generate_sqlite(&self, path: &Path, shortlist: &VariantShortlist) -> Result<()> {
        info!("Generating SQLite report: {:?}", path);

        // CREATE TABLE would fail against a previous report
        if path.exists() {
            std::fs::remove_file(path).context("Failed to replace existing SQLite report")?;
        }

        let mut conn = Connection::open(path).context("Failed to create SQLite database")?;

        let columns = report_columns(shortlist);
        let column_defs: Vec<String> = columns
            .iter()
            .map(|name| format!("{} TEXT", quote_identifier(name)))
            .collect();

        conn.execute(
            &format!(
                "CREATE TABLE shortlist (row_order INTEGER PRIMARY KEY, {})",
                column_defs.join(", ")
            ),
            [],
        )
        .context("Failed to create shortlist table")?;

        conn.execute(
            "CREATE TABLE metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create metadata table")?;

        let variant_count = shortlist.len().to_string();
        let generated_at = Utc::now().to_rfc3339();
        let metadata_items = [
            ("sample_id", self.sample_id.as_str()),
            ("report_name", self.report_name.as_str()),
            ("generated_at", generated_at.as_str()),
            ("variant_count", variant_count.as_str()),
            ("version", env!("CARGO_PKG_VERSION")),
        ];

        for (key, value) in metadata_items {
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .context("Failed to insert metadata")?;
        }

        let placeholders: Vec<String> = (1..=columns.len() + 1).map(|i| format!("?{}", i)).collect();
        let insert = format!(
            "INSERT INTO shortlist (row_order, {}) VALUES ({})",
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders.join(", ")
        );

        let tx = conn.transaction().context("Failed to start transaction")?;
        {
            let mut stmt = tx
                .prepare(&insert)
                .context("Failed to prepare shortlist insert statement")?;

            for (order, row) in shortlist.rows.iter().enumerate() {
                let mut values: Vec<Option<String>> = Vec::with_capacity(columns.len() + 1);
                values.push(Some((order + 1).to_string()));
                values.extend((0..columns.len()).map(|idx| row.value(idx).map(str::to_string)));

                stmt.execute(params_from_iter(values.iter()))
                    .context("Failed to insert shortlist row")?;
            }
        }
        tx.commit().context("Failed to commit shortlist")?;

        info!("SQLite report complete: {} variants", shortlist.len());
        Ok(())
    }
}

/// Double-quote an SQL identifier
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnnotatedVariant;
    use tempfile::TempDir;

    fn shortlist() -> VariantShortlist {
        let header: Vec<String> = ["Chr", "Start", "Gene.refGene", "CLNSIG", "Otherinfo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = |line: usize, values: &[&str]| AnnotatedVariant {
            line,
            locus: None,
            values: values.iter().map(|s| s.to_string()).collect(),
        };

        VariantShortlist {
            header,
            rows: vec![
                row(2, &["chr10", "43114500", "RET", "Pathogenic", "0.5", "50", "PASS"]),
                row(5, &["chr11", "64804000", "MEN1", "Likely_pathogenic", "1"]),
            ],
        }
    }

    fn empty_shortlist() -> VariantShortlist {
        VariantShortlist {
            header: shortlist().header,
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_report_format_extension() {
        assert_eq!(ReportFormat::Tsv.extension(), "tsv");
        assert_eq!(ReportFormat::Json.extension(), "json");
        assert_eq!(ReportFormat::Parquet.extension(), "parquet");
        assert_eq!(ReportFormat::Sqlite.extension(), "db");
    }

    #[test]
    fn test_report_format_serde() {
        let json = serde_json::to_string(&ReportFormat::Sqlite).unwrap();
        assert_eq!(json, "\"sqlite\"");

        let parsed: ReportFormat = serde_json::from_str("\"parquet\"").unwrap();
        assert_eq!(parsed, ReportFormat::Parquet);
    }

    #[test]
    fn test_report_columns() {
        let columns = report_columns(&shortlist());
        assert_eq!(
            columns,
            vec!["Chr", "Start", "Gene.refGene", "CLNSIG", "Otherinfo", "extra_6", "extra_7"]
        );

        let dupes = VariantShortlist {
            header: vec!["AF".into(), "af".into(), "AF_2".into(), "".into()],
            rows: Vec::new(),
        };
        assert_eq!(report_columns(&dupes), vec!["AF", "af_2", "AF_2_2", "extra_4"]);
    }

    #[test]
    fn test_report_path() {
        let writer = ReportWriter::new("Patient_01", "Thyroid_Panel_Report", "/reports");
        assert_eq!(
            writer.path_for(ReportFormat::Tsv),
            PathBuf::from("/reports/Patient_01_Thyroid_Panel_Report.tsv")
        );
    }

    #[tokio::test]
    async fn test_tsv_report() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new("S1", "Thyroid_Panel_Report", dir.path());

        let paths = writer.write(&[ReportFormat::Tsv], &shortlist()).await.unwrap();
        let text = std::fs::read_to_string(&paths[&ReportFormat::Tsv]).unwrap();

        assert_eq!(
            text,
            "Chr\tStart\tGene.refGene\tCLNSIG\tOtherinfo\n\
             chr10\t43114500\tRET\tPathogenic\t0.5\t50\tPASS\n\
             chr11\t64804000\tMEN1\tLikely_pathogenic\t1\n"
        );
    }

    #[tokio::test]
    async fn test_json_report() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new("S1", "Thyroid_Panel_Report", dir.path());

        let paths = writer.write(&[ReportFormat::Json], &shortlist()).await.unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths[&ReportFormat::Json]).unwrap()).unwrap();

        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["Gene.refGene"], "RET");
        assert_eq!(value[0]["extra_7"], "PASS");
        assert!(value[1]["extra_6"].is_null());
    }

    #[tokio::test]
    async fn test_sqlite_report() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new("S1", "Thyroid_Panel_Report", dir.path());

        // Written twice: the second run replaces the first
        writer.write(&[ReportFormat::Sqlite], &shortlist()).await.unwrap();
        let paths = writer.write(&[ReportFormat::Sqlite], &shortlist()).await.unwrap();

        let conn = Connection::open(&paths[&ReportFormat::Sqlite]).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM shortlist", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let gene: String = conn
            .query_row(
                "SELECT \"Gene.refGene\" FROM shortlist WHERE row_order = 2",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(gene, "MEN1");

        let sample: String = conn
            .query_row("SELECT value FROM metadata WHERE key = 'sample_id'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(sample, "S1");
    }

    #[tokio::test]
    async fn test_parquet_report() {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new("S1", "Thyroid_Panel_Report", dir.path());

        let paths = writer.write(&[ReportFormat::Parquet], &shortlist()).await.unwrap();
        let reader =
            SerializedFileReader::new(std::fs::File::open(&paths[&ReportFormat::Parquet]).unwrap()).unwrap();

        let metadata = reader.metadata().file_metadata();
        assert_eq!(metadata.num_rows(), 2);
        assert_eq!(metadata.schema_descr().num_columns(), 7);
    }

    #[tokio::test]
    async fn test_empty_shortlist_all_formats() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new("S1", "Thyroid_Panel_Report", dir.path().join("reports"));
        let formats = [
            ReportFormat::Tsv,
            ReportFormat::Json,
            ReportFormat::Parquet,
            ReportFormat::Sqlite,
        ];

        let paths = writer.write(&formats, &empty_shortlist()).await.unwrap();

        assert_eq!(paths.len(), 4);
        assert!(paths.values().all(|p| p.exists()));
        assert_eq!(
            std::fs::read_to_string(&paths[&ReportFormat::Tsv]).unwrap(),
            "Chr\tStart\tGene.refGene\tCLNSIG\tOtherinfo\n"
        );
        assert_eq!(std::fs::read_to_string(&paths[&ReportFormat::Json]).unwrap(), "[]");
    }
}
