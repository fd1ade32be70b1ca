// ==============================================================================
// pipeline/stage.rs - Pipeline Stage Definitions
// ==============================================================================
// Description: Fixed stage sequence and the external tool invocations per stage
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Stages (one sample, strictly sequential):
//   1. align          bwa mem              -> <sample>.sam
//   2. sort_index     samtools sort/index  -> <sample>.sorted.bam(.bai)
//   3. deduplicate    gatk MarkDuplicates  -> <sample>.dedup.bam
//   4. call_variants  gatk HaplotypeCaller -> <sample>.vcf   (restricted to -L panel)
//   5. annotate       table_annovar.pl     -> <sample>.anno.<build>_multianno.txt
// ==============================================================================

use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::PanelConfig;
use crate::models::ReferenceBuild;

/// The five stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Align,
    SortIndex,
    Deduplicate,
    CallVariants,
    Annotate,
}

impl StageKind {
    pub const ORDER: [StageKind; 5] = [
        StageKind::Align,
        StageKind::SortIndex,
        StageKind::Deduplicate,
        StageKind::CallVariants,
        StageKind::Annotate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Align => "align",
            StageKind::SortIndex => "sort_index",
            StageKind::Deduplicate => "deduplicate",
            StageKind::CallVariants => "call_variants",
            StageKind::Annotate => "annotate",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One external process launch. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Redirect standard output to this file (e.g., bwa's SAM stream)
    pub stdout: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout = Some(path.to_path_buf());
        self
    }

    /// Arguments as text, for logging and assertions
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Human-readable command line
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in self.args_lossy() {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push_str(&format!("'{}'", arg));
            } else {
                line.push_str(&arg);
            }
        }
        if let Some(stdout) = &self.stdout {
            line.push_str(&format!(" > {}", stdout.display()));
        }
        line
    }
}

/// A single pipeline stage: one or more invocations plus its file contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    pub kind: StageKind,
    pub name: String,
    pub invocations: Vec<ToolInvocation>,
    /// Files that must exist before the stage starts
    pub inputs: Vec<PathBuf>,
    /// Files the stage is expected to produce
    pub outputs: Vec<PathBuf>,
}

impl PipelineStage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            invocations: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn invoke(mut self, invocation: ToolInvocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.inputs.extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    pub fn outputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.outputs.extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }
}

/// Pre-supplied files for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInputs {
    pub sample_id: String,
    pub reads_1: PathBuf,
    pub reads_2: PathBuf,
    pub reference: PathBuf,
    pub known_sites: PathBuf,
    pub region_file: PathBuf,
}

/// Intermediate and final files produced for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleArtifacts {
    pub work_dir: PathBuf,
    pub sam: PathBuf,
    pub sorted_bam: PathBuf,
    pub sorted_bam_index: PathBuf,
    pub dedup_bam: PathBuf,
    pub duplicate_metrics: PathBuf,
    pub vcf: PathBuf,
    pub annotation_prefix: PathBuf,
    pub annotation_table: PathBuf,
}

impl SampleArtifacts {
    pub fn new(work_dir: &Path, sample_id: &str, build: ReferenceBuild) -> Self {
        let file = |suffix: &str| work_dir.join(format!("{}{}", sample_id, suffix));
        Self {
            work_dir: work_dir.to_path_buf(),
            sam: file(".sam"),
            sorted_bam: file(".sorted.bam"),
            sorted_bam_index: file(".sorted.bam.bai"),
            dedup_bam: file(".dedup.bam"),
            duplicate_metrics: file(".metrics.txt"),
            vcf: file(".vcf"),
            annotation_prefix: file(".anno"),
            annotation_table: file(&format!(".anno.{}_multianno.txt", build.as_str())),
        }
    }
}

/// Build the fixed five-stage sequence for one sample
pub fn build_stages(
    inputs: &SampleInputs,
    artifacts: &SampleArtifacts,
    config: &PanelConfig,
) -> Vec<PipelineStage> {
    let tools = &config.tools;
    let sample = &inputs.sample_id;

    let align = PipelineStage::new(StageKind::Align)
        .invoke(
            ToolInvocation::new(&tools.bwa)
                .arg("mem")
                .arg("-t")
                .arg(config.threads.to_string())
                .arg("-R")
                .arg(format!("@RG\\tID:{}\\tSM:{}\\tPL:ILLUMINA", sample, sample))
                .path_arg(&inputs.reference)
                .path_arg(&inputs.reads_1)
                .path_arg(&inputs.reads_2)
                .stdout_to(&artifacts.sam),
        )
        .inputs([&inputs.reference, &inputs.reads_1, &inputs.reads_2])
        .outputs([&artifacts.sam]);

    let sort_index = PipelineStage::new(StageKind::SortIndex)
        .invoke(
            ToolInvocation::new(&tools.samtools)
                .arg("sort")
                .arg("-o")
                .path_arg(&artifacts.sorted_bam)
                .path_arg(&artifacts.sam),
        )
        .invoke(
            ToolInvocation::new(&tools.samtools)
                .arg("index")
                .path_arg(&artifacts.sorted_bam),
        )
        .inputs([&artifacts.sam])
        .outputs([&artifacts.sorted_bam, &artifacts.sorted_bam_index]);

    let deduplicate = PipelineStage::new(StageKind::Deduplicate)
        .invoke(
            ToolInvocation::new(&tools.gatk)
                .arg("MarkDuplicates")
                .arg("-I")
                .path_arg(&artifacts.sorted_bam)
                .arg("-O")
                .path_arg(&artifacts.dedup_bam)
                .arg("-M")
                .path_arg(&artifacts.duplicate_metrics)
                .arg("--CREATE_INDEX")
                .arg("true"),
        )
        .inputs([&artifacts.sorted_bam])
        .outputs([&artifacts.dedup_bam, &artifacts.duplicate_metrics]);

    let call_variants = PipelineStage::new(StageKind::CallVariants)
        .invoke(
            ToolInvocation::new(&tools.gatk)
                .arg("HaplotypeCaller")
                .arg("-R")
                .path_arg(&inputs.reference)
                .arg("-I")
                .path_arg(&artifacts.dedup_bam)
                .arg("-O")
                .path_arg(&artifacts.vcf)
                .arg("-L")
                .path_arg(&inputs.region_file)
                .arg("--interval-padding")
                .arg(config.padding_bp.to_string())
                .arg("--dbsnp")
                .path_arg(&inputs.known_sites),
        )
        .inputs([
            &inputs.reference,
            &artifacts.dedup_bam,
            &inputs.region_file,
            &inputs.known_sites,
        ])
        .outputs([&artifacts.vcf]);

    let annotation = &config.annotation;
    let annotate = PipelineStage::new(StageKind::Annotate)
        .invoke(
            ToolInvocation::new(&tools.annovar)
                .path_arg(&artifacts.vcf)
                .path_arg(&annotation.humandb)
                .arg("-buildver")
                .arg(config.reference_build.as_str())
                .arg("-out")
                .path_arg(&artifacts.annotation_prefix)
                .arg("-remove")
                .arg("-protocol")
                .arg(annotation.protocols.join(","))
                .arg("-operation")
                .arg(annotation.operations.join(","))
                .arg("-nastring")
                .arg(annotation.nastring.as_str())
                .arg("-vcfinput"),
        )
        .inputs([&artifacts.vcf])
        .outputs([&artifacts.annotation_table]);

    vec![align, sort_index, deduplicate, call_variants, annotate]
}
