// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Report generation (JSON and Markdown)

use super::metrics::DistanceStrategy;
use super::runner::{Evaluation, EvaluationResult};
use crate::config::EvaluationConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Complete evaluation report for one candidate stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub timestamp: String,
    pub candidate: String,
    /// SHA-256 of the candidate stream bytes
    pub candidate_sha256: String,
    pub reference: String,
    pub accuracy_quantile: f64,
    pub completeness_ratio: f64,
    pub strategy: DistanceStrategy,
    pub steps: Vec<EvaluationResult>,
    pub actual_size: u64,
    pub declared_size: u64,
}

/// Curves as space-separated text, one string per curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Columns {
    pub relative_positions: String,
    pub hausdorff: String,
    pub accuracy: String,
    pub completeness: String,
}

impl EvaluationReport {
    pub fn new(
        candidate: impl Into<String>,
        candidate_bytes: &[u8],
        reference: impl Into<String>,
        config: &EvaluationConfig,
        evaluation: &Evaluation,
    ) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            candidate: candidate.into(),
            candidate_sha256: format!("{:x}", Sha256::digest(candidate_bytes)),
            reference: reference.into(),
            accuracy_quantile: config.accuracy_quantile,
            completeness_ratio: config.completeness_ratio,
            strategy: config.strategy,
            steps: evaluation.points(),
            actual_size: evaluation.actual_size,
            declared_size: evaluation.declared_size,
        }
    }

    /// Report for a candidate file, hashing its contents
    pub fn for_file(
        candidate: &Path,
        reference: impl Into<String>,
        config: &EvaluationConfig,
        evaluation: &Evaluation,
    ) -> Result<Self> {
        let bytes = fs::read(candidate)
            .with_context(|| format!("Failed to read candidate: {}", candidate.display()))?;
        let name = candidate
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| candidate.display().to_string());
        Ok(Self::new(name, &bytes, reference, config, evaluation))
    }

    /// Scores of the fully decoded stream
    pub fn final_step(&self) -> Option<&EvaluationResult> {
        self.steps.last()
    }

    /// Ratio of the actual stream size to the size it announced
    pub fn size_ratio(&self) -> Option<f64> {
        if self.declared_size == 0 {
            None
        } else {
            Some(self.actual_size as f64 / self.declared_size as f64)
        }
    }

    pub fn to_columns(&self) -> Columns {
        fn join(values: impl Iterator<Item = f64>) -> String {
            values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
        }

        Columns {
            relative_positions: join(self.steps.iter().map(|s| s.relative_position)),
            hausdorff: join(self.steps.iter().map(|s| s.hausdorff)),
            accuracy: join(self.steps.iter().map(|s| s.accuracy)),
            completeness: join(self.steps.iter().map(|s| s.completeness)),
        }
    }
}

/// Report writer
pub struct Reporter;

impl Reporter {
    /// Write JSON report
    pub fn write_json(report: &EvaluationReport, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Write Markdown report
    pub fn write_markdown(report: &EvaluationReport, path: &Path) -> Result<()> {
        fs::write(path, Self::render_markdown(report))
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Write both reports into `output_dir`, named after the candidate and
    /// the reference
    pub fn write_all(report: &EvaluationReport, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let stem = Path::new(&report.candidate)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "candidate".to_string());
        let base = format!("{}-{}", stem, report.reference);

        let json_path = output_dir.join(format!("{}.json", base));
        let md_path = output_dir.join(format!("{}.md", base));
        Self::write_json(report, &json_path)?;
        Self::write_markdown(report, &md_path)?;

        info!("Reports written to {}", output_dir.display());
        Ok((json_path, md_path))
    }

    pub fn render_markdown(report: &EvaluationReport) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "# Evaluation of {} against {}\n\n",
            report.candidate, report.reference
        ));

        // Summary
        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Candidate SHA-256**: `{}`\n", report.candidate_sha256));
        md.push_str(&format!("- **Steps**: {}\n", report.steps.len()));
        md.push_str(&format!("- **Actual Size**: {}\n", report.actual_size));
        md.push_str(&format!("- **Declared Size**: {}\n", report.declared_size));
        if let Some(ratio) = report.size_ratio() {
            md.push_str(&format!("- **Size Ratio**: {:.3}\n", ratio));
        }
        md.push_str(&format!(
            "- **Accuracy Quantile**: {}\n",
            report.accuracy_quantile
        ));
        md.push_str(&format!(
            "- **Completeness Ratio**: {}\n",
            report.completeness_ratio
        ));
        md.push_str(&format!("- **Distance Kernel**: {}\n", report.strategy));
        if let Some(last) = report.final_step() {
            md.push_str(&format!(
                "- **Final Step**: hausdorff {:.6}, accuracy {:.6}, completeness {:.2}%\n",
                last.hausdorff,
                last.accuracy,
                last.completeness * 100.0
            ));
        }
        md.push('\n');

        // Table
        md.push_str("## Steps\n\n");
        if report.steps.is_empty() {
            md.push_str("The stream produced no steps.\n");
        } else {
            md.push_str("| Step | Position | Hausdorff | Accuracy | Completeness |\n");
            md.push_str("|------|----------|-----------|----------|--------------|\n");
            for step in &report.steps {
                md.push_str(&format!(
                    "| {} | {:.4} | {:.6} | {:.6} | {:.2}% |\n",
                    step.step,
                    step.relative_position,
                    step.hausdorff,
                    step.accuracy,
                    step.completeness * 100.0
                ));
            }
        }

        // Footer
        md.push_str(&format!("\n---\n\n*Generated on {}*\n", report.timestamp));
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn evaluation() -> Evaluation {
        Evaluation {
            relative_positions: vec![0.5, 1.0],
            hausdorff: vec![0.25, 0.0],
            accuracy: vec![0.125, 0.0],
            completeness: vec![0.5, 1.0],
            actual_size: 120,
            declared_size: 100,
        }
    }

    #[test]
    fn test_report_creation() {
        let config = EvaluationConfig::default();
        let report = EvaluationReport::new("bunny_prog.obja", b"abc", "bunny", &config, &evaluation());

        assert_eq!(report.steps.len(), 2);
        assert_eq!(
            report.candidate_sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(report.final_step().unwrap().completeness, 1.0);
        assert_eq!(report.size_ratio(), Some(1.2));
    }

    #[test]
    fn test_columns() {
        let config = EvaluationConfig::default();
        let report = EvaluationReport::new("c.obja", b"", "cow", &config, &evaluation());
        let columns = report.to_columns();

        assert_eq!(columns.relative_positions, "0.5 1");
        assert_eq!(columns.hausdorff, "0.25 0");
        assert_eq!(columns.completeness, "0.5 1");
    }

    #[test]
    fn test_write_all() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = EvaluationConfig::default();
        let report = EvaluationReport::new("c.obja", b"", "cow", &config, &evaluation());

        let (json, md) = Reporter::write_all(&report, &dir.path().join("out"))?;
        assert!(json.ends_with("c-cow.json"));

        let parsed: EvaluationReport = serde_json::from_str(&fs::read_to_string(&json)?)?;
        assert_eq!(parsed.steps, report.steps);

        let markdown = fs::read_to_string(&md)?;
        assert!(markdown.contains("| 1 | 1.0000 | 0.000000 | 0.000000 | 100.00% |"));
        Ok(())
    }

    #[test]
    fn test_empty_report_markdown() {
        let config = EvaluationConfig::default();
        let report =
            EvaluationReport::new("empty.obja", b"", "cow", &config, &Evaluation::default());
        let markdown = Reporter::render_markdown(&report);
        assert!(markdown.contains("no steps"));
        assert_eq!(report.size_ratio(), None);
    }
}
