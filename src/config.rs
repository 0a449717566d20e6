// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Evaluation configuration

use crate::error::{MeshError, MeshResult};
use crate::evaluation::metrics::validate_quantile;
use crate::evaluation::{DistanceStrategy, ReferenceCatalog};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "meshbench.toml";

/// Evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Quantile of absolute candidate deviations reported as accuracy
    pub accuracy_quantile: f64,
    /// Completeness threshold, as a fraction of the reference diagonal
    pub completeness_ratio: f64,
    pub strategy: DistanceStrategy,
    /// Score steps in parallel
    pub parallel: bool,
    /// Worker threads; the global pool size when unset
    pub threads: Option<usize>,
    /// Output directory for reports
    pub output_dir: PathBuf,
    pub catalog: ReferenceCatalog,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            accuracy_quantile: 0.9,
            completeness_ratio: 0.01,
            strategy: DistanceStrategy::VertexToVertex,
            parallel: true,
            threads: None,
            output_dir: PathBuf::from("evaluation/results"),
            catalog: ReferenceCatalog::default(),
        }
    }
}

impl EvaluationConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: EvaluationConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.with_env_overrides()
    }

    /// Apply `MESHBENCH_*` environment variables
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(quantile) = std::env::var("MESHBENCH_ACCURACY_QUANTILE") {
            self.accuracy_quantile = quantile
                .parse()
                .with_context(|| format!("Invalid MESHBENCH_ACCURACY_QUANTILE: {}", quantile))?;
        }

        if let Ok(ratio) = std::env::var("MESHBENCH_COMPLETENESS_RATIO") {
            self.completeness_ratio = ratio
                .parse()
                .with_context(|| format!("Invalid MESHBENCH_COMPLETENESS_RATIO: {}", ratio))?;
        }

        if let Ok(dir) = std::env::var("MESHBENCH_REFERENCE_DIR") {
            self.catalog.root = PathBuf::from(dir);
        }

        if let Ok(threads) = std::env::var("MESHBENCH_THREADS") {
            self.threads = threads.parse().ok().filter(|&n: &usize| n > 0);
        }

        self.validate()?;
        debug!("Effective configuration: {:?}", self);
        Ok(self)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Check parameter ranges
    pub fn validate(&self) -> MeshResult<()> {
        validate_quantile(self.accuracy_quantile)?;

        if !(self.completeness_ratio.is_finite() && self.completeness_ratio >= 0.0) {
            return Err(MeshError::InvalidParameter {
                name: "completeness_ratio",
                value: self.completeness_ratio,
                reason: "must be a finite, non-negative number",
            });
        }

        if self.threads == Some(0) {
            return Err(MeshError::InvalidParameter {
                name: "threads",
                value: 0.0,
                reason: "must be at least 1",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EvaluationConfig::default();
        assert_eq!(config.accuracy_quantile, 0.9);
        assert_eq!(config.completeness_ratio, 0.01);
        assert_eq!(config.strategy, DistanceStrategy::VertexToVertex);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(CONFIG_FILE);

        let config = EvaluationConfig {
            accuracy_quantile: 0.95,
            strategy: DistanceStrategy::PointToTriangle,
            threads: Some(2),
            ..EvaluationConfig::default()
        };
        config.save(&path)?;

        let loaded = EvaluationConfig::from_file(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
completeness_ratio = 0.02
strategy = "point_to_triangle"

[catalog]
root = "/data/meshes"

[catalog.models.teapot]
file = "teapot.obj"
diagonal = 4.5
"#,
        )?;

        let config = EvaluationConfig::from_file(&path)?;
        assert_eq!(config.accuracy_quantile, 0.9);
        assert_eq!(config.completeness_ratio, 0.02);
        assert_eq!(config.strategy, DistanceStrategy::PointToTriangle);
        assert_eq!(config.catalog.len(), 1);
        assert_eq!(config.catalog.get("teapot")?.diagonal, Some(4.5));
        assert_eq!(
            config.catalog.path("teapot")?,
            PathBuf::from("/data/meshes/teapot.obj")
        );
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_rejected() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "accuracy_quantile = 1.5\n")?;

        assert!(EvaluationConfig::from_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_validate_ranges() {
        let config = EvaluationConfig {
            completeness_ratio: -0.1,
            ..EvaluationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MeshError::InvalidParameter {
                name: "completeness_ratio",
                ..
            })
        ));

        let config = EvaluationConfig {
            threads: Some(0),
            ..EvaluationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
