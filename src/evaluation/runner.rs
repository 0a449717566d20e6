// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Evaluation runner: scores every step of a progressive stream against a
//! reference model

use super::catalog::{ReferenceCatalog, ReferenceMesh};
use super::metrics::validate_quantile;
use crate::config::EvaluationConfig;
use crate::error::MeshResult;
use crate::io::{load_progressive, parse_progressive, ProgressiveStep, ProgressiveStream};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Scores of a single step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub step: u32,
    pub relative_position: f64,
    pub hausdorff: f64,
    pub accuracy: f64,
    pub completeness: f64,
}

/// Rate/distortion curves of one candidate stream, one entry per step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub relative_positions: Vec<f64>,
    pub hausdorff: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub completeness: Vec<f64>,
    /// Size units accumulated over the whole stream
    pub actual_size: u64,
    /// Argument of the last `s` marker, 0 without markers
    pub declared_size: u64,
}

impl Evaluation {
    fn from_results(results: &[EvaluationResult], stream: &ProgressiveStream) -> Self {
        Self {
            relative_positions: results.iter().map(|r| r.relative_position).collect(),
            hausdorff: results.iter().map(|r| r.hausdorff).collect(),
            accuracy: results.iter().map(|r| r.accuracy).collect(),
            completeness: results.iter().map(|r| r.completeness).collect(),
            actual_size: stream.actual_size(),
            declared_size: stream.declared_size(),
        }
    }

    pub fn len(&self) -> usize {
        self.relative_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relative_positions.is_empty()
    }

    /// Per-step view of the curves
    pub fn points(&self) -> Vec<EvaluationResult> {
        (0..self.len())
            .map(|i| EvaluationResult {
                step: i as u32,
                relative_position: self.relative_positions[i],
                hausdorff: self.hausdorff[i],
                accuracy: self.accuracy[i],
                completeness: self.completeness[i],
            })
            .collect()
    }

    /// Scores of the last step, the fully decoded mesh
    pub fn last(&self) -> Option<EvaluationResult> {
        self.points().pop()
    }
}

/// Scores candidate streams with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Score a stream file against a catalog reference
    pub fn evaluate(&self, candidate: impl AsRef<Path>, reference_id: &str) -> MeshResult<Evaluation> {
        validate_quantile(self.config.accuracy_quantile)?;
        let reference = self.config.catalog.load(reference_id)?;
        let stream = load_progressive(candidate)?;
        self.evaluate_against(&stream, &reference)
    }

    /// Score in-memory stream text against a catalog reference
    pub fn evaluate_stream(&self, source: &str, reference_id: &str) -> MeshResult<Evaluation> {
        validate_quantile(self.config.accuracy_quantile)?;
        let reference = self.config.catalog.load(reference_id)?;
        let stream = parse_progressive(source)?;
        self.evaluate_against(&stream, &reference)
    }

    /// Score a parsed stream against a loaded reference
    pub fn evaluate_against(
        &self,
        stream: &ProgressiveStream,
        reference: &ReferenceMesh,
    ) -> MeshResult<Evaluation> {
        self.evaluate_with_progress(stream, reference, |_| {})
    }

    /// Like [`Evaluator::evaluate_against`], calling `on_step` as each step is
    /// scored. Calls may arrive out of step order.
    pub fn evaluate_with_progress<F>(
        &self,
        stream: &ProgressiveStream,
        reference: &ReferenceMesh,
        on_step: F,
    ) -> MeshResult<Evaluation>
    where
        F: Fn(&EvaluationResult) + Send + Sync,
    {
        validate_quantile(self.config.accuracy_quantile)?;

        let steps = stream.steps();
        if steps.is_empty() {
            warn!("Stream has no steps, nothing to evaluate");
            return Ok(Evaluation::from_results(&[], stream));
        }

        let threshold = reference.completeness_threshold(self.config.completeness_ratio);
        info!(
            "Evaluating {} steps against '{}' ({} vertices, threshold {:.6})",
            steps.len(),
            reference.id,
            reference.vertex_count(),
            threshold
        );

        let start = Instant::now();
        let score = || -> MeshResult<Vec<EvaluationResult>> {
            steps
                .par_iter()
                .map(|step| -> MeshResult<EvaluationResult> {
                    let result = self.score_step(step, reference, threshold)?;
                    on_step(&result);
                    Ok(result)
                })
                .collect()
        };
        let results = self.run_in_pool(score)?;

        info!("Evaluation finished in {:?}", start.elapsed());
        Ok(Evaluation::from_results(&results, stream))
    }

    fn score_step(
        &self,
        step: &ProgressiveStep,
        reference: &ReferenceMesh,
        threshold: f64,
    ) -> MeshResult<EvaluationResult> {
        let hausdorff = reference.surface.hausdorff(&step.vertices);
        let (accuracy, completeness) = reference.surface.middlebury(
            &step.vertices,
            &step.faces,
            self.config.accuracy_quantile,
            threshold,
            self.config.strategy,
        )?;

        debug!(
            "Step {} ({} vertices, {} faces): hausdorff={:.6} accuracy={:.6} completeness={:.4}",
            step.ordinal,
            step.vertices.len(),
            step.faces.len(),
            hausdorff,
            accuracy,
            completeness
        );

        Ok(EvaluationResult {
            step: step.ordinal,
            relative_position: step.relative_position,
            hausdorff,
            accuracy,
            completeness,
        })
    }

    /// Run `job` on a dedicated pool when the thread count is bounded, on the
    /// global pool otherwise
    fn run_in_pool<T, J>(&self, job: J) -> T
    where
        T: Send,
        J: FnOnce() -> T + Send,
    {
        let threads = if self.config.parallel {
            self.config.threads
        } else {
            Some(1)
        };

        match threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(job),
                Err(e) => {
                    warn!("Failed to build a {}-thread pool, using the global pool: {}", threads, e);
                    job()
                }
            },
            None => job(),
        }
    }
}

/// Score a stream file against a catalog reference, with the default distance
/// kernel and `completeness_ratio × diagonal` as completeness threshold
pub fn evaluate(
    candidate: impl AsRef<Path>,
    reference_id: &str,
    accuracy_quantile: f64,
    completeness_ratio: f64,
    catalog: &ReferenceCatalog,
) -> MeshResult<Evaluation> {
    let config = EvaluationConfig {
        accuracy_quantile,
        completeness_ratio,
        catalog: catalog.clone(),
        ..EvaluationConfig::default()
    };
    Evaluator::new(config).evaluate(candidate, reference_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeshError;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cube_reference() -> ReferenceMesh {
        let cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        ReferenceMesh::from_mesh("cube", &cube, None)
    }

    const CUBE_STREAM: &str = "\
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
s 52
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
f 5 6 7
f 5 7 8
f 2 1 4
f 2 4 3
f 6 2 3
f 6 3 7
f 1 5 8
f 1 8 4
f 8 7 3
f 8 3 4
f 1 2 6
f 1 6 5
s 152
";

    #[test]
    fn test_identical_final_step() {
        let stream = parse_progressive(CUBE_STREAM).unwrap();
        let evaluation = Evaluator::default()
            .evaluate_against(&stream, &cube_reference())
            .unwrap();

        assert_eq!(evaluation.len(), 2);
        assert_eq!(evaluation.relative_positions, vec![52.0 / 152.0, 1.0]);
        assert_eq!(evaluation.actual_size, 152);
        assert_eq!(evaluation.declared_size, 152);

        let last = evaluation.last().unwrap();
        assert_relative_eq!(last.hausdorff, 0.0);
        assert_relative_eq!(last.accuracy, 0.0);
        assert_eq!(last.completeness, 1.0);

        // Half the corners are present after the first marker
        assert_eq!(evaluation.completeness[0], 0.5);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let stream = parse_progressive(CUBE_STREAM).unwrap();
        let reference = cube_reference();

        let parallel = Evaluator::default()
            .evaluate_against(&stream, &reference)
            .unwrap();
        let sequential = Evaluator::new(EvaluationConfig {
            parallel: false,
            ..EvaluationConfig::default()
        })
        .evaluate_against(&stream, &reference)
        .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_empty_stream_gives_empty_curves() {
        let stream = parse_progressive("# nothing here\n").unwrap();
        let evaluation = Evaluator::default()
            .evaluate_against(&stream, &cube_reference())
            .unwrap();

        assert!(evaluation.is_empty());
        assert!(evaluation.hausdorff.is_empty());
        assert!(evaluation.accuracy.is_empty());
        assert!(evaluation.completeness.is_empty());
    }

    #[test]
    fn test_invalid_quantile_is_rejected_first() {
        let evaluator = Evaluator::new(EvaluationConfig {
            accuracy_quantile: 1.5,
            ..EvaluationConfig::default()
        });
        // The reference id does not exist; the quantile is reported instead
        assert!(matches!(
            evaluator.evaluate_stream("v 0 0 0\n", "missing"),
            Err(MeshError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_unknown_reference() {
        assert!(matches!(
            Evaluator::default().evaluate_stream("v 0 0 0\n", "teapot"),
            Err(MeshError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_progress_callback_sees_every_step() {
        let stream = parse_progressive(CUBE_STREAM).unwrap();
        let seen = AtomicUsize::new(0);

        Evaluator::default()
            .evaluate_with_progress(&stream, &cube_reference(), |_| {
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_points_view() {
        let evaluation = Evaluation {
            relative_positions: vec![0.5, 1.0],
            hausdorff: vec![0.2, 0.0],
            accuracy: vec![0.1, 0.0],
            completeness: vec![0.4, 1.0],
            actual_size: 10,
            declared_size: 10,
        };
        let points = evaluation.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].step, 0);
        assert_eq!(points[0].hausdorff, 0.2);
        assert_eq!(points[1].completeness, 1.0);
    }
}
