// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Meshbench
//!
//! Rate/quality evaluation of progressive mesh streams. A candidate stream is
//! decoded step by step and every intermediate mesh is scored against a
//! reference model with the directed Hausdorff distance and the Middlebury
//! accuracy/completeness pair.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod geometry;
pub mod io;

pub use config::EvaluationConfig;
pub use error::{MeshError, MeshResult, Target};
pub use evaluation::{
    evaluate, hausdorff, middlebury, middlebury_with, DistanceStrategy, Evaluation,
    EvaluationReport, EvaluationResult, Evaluator, ReferenceCatalog, ReferenceMesh, Reporter,
};
pub use geometry::{Mesh, Primitive};
pub use io::{load_obj, load_progressive, parse_obj, parse_progressive, ProgressiveStep, ProgressiveStream};

/// Score in-memory stream text against an in-memory reference mesh with the
/// default configuration
pub fn evaluate_source(candidate: &str, reference: &Mesh) -> MeshResult<Evaluation> {
    let stream = parse_progressive(candidate)?;
    let reference = ReferenceMesh::from_mesh("reference", reference, None);
    Evaluator::default().evaluate_against(&stream, &reference)
}
