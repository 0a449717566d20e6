// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Evaluation of progressive streams against reference models

pub mod catalog;
pub mod distance;
pub mod metrics;
pub mod reporter;
pub mod runner;

pub use catalog::{ReferenceCatalog, ReferenceMesh, ReferenceModel};
pub use metrics::{
    hausdorff, middlebury, middlebury_with, signed_distances, vertex_normals, DistanceStrategy,
    ReferenceSurface,
};
pub use reporter::{Columns, EvaluationReport, Reporter};
pub use runner::{evaluate, Evaluation, EvaluationResult, Evaluator};
