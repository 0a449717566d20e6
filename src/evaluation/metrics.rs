// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric fidelity metrics
//!
//! Directed Hausdorff distance and the Middlebury accuracy/completeness pair.
//! All functions are pure and operate on plain vertex and triangle lists.

use super::distance::{
    nearest_on_triangles, nearest_triangle_distances, nearest_vertex, nearest_vertex_distances,
};
use crate::error::{MeshError, MeshResult};
use crate::geometry::triangle_normal;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Distance kernel used by the Middlebury metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceStrategy {
    /// Nearest vertex to nearest vertex
    #[default]
    VertexToVertex,
    /// Closest point on the nearest triangle
    PointToTriangle,
}

impl fmt::Display for DistanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceStrategy::VertexToVertex => write!(f, "vertex"),
            DistanceStrategy::PointToTriangle => write!(f, "triangle"),
        }
    }
}

impl FromStr for DistanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertex" | "vertex_to_vertex" => Ok(DistanceStrategy::VertexToVertex),
            "triangle" | "point_to_triangle" => Ok(DistanceStrategy::PointToTriangle),
            other => Err(format!("unknown distance strategy '{}'", other)),
        }
    }
}

/// Directed Hausdorff distance from `candidate` to `reference`: the largest
/// distance from a candidate point to its nearest reference point.
///
/// An empty candidate gives 0; an empty reference gives infinity.
pub fn hausdorff(reference: &[Point3<f64>], candidate: &[Point3<f64>]) -> f64 {
    candidate
        .par_iter()
        .map(|point| nearest_vertex(point, reference).map_or(f64::INFINITY, |n| n.distance))
        .reduce(|| 0.0, f64::max)
}

/// Accuracy quantiles must lie in `(0, 1]`
pub fn validate_quantile(accuracy_quantile: f64) -> MeshResult<()> {
    if accuracy_quantile > 0.0 && accuracy_quantile <= 1.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidParameter {
            name: "accuracy_quantile",
            value: accuracy_quantile,
            reason: "must lie in (0, 1]",
        })
    }
}

/// Incident triangles of every vertex. Isolated vertices get an empty entry.
pub fn incident_faces(vertex_count: usize, faces: &[[u32; 3]]) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); vertex_count];
    for (face_index, face) in faces.iter().enumerate() {
        for &vertex in face {
            adjacency[vertex as usize].push(face_index);
        }
    }
    adjacency
}

/// Per-vertex normals: the normalised sum of the unnormalised normals of the
/// incident triangles. Isolated vertices, and vertices whose incident normals
/// cancel out, get a zero normal.
pub fn vertex_normals(vertices: &[Point3<f64>], faces: &[[u32; 3]]) -> Vec<Vector3<f64>> {
    let face_normals: Vec<Vector3<f64>> = faces
        .iter()
        .map(|&face| triangle_normal(vertices, face))
        .collect();

    incident_faces(vertices.len(), faces)
        .iter()
        .map(|incident| {
            let sum: Vector3<f64> = incident.iter().map(|&f| face_normals[f]).sum();
            sum.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
        })
        .collect()
}

/// Absolute value at index `⌈n·q⌉ − 1` of the sorted magnitudes.
/// Returns 0 for an empty list.
pub fn quantile_cut(distances: &[f64], accuracy_quantile: f64) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }

    let mut magnitudes: Vec<f64> = distances.iter().map(|d| d.abs()).collect();
    magnitudes.sort_by(f64::total_cmp);

    let n = magnitudes.len();
    let index = ((n as f64 * accuracy_quantile).ceil() as usize)
        .saturating_sub(1)
        .min(n - 1);
    magnitudes[index]
}

/// Reference surface with its normals computed once, shared by every step
/// scored against it.
#[derive(Debug, Clone)]
pub struct ReferenceSurface {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    normals: Vec<Vector3<f64>>,
}

impl ReferenceSurface {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        let normals = vertex_normals(&vertices, &faces);
        Self {
            vertices,
            faces,
            normals,
        }
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn normals(&self) -> &[Vector3<f64>] {
        &self.normals
    }

    /// Directed Hausdorff distance from `candidate` to this surface's vertices
    pub fn hausdorff(&self, candidate: &[Point3<f64>]) -> f64 {
        hausdorff(&self.vertices, candidate)
    }

    /// Signed distance of every candidate vertex to the surface. Negative
    /// values lie behind the surface.
    pub fn signed_distances(
        &self,
        candidate: &[Point3<f64>],
        strategy: DistanceStrategy,
    ) -> Vec<f64> {
        match strategy {
            DistanceStrategy::VertexToVertex => candidate
                .par_iter()
                .map(|point| match nearest_vertex(point, &self.vertices) {
                    Some(nearest) => sign(point, &nearest.point, &self.normals[nearest.index])
                        * nearest.distance,
                    None => f64::INFINITY,
                })
                .collect(),
            DistanceStrategy::PointToTriangle => candidate
                .par_iter()
                .map(
                    |point| match nearest_on_triangles(point, &self.vertices, &self.faces) {
                        Some(nearest) => {
                            let normal = triangle_normal(&self.vertices, self.faces[nearest.index]);
                            sign(point, &nearest.point, &normal) * nearest.distance
                        }
                        None => f64::INFINITY,
                    },
                )
                .collect(),
        }
    }

    /// Middlebury `(accuracy, completeness)` of a candidate against this surface
    pub fn middlebury(
        &self,
        candidate_vertices: &[Point3<f64>],
        candidate_faces: &[[u32; 3]],
        accuracy_quantile: f64,
        completeness_threshold: f64,
        strategy: DistanceStrategy,
    ) -> MeshResult<(f64, f64)> {
        validate_quantile(accuracy_quantile)?;

        if self.faces.is_empty() {
            warn!("Reference has no faces, Middlebury metrics default to zero");
            return Ok((0.0, 0.0));
        }
        if candidate_vertices.is_empty() {
            return Ok((0.0, 0.0));
        }

        let signed = self.signed_distances(candidate_vertices, strategy);
        let accuracy = quantile_cut(&signed, accuracy_quantile);

        let coverage = match strategy {
            DistanceStrategy::PointToTriangle if !candidate_faces.is_empty() => {
                nearest_triangle_distances(&self.vertices, candidate_vertices, candidate_faces)
            }
            _ => nearest_vertex_distances(&self.vertices, candidate_vertices),
        };
        let completeness = completeness_fraction(&coverage, completeness_threshold);

        Ok((accuracy, completeness))
    }
}

fn sign(point: &Point3<f64>, nearest: &Point3<f64>, normal: &Vector3<f64>) -> f64 {
    if (point - nearest).dot(normal) < 0.0 {
        -1.0
    } else {
        1.0
    }
}

fn completeness_fraction(distances: &[f64], threshold: f64) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }
    let covered = distances.iter().filter(|&&d| d < threshold).count();
    covered as f64 / distances.len() as f64
}

/// Signed vertex-to-vertex distances of `candidate` to the reference surface
pub fn signed_distances(
    reference_vertices: &[Point3<f64>],
    reference_faces: &[[u32; 3]],
    candidate: &[Point3<f64>],
) -> Vec<f64> {
    ReferenceSurface::new(reference_vertices.to_vec(), reference_faces.to_vec())
        .signed_distances(candidate, DistanceStrategy::VertexToVertex)
}

/// Middlebury `(accuracy, completeness)` with the vertex-to-vertex kernel
pub fn middlebury(
    reference_vertices: &[Point3<f64>],
    reference_faces: &[[u32; 3]],
    candidate_vertices: &[Point3<f64>],
    candidate_faces: &[[u32; 3]],
    accuracy_quantile: f64,
    completeness_threshold: f64,
) -> MeshResult<(f64, f64)> {
    middlebury_with(
        reference_vertices,
        reference_faces,
        candidate_vertices,
        candidate_faces,
        accuracy_quantile,
        completeness_threshold,
        DistanceStrategy::default(),
    )
}

/// Middlebury `(accuracy, completeness)` with an explicit distance kernel
pub fn middlebury_with(
    reference_vertices: &[Point3<f64>],
    reference_faces: &[[u32; 3]],
    candidate_vertices: &[Point3<f64>],
    candidate_faces: &[[u32; 3]],
    accuracy_quantile: f64,
    completeness_threshold: f64,
    strategy: DistanceStrategy,
) -> MeshResult<(f64, f64)> {
    validate_quantile(accuracy_quantile)?;

    ReferenceSurface::new(reference_vertices.to_vec(), reference_faces.to_vec()).middlebury(
        candidate_vertices,
        candidate_faces,
        accuracy_quantile,
        completeness_threshold,
        strategy,
    )
}
