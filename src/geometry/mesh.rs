// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation with index-stable faces

use super::BoundingBox;
use crate::error::{MeshError, MeshResult};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Triangle defined by three zero-based vertex indices.
///
/// Faces are never removed from a mesh: `df` hides them instead, so that
/// later instructions can keep addressing faces by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub indices: [u32; 3],
    pub visible: bool,
}

impl Face {
    pub fn new(indices: [u32; 3]) -> Self {
        Self {
            indices,
            visible: true,
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

/// Triangular mesh built incrementally
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Add a vertex and return its zero-based index
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let index = self.vertices.len();
        self.vertices.push(position);
        index
    }

    /// Add a face whose indices were already checked with [`Mesh::resolve_vertex`]
    pub fn add_face(&mut self, face: Face) -> usize {
        let index = self.faces.len();
        self.faces.push(face);
        index
    }

    /// Convert a 1-based vertex reference into a zero-based index, failing if
    /// the vertex has not been declared yet.
    pub fn resolve_vertex(&self, index: i64, line: usize) -> MeshResult<u32> {
        if index < 1 || index as usize > self.vertices.len() {
            return Err(MeshError::dangling_vertex(index, line));
        }
        Ok((index - 1) as u32)
    }

    /// Resolve three 1-based references into a face, checking them in order
    pub fn resolve_face(&self, indices: [i64; 3], line: usize) -> MeshResult<Face> {
        let a = self.resolve_vertex(indices[0], line)?;
        let b = self.resolve_vertex(indices[1], line)?;
        let c = self.resolve_vertex(indices[2], line)?;
        Ok(Face::new([a, b, c]))
    }

    /// Mutable access to a vertex by 1-based index
    pub fn vertex_mut(&mut self, index: i64, line: usize) -> MeshResult<&mut Point3<f64>> {
        let zero_based = self.resolve_vertex(index, line)? as usize;
        Ok(&mut self.vertices[zero_based])
    }

    /// Mutable access to a face by 1-based index
    pub fn face_mut(&mut self, index: i64, line: usize) -> MeshResult<&mut Face> {
        if index < 1 || index as usize > self.faces.len() {
            return Err(MeshError::dangling_face(index, line));
        }
        Ok(&mut self.faces[(index - 1) as usize])
    }

    pub fn visible_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().filter(|face| face.visible)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of stored faces, hidden ones included
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn visible_face_count(&self) -> usize {
        self.visible_faces().count()
    }

    /// Flattened copy of the mesh: vertex positions and the index triples of
    /// visible faces.
    pub fn get_lists(&self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        let faces = self.visible_faces().map(|face| face.indices).collect();
        (self.vertices.clone(), faces)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    /// Length of the bounding box diagonal, 0 for an empty mesh
    pub fn diagonal(&self) -> f64 {
        self.bounding_box().diagonal()
    }

    /// Unnormalized normal `(b - a) × (c - a)` of a face
    pub fn face_normal(&self, face: &Face) -> Vector3<f64> {
        triangle_normal(&self.vertices, face.indices)
    }
}

/// Unnormalized normal of a triangle given by indices into `vertices`
pub fn triangle_normal(vertices: &[Point3<f64>], indices: [u32; 3]) -> Vector3<f64> {
    let a = vertices[indices[0] as usize];
    let b = vertices[indices[1] as usize];
    let c = vertices[indices[2] as usize];
    (b - a).cross(&(c - a))
}
