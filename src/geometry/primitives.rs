// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Indexed primitive meshes, used as synthetic reference models

use super::{Face, Mesh};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Geometric primitives
pub enum Primitive {
    Cube { size: Vector3<f64>, center: bool },
    Sphere { r: f64, fn_: u32 },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f64, fn_: u32) -> Self {
        let segments = if fn_ > 2 { fn_ } else { 32 };
        Self::Sphere { r, fn_: segments }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cube { size, center } => generate_cube_mesh(*size, *center),
            Self::Sphere { r, fn_ } => generate_sphere_mesh(*r, *fn_),
        }
    }
}

fn generate_cube_mesh(size: Vector3<f64>, center: bool) -> Mesh {
    let mut mesh = Mesh::with_capacity(8, 12);

    let (min, max) = if center {
        (-size / 2.0, size / 2.0)
    } else {
        (Vector3::zeros(), size)
    };

    // 8 shared corners
    for position in [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ] {
        mesh.add_vertex(position);
    }

    // Two outward-wound triangles per side
    let faces: [[u32; 3]; 12] = [
        [4, 5, 6],
        [4, 6, 7],
        [1, 0, 3],
        [1, 3, 2],
        [5, 1, 2],
        [5, 2, 6],
        [0, 4, 7],
        [0, 7, 3],
        [7, 6, 2],
        [7, 2, 3],
        [0, 1, 5],
        [0, 5, 4],
    ];
    for indices in faces {
        mesh.add_face(Face::new(indices));
    }

    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let stacks = segments;
    let slices = segments;
    let mut mesh = Mesh::with_capacity(
        ((stacks + 1) * (slices + 1)) as usize,
        (2 * stacks * slices) as usize,
    );

    for i in 0..=stacks {
        let phi = PI * i as f64 / stacks as f64;
        let y = radius * phi.cos();
        let r = radius * phi.sin();

        for j in 0..=slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            mesh.add_vertex(Point3::new(r * theta.cos(), y, r * theta.sin()));
        }
    }

    // Outward winding; pole rows produce zero-area triangles, which
    // contribute nothing to vertex normals.
    for i in 0..stacks {
        for j in 0..slices {
            let first = i * (slices + 1) + j;
            let second = first + slices + 1;

            mesh.add_face(Face::new([first, first + 1, second]));
            mesh.add_face(Face::new([second, first + 1, second + 1]));
        }
    }

    mesh
}
