// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and primitives

mod bbox;
mod mesh;
mod primitives;

pub use bbox::BoundingBox;
pub use mesh::{triangle_normal, Face, Mesh};
pub use primitives::Primitive;
