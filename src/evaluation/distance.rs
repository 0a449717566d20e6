// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Brute-force nearest-neighbour kernels
//!
//! All searches are exhaustive, O(queries × targets). Queries are spread over
//! the rayon pool; each query scans the targets sequentially.

use nalgebra::Point3;
use rayon::prelude::*;

/// Nearest target found for a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Index of the target vertex or face
    pub index: usize,
    /// Closest point on the target
    pub point: Point3<f64>,
    pub distance: f64,
}

/// Closest vertex of `targets` to `query`; the first one wins ties
pub fn nearest_vertex(query: &Point3<f64>, targets: &[Point3<f64>]) -> Option<Nearest> {
    let mut best: Option<(usize, f64)> = None;
    for (index, target) in targets.iter().enumerate() {
        let dist_sq = (target - query).norm_squared();
        if best.map_or(true, |(_, d)| dist_sq < d) {
            best = Some((index, dist_sq));
        }
    }

    best.map(|(index, dist_sq)| Nearest {
        index,
        point: targets[index],
        distance: dist_sq.sqrt(),
    })
}

/// Closest point over all triangles `faces` of `vertices`
pub fn nearest_on_triangles(
    query: &Point3<f64>,
    vertices: &[Point3<f64>],
    faces: &[[u32; 3]],
) -> Option<Nearest> {
    let mut best: Option<(usize, Point3<f64>, f64)> = None;
    for (index, face) in faces.iter().enumerate() {
        let a = vertices[face[0] as usize];
        let b = vertices[face[1] as usize];
        let c = vertices[face[2] as usize];

        let point = closest_point_on_triangle(*query, a, b, c);
        let dist_sq = (point - query).norm_squared();
        if best.map_or(true, |(_, _, d)| dist_sq < d) {
            best = Some((index, point, dist_sq));
        }
    }

    best.map(|(index, point, dist_sq)| Nearest {
        index,
        point,
        distance: dist_sq.sqrt(),
    })
}

/// Distance from every query to its nearest target vertex.
/// Infinite when there are no targets.
pub fn nearest_vertex_distances(queries: &[Point3<f64>], targets: &[Point3<f64>]) -> Vec<f64> {
    queries
        .par_iter()
        .map(|query| nearest_vertex(query, targets).map_or(f64::INFINITY, |n| n.distance))
        .collect()
}

/// Distance from every query to the closest point on any target triangle.
/// Infinite when there are no triangles.
pub fn nearest_triangle_distances(
    queries: &[Point3<f64>],
    vertices: &[Point3<f64>],
    faces: &[[u32; 3]],
) -> Vec<f64> {
    queries
        .par_iter()
        .map(|query| {
            nearest_on_triangles(query, vertices, faces).map_or(f64::INFINITY, |n| n.distance)
        })
        .collect()
}

/// Closest point to `p` on triangle `abc`, by Voronoi region of the
/// triangle's vertices, edges and interior. Degenerate triangles collapse
/// onto their edges.
pub fn closest_point_on_triangle(
    p: Point3<f64>,
    a: Point3<f64>,
    b: Point3<f64>,
    c: Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = va + vb + vc;
    if denom.abs() < f64::EPSILON {
        return a;
    }
    let v = vb / denom;
    let w = vc / denom;
    a + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        (
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_closest_point_interior_projects_onto_plane() {
        let (a, b, c) = unit_triangle();
        let p = closest_point_on_triangle(Point3::new(0.25, 0.25, 3.0), a, b, c);
        assert_relative_eq!(p, Point3::new(0.25, 0.25, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_closest_point_vertex_region() {
        let (a, b, c) = unit_triangle();
        let p = closest_point_on_triangle(Point3::new(-1.0, -1.0, 0.5), a, b, c);
        assert_eq!(p, a);
        let p = closest_point_on_triangle(Point3::new(3.0, -0.5, 0.0), a, b, c);
        assert_eq!(p, b);
    }

    #[test]
    fn test_closest_point_edge_region() {
        let (a, b, c) = unit_triangle();
        let p = closest_point_on_triangle(Point3::new(1.0, 1.0, 0.0), a, b, c);
        assert_relative_eq!(p, Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        let p = closest_point_on_triangle(Point3::new(0.5, -2.0, 1.0), a, b, c);
        assert_relative_eq!(p, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_does_not_produce_nan() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let p = closest_point_on_triangle(Point3::new(1.0, 2.0, 3.0), a, a, a);
        assert_eq!(p, a);
    }

    #[test]
    fn test_nearest_vertex_first_wins_ties() {
        let targets = [Point3::new(1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)];
        let nearest = nearest_vertex(&Point3::origin(), &targets).unwrap();
        assert_eq!(nearest.index, 0);
        assert_eq!(nearest.distance, 1.0);
    }

    #[test]
    fn test_empty_targets() {
        assert!(nearest_vertex(&Point3::origin(), &[]).is_none());
        let distances = nearest_vertex_distances(&[Point3::origin()], &[]);
        assert_eq!(distances, vec![f64::INFINITY]);
    }

    #[test]
    fn test_triangle_distances_beat_vertex_distances() {
        let (a, b, c) = unit_triangle();
        let vertices = [a, b, c];
        let faces = [[0, 1, 2]];
        let queries = [Point3::new(0.3, 0.3, 0.1)];

        let to_triangles = nearest_triangle_distances(&queries, &vertices, &faces);
        let to_vertices = nearest_vertex_distances(&queries, &vertices);

        assert_relative_eq!(to_triangles[0], 0.1, epsilon = 1e-12);
        assert!(to_triangles[0] < to_vertices[0]);
    }
}
