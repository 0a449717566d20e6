// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Wavefront OBJ reader and writer for reference meshes

use super::instruction::{fan, strip, Operands};
use crate::error::{MeshError, MeshResult};
use crate::geometry::Mesh;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Parse OBJ text into a mesh.
///
/// Only `v`, `f` and `ts` records carry geometry; comments and every other
/// record type (`vn`, `vt`, `o`, `g`, `s`, `usemtl`, ...) are skipped.
pub fn parse_obj(source: &str) -> MeshResult<Mesh> {
    let mut mesh = Mesh::new();

    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let mut tokens = text.split_whitespace();
        let keyword = match tokens.next() {
            Some(keyword) => keyword,
            None => continue,
        };
        let mut operands = Operands::new(tokens, line, keyword);

        match keyword {
            "v" => {
                mesh.add_vertex(operands.point()?);
            }
            "f" => {
                let corners = operands.face_indices()?;
                for triangle in fan(&corners) {
                    let face = mesh.resolve_face(triangle, line)?;
                    mesh.add_face(face);
                }
            }
            "ts" => {
                let corners = operands.face_indices()?;
                for triangle in strip(&corners) {
                    let face = mesh.resolve_face(triangle, line)?;
                    mesh.add_face(face);
                }
            }
            _ => {}
        }
    }

    Ok(mesh)
}

/// Parse OBJ data from a reader; the input is read fully first
pub fn read_obj<R: Read>(mut reader: R) -> MeshResult<Mesh> {
    let mut source = String::new();
    reader
        .read_to_string(&mut source)
        .map_err(|e| MeshError::io("<stream>", e))?;
    parse_obj(&source)
}

/// Load an OBJ file
pub fn load_obj(path: impl AsRef<Path>) -> MeshResult<Mesh> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| MeshError::io(path, e))?;
    let mesh = parse_obj(&source)?;

    info!(
        "Loaded {:?}: {} vertices, {} faces",
        path,
        mesh.vertex_count(),
        mesh.face_count()
    );

    Ok(mesh)
}

/// Write the vertices and visible faces of a mesh as OBJ text
pub fn write_obj<W: Write>(mesh: &Mesh, mut writer: W) -> std::io::Result<()> {
    for vertex in &mesh.vertices {
        writeln!(writer, "v {} {} {}", vertex.x, vertex.y, vertex.z)?;
    }
    for face in mesh.visible_faces() {
        let [a, b, c] = face.indices;
        writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    writer.flush()
}

/// Export a mesh to an OBJ file
pub fn export_obj(mesh: &Mesh, path: impl AsRef<Path>) -> MeshResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| MeshError::io(path, e))?;
    write_obj(mesh, BufWriter::new(file)).map_err(|e| MeshError::io(path, e))?;

    debug!("Exported {} vertices to {:?}", mesh.vertex_count(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Target;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_quad_with_suffixes() {
        let source = "\
# a unit quad
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vt 0 0
s off
usemtl plain
f 1/1/1 2/1/1 3/1/1 4/1/1
";
        let mesh = parse_obj(source).unwrap();
        assert_eq!(mesh.vertex_count(), 4);

        let (vertices, faces) = mesh.get_lists();
        assert_eq!(vertices.len(), 4);
        assert_eq!(faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_dangling_reference_reports_one_based_index() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\n\nf 1 2 4\n";
        match parse_obj(source) {
            Err(MeshError::DanglingReference {
                target: Target::Vertex,
                index: 4,
                line: 5,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_face_before_vertices_is_rejected() {
        let source = "f 1 2 3\nv 0 0 0\nv 1 0 0\nv 0 1 0\n";
        assert!(matches!(
            parse_obj(source),
            Err(MeshError::DanglingReference { index: 1, line: 1, .. })
        ));
    }

    #[test]
    fn test_malformed_vertex() {
        assert!(matches!(
            parse_obj("v 0 zero 0\n"),
            Err(MeshError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_obj_file() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "v 0 0 0")?;
        writeln!(file, "v 1 0 0")?;
        writeln!(file, "v 0 1 0")?;
        writeln!(file, "f 1 2 3")?;

        let mesh = load_obj(file.path())?;
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);

        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_obj("/nonexistent/reference.obj"),
            Err(MeshError::Io { .. })
        ));
    }

    #[test]
    fn test_export_then_load_preserves_cube() -> anyhow::Result<()> {
        let cube = Primitive::cube(Vector3::new(2.0, 4.0, 6.0), true).to_mesh();
        let file = NamedTempFile::new()?;

        export_obj(&cube, file.path())?;
        let loaded = load_obj(file.path())?;

        assert_eq!(loaded.get_lists(), cube.get_lists());
        Ok(())
    }
}
