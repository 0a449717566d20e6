// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Reference model catalog
//!
//! Maps a reference id to its OBJ file and descriptive metadata. Candidates
//! are always scored against a catalog entry, never an arbitrary path.

use super::metrics::ReferenceSurface;
use crate::error::{MeshError, MeshResult};
use crate::geometry::Mesh;
use crate::io::load_obj;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Catalog entry for one reference model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceModel {
    /// OBJ file, relative to the catalog root unless absolute
    pub file: PathBuf,
    #[serde(default)]
    pub watertight: bool,
    #[serde(default)]
    pub manifoldness: u32,
    #[serde(default)]
    pub faces: usize,
    #[serde(default)]
    pub vertices: usize,
    /// Overrides the bounding-box diagonal used to scale the completeness
    /// threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagonal: Option<f64>,
}

impl ReferenceModel {
    fn builtin(id: &str, watertight: bool, manifoldness: u32, faces: usize, vertices: usize) -> Self {
        Self {
            file: PathBuf::from(format!("{}.obj", id)),
            watertight,
            manifoldness,
            faces,
            vertices,
            diagonal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCatalog {
    /// Directory holding the reference OBJ files
    pub root: PathBuf,
    #[serde(default)]
    pub models: BTreeMap<String, ReferenceModel>,
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        let models = [
            ("icosphere", true, 1, 1280, 642),
            ("sphere", true, 1, 4680, 2342),
            ("bunny", false, 1, 4968, 2503),
            ("cow", true, 1, 5804, 2903),
            ("suzanne", false, 3, 15488, 7830),
            ("fandisk", true, 1, 19724, 9864),
            ("pokemon", true, 3, 51663, 25926),
            ("hippo", true, 1, 64244, 32144),
        ]
        .into_iter()
        .map(|(id, watertight, manifoldness, faces, vertices)| {
            (
                id.to_string(),
                ReferenceModel::builtin(id, watertight, manifoldness, faces, vertices),
            )
        })
        .collect();

        Self {
            root: PathBuf::from("references"),
            models,
        }
    }
}

impl ReferenceCatalog {
    /// Empty catalog rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            models: BTreeMap::new(),
        }
    }

    /// Build a catalog from the `.obj` files under a directory.
    /// Ids are file stems; metadata is left at its defaults.
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            anyhow::bail!("Reference directory not found: {}", dir.display());
        }

        let mut catalog = Self::new(dir);
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "obj") {
                continue;
            }
            let id = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(id) => id.to_string(),
                None => continue,
            };
            let file = path
                .strip_prefix(dir)
                .with_context(|| format!("Failed to relativize {}", path.display()))?
                .to_path_buf();

            debug!("Discovered reference '{}' at {}", id, path.display());
            catalog.insert(
                id,
                ReferenceModel {
                    file,
                    watertight: false,
                    manifoldness: 0,
                    faces: 0,
                    vertices: 0,
                    diagonal: None,
                },
            );
        }

        info!(
            "Discovered {} reference models under {}",
            catalog.len(),
            dir.display()
        );
        Ok(catalog)
    }

    pub fn insert(&mut self, id: impl Into<String>, model: ReferenceModel) {
        self.models.insert(id.into(), model);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Reference ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> MeshResult<&ReferenceModel> {
        self.models
            .get(id)
            .ok_or_else(|| MeshError::UnknownReference { id: id.to_string() })
    }

    /// Resolved path of a reference file
    pub fn path(&self, id: &str) -> MeshResult<PathBuf> {
        let model = self.get(id)?;
        Ok(if model.file.is_absolute() {
            model.file.clone()
        } else {
            self.root.join(&model.file)
        })
    }

    /// Load a reference mesh and prepare it for scoring
    pub fn load(&self, id: &str) -> MeshResult<ReferenceMesh> {
        let model = self.get(id)?;
        let mesh = load_obj(self.path(id)?)?;
        Ok(ReferenceMesh::from_mesh(id, &mesh, model.diagonal))
    }
}

/// A loaded reference mesh with its scoring data precomputed
#[derive(Debug, Clone)]
pub struct ReferenceMesh {
    pub id: String,
    pub surface: ReferenceSurface,
    /// Length used to scale the completeness threshold
    pub diagonal: f64,
}

impl ReferenceMesh {
    /// `diagonal` overrides the bounding-box diagonal of the mesh
    pub fn from_mesh(id: impl Into<String>, mesh: &Mesh, diagonal: Option<f64>) -> Self {
        let (vertices, faces) = mesh.get_lists();
        let diagonal = diagonal.unwrap_or_else(|| mesh.diagonal());
        Self {
            id: id.into(),
            surface: ReferenceSurface::new(vertices, faces),
            diagonal,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.surface.vertices().len()
    }

    pub fn face_count(&self) -> usize {
        self.surface.faces().len()
    }

    /// Absolute completeness threshold for a diagonal-relative ratio
    pub fn completeness_threshold(&self, ratio: f64) -> f64 {
        ratio * self.diagonal
    }
}
