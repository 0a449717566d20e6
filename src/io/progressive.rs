// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Progressive mesh stream interpreter
//!
//! A stream starts from an empty mesh and refines it one instruction per
//! line. Snapshots ("steps") are taken at explicit `s` markers, or, for
//! streams without any marker, at ten evenly spaced line checkpoints.

use super::instruction::{fan, strip, Instruction};
use crate::error::{MeshError, MeshResult};
use crate::geometry::Mesh;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Number of checkpoints synthesized for streams without step markers
pub const FALLBACK_CHECKPOINTS: usize = 10;

/// Snapshot of the mesh at one point of the stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressiveStep {
    /// Zero-based position in the step sequence
    pub ordinal: u32,
    /// 1-based line the snapshot was taken after
    pub line: usize,
    /// Argument of the `s` marker; `None` for line checkpoints
    pub declared_size: Option<u64>,
    /// Size units accumulated up to and including `line`
    pub encoded_size: u64,
    /// Position on the rate axis, in `[0, 1]`
    pub relative_position: f64,
    pub vertices: Vec<Point3<f64>>,
    /// Visible faces only
    pub faces: Vec<[u32; 3]>,
}

/// How steps are extracted from a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPolicy {
    /// One step per `s` marker
    Markers,
    /// One step every `interval` lines
    LineCheckpoints { interval: usize },
}

impl StepPolicy {
    fn select(instructions: &[Option<Instruction>]) -> Self {
        let has_markers = instructions
            .iter()
            .flatten()
            .any(|instruction| matches!(instruction, Instruction::Step(_)));

        if has_markers {
            StepPolicy::Markers
        } else {
            let interval = (instructions.len() / FALLBACK_CHECKPOINTS).max(1);
            StepPolicy::LineCheckpoints { interval }
        }
    }
}

/// A fully parsed progressive stream
#[derive(Debug, Clone)]
pub struct ProgressiveStream {
    steps: Vec<ProgressiveStep>,
    mesh: Mesh,
    policy: StepPolicy,
    actual_size: u64,
    declared_size: u64,
    line_count: usize,
}

impl ProgressiveStream {
    pub fn steps(&self) -> &[ProgressiveStep] {
        &self.steps
    }

    /// Steps, or [`MeshError::EmptyInput`] when the stream produced none
    pub fn require_steps(&self) -> MeshResult<&[ProgressiveStep]> {
        if self.steps.is_empty() {
            Err(MeshError::EmptyInput)
        } else {
            Ok(&self.steps)
        }
    }

    /// Mesh state after the last line
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn policy(&self) -> StepPolicy {
        self.policy
    }

    /// Size units accumulated over the whole stream
    pub fn actual_size(&self) -> u64 {
        self.actual_size
    }

    /// Size announced by the last `s` marker, 0 without markers
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn relative_positions(&self) -> Vec<f64> {
        self.steps.iter().map(|step| step.relative_position).collect()
    }

    pub fn into_steps(self) -> Vec<ProgressiveStep> {
        self.steps
    }
}

/// Parse a progressive stream from text
pub fn parse_progressive(source: &str) -> MeshResult<ProgressiveStream> {
    let instructions = source
        .lines()
        .enumerate()
        .map(|(index, text)| Instruction::decode(text, index + 1))
        .collect::<MeshResult<Vec<_>>>()?;

    let policy = StepPolicy::select(&instructions);
    let has_content = instructions
        .iter()
        .flatten()
        .any(Instruction::has_content);

    debug!(
        "Decoded {} lines, step policy {:?}",
        instructions.len(),
        policy
    );

    let mut interpreter = Interpreter::new(policy, instructions.len());
    for (index, instruction) in instructions.into_iter().enumerate() {
        interpreter.execute(index + 1, instruction)?;
    }

    let mut stream = interpreter.finish();
    if !has_content {
        warn!("Stream has no mesh instructions, no steps extracted");
        stream.steps.clear();
    }

    Ok(stream)
}

/// Parse a progressive stream from a reader; the input is read fully first
pub fn read_progressive<R: Read>(mut reader: R) -> MeshResult<ProgressiveStream> {
    let mut source = String::new();
    reader
        .read_to_string(&mut source)
        .map_err(|e| MeshError::io("<stream>", e))?;
    parse_progressive(&source)
}

/// Load and parse a progressive stream file
pub fn load_progressive(path: impl AsRef<Path>) -> MeshResult<ProgressiveStream> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| MeshError::io(path, e))?;
    let stream = parse_progressive(&source)?;

    info!(
        "Loaded progressive stream {:?}: {} lines, {} steps, size {} (declared {})",
        path,
        stream.line_count(),
        stream.steps().len(),
        stream.actual_size(),
        stream.declared_size()
    );

    Ok(stream)
}

/// Replays instructions over an initially empty mesh
struct Interpreter {
    mesh: Mesh,
    policy: StepPolicy,
    steps: Vec<ProgressiveStep>,
    size: u64,
    declared_size: u64,
    line_count: usize,
}

impl Interpreter {
    fn new(policy: StepPolicy, line_count: usize) -> Self {
        Self {
            mesh: Mesh::new(),
            policy,
            steps: Vec::new(),
            size: 0,
            declared_size: 0,
            line_count,
        }
    }

    fn execute(&mut self, line: usize, instruction: Option<Instruction>) -> MeshResult<()> {
        if let Some(instruction) = instruction {
            self.size += instruction.size_units();
            self.apply(line, instruction)?;
        }

        if let StepPolicy::LineCheckpoints { interval } = self.policy {
            if line % interval == 0 {
                self.snapshot(line, None);
            }
        }

        Ok(())
    }

    fn apply(&mut self, line: usize, instruction: Instruction) -> MeshResult<()> {
        match instruction {
            Instruction::Vertex(position) => {
                self.mesh.add_vertex(position);
            }
            Instruction::EditVertex { index, position } => {
                *self.mesh.vertex_mut(index, line)? = position;
            }
            Instruction::TranslateVertex { index, offset } => {
                *self.mesh.vertex_mut(index, line)? += offset;
            }
            Instruction::Face(indices) | Instruction::TriangleFan(indices) => {
                for corners in fan(&indices) {
                    let face = self.mesh.resolve_face(corners, line)?;
                    self.mesh.add_face(face);
                }
            }
            Instruction::TriangleStrip(indices) => {
                for corners in strip(&indices) {
                    let face = self.mesh.resolve_face(corners, line)?;
                    self.mesh.add_face(face);
                }
            }
            Instruction::EditFace { index, vertices } => {
                let replacement = self.mesh.resolve_face(vertices, line)?;
                self.mesh.face_mut(index, line)?.indices = replacement.indices;
            }
            Instruction::EditFaceVertex {
                index,
                slot,
                vertex,
            } => {
                self.mesh.face_mut(index, line)?;
                if !(1..=3).contains(&slot) {
                    return Err(MeshError::FaceVertex { index: slot, line });
                }
                let vertex = self.mesh.resolve_vertex(vertex, line)?;
                self.mesh.face_mut(index, line)?.indices[(slot - 1) as usize] = vertex;
            }
            Instruction::DeleteFace(index) => {
                self.mesh.face_mut(index, line)?.hide();
            }
            Instruction::Step(declared) => {
                self.declared_size = declared;
                self.snapshot(line, Some(declared));
            }
            Instruction::FaceColor | Instruction::Comment | Instruction::Unknown => {}
        }
        Ok(())
    }

    fn snapshot(&mut self, line: usize, declared_size: Option<u64>) {
        let (vertices, faces) = self.mesh.get_lists();
        self.steps.push(ProgressiveStep {
            ordinal: self.steps.len() as u32,
            line,
            declared_size,
            encoded_size: self.size,
            relative_position: 0.0,
            vertices,
            faces,
        });
    }

    fn finish(mut self) -> ProgressiveStream {
        let positions = match self.policy {
            StepPolicy::Markers => {
                let values: Vec<f64> = self
                    .steps
                    .iter()
                    .map(|step| step.declared_size.unwrap_or(0) as f64)
                    .collect();
                normalize(&values)
            }
            StepPolicy::LineCheckpoints { .. } => {
                let values: Vec<f64> = self.steps.iter().map(|step| step.line as f64).collect();
                normalize(&values)
            }
        };

        for (step, position) in self.steps.iter_mut().zip(positions) {
            step.relative_position = position;
        }

        ProgressiveStream {
            steps: self.steps,
            mesh: self.mesh,
            policy: self.policy,
            actual_size: self.size,
            declared_size: self.declared_size,
            line_count: self.line_count,
        }
    }
}

/// Divide every value by the last one. A zero last value falls back to
/// evenly spaced ordinals so the curve still ends at 1.
fn normalize(values: &[f64]) -> Vec<f64> {
    match values.last() {
        Some(&last) if last > 0.0 => values.iter().map(|v| v / last).collect(),
        Some(_) => {
            warn!("Last step has size 0, using ordinal positions");
            let count = values.len() as f64;
            (1..=values.len()).map(|i| i as f64 / count).collect()
        }
        None => Vec::new(),
    }
}
