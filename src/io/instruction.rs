// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Line decoding for progressive (OBJA) mesh streams
//!
//! Each line is decoded once into an [`Instruction`] carrying typed operands.
//! Vertex and face references stay 1-based here; they are resolved against
//! the mesh when the instruction is applied.

use crate::error::{MeshError, MeshResult};
use nalgebra::{Point3, Vector3};
use std::str::{FromStr, SplitWhitespace};

/// One decoded stream instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `v x y z`
    Vertex(Point3<f64>),
    /// `ev i x y z`
    EditVertex { index: i64, position: Point3<f64> },
    /// `tv i dx dy dz`
    TranslateVertex { index: i64, offset: Vector3<f64> },
    /// `f i1 i2 ... ik`
    Face(Vec<i64>),
    /// `tf i1 i2 ... ik`, fan-triangulated like `f`
    TriangleFan(Vec<i64>),
    /// `ts i1 i2 i3 i4 ...`
    TriangleStrip(Vec<i64>),
    /// `ef i j1 j2 j3`
    EditFace { index: i64, vertices: [i64; 3] },
    /// `efv i slot n`
    EditFaceVertex { index: i64, slot: i64, vertex: i64 },
    /// `df i`
    DeleteFace(i64),
    /// `s n`
    Step(u64),
    /// `fc i r g b`; colours carry no geometry
    FaceColor,
    /// `#...`
    Comment,
    /// Any keyword this reader does not know
    Unknown,
}

impl Instruction {
    /// Decode a single line. Returns `None` for blank lines.
    pub fn decode(text: &str, line: usize) -> MeshResult<Option<Self>> {
        let mut tokens = text.split_whitespace();
        let keyword = match tokens.next() {
            Some(keyword) => keyword,
            None => return Ok(None),
        };
        let mut operands = Operands::new(tokens, line, keyword);

        let instruction = match keyword {
            "v" => Instruction::Vertex(operands.point()?),
            "ev" => Instruction::EditVertex {
                index: operands.index()?,
                position: operands.point()?,
            },
            "tv" => Instruction::TranslateVertex {
                index: operands.index()?,
                offset: operands.point()?.coords,
            },
            "f" => Instruction::Face(operands.face_indices()?),
            "tf" => Instruction::TriangleFan(operands.face_indices()?),
            "ts" => Instruction::TriangleStrip(operands.face_indices()?),
            "ef" => Instruction::EditFace {
                index: operands.index()?,
                vertices: [
                    operands.face_index()?,
                    operands.face_index()?,
                    operands.face_index()?,
                ],
            },
            "efv" => Instruction::EditFaceVertex {
                index: operands.index()?,
                slot: operands.index()?,
                vertex: operands.index()?,
            },
            "df" => Instruction::DeleteFace(operands.index()?),
            "s" => Instruction::Step(operands.number::<u64>()?),
            "fc" => Instruction::FaceColor,
            comment if comment.starts_with('#') => Instruction::Comment,
            _ => Instruction::Unknown,
        };

        Ok(Some(instruction))
    }

    /// Declared wire size of the instruction, in size units
    pub const fn size_units(&self) -> u64 {
        match self {
            Instruction::Vertex(_) => 13,
            Instruction::EditVertex { .. } => 14,
            Instruction::TranslateVertex { .. } => 14,
            Instruction::Face(_) => 4,
            Instruction::TriangleFan(_) => 7,
            Instruction::TriangleStrip(_) => 6,
            Instruction::EditFace { .. } => 5,
            Instruction::EditFaceVertex { .. } => 4,
            Instruction::DeleteFace(_) => 1,
            Instruction::Step(_) => 0,
            Instruction::FaceColor | Instruction::Comment | Instruction::Unknown => 0,
        }
    }

    /// Whether the instruction affects the mesh or the step sequence
    pub fn has_content(&self) -> bool {
        !matches!(
            self,
            Instruction::FaceColor | Instruction::Comment | Instruction::Unknown
        )
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Instruction::Vertex(_) => "v",
            Instruction::EditVertex { .. } => "ev",
            Instruction::TranslateVertex { .. } => "tv",
            Instruction::Face(_) => "f",
            Instruction::TriangleFan(_) => "tf",
            Instruction::TriangleStrip(_) => "ts",
            Instruction::EditFace { .. } => "ef",
            Instruction::EditFaceVertex { .. } => "efv",
            Instruction::DeleteFace(_) => "df",
            Instruction::Step(_) => "s",
            Instruction::FaceColor => "fc",
            Instruction::Comment => "#",
            Instruction::Unknown => "?",
        }
    }
}

/// Operand cursor over the tokens following a keyword
pub(crate) struct Operands<'a> {
    tokens: SplitWhitespace<'a>,
    line: usize,
    keyword: &'a str,
}

impl<'a> Operands<'a> {
    pub(crate) fn new(tokens: SplitWhitespace<'a>, line: usize, keyword: &'a str) -> Self {
        Self {
            tokens,
            line,
            keyword,
        }
    }

    fn next_token(&mut self) -> MeshResult<&'a str> {
        let (line, keyword) = (self.line, self.keyword);
        self.tokens
            .next()
            .ok_or_else(|| MeshError::syntax(line, format!("'{}' is missing an operand", keyword)))
    }

    pub(crate) fn number<T: FromStr>(&mut self) -> MeshResult<T> {
        let token = self.next_token()?;
        token.parse::<T>().map_err(|_| {
            MeshError::syntax(
                self.line,
                format!("'{}' has an invalid operand '{}'", self.keyword, token),
            )
        })
    }

    pub(crate) fn index(&mut self) -> MeshResult<i64> {
        self.number::<i64>()
    }

    pub(crate) fn point(&mut self) -> MeshResult<Point3<f64>> {
        Ok(Point3::new(self.number()?, self.number()?, self.number()?))
    }

    /// A face corner: vertex index with an optional `/texcoord/normal` suffix
    pub(crate) fn face_index(&mut self) -> MeshResult<i64> {
        let token = self.next_token()?;
        parse_face_index(token, self.line, self.keyword)
    }

    /// All remaining tokens as face corners
    pub(crate) fn face_indices(&mut self) -> MeshResult<Vec<i64>> {
        let (line, keyword) = (self.line, self.keyword);
        self.tokens
            .by_ref()
            .map(|token| parse_face_index(token, line, keyword))
            .collect()
    }
}

fn parse_face_index(token: &str, line: usize, keyword: &str) -> MeshResult<i64> {
    let vertex = token.split('/').next().unwrap_or(token);
    vertex.parse::<i64>().map_err(|_| {
        MeshError::syntax(
            line,
            format!("'{}' has an invalid vertex reference '{}'", keyword, token),
        )
    })
}

/// Fan triangulation: `[a, b, c, d]` gives `(a, b, c)` and `(a, c, d)`
pub(crate) fn fan(indices: &[i64]) -> impl Iterator<Item = [i64; 3]> + '_ {
    let first = indices.first().copied();
    indices
        .windows(2)
        .skip(1)
        .filter_map(move |pair| first.map(|a| [a, pair[0], pair[1]]))
}

/// Strip triangulation with alternating winding: the triple starting at odd
/// 1-based position p is `(p, p+1, p+2)`, at even position `(p, p+2, p+1)`.
pub(crate) fn strip(indices: &[i64]) -> impl Iterator<Item = [i64; 3]> + '_ {
    indices.windows(3).enumerate().map(|(offset, w)| {
        if offset % 2 == 0 {
            [w[0], w[1], w[2]]
        } else {
            [w[0], w[2], w[1]]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Instruction {
        Instruction::decode(text, 1).unwrap().unwrap()
    }

    #[test]
    fn test_decode_vertex() {
        assert_eq!(
            decode("v 1 2.5 -3"),
            Instruction::Vertex(Point3::new(1.0, 2.5, -3.0))
        );
    }

    #[test]
    fn test_decode_blank_line() {
        assert_eq!(Instruction::decode("   \t", 3).unwrap(), None);
    }

    #[test]
    fn test_decode_face_strips_suffixes() {
        assert_eq!(
            decode("f 1/4/7 2//8 3"),
            Instruction::Face(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_decode_edits() {
        assert_eq!(
            decode("efv 3 2 7"),
            Instruction::EditFaceVertex {
                index: 3,
                slot: 2,
                vertex: 7
            }
        );
        assert_eq!(
            decode("ef 1 4 5 6"),
            Instruction::EditFace {
                index: 1,
                vertices: [4, 5, 6]
            }
        );
        assert_eq!(
            decode("tv 2 0.5 0 0"),
            Instruction::TranslateVertex {
                index: 2,
                offset: Vector3::new(0.5, 0.0, 0.0)
            }
        );
        assert_eq!(decode("df 9"), Instruction::DeleteFace(9));
        assert_eq!(decode("s 120"), Instruction::Step(120));
    }

    #[test]
    fn test_ignored_lines() {
        assert_eq!(decode("# comment"), Instruction::Comment);
        assert_eq!(decode("#comment"), Instruction::Comment);
        assert_eq!(decode("fc 1 0.5 0.5 0.5"), Instruction::FaceColor);
        assert_eq!(decode("vn 0 0 1"), Instruction::Unknown);
        assert_eq!(decode("vn 0 0 1").size_units(), 0);
        assert!(!decode("fc 1 1 1 1").has_content());
    }

    #[test]
    fn test_size_units() {
        assert_eq!(decode("v 0 0 0").size_units(), 13);
        assert_eq!(decode("ev 1 0 0 0").size_units(), 14);
        assert_eq!(decode("tv 1 0 0 0").size_units(), 14);
        assert_eq!(decode("f 1 2 3 4 5").size_units(), 4);
        assert_eq!(decode("tf 1 2 3").size_units(), 7);
        assert_eq!(decode("ts 1 2 3 4").size_units(), 6);
        assert_eq!(decode("ef 1 1 2 3").size_units(), 5);
        assert_eq!(decode("efv 1 1 2").size_units(), 4);
        assert_eq!(decode("df 1").size_units(), 1);
        assert_eq!(decode("s 10").size_units(), 0);
    }

    #[test]
    fn test_missing_operand_is_syntax_error() {
        match Instruction::decode("v 1 2", 4) {
            Err(MeshError::Syntax { line: 4, .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bad_number_is_syntax_error() {
        assert!(matches!(
            Instruction::decode("ev one 0 0 0", 2),
            Err(MeshError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            Instruction::decode("s -4", 8),
            Err(MeshError::Syntax { line: 8, .. })
        ));
    }

    #[test]
    fn test_fan() {
        let faces: Vec<_> = fan(&[1, 2, 3, 4]).collect();
        assert_eq!(faces, vec![[1, 2, 3], [1, 3, 4]]);
        assert_eq!(fan(&[1, 2]).count(), 0);
        assert_eq!(fan(&[]).count(), 0);
    }

    #[test]
    fn test_strip_alternates_winding() {
        let faces: Vec<_> = strip(&[1, 2, 3, 4, 5]).collect();
        assert_eq!(faces, vec![[1, 2, 3], [2, 4, 3], [3, 4, 5]]);
    }
}
