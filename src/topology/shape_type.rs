//! Shape type tags for mesh elements.
//!
//! Every element of a cell set has exactly one shape. Explicit cell sets
//! store the shape as its [`code`](ShapeType::code) next to the connectivity;
//! structured cell sets derive it from their dimensionality.

use serde::{Deserialize, Serialize};

use crate::topomap_error::TopoMapError;

/// Element shapes, with stable integer codes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ShapeType {
    /// 0D point.
    Point = 1,
    /// 1D segment.
    Line = 2,
    /// 2D simplex.
    Triangle = 3,
    /// 2D quadrilateral.
    Quad = 4,
    /// Axis-aligned quadrilateral.
    Pixel = 5,
    /// 3D simplex.
    Tet = 6,
    Pyramid = 7,
    /// Triangular prism.
    Wedge = 8,
    /// 3D hexahedron.
    Hex = 9,
    /// Axis-aligned hexahedron.
    Voxel = 10,
    TriStrip = 11,
    /// 2D polygon with any vertex count.
    Polygon = 12,
    Other = 13,
}

impl Default for ShapeType {
    fn default() -> Self {
        ShapeType::Other
    }
}

impl ShapeType {
    /// Integer code of the shape, as stored in explicit connectivity.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, TopoMapError> {
        Ok(match code {
            1 => ShapeType::Point,
            2 => ShapeType::Line,
            3 => ShapeType::Triangle,
            4 => ShapeType::Quad,
            5 => ShapeType::Pixel,
            6 => ShapeType::Tet,
            7 => ShapeType::Pyramid,
            8 => ShapeType::Wedge,
            9 => ShapeType::Hex,
            10 => ShapeType::Voxel,
            11 => ShapeType::TriStrip,
            12 => ShapeType::Polygon,
            13 => ShapeType::Other,
            _ => return Err(TopoMapError::UnknownShapeCode(code)),
        })
    }

    /// Topological dimension, when well-defined.
    pub fn dimension(self) -> Option<u8> {
        match self {
            ShapeType::Point => Some(0),
            ShapeType::Line => Some(1),
            ShapeType::Triangle
            | ShapeType::Quad
            | ShapeType::Pixel
            | ShapeType::TriStrip
            | ShapeType::Polygon => Some(2),
            ShapeType::Tet
            | ShapeType::Pyramid
            | ShapeType::Wedge
            | ShapeType::Hex
            | ShapeType::Voxel => Some(3),
            ShapeType::Other => None,
        }
    }

    /// Number of vertices for fixed-size shapes.
    pub fn vertex_count(self) -> Option<usize> {
        match self {
            ShapeType::Point => Some(1),
            ShapeType::Line => Some(2),
            ShapeType::Triangle => Some(3),
            ShapeType::Quad | ShapeType::Pixel | ShapeType::Tet => Some(4),
            ShapeType::Pyramid => Some(5),
            ShapeType::Wedge => Some(6),
            ShapeType::Hex | ShapeType::Voxel => Some(8),
            ShapeType::TriStrip | ShapeType::Polygon | ShapeType::Other => None,
        }
    }

    /// Shape of every cell in a structured grid of dimension `dim`.
    pub fn regular_cell(dim: usize) -> ShapeType {
        match dim {
            0 => ShapeType::Point,
            1 => ShapeType::Line,
            2 => ShapeType::Quad,
            _ => ShapeType::Hex,
        }
    }
}

impl TryFrom<u8> for ShapeType {
    type Error = TopoMapError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ShapeType::from_code(code)
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(ShapeType, u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in 1..=13u8 {
            assert_eq!(ShapeType::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn unknown_codes_rejected() {
        assert_eq!(ShapeType::from_code(0), Err(TopoMapError::UnknownShapeCode(0)));
        assert_eq!(ShapeType::try_from(14u8), Err(TopoMapError::UnknownShapeCode(14)));
    }

    #[test]
    fn regular_cells_by_dimension() {
        assert_eq!(ShapeType::regular_cell(1), ShapeType::Line);
        assert_eq!(ShapeType::regular_cell(2), ShapeType::Quad);
        assert_eq!(ShapeType::regular_cell(3), ShapeType::Hex);
    }

    #[test]
    fn dimensions() {
        assert_eq!(ShapeType::Triangle.dimension(), Some(2));
        assert_eq!(ShapeType::Wedge.dimension(), Some(3));
        assert_eq!(ShapeType::Other.dimension(), None);
        assert_eq!(ShapeType::Polygon.vertex_count(), None);
        assert_eq!(ShapeType::Pyramid.vertex_count(), Some(5));
    }

    #[test]
    fn serializes_by_name() {
        let json = serde_json::to_string(&ShapeType::Quad).unwrap();
        assert_eq!(json, "\"Quad\"");
    }
}
