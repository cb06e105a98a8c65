//! CAD entity model for geometry import.
//!
//! A deliberately small vector model: the subset of DXF the converter
//! understands, decoupled from the `dxf` crate types so conversion can be
//! driven (and tested) without touching the filesystem. Angles are radians,
//! counter-clockwise positive.

use serde::{Deserialize, Serialize};

/// One polyline vertex. A non-zero bulge turns the segment to the next
/// vertex into a circular arc; positive bulge sweeps counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolyVertex {
    pub x: f64,
    pub y: f64,
    pub bulge: f64,
}

impl PolyVertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, bulge: 0.0 }
    }

    pub fn with_bulge(x: f64, y: f64, bulge: f64) -> Self {
        Self { x, y, bulge }
    }
}

/// A CAD entity the converter can trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CadEntity {
    Line {
        start: (f64, f64),
        end: (f64, f64),
    },
    Polyline {
        vertices: Vec<PolyVertex>,
        closed: bool,
    },
    Circle {
        center: (f64, f64),
        radius: f64,
    },
    /// Circular arc, always counter-clockwise from `start_angle` to
    /// `end_angle` (DXF convention). Angles in radians.
    Arc {
        center: (f64, f64),
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
}

impl CadEntity {
    /// Point where the tool first touches this entity.
    pub fn start_point(&self) -> Option<(f64, f64)> {
        match self {
            Self::Line { start, .. } => Some(*start),
            Self::Polyline { vertices, .. } => vertices.first().map(|v| (v.x, v.y)),
            Self::Circle { center, radius } => Some((center.0 + radius, center.1)),
            Self::Arc {
                center,
                radius,
                start_angle,
                ..
            } => Some((
                center.0 + radius * start_angle.cos(),
                center.1 + radius * start_angle.sin(),
            )),
        }
    }

    /// Priority used to pick "the first entity" for origin computation:
    /// lines before polylines before circles before arcs.
    pub(crate) fn type_priority(&self) -> u8 {
        match self {
            Self::Line { .. } => 0,
            Self::Polyline { .. } => 1,
            Self::Circle { .. } => 2,
            Self::Arc { .. } => 3,
        }
    }
}
