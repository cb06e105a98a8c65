//! # GCodeBench Core
//!
//! Document model, tolerant G-code text parser and shared toolpath
//! geometry for GCodeBench. The DXF converter and the visualizer crates
//! both build on the types here; the document is the single data model
//! the whole workspace exchanges.

pub mod document;
pub mod error;
pub mod geometry;
pub mod parser;

pub use document::{Document, GcodeKind, GcodeLine};
pub use error::{DocumentError, DocumentResult};
pub use geometry::{Point3, GEOM_EPSILON, POS_EPSILON};
pub use parser::GcodeParser;
