//! # GCodeBench CAM tools
//!
//! DXF geometry import for GCodeBench: reads CAD entities (lines,
//! polylines, circles, arcs) and converts them into a G-code document in
//! source order, with configurable origin placement and command style.

pub mod dxf_import;
pub mod entities;
pub mod error;

pub use dxf_import::{
    extract_entities, load_file, CommandStyle, ControllerKind, DxfConverter, ImportOptions,
    OriginMode,
};
pub use entities::{CadEntity, PolyVertex};
pub use error::{DxfImportError, DxfImportResult};
