//! Structured G-code document model.
//!
//! This module provides:
//! - The line/command entity and its classification
//! - The document with its cached flattened view
//! - Bounding box computation and text regeneration
//! - Project JSON round-trip

mod document;
mod line;

pub use document::Document;
pub use line::{GcodeKind, GcodeLine};
