//! # GCodeBench Visualizer
//!
//! Read-only consumers of the document model: a motion simulator that
//! replays a document as a time-indexed segment timeline, and an SVG path
//! projector for rendering and click-to-select mapping. Neither mutates
//! the document it reads.

pub mod simulator;
pub mod svg_render;

pub use simulator::{MotionSegment, PlaybackState, SimulationState, Simulator};
pub use svg_render::{clickable_paths, generate_paths, PathSegment};
