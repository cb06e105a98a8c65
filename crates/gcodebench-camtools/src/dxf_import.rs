//! DXF entity to G-code document conversion.
//!
//! The converter walks a set of CAD entities in source order and emits a
//! document that traces them: a caller-supplied header block, an explicit
//! feed-rate line, a smart rapid plus cut moves per entity, and a footer
//! block. Coordinates are shifted by the configured origin policy; I/J arc
//! offsets are relative to the segment start and are never shifted.

use std::path::Path;

use dxf::entities::EntityType;
use dxf::Drawing;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gcodebench_core::document::{Document, GcodeKind, GcodeLine};
use gcodebench_core::geometry::{arc_from_bulge, Bounds, GEOM_EPSILON, POS_EPSILON};

use crate::entities::{CadEntity, PolyVertex};
use crate::error::DxfImportResult;

/// Controller family. Affects which command aliases are natural for the
/// target, never the geometry itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControllerKind {
    #[default]
    Pmac,
    Beckhoff,
}

/// Command style: standard G-codes or PMAC textual commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommandStyle {
    /// G00 / G01 / G02 / G03
    GCode,
    /// RAPID / LINEAR / ARC1 / ARC2
    #[default]
    PmacNative,
}

/// Origin policy: the rule by which imported coordinates are shifted so a
/// chosen reference point becomes (0,0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OriginMode {
    /// Keep the source coordinate system.
    #[default]
    Original,
    /// Shift so the first entity's start point lands at the origin.
    FirstEntityStart,
    /// Shift so the precise bounding box center lands at the origin.
    BoundingBoxCenter,
    /// Shift so the bounding box top-left corner lands at the origin.
    BoundingBoxTopLeft,
}

/// Configuration for DXF import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub controller: ControllerKind,
    pub style: CommandStyle,

    /// Setup block emitted before any motion.
    pub header_code: String,
    /// Program block emitted after all motion.
    pub footer_code: String,

    pub use_line_numbers: bool,
    /// Emit `G1` instead of `G01`, etc.
    pub use_compact_commands: bool,

    /// Cutting feed rate (mm/sec), emitted as an explicit feed line.
    pub feed_rate: f64,
    /// Plunge feed rate (mm/sec).
    pub plunge_feed_rate: f64,
    /// Rapid feed rate (mm/sec), used for simulation estimation.
    pub rapid_feed_rate: f64,

    /// Token that starts the output device (e.g. spindle/laser on).
    pub start_trigger: String,
    /// Token that stops the output device.
    pub stop_trigger: String,

    pub origin: OriginMode,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            controller: ControllerKind::Pmac,
            style: CommandStyle::PmacNative,
            header_code: "G21\nG90".to_string(),
            footer_code: "M30".to_string(),
            use_line_numbers: false,
            use_compact_commands: false,
            feed_rate: 10.0,
            plunge_feed_rate: 5.0,
            rapid_feed_rate: 100.0,
            start_trigger: "M03".to_string(),
            stop_trigger: "M05".to_string(),
            origin: OriginMode::Original,
        }
    }
}

/// Load a DXF file and convert it to a G-code document.
///
/// Fatal on failure: an unreadable or malformed file returns an error and
/// no partial document.
pub fn load_file(path: impl AsRef<Path>, options: &ImportOptions) -> DxfImportResult<Document> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path)?;
    let drawing = Drawing::load(&mut file)?;
    let entities = extract_entities(&drawing);
    debug!(
        path = %path.display(),
        entities = entities.len(),
        "loaded DXF file"
    );

    let mut doc = DxfConverter::new(options.clone()).convert(&entities);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        doc.set_file_name(name);
    }
    Ok(doc)
}

/// Extract convertible entities from a drawing, grouped in the fixed
/// entity-type order the converter traces: lines, polylines, circles, arcs.
pub fn extract_entities(drawing: &Drawing) -> Vec<CadEntity> {
    let mut lines = Vec::new();
    let mut polylines = Vec::new();
    let mut circles = Vec::new();
    let mut arcs = Vec::new();

    for entity in drawing.entities() {
        match &entity.specific {
            EntityType::Line(line) => {
                lines.push(CadEntity::Line {
                    start: (line.p1.x, line.p1.y),
                    end: (line.p2.x, line.p2.y),
                });
            }
            EntityType::LwPolyline(poly) => {
                let vertices = poly
                    .vertices
                    .iter()
                    .map(|v| PolyVertex::with_bulge(v.x, v.y, v.bulge))
                    .collect();
                polylines.push(CadEntity::Polyline {
                    vertices,
                    // Bit 0 (value 1) indicates closed
                    closed: poly.flags & 1 != 0,
                });
            }
            EntityType::Polyline(poly) => {
                let vertices = poly
                    .vertices()
                    .map(|v| PolyVertex::with_bulge(v.location.x, v.location.y, v.bulge))
                    .collect();
                polylines.push(CadEntity::Polyline {
                    vertices,
                    closed: poly.flags & 1 != 0,
                });
            }
            EntityType::Circle(circle) => {
                circles.push(CadEntity::Circle {
                    center: (circle.center.x, circle.center.y),
                    radius: circle.radius,
                });
            }
            EntityType::Arc(arc) => {
                // DXF arcs are CCW with angles in degrees.
                arcs.push(CadEntity::Arc {
                    center: (arc.center.x, arc.center.y),
                    radius: arc.radius,
                    start_angle: arc.start_angle.to_radians(),
                    end_angle: arc.end_angle.to_radians(),
                });
            }
            _ => {}
        }
    }

    lines
        .into_iter()
        .chain(polylines)
        .chain(circles)
        .chain(arcs)
        .collect()
}

/// Converts CAD entities into a G-code document.
pub struct DxfConverter {
    options: ImportOptions,
    offset_x: f64,
    offset_y: f64,
    last_x: f64,
    last_y: f64,
    has_last_pos: bool,
    line_number: u32,
}

impl DxfConverter {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            offset_x: 0.0,
            offset_y: 0.0,
            last_x: 0.0,
            last_y: 0.0,
            has_last_pos: false,
            line_number: 1,
        }
    }

    /// Convert entities in source order into an ordered document.
    pub fn convert(mut self, entities: &[CadEntity]) -> Document {
        let mut doc = Document::new();

        let (offset_x, offset_y) = compute_origin_offset(entities, self.options.origin);
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        debug!(
            origin = ?self.options.origin,
            offset_x,
            offset_y,
            "computed origin offset"
        );

        // Caller-supplied setup block.
        let header = self.options.header_code.clone();
        for text in header.lines() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let line = self.make_line(GcodeKind::Setup, text, "", "Header");
            doc.push_line(line);
        }

        // Explicit feed rate line so the simulator can pick it up.
        let feed = self.options.feed_rate;
        let mut feed_line = self.make_line(GcodeKind::Setup, "F", "", "Feed Rate (mm/sec)");
        feed_line.raw_text = format!("F{:.1}", feed);
        feed_line.f = Some(feed);
        doc.push_line(feed_line);

        for entity in entities {
            match entity {
                CadEntity::Line { start, end } => self.convert_line(&mut doc, *start, *end),
                CadEntity::Polyline { vertices, closed } => {
                    self.convert_polyline(&mut doc, vertices, *closed)
                }
                CadEntity::Circle { center, radius } => {
                    self.convert_circle(&mut doc, *center, *radius)
                }
                CadEntity::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                } => self.convert_arc(&mut doc, *center, *radius, *start_angle, *end_angle),
            }
        }

        // Caller-supplied program end block.
        let footer = self.options.footer_code.clone();
        for text in footer.lines() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let line = self.make_line(GcodeKind::Program, text, "", "Footer");
            doc.push_line(line);
        }

        doc
    }

    /// Rapid to an (un-offset) position unless the tool is already there.
    fn move_to(&mut self, doc: &mut Document, x: f64, y: f64) {
        let final_x = x + self.offset_x;
        let final_y = y + self.offset_y;

        // Compare against the last generated position, which already
        // includes the offset.
        if self.has_last_pos
            && (final_x - self.last_x).abs() < POS_EPSILON
            && (final_y - self.last_y).abs() < POS_EPSILON
        {
            return;
        }

        let params = format!("X{:.3} Y{:.3}", final_x, final_y);
        let mut line = self.make_line(GcodeKind::Rapid, self.rapid_cmd(), &params, "Rapid");
        line.x = Some(round3(final_x));
        line.y = Some(round3(final_y));
        doc.push_line(line);

        self.last_x = final_x;
        self.last_y = final_y;
        self.has_last_pos = true;
    }

    fn convert_line(&mut self, doc: &mut Document, start: (f64, f64), end: (f64, f64)) {
        self.move_to(doc, start.0, start.1);

        let end_x = end.0 + self.offset_x;
        let end_y = end.1 + self.offset_y;

        let params = format!("X{:.3} Y{:.3}", end_x, end_y);
        let mut line = self.make_line(GcodeKind::Linear, self.linear_cmd(), &params, "Line");
        line.x = Some(round3(end_x));
        line.y = Some(round3(end_y));
        doc.push_line(line);

        self.last_x = end_x;
        self.last_y = end_y;
        self.has_last_pos = true;
    }

    fn convert_polyline(&mut self, doc: &mut Document, vertices: &[PolyVertex], closed: bool) {
        if vertices.len() < 2 {
            return;
        }

        let first = vertices[0];
        self.move_to(doc, first.x, first.y);

        let mut parent = GcodeLine::new(self.next_line_number());
        parent.kind = GcodeKind::Polyline;
        parent.is_collapsed = true;
        parent.label = format!("Polyline ({} pts)", vertices.len());
        parent.x = Some(round3(first.x + self.offset_x));
        parent.y = Some(round3(first.y + self.offset_y));
        let parent_number = parent.line_number;

        let vertex_count = vertices.len();
        let segment_count = if closed { vertex_count } else { vertex_count - 1 };

        for i in 0..segment_count {
            let cur = vertices[i];
            let next = vertices[(i + 1) % vertex_count];

            let next_x = next.x + self.offset_x;
            let next_y = next.y + self.offset_y;

            if cur.bulge.abs() < GEOM_EPSILON {
                let params = format!("X{:.3} Y{:.3}", next_x, next_y);
                let mut child =
                    self.make_line(GcodeKind::Linear, self.linear_cmd(), &params, "");
                child.x = Some(round3(next_x));
                child.y = Some(round3(next_y));
                child.parent = Some(parent_number);
                parent.children.push(child);
            } else {
                // The vector math needs the raw (un-offset) coordinates;
                // I/J fall out of a subtraction, so the offset cancels.
                let Some(arc) = arc_from_bulge(cur.x, cur.y, next.x, next.y, cur.bulge) else {
                    continue;
                };
                let i_val = arc.center_x - cur.x;
                let j_val = arc.center_y - cur.y;

                let (kind, command) = if cur.bulge > 0.0 {
                    (GcodeKind::ArcCCW, self.arc_ccw_cmd())
                } else {
                    (GcodeKind::ArcCW, self.arc_cw_cmd())
                };

                let params = format!(
                    "X{:.3} Y{:.3} I{:.3} J{:.3}",
                    next_x, next_y, i_val, j_val
                );
                let mut child = self.make_line(kind, command, &params, "");
                child.x = Some(round3(next_x));
                child.y = Some(round3(next_y));
                child.i = Some(round3(i_val));
                child.j = Some(round3(j_val));
                child.parent = Some(parent_number);
                parent.children.push(child);
            }
        }

        doc.push_line(parent);

        let end_vertex = if closed {
            vertices[0]
        } else {
            vertices[vertex_count - 1]
        };
        self.last_x = end_vertex.x + self.offset_x;
        self.last_y = end_vertex.y + self.offset_y;
        self.has_last_pos = true;
    }

    fn convert_circle(&mut self, doc: &mut Document, center: (f64, f64), radius: f64) {
        let start_x = center.0 + radius;
        let start_y = center.1;
        let i_val = -radius;
        let j_val = 0.0;

        self.move_to(doc, start_x, start_y);

        let final_x = start_x + self.offset_x;
        let final_y = start_y + self.offset_y;

        let params = format!(
            "X{:.3} Y{:.3} I{:.3} J{:.3}",
            final_x, final_y, i_val, j_val
        );
        let label = format!("Circle R{:.2}", radius);
        let mut line = self.make_line(GcodeKind::ArcCW, self.arc_cw_cmd(), &params, &label);
        line.x = Some(round3(final_x));
        line.y = Some(round3(final_y));
        line.i = Some(round3(i_val));
        line.j = Some(round3(j_val));
        doc.push_line(line);

        self.last_x = final_x;
        self.last_y = final_y;
        self.has_last_pos = true;
    }

    fn convert_arc(
        &mut self,
        doc: &mut Document,
        center: (f64, f64),
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    ) {
        let raw_start_x = center.0 + radius * start_angle.cos();
        let raw_start_y = center.1 + radius * start_angle.sin();
        let raw_end_x = center.0 + radius * end_angle.cos();
        let raw_end_y = center.1 + radius * end_angle.sin();

        // Relative to the arc start, unaffected by the origin offset.
        let i_val = center.0 - raw_start_x;
        let j_val = center.1 - raw_start_y;

        self.move_to(doc, raw_start_x, raw_start_y);

        let final_x = raw_end_x + self.offset_x;
        let final_y = raw_end_y + self.offset_y;

        let params = format!(
            "X{:.3} Y{:.3} I{:.3} J{:.3}",
            final_x, final_y, i_val, j_val
        );
        let label = format!("Arc R{:.2}", radius);
        let mut line = self.make_line(GcodeKind::ArcCCW, self.arc_ccw_cmd(), &params, &label);
        line.x = Some(round3(final_x));
        line.y = Some(round3(final_y));
        line.i = Some(round3(i_val));
        line.j = Some(round3(j_val));
        doc.push_line(line);

        self.last_x = final_x;
        self.last_y = final_y;
        self.has_last_pos = true;
    }

    fn next_line_number(&mut self) -> u32 {
        let n = self.line_number;
        self.line_number += 1;
        n
    }

    fn make_line(&mut self, kind: GcodeKind, command: &str, params: &str, label: &str) -> GcodeLine {
        let number = self.next_line_number();
        let prefix = if self.options.use_line_numbers {
            format!("N{} ", number)
        } else {
            String::new()
        };

        let mut line = GcodeLine::new(number);
        line.kind = kind;
        line.command = command.to_string();
        line.raw_text = format!("{}{} {}", prefix, command, params).trim().to_string();
        line.label = if label.is_empty() {
            kind.label().to_string()
        } else {
            label.to_string()
        };
        line
    }

    fn rapid_cmd(&self) -> &'static str {
        match self.options.style {
            CommandStyle::PmacNative => "RAPID",
            CommandStyle::GCode => {
                if self.options.use_compact_commands {
                    "G0"
                } else {
                    "G00"
                }
            }
        }
    }

    fn linear_cmd(&self) -> &'static str {
        match self.options.style {
            CommandStyle::PmacNative => "LINEAR",
            CommandStyle::GCode => {
                if self.options.use_compact_commands {
                    "G1"
                } else {
                    "G01"
                }
            }
        }
    }

    fn arc_cw_cmd(&self) -> &'static str {
        match self.options.style {
            CommandStyle::PmacNative => "ARC1",
            CommandStyle::GCode => {
                if self.options.use_compact_commands {
                    "G2"
                } else {
                    "G02"
                }
            }
        }
    }

    fn arc_ccw_cmd(&self) -> &'static str {
        match self.options.style {
            CommandStyle::PmacNative => "ARC2",
            CommandStyle::GCode => {
                if self.options.use_compact_commands {
                    "G3"
                } else {
                    "G03"
                }
            }
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Compute the constant (offset_x, offset_y) applied to every emitted X/Y.
fn compute_origin_offset(entities: &[CadEntity], origin: OriginMode) -> (f64, f64) {
    match origin {
        OriginMode::Original => (0.0, 0.0),
        OriginMode::FirstEntityStart => {
            let first = entities
                .iter()
                .enumerate()
                .min_by_key(|(i, e)| (e.type_priority(), *i))
                .map(|(_, e)| e);
            match first.and_then(CadEntity::start_point) {
                Some((x, y)) => (-x, -y),
                None => (0.0, 0.0),
            }
        }
        OriginMode::BoundingBoxCenter | OriginMode::BoundingBoxTopLeft => {
            let bounds = compute_bounds(entities);
            if !bounds.is_valid() {
                debug!("no bounds found for bounding-box origin");
                return (0.0, 0.0);
            }
            if origin == OriginMode::BoundingBoxCenter {
                let (cx, cy) = bounds.center();
                (-cx, -cy)
            } else {
                // Top-left (min_x, max_y) lands at (0,0).
                (-bounds.min_x, -bounds.max_y)
            }
        }
    }
}

/// Precise bounding box over all entities, including arc extrema.
fn compute_bounds(entities: &[CadEntity]) -> Bounds {
    let mut bounds = Bounds::new();

    for entity in entities {
        match entity {
            CadEntity::Line { start, end } => {
                bounds.update(start.0, start.1);
                bounds.update(end.0, end.1);
            }
            CadEntity::Polyline { vertices, closed } => {
                let Some(first) = vertices.first() else {
                    continue;
                };
                bounds.update(first.x, first.y);

                let vertex_count = vertices.len();
                let segment_count = if *closed {
                    vertex_count
                } else {
                    vertex_count.saturating_sub(1)
                };

                for i in 0..segment_count {
                    let cur = vertices[i];
                    let next = vertices[(i + 1) % vertex_count];
                    bounds.update(next.x, next.y);

                    if cur.bulge.abs() > GEOM_EPSILON {
                        // A bulge segment bounds like the arc it encodes.
                        if let Some(arc) =
                            arc_from_bulge(cur.x, cur.y, next.x, next.y, cur.bulge)
                        {
                            let start_angle =
                                (cur.y - arc.center_y).atan2(cur.x - arc.center_x);
                            let end_angle =
                                (next.y - arc.center_y).atan2(next.x - arc.center_x);
                            bounds.update_arc(
                                arc.center_x,
                                arc.center_y,
                                arc.radius,
                                start_angle,
                                end_angle,
                                arc.ccw,
                            );
                        }
                    }
                }
            }
            CadEntity::Circle { center, radius } => {
                bounds.update(center.0 - radius, center.1 - radius);
                bounds.update(center.0 + radius, center.1 + radius);
            }
            CadEntity::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                bounds.update_arc(center.0, center.1, *radius, *start_angle, *end_angle, true);
            }
        }
    }

    bounds
}
