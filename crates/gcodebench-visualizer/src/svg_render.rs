//! Projection of a document into 2D vector path strings.
//!
//! Two views of the same walk: [`generate_paths`] produces one combined
//! path per pen (rapid and feed) for bulk rendering, and
//! [`clickable_paths`] produces one self-contained fragment per flattened
//! line for hit-testing. Both track a running cursor with modal X/Y
//! carry-forward and share the arc flag rules: sweep flag 1 for CCW,
//! large-arc flag 1 when the normalized sweep exceeds half a turn, and a
//! full circle split into two half-arcs through the antipodal point.

use serde::Serialize;

use gcodebench_core::document::{Document, GcodeKind};
use gcodebench_core::geometry::{sweep_angle, POS_EPSILON};

/// One clickable path fragment, tagged for selection synchronization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSegment {
    pub path: String,
    /// Index into the document's flattened view.
    pub flat_index: usize,
    pub is_rapid: bool,
}

/// Render the document as two path strings: `(rapid, feed)`.
///
/// Rapid moves are independent moveto+lineto pairs. Feed moves share a
/// tracked pen: a moveto is emitted only when the pen is not already at
/// the segment start, and any rapid breaks the pen.
pub fn generate_paths(doc: &Document) -> (String, String) {
    let mut rapid = String::new();
    let mut feed = String::new();

    let mut cur_x = 0.0;
    let mut cur_y = 0.0;

    // Pen position of the feed path; None after a rapid or at the start.
    let mut feed_pen: Option<(f64, f64)> = None;

    for line in doc.flat_lines() {
        let next_x = line.x.unwrap_or(cur_x);
        let next_y = line.y.unwrap_or(cur_y);

        let moved =
            (next_x - cur_x).abs() > POS_EPSILON || (next_y - cur_y).abs() > POS_EPSILON;

        match line.kind {
            GcodeKind::Rapid => {
                if moved {
                    rapid.push_str(&format!(
                        "M{:.3},{:.3}L{:.3},{:.3} ",
                        cur_x, cur_y, next_x, next_y
                    ));
                }
                feed_pen = None;
            }
            GcodeKind::Linear | GcodeKind::Polyline => {
                if moved {
                    emit_feed_moveto(&mut feed, feed_pen, cur_x, cur_y);
                    feed.push_str(&format!("L{:.3},{:.3} ", next_x, next_y));
                    feed_pen = Some((next_x, next_y));
                }
            }
            GcodeKind::ArcCW | GcodeKind::ArcCCW => {
                let i = line.i.unwrap_or(0.0);
                let j = line.j.unwrap_or(0.0);
                let radius = (i * i + j * j).sqrt();
                let full_circle = is_full_circle(cur_x, cur_y, next_x, next_y, radius);

                if moved || full_circle {
                    emit_feed_moveto(&mut feed, feed_pen, cur_x, cur_y);
                    feed.push_str(&arc_commands(
                        cur_x,
                        cur_y,
                        next_x,
                        next_y,
                        i,
                        j,
                        line.kind == GcodeKind::ArcCCW,
                    ));
                    feed_pen = Some((next_x, next_y));
                }
            }
            _ => {}
        }

        cur_x = next_x;
        cur_y = next_y;
    }

    (rapid, feed)
}

/// Render one self-contained fragment per flattened line.
///
/// Each fragment carries its own moveto; lines producing no movement are
/// omitted. The flat index ties a clicked fragment back to its line.
pub fn clickable_paths(doc: &Document) -> Vec<PathSegment> {
    let mut result = Vec::new();

    let mut cur_x = 0.0;
    let mut cur_y = 0.0;

    for (flat_index, line) in doc.flat_lines().iter().enumerate() {
        let next_x = line.x.unwrap_or(cur_x);
        let next_y = line.y.unwrap_or(cur_y);

        let moved =
            (next_x - cur_x).abs() > POS_EPSILON || (next_y - cur_y).abs() > POS_EPSILON;

        let mut path = String::new();
        let mut is_rapid = false;

        match line.kind {
            GcodeKind::Rapid => {
                if moved {
                    path = format!("M{:.3},{:.3}L{:.3},{:.3}", cur_x, cur_y, next_x, next_y);
                    is_rapid = true;
                }
            }
            GcodeKind::Linear => {
                if moved {
                    path = format!("M{:.3},{:.3}L{:.3},{:.3}", cur_x, cur_y, next_x, next_y);
                }
            }
            GcodeKind::ArcCW | GcodeKind::ArcCCW => {
                let i = line.i.unwrap_or(0.0);
                let j = line.j.unwrap_or(0.0);
                let radius = (i * i + j * j).sqrt();
                let full_circle = is_full_circle(cur_x, cur_y, next_x, next_y, radius);

                if moved || full_circle {
                    let body = arc_commands(
                        cur_x,
                        cur_y,
                        next_x,
                        next_y,
                        i,
                        j,
                        line.kind == GcodeKind::ArcCCW,
                    );
                    path = format!("M{:.3},{:.3}{}", cur_x, cur_y, body.trim_end());
                }
            }
            _ => {}
        }

        if !path.is_empty() {
            result.push(PathSegment {
                path,
                flat_index,
                is_rapid,
            });
        }

        cur_x = next_x;
        cur_y = next_y;
    }

    result
}

fn emit_feed_moveto(feed: &mut String, pen: Option<(f64, f64)>, x: f64, y: f64) {
    let at_pen = match pen {
        Some((px, py)) => (x - px).abs() <= POS_EPSILON && (y - py).abs() <= POS_EPSILON,
        None => false,
    };
    if !at_pen {
        feed.push_str(&format!("M{:.3},{:.3} ", x, y));
    }
}

fn is_full_circle(cur_x: f64, cur_y: f64, next_x: f64, next_y: f64, radius: f64) -> bool {
    (cur_x - next_x).abs() < POS_EPSILON
        && (cur_y - next_y).abs() < POS_EPSILON
        && radius > POS_EPSILON
}

/// Arc drawing commands from the current point, trailing space included.
///
/// A full circle cannot be expressed as a single arc command (the
/// endpoints coincide), so it is drawn as two half-circles through the
/// point diametrically opposite the start.
fn arc_commands(
    cur_x: f64,
    cur_y: f64,
    next_x: f64,
    next_y: f64,
    i: f64,
    j: f64,
    ccw: bool,
) -> String {
    let radius = (i * i + j * j).sqrt();
    if radius < POS_EPSILON {
        return format!("L{:.3},{:.3} ", next_x, next_y);
    }

    let sweep_flag = if ccw { 1 } else { 0 };
    let cx = cur_x + i;
    let cy = cur_y + j;

    if is_full_circle(cur_x, cur_y, next_x, next_y, radius) {
        let mid_x = cx - (cur_x - cx);
        let mid_y = cy - (cur_y - cy);
        return format!(
            "A{r:.3},{r:.3} 0 1 {s} {:.3},{:.3} A{r:.3},{r:.3} 0 1 {s} {:.3},{:.3} ",
            mid_x,
            mid_y,
            next_x,
            next_y,
            r = radius,
            s = sweep_flag,
        );
    }

    let start_angle = (cur_y - cy).atan2(cur_x - cx);
    let end_angle = (next_y - cy).atan2(next_x - cx);
    let sweep = sweep_angle(start_angle, end_angle, ccw);
    let large_arc_flag = if sweep.abs() > std::f64::consts::PI { 1 } else { 0 };

    format!(
        "A{r:.3},{r:.3} 0 {} {} {:.3},{:.3} ",
        large_arc_flag,
        sweep_flag,
        next_x,
        next_y,
        r = radius,
    )
}
