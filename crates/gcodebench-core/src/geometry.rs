//! Shared arc and vector math for toolpath geometry.
//!
//! The parser, DXF converter, simulator and path projector all lean on the
//! same handful of constructions: winding-normalized sweep angles, the
//! bulge-to-circle conversion, and bounding boxes that account for arc
//! extrema. They live here so the three crates agree on the numbers.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Tolerance below which chords, radii and sagittas are degenerate.
pub const GEOM_EPSILON: f64 = 1e-4;

/// Tolerance for comparing tool positions (mm).
pub const POS_EPSILON: f64 = 1e-3;

/// A point in machine space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for Point3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z)
    }
}

/// Linear interpolation between two scalars.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Signed sweep from `start_angle` to `end_angle` honoring the winding
/// direction: the result is positive for CCW arcs and negative for CW arcs,
/// produced by shifting the raw difference in whole turns until the sign
/// matches.
pub fn sweep_angle(start_angle: f64, end_angle: f64, ccw: bool) -> f64 {
    let mut diff = end_angle - start_angle;
    if ccw {
        while diff <= 0.0 {
            diff += 2.0 * PI;
        }
    } else {
        while diff >= 0.0 {
            diff -= 2.0 * PI;
        }
    }
    diff
}

/// Normalize an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a < 0.0 {
        a += 2.0 * PI;
    }
    a
}

/// Circle recovered from a polyline bulge segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulgeArc {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// Positive bulge sweeps counter-clockwise.
    pub ccw: bool,
}

/// Convert a bulge segment from `(sx, sy)` to `(ex, ey)` into its circle.
///
/// The bulge is the tangent of a quarter of the included angle; its
/// magnitude fixes the sagitta as `|b|·chord/2` and its sign picks the side
/// of the chord the center lies on. Returns `None` when the chord or the
/// sagitta is below [`GEOM_EPSILON`] — callers treat that as "no arc".
pub fn arc_from_bulge(sx: f64, sy: f64, ex: f64, ey: f64, bulge: f64) -> Option<BulgeArc> {
    let chord_x = ex - sx;
    let chord_y = ey - sy;
    let chord_len = (chord_x * chord_x + chord_y * chord_y).sqrt();
    if chord_len < GEOM_EPSILON {
        return None;
    }

    let sagitta = bulge.abs() * chord_len / 2.0;
    if sagitta < GEOM_EPSILON {
        return None;
    }

    let half_chord = chord_len / 2.0;
    let radius = (half_chord * half_chord + sagitta * sagitta) / (2.0 * sagitta);
    let dist_to_center = radius - sagitta;

    let mid_x = (sx + ex) / 2.0;
    let mid_y = (sy + ey) / 2.0;

    // Unit normal, left of the chord direction.
    let norm_x = -chord_y / chord_len;
    let norm_y = chord_x / chord_len;

    let sign = if bulge > 0.0 { 1.0 } else { -1.0 };

    Some(BulgeArc {
        center_x: mid_x + sign * dist_to_center * norm_x,
        center_y: mid_y + sign * dist_to_center * norm_y,
        radius,
        ccw: bulge > 0.0,
    })
}

/// Running 2D min/max accumulator with arc-aware expansion.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    valid: bool,
}

impl Bounds {
    pub fn new() -> Self {
        Self {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
            valid: false,
        }
    }

    /// True once at least one point has been accumulated.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn update(&mut self, x: f64, y: f64) {
        if x < self.min_x {
            self.min_x = x;
        }
        if x > self.max_x {
            self.max_x = x;
        }
        if y < self.min_y {
            self.min_y = y;
        }
        if y > self.max_y {
            self.max_y = y;
        }
        self.valid = true;
    }

    /// Expand over a circular arc: both endpoints plus every cardinal angle
    /// (0°, 90°, 180°, 270°) the sweep passes through per its winding.
    pub fn update_arc(
        &mut self,
        cx: f64,
        cy: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        ccw: bool,
    ) {
        self.update(cx + radius * start_angle.cos(), cy + radius * start_angle.sin());
        self.update(cx + radius * end_angle.cos(), cy + radius * end_angle.sin());

        let start = normalize_angle(start_angle);
        let end = normalize_angle(end_angle);

        let cardinals = [0.0, PI / 2.0, PI, 3.0 * PI / 2.0];
        for card in cardinals {
            let included = if ccw {
                if start < end {
                    card >= start && card <= end
                } else {
                    // Sweep wraps through 0.
                    card >= start || card <= end
                }
            } else if start > end {
                card <= start && card >= end
            } else {
                card <= start || card >= end
            };

            if included {
                self.update(cx + radius * card.cos(), cy + radius * card.sin());
            }
        }
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_angle_ccw_is_positive() {
        let sweep = sweep_angle(0.0, PI / 2.0, true);
        assert!((sweep - PI / 2.0).abs() < 1e-9);

        // Same endpoints traversed CW go the long way round, negatively.
        let sweep = sweep_angle(0.0, PI / 2.0, false);
        assert!((sweep + 3.0 * PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_angle_full_circle() {
        // Coincident start/end must sweep a whole turn, not zero.
        let sweep = sweep_angle(PI, PI, true);
        assert!((sweep - 2.0 * PI).abs() < 1e-9);
        let sweep = sweep_angle(PI, PI, false);
        assert!((sweep + 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_bulge_semicircle() {
        // Bulge 1.0 over a chord of 10 is an exact semicircle: radius 5,
        // center at the chord midpoint.
        let arc = arc_from_bulge(0.0, 0.0, 10.0, 0.0, 1.0).unwrap();
        assert!((arc.radius - 5.0).abs() < 1e-9);
        assert!((arc.center_x - 5.0).abs() < 1e-9);
        assert!(arc.center_y.abs() < 1e-9);
        assert!(arc.ccw);
    }

    #[test]
    fn test_bulge_sign_picks_side() {
        let ccw = arc_from_bulge(0.0, 0.0, 10.0, 0.0, 0.5).unwrap();
        let cw = arc_from_bulge(0.0, 0.0, 10.0, 0.0, -0.5).unwrap();
        assert!(ccw.ccw);
        assert!(!cw.ccw);
        assert!((ccw.radius - cw.radius).abs() < 1e-9);
        // Mirror images across the chord.
        assert!((ccw.center_y + cw.center_y).abs() < 1e-9);
    }

    #[test]
    fn test_bulge_degenerate_chord_skipped() {
        assert!(arc_from_bulge(1.0, 1.0, 1.0, 1.0, 1.0).is_none());
        assert!(arc_from_bulge(0.0, 0.0, 10.0, 0.0, 0.0).is_none());
        assert!(arc_from_bulge(0.0, 0.0, 10.0, 0.0, 1e-6).is_none());
    }

    #[test]
    fn test_bounds_update_arc_cardinals() {
        // Upper semicircle, CCW from 0 to π around the origin: the top of
        // the circle (90°) must be included, the bottom must not.
        let mut b = Bounds::new();
        b.update_arc(0.0, 0.0, 5.0, 0.0, PI, true);
        assert!((b.max_y - 5.0).abs() < 1e-9);
        assert!(b.min_y.abs() < 1e-9);
        assert!((b.min_x + 5.0).abs() < 1e-9);
        assert!((b.max_x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_arc_wrapping_zero() {
        // CCW from 270° to 90° passes through 0°: max_x is on the circle.
        let mut b = Bounds::new();
        b.update_arc(0.0, 0.0, 2.0, 3.0 * PI / 2.0, PI / 2.0, true);
        assert!((b.max_x - 2.0).abs() < 1e-9);
        // 180° is not on the sweep, so min_x stays at the endpoints.
        assert!(b.min_x > -1e-9);
    }

    #[test]
    fn test_point_distance() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
