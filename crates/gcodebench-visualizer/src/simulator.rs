//! Time-parameterized motion simulation.
//!
//! [`Simulator::load`] converts a document into a timeline of motion
//! segments, each with a cumulative start time and duration derived from
//! travel distance and feed rate. Playback is driven by an external clock
//! through [`Simulator::tick`]; [`Simulator::state`] interpolates the tool
//! position at the current elapsed time. The segment list is rebuilt
//! wholesale on every load, never patched.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use gcodebench_core::document::{Document, GcodeKind};
use gcodebench_core::geometry::{lerp, sweep_angle, Point3, GEOM_EPSILON};

/// Fallback cutting feed when no F word has been seen (mm/sec).
const DEFAULT_CUT_FEED: f64 = 10.0;

/// Default rapid traverse rate (mm/sec).
const DEFAULT_RAPID_FEED: f64 = 100.0;

const MIN_SPEED_MULTIPLIER: f64 = 0.1;

/// Playback lifecycle. Playing and Paused differ only in whether
/// [`Simulator::tick`] advances time; Stopped also resets elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// One simulated move: a span of the timeline with its geometry.
#[derive(Debug, Clone)]
pub struct MotionSegment {
    pub start: Point3,
    pub end: Point3,
    /// Flat index of the document line this segment executes.
    pub flat_index: usize,
    /// Cumulative start time in seconds.
    pub start_time: f64,
    /// Duration in seconds, always positive.
    pub duration: f64,

    pub is_arc: bool,
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub ccw: bool,
}

/// Snapshot of the simulation for a renderer or UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationState {
    pub is_playing: bool,
    /// Fraction of total duration in `[0, 1]`.
    pub progress: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Flat index of the line currently executing, if any motion exists.
    pub current_index: Option<usize>,
}

/// Replays a document as timed motion.
///
/// Single-threaded by design; the host calls [`tick`](Self::tick) at its
/// own cadence (e.g. once per rendered frame) with a wall-clock delta.
pub struct Simulator {
    segments: Vec<MotionSegment>,
    total_duration: f64,
    elapsed: f64,
    playback: PlaybackState,
    speed_multiplier: f64,
    /// Forward-scan hint for segment lookup; reset on load and seek.
    last_segment_index: usize,
    rapid_feed_rate: f64,
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            total_duration: 0.0,
            elapsed: 0.0,
            playback: PlaybackState::Stopped,
            speed_multiplier: 1.0,
            last_segment_index: 0,
            rapid_feed_rate: DEFAULT_RAPID_FEED,
        }
    }

    /// Rapid traverse rate used for Rapid-kind lines (mm/sec).
    pub fn rapid_feed_rate(&self) -> f64 {
        self.rapid_feed_rate
    }

    pub fn set_rapid_feed_rate(&mut self, rate: f64) {
        self.rapid_feed_rate = rate;
    }

    /// Rebuild the segment timeline from a document.
    ///
    /// Walks the flattened view with modal X/Y/Z and F carry-forward.
    /// Moves shorter than the geometric tolerance are dropped rather than
    /// simulated as zero-duration segments.
    pub fn load(&mut self, doc: &Document) {
        self.segments.clear();
        self.total_duration = 0.0;
        self.elapsed = 0.0;
        self.playback = PlaybackState::Stopped;
        self.last_segment_index = 0;

        let mut cur = Point3::default();
        let mut current_feed = DEFAULT_CUT_FEED;

        for (flat_index, line) in doc.flat_lines().iter().enumerate() {
            let next = Point3::new(
                line.x.unwrap_or(cur.x),
                line.y.unwrap_or(cur.y),
                line.z.unwrap_or(cur.z),
            );

            if let Some(f) = line.f {
                current_feed = f;
            }

            let is_arc = line.kind.is_arc();
            let ccw = line.kind == GcodeKind::ArcCCW;

            let mut center_x = 0.0;
            let mut center_y = 0.0;
            let mut radius = 0.0;
            let mut start_angle = 0.0;
            let mut end_angle = 0.0;
            let mut dist = 0.0;

            if is_arc {
                let i = line.i.unwrap_or(0.0);
                let j = line.j.unwrap_or(0.0);
                center_x = cur.x + i;
                center_y = cur.y + j;
                radius = (i * i + j * j).sqrt();

                if radius > GEOM_EPSILON {
                    start_angle = (cur.y - center_y).atan2(cur.x - center_x);
                    end_angle = (next.y - center_y).atan2(next.x - center_x);
                    let sweep = sweep_angle(start_angle, end_angle, ccw);
                    dist = sweep.abs() * radius;
                }
            } else {
                dist = cur.distance_to(&next);
            }

            if dist > GEOM_EPSILON {
                let mut feed = if line.kind == GcodeKind::Rapid {
                    self.rapid_feed_rate
                } else {
                    current_feed
                };
                if feed <= 0.0 {
                    feed = DEFAULT_CUT_FEED;
                }

                let duration = dist / feed;
                self.segments.push(MotionSegment {
                    start: cur,
                    end: next,
                    flat_index,
                    start_time: self.total_duration,
                    duration,
                    is_arc,
                    center_x,
                    center_y,
                    radius,
                    start_angle,
                    end_angle,
                    ccw,
                });
                self.total_duration += duration;
            }

            cur = next;
        }

        debug!(
            segments = self.segments.len(),
            total_seconds = self.total_duration,
            "built motion timeline"
        );
    }

    pub fn play(&mut self) {
        self.playback = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        self.playback = PlaybackState::Paused;
    }

    pub fn stop(&mut self) {
        self.playback = PlaybackState::Stopped;
        self.elapsed = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackState::Playing
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    /// Jump to a fraction of the total duration. Out-of-range values are
    /// clamped, never rejected.
    pub fn seek(&mut self, progress: f64) {
        self.elapsed = self.total_duration * progress.clamp(0.0, 1.0);
        self.last_segment_index = 0;
    }

    /// Playback speed multiplier, clamped to a minimum of 0.1.
    pub fn set_speed(&mut self, multiplier: f64) {
        self.speed_multiplier = multiplier.max(MIN_SPEED_MULTIPLIER);
    }

    /// Advance simulated time by a wall-clock delta. No-op unless Playing;
    /// auto-pauses on reaching the end of the timeline.
    pub fn tick(&mut self, real_delta: Duration) {
        if self.playback != PlaybackState::Playing {
            return;
        }

        self.elapsed += real_delta.as_secs_f64() * self.speed_multiplier;

        if self.elapsed >= self.total_duration {
            self.elapsed = self.total_duration;
            self.playback = PlaybackState::Paused;
        }
    }

    pub fn progress(&self) -> f64 {
        if self.total_duration > 0.0 {
            self.elapsed / self.total_duration
        } else {
            0.0
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_duration
    }

    pub fn segments(&self) -> &[MotionSegment] {
        &self.segments
    }

    /// Interpolated state at the current elapsed time.
    ///
    /// Takes `&mut self` to maintain the forward-scan hint; time usually
    /// moves forward, so locating the current segment is amortized O(1).
    pub fn state(&mut self) -> SimulationState {
        let mut state = SimulationState {
            is_playing: self.is_playing(),
            progress: self.progress(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            current_index: None,
        };

        let elapsed = self.elapsed;
        let Some(segment) = self.locate_segment() else {
            return state;
        };

        state.current_index = Some(segment.flat_index);

        let local = if segment.duration > 0.0 {
            ((elapsed - segment.start_time) / segment.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        state.z = lerp(segment.start.z, segment.end.z, local);

        if segment.is_arc && segment.radius > GEOM_EPSILON {
            let sweep = sweep_angle(segment.start_angle, segment.end_angle, segment.ccw);
            let angle = segment.start_angle + sweep * local;
            state.x = segment.center_x + segment.radius * angle.cos();
            state.y = segment.center_y + segment.radius * angle.sin();
        } else {
            state.x = lerp(segment.start.x, segment.end.x, local);
            state.y = lerp(segment.start.y, segment.end.y, local);
        }

        state
    }

    fn locate_segment(&mut self) -> Option<&MotionSegment> {
        let count = self.segments.len();
        if count == 0 {
            return None;
        }

        if self.last_segment_index >= count {
            self.last_segment_index = count - 1;
        }

        // Rewind when elapsed time fell behind the hint's segment.
        if self.last_segment_index > 0
            && self.segments[self.last_segment_index].start_time > self.elapsed
        {
            self.last_segment_index = 0;
        }

        let mut found = None;
        for i in self.last_segment_index..count {
            let s = &self.segments[i];
            if s.start_time <= self.elapsed && s.start_time + s.duration >= self.elapsed {
                found = Some(i);
                self.last_segment_index = i;
                break;
            }
            // Segments are ordered; past the elapsed time nothing matches.
            if s.start_time > self.elapsed {
                break;
            }
        }

        let index = match found {
            Some(i) => i,
            None if self.elapsed >= self.total_duration => count - 1,
            None if self.elapsed <= 0.0 => 0,
            None => return None,
        };

        Some(&self.segments[index])
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodebench_core::GcodeParser;
    use std::f64::consts::PI;

    fn load(text: &str) -> Simulator {
        let doc = GcodeParser::new().parse(text);
        let mut sim = Simulator::new();
        sim.load(&doc);
        sim
    }

    #[test]
    fn test_rapid_duration() {
        // 10 mm at the default rapid rate of 100 mm/sec.
        let sim = load("G0 X10 Y0");
        assert_eq!(sim.segments().len(), 1);
        assert!((sim.segments()[0].duration - 0.1).abs() < 1e-12);
        assert!((sim.total_seconds() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_modal_feed_carry_forward() {
        let sim = load("G1 X10 F5\nG1 X20");
        // Both cuts run at F5: 10 mm each, 2 seconds each.
        assert_eq!(sim.segments().len(), 2);
        assert!((sim.segments()[0].duration - 2.0).abs() < 1e-12);
        assert!((sim.segments()[1].duration - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_cut_feed_fallback() {
        // No F anywhere: 10 mm at 10 mm/sec.
        let sim = load("G1 X10");
        assert!((sim.segments()[0].duration - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_length_moves_dropped() {
        let sim = load("G0 X0 Y0\nG21\nM03\nG0 X5");
        assert_eq!(sim.segments().len(), 1);
        assert_eq!(sim.segments()[0].end, Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_arc_length_full_circle() {
        // Full circle of radius 5 starting and ending at (5,0).
        let sim = load("G0 X5 Y0\nG3 X5 Y0 I-5 J0 F10");
        let arc = &sim.segments()[1];
        assert!(arc.is_arc);
        assert!((arc.radius - 5.0).abs() < 1e-12);
        assert!((arc.duration - 2.0 * PI * 5.0 / 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cumulative_start_times() {
        let sim = load("G0 X10\nG1 X20 F10");
        assert_eq!(sim.segments()[0].start_time, 0.0);
        assert!((sim.segments()[1].start_time - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_seek_sets_half_elapsed() {
        let mut sim = load("G1 X10 F10");
        sim.seek(0.5);
        assert!((sim.elapsed_seconds() - 0.5).abs() < 1e-12);

        // Out-of-range input clamps.
        sim.seek(7.0);
        assert!((sim.elapsed_seconds() - 1.0).abs() < 1e-12);
        sim.seek(-1.0);
        assert_eq!(sim.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_seek_and_tick_agree() {
        let text = "G0 X10\nG1 X10 Y10 F10\nG1 X0 Y10";
        let mut seeked = load(text);
        seeked.seek(0.5);
        let seek_state = seeked.state();

        let mut ticked = load(text);
        ticked.play();
        let target = seeked.elapsed_seconds();
        // Accumulate the same elapsed time in uneven ticks.
        let mut remaining = target;
        while remaining > 1e-9 {
            let step = remaining.min(0.013);
            ticked.tick(Duration::from_secs_f64(step));
            remaining -= step;
        }
        let tick_state = ticked.state();

        assert!((seek_state.x - tick_state.x).abs() < 1e-6);
        assert!((seek_state.y - tick_state.y).abs() < 1e-6);
        assert!((seek_state.z - tick_state.z).abs() < 1e-6);
        assert_eq!(seek_state.current_index, tick_state.current_index);
    }

    #[test]
    fn test_arc_interpolation_midpoint() {
        // CCW semicircle from (5,0) to (-5,0) around the origin: halfway
        // through the tool sits at the top of the circle.
        let mut sim = load("G0 X5 Y0\nG3 X-5 Y0 I-5 J0 F10");
        let arc_start = sim.segments()[1].start_time;
        let arc_half = arc_start + sim.segments()[1].duration / 2.0;
        sim.seek(arc_half / sim.total_seconds());

        let state = sim.state();
        assert!(state.x.abs() < 1e-6);
        assert!((state.y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_tick_requires_playing() {
        let mut sim = load("G1 X10 F10");
        sim.tick(Duration::from_millis(500));
        assert_eq!(sim.elapsed_seconds(), 0.0);

        sim.play();
        sim.tick(Duration::from_millis(500));
        assert!((sim.elapsed_seconds() - 0.5).abs() < 1e-12);

        sim.pause();
        sim.tick(Duration::from_millis(500));
        assert!((sim.elapsed_seconds() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tick_auto_pauses_at_end() {
        let mut sim = load("G1 X10 F10");
        sim.play();
        sim.tick(Duration::from_secs(5));
        assert_eq!(sim.playback(), PlaybackState::Paused);
        assert!((sim.elapsed_seconds() - sim.total_seconds()).abs() < 1e-12);
        assert!((sim.progress() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_speed_multiplier_clamped() {
        let mut sim = load("G1 X10 F10");
        sim.set_speed(0.01);
        sim.play();
        sim.tick(Duration::from_secs(1));
        // Effective speed is the 0.1 floor.
        assert!((sim.elapsed_seconds() - 0.1).abs() < 1e-12);

        sim.set_speed(2.0);
        sim.tick(Duration::from_millis(100));
        assert!((sim.elapsed_seconds() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_stop_resets_elapsed() {
        let mut sim = load("G1 X10 F10");
        sim.play();
        sim.tick(Duration::from_millis(300));
        sim.stop();
        assert_eq!(sim.playback(), PlaybackState::Stopped);
        assert_eq!(sim.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_backward_seek_after_forward_scan() {
        let mut sim = load("G1 X10 F10\nG1 X20\nG1 X30");
        sim.seek(0.9);
        let late = sim.state();
        sim.seek(0.1);
        let early = sim.state();

        assert!(late.x > early.x);
        assert_eq!(early.current_index, Some(0));
    }

    #[test]
    fn test_empty_document_state() {
        let mut sim = load("");
        let state = sim.state();
        assert_eq!(state.current_index, None);
        assert_eq!(state.progress, 0.0);
        assert_eq!((state.x, state.y, state.z), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_state_at_boundaries() {
        let mut sim = load("G0 X10\nG1 X20 F10");
        sim.seek(0.0);
        assert_eq!(sim.state().current_index, Some(0));
        sim.seek(1.0);
        let state = sim.state();
        assert_eq!(state.current_index, Some(1));
        assert!((state.x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_configurable_rapid_feed() {
        let doc = GcodeParser::new().parse("G0 X10");
        let mut sim = Simulator::new();
        sim.set_rapid_feed_rate(50.0);
        sim.load(&doc);
        assert!((sim.segments()[0].duration - 0.2).abs() < 1e-12);
    }
}
