//! Parse, simulate and project a small program end to end.

use std::time::Duration;

use gcodebench_core::GcodeParser;
use gcodebench_visualizer::{clickable_paths, generate_paths, Simulator};

const PROGRAM: &str = "\
G21
G90
F10
G0 X0 Y0
G1 X40 Y0
G1 X40 Y30
G3 X30 Y40 I-10 J0
G1 X0 Y40
G1 X0 Y0
M30";

#[test]
fn test_program_timeline_and_paths_agree() {
    let doc = GcodeParser::new().parse(PROGRAM);

    let mut sim = Simulator::new();
    sim.load(&doc);

    // Perimeter: 40 + 30 + quarter arc of radius 10 + 30 + 40, all at F10.
    let quarter = std::f64::consts::PI * 10.0 / 2.0;
    let expected = (40.0 + 30.0 + quarter + 30.0 + 40.0) / 10.0;
    assert!((sim.total_seconds() - expected).abs() < 1e-9);

    // Every simulated segment maps to a clickable fragment at the same
    // flat index.
    let fragments = clickable_paths(&doc);
    for segment in sim.segments() {
        assert!(
            fragments.iter().any(|f| f.flat_index == segment.flat_index),
            "no fragment for flat index {}",
            segment.flat_index
        );
    }

    let (rapid, feed) = generate_paths(&doc);
    // The initial rapid targets the origin where the tool already sits.
    assert_eq!(rapid, "");
    assert_eq!(feed.matches('A').count(), 1);
    assert!(feed.ends_with("L0.000,0.000 "));
}

#[test]
fn test_playback_runs_to_completion() {
    let doc = GcodeParser::new().parse(PROGRAM);
    let mut sim = Simulator::new();
    sim.load(&doc);
    sim.play();

    let mut ticks = 0;
    while sim.is_playing() && ticks < 100_000 {
        sim.tick(Duration::from_millis(16));
        ticks += 1;
    }

    let state = sim.state();
    assert!(!state.is_playing);
    assert!((state.progress - 1.0).abs() < 1e-12);
    // The program ends back at the origin.
    assert!(state.x.abs() < 1e-6);
    assert!(state.y.abs() < 1e-6);
}
