//! Tolerant G-code text parser.
//!
//! Parsing never fails: unrecognized content degrades to
//! [`GcodeKind::Unknown`] with whatever fields could be extracted, and
//! blank lines are skipped rather than emitted.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, trace};

use crate::document::{Document, GcodeKind, GcodeLine};

/// Matches G/M commands or textual motion aliases (RAPID, LINEAR, ARC1/2).
fn command_regex() -> &'static Regex {
    static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r"(?i)([GM]\d+|RAPID|LINEAR|ARC[12]|OPEN|CLOSE)").expect("invalid regex pattern")
    })
}

/// Matches axis parameters: a letter, an optional `=`, a signed decimal.
fn param_regex() -> &'static Regex {
    static PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
    PARAM_REGEX.get_or_init(|| {
        Regex::new(r"(?i)([XYZIJKRFSTP])\s*=?\s*(-?\d+\.?\d*)").expect("invalid regex pattern")
    })
}

/// Matches an end-of-line comment: `;` or `(` to the end of the line.
fn comment_regex() -> &'static Regex {
    static COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    COMMENT_REGEX.get_or_init(|| Regex::new(r"[;(].*").expect("invalid regex pattern"))
}

/// G-code text parser.
#[derive(Debug, Default)]
pub struct GcodeParser;

impl GcodeParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw G-code text into a document, one line per non-blank
    /// physical line.
    pub fn parse(&self, text: &str) -> Document {
        let mut doc = Document::new();

        let mut line_number = 1;
        for raw in text.lines() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let line = self.parse_line(raw, line_number);
            line_number += 1;
            doc.push_line(line);
        }

        assign_labels(&mut doc);
        debug!(lines = doc.lines().len(), "parsed g-code text");
        doc
    }

    /// Parse a single physical line.
    fn parse_line(&self, raw_text: &str, line_number: u32) -> GcodeLine {
        let mut line = GcodeLine::new(line_number);
        line.raw_text = raw_text.to_string();

        // Strip the comment for token scanning.
        let code_text = comment_regex().replace(raw_text, "").trim().to_string();

        // Comment-only line: keep the comment text as the label.
        if code_text.is_empty() && (raw_text.contains(';') || raw_text.contains('(')) {
            line.kind = GcodeKind::Comment;
            line.command = ";".to_string();
            line.label = raw_text
                .trim_start_matches([';', '(', ' '])
                .trim_end_matches([')', ' '])
                .to_string();
            return line;
        }

        // Only the first command token counts; a malformed line carrying
        // two command tokens keeps the first.
        if let Some(m) = command_regex().find(&code_text) {
            line.command = m.as_str().to_uppercase();
            line.kind = classify(&line.command);
        }

        // Parameter scan is independent of the command scan; the last
        // occurrence of a repeated letter wins.
        for caps in param_regex().captures_iter(&code_text) {
            let letter = caps[1].to_uppercase();
            let Ok(value) = caps[2].parse::<f64>() else {
                continue;
            };
            match letter.as_str() {
                "X" => line.x = Some(value),
                "Y" => line.y = Some(value),
                "Z" => line.z = Some(value),
                "I" => line.i = Some(value),
                "J" => line.j = Some(value),
                "K" => line.k = Some(value),
                "R" => line.r = Some(value),
                "F" => line.f = Some(value),
                "S" => line.s = Some(value),
                // T and P are tokenized but carry no document field.
                _ => {}
            }
        }

        // Bare feed/speed lines ("F10.0", "S1000") act as setup commands.
        if line.command.is_empty() && (line.f.is_some() || line.s.is_some()) {
            line.command = code_text;
            line.kind = GcodeKind::Setup;
        }

        if line.kind == GcodeKind::Unknown {
            trace!(text = raw_text, "unclassified g-code line");
        }

        line
    }
}

/// Fixed command-to-kind lookup.
fn classify(command: &str) -> GcodeKind {
    match command {
        "G00" | "G0" | "RAPID" => GcodeKind::Rapid,
        "G01" | "G1" | "LINEAR" => GcodeKind::Linear,
        "G02" | "G2" | "ARC1" => GcodeKind::ArcCW,
        "G03" | "G3" | "ARC2" => GcodeKind::ArcCCW,
        "G04" | "G4" => GcodeKind::Dwell,
        "G20" | "G21" | "G90" | "G91" | "G17" | "G18" | "G19" => GcodeKind::Setup,
        "M03" | "M3" | "M04" | "M4" | "M05" | "M5" => GcodeKind::Spindle,
        "M06" | "M6" => GcodeKind::ToolChange,
        "M07" | "M7" | "M08" | "M8" | "M09" | "M9" => GcodeKind::Coolant,
        "M00" | "M0" | "M01" | "M1" | "M02" | "M2" | "M30" => GcodeKind::Program,
        _ => GcodeKind::Unknown,
    }
}

/// Assign a display tag and human-readable label per classified kind.
///
/// Pure and idempotent: tags are replaced, not appended, and comment
/// labels set during parsing are preserved.
pub fn assign_labels(doc: &mut Document) {
    for line in doc.lines_mut() {
        line.tags = vec![line.kind.label().to_string()];

        let label = match line.kind {
            GcodeKind::Setup => setup_label(&line.command),
            GcodeKind::Rapid => "Rapid Move",
            GcodeKind::Linear => "Linear Cut",
            GcodeKind::ArcCW => "Arc CW",
            GcodeKind::ArcCCW => "Arc CCW",
            GcodeKind::Spindle => spindle_label(&line.command),
            GcodeKind::Coolant => "Coolant",
            GcodeKind::ToolChange => "Tool Change",
            GcodeKind::Program => program_label(&line.command),
            // Comment text and polyline labels are authoritative already.
            GcodeKind::Comment | GcodeKind::Polyline | GcodeKind::Dwell | GcodeKind::Unknown => {
                continue;
            }
        };
        line.label = label.to_string();
    }
}

fn setup_label(command: &str) -> &'static str {
    match command {
        "G20" => "Inch Units",
        "G21" => "Metric Units",
        "G90" => "Absolute Mode",
        "G91" => "Relative Mode",
        "G17" => "XY Plane",
        "G18" => "XZ Plane",
        "G19" => "YZ Plane",
        _ => "Setup",
    }
}

fn spindle_label(command: &str) -> &'static str {
    match command {
        "M03" | "M3" => "Spindle CW",
        "M04" | "M4" => "Spindle CCW",
        "M05" | "M5" => "Spindle Stop",
        _ => "Spindle",
    }
}

fn program_label(command: &str) -> &'static str {
    match command {
        "M00" | "M0" => "Program Stop",
        "M01" | "M1" => "Optional Stop",
        "M02" | "M2" | "M30" => "Program End",
        _ => "Program",
    }
}
