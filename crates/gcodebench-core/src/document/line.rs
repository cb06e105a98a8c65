//! The G-code line entity and its command classification.

use serde::{Deserialize, Deserializer, Serialize};

/// Classification of a single G-code line.
///
/// Closed set: every consumer (simulator distance formula, projector arc
/// rendering, UI coloring) matches exhaustively on it. Deserialization maps
/// unrecognized names to [`GcodeKind::Unknown`] so project files written by
/// newer versions still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GcodeKind {
    #[default]
    Unknown,
    /// Setup commands (G20/G21/G90/G91/G17/G18/G19, bare F/S lines)
    Setup,
    /// Rapid positioning (G00)
    Rapid,
    /// Linear interpolation (G01)
    Linear,
    /// Clockwise arc (G02)
    ArcCW,
    /// Counter-clockwise arc (G03)
    ArcCCW,
    /// Dwell (G04)
    Dwell,
    /// Spindle control (M03/M04/M05)
    Spindle,
    /// Coolant control (M07/M08/M09)
    Coolant,
    /// Tool change (M06)
    ToolChange,
    /// Program control (M00/M01/M02/M30)
    Program,
    /// Comment-only line
    Comment,
    /// Collapsed polyline container (DXF import)
    Polyline,
}

impl GcodeKind {
    /// Short tag used in the line list UI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Setup => "Setup",
            Self::Rapid => "Rapid",
            Self::Linear => "Linear",
            Self::ArcCW => "Arc CW",
            Self::ArcCCW => "Arc CCW",
            Self::Dwell => "Dwell",
            Self::Spindle => "Spindle",
            Self::Coolant => "Coolant",
            Self::ToolChange => "Tool",
            Self::Program => "Program",
            Self::Comment => "Comment",
            Self::Polyline => "Poly",
            Self::Unknown => "Unknown",
        }
    }

    /// Theme color name for the line list UI.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Setup => "slate",
            Self::Rapid => "yellow",
            Self::Linear => "green",
            Self::ArcCW | Self::ArcCCW => "cyan",
            Self::Spindle => "primary",
            Self::Coolant => "blue",
            Self::ToolChange => "orange",
            Self::Program | Self::Polyline => "purple",
            Self::Comment => "gray",
            Self::Dwell | Self::Unknown => "slate",
        }
    }

    /// True for the two circular interpolation kinds.
    pub fn is_arc(&self) -> bool {
        matches!(self, Self::ArcCW | Self::ArcCCW)
    }

    /// Parse a serialized kind name, mapping unknown names to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Setup" => Self::Setup,
            "Rapid" => Self::Rapid,
            "Linear" => Self::Linear,
            "ArcCW" => Self::ArcCW,
            "ArcCCW" => Self::ArcCCW,
            "Dwell" => Self::Dwell,
            "Spindle" => Self::Spindle,
            "Coolant" => Self::Coolant,
            "ToolChange" => Self::ToolChange,
            "Program" => Self::Program,
            "Comment" => Self::Comment,
            "Polyline" => Self::Polyline,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for GcodeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

impl std::fmt::Display for GcodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One motion or setup instruction.
///
/// Coordinates are `Option<f64>`: `None` means "not specified on this
/// line" and modal carry-forward applies, which is distinct from an
/// explicit zero. I/J are always relative to the segment start and are
/// never modal. Children are owned; `parent` is an identity-only
/// back-reference (the parent's line number), never used for traversal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GcodeLine {
    pub line_number: u32,
    pub raw_text: String,
    pub command: String,
    pub kind: GcodeKind,

    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub k: Option<f64>,
    pub r: Option<f64>,
    /// Feed rate
    pub f: Option<f64>,
    /// Spindle speed
    pub s: Option<f64>,

    pub tags: Vec<String>,
    pub label: String,

    /// Collapsed state of a polyline container in the line list.
    pub is_collapsed: bool,
    /// Nested lines; populated only for `GcodeKind::Polyline` parents.
    pub children: Vec<GcodeLine>,
    /// Line number of the owning polyline parent, if any. Identity only.
    pub parent: Option<u32>,
}

impl GcodeLine {
    pub fn new(line_number: u32) -> Self {
        Self {
            line_number,
            is_collapsed: true,
            ..Default::default()
        }
    }

    /// True when this line is a polyline container.
    pub fn is_polyline(&self) -> bool {
        self.kind == GcodeKind::Polyline
    }

    /// Command text for display: the mnemonic, or a container marker.
    pub fn display_command(&self) -> String {
        if !self.command.is_empty() {
            self.command.clone()
        } else if self.is_polyline() {
            "[Polyline]".to_string()
        } else {
            String::new()
        }
    }

    /// Present parameters joined as `"X1 Y2 …"`.
    ///
    /// F is skipped on Setup lines: a bare feed line already carries its
    /// value in the command text (e.g. `"F10.0"`).
    pub fn parameters_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(x) = self.x {
            parts.push(format!("X{}", x));
        }
        if let Some(y) = self.y {
            parts.push(format!("Y{}", y));
        }
        if let Some(z) = self.z {
            parts.push(format!("Z{}", z));
        }
        if let Some(i) = self.i {
            parts.push(format!("I{}", i));
        }
        if let Some(j) = self.j {
            parts.push(format!("J{}", j));
        }
        if let Some(k) = self.k {
            parts.push(format!("K{}", k));
        }
        if let Some(r) = self.r {
            parts.push(format!("R{}", r));
        }
        if let Some(f) = self.f {
            if self.kind != GcodeKind::Setup {
                parts.push(format!("F{}", f));
            }
        }
        if let Some(s) = self.s {
            parts.push(format!("S{}", s));
        }
        parts.join(" ")
    }

    /// Number of flattened entries this line contributes (itself plus
    /// children, preorder).
    pub fn flat_count(&self) -> usize {
        1 + self.children.iter().map(GcodeLine::flat_count).sum::<usize>()
    }
}
