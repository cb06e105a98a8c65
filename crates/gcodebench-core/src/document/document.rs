//! The G-code document: an ordered line sequence with a cached flat view.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use tracing::debug;

use super::line::{GcodeKind, GcodeLine};
use crate::error::{DocumentError, DocumentResult};

/// Flat-view entry: top-level index plus an optional child index.
///
/// Nesting is one level deep (polyline parents own leaf children), so an
/// index pair addresses any line without holding borrows into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlatEntry {
    top: usize,
    child: Option<usize>,
}

/// Ordered top-level sequence of G-code lines plus a derived, cached
/// flattened (depth-first, parent-before-children) view.
///
/// The flat cache is invalidated by the structural mutators on this type.
/// Callers that edit through [`Document::lines_mut`] must call
/// [`Document::invalidate_cache`] themselves after inserting, removing or
/// reordering lines; editing coordinate or label fields in place does not
/// require invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    lines: Vec<GcodeLine>,
    file_name: String,
    is_dirty: bool,
    selected_index: Option<usize>,
    #[serde(skip)]
    flat_cache: OnceCell<Vec<FlatEntry>>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            file_name: "untitled.nc".to_string(),
            is_dirty: false,
            selected_index: None,
            flat_cache: OnceCell::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(lines: Vec<GcodeLine>) -> Self {
        Self {
            lines,
            ..Default::default()
        }
    }

    pub fn lines(&self) -> &[GcodeLine] {
        &self.lines
    }

    /// Mutable access to the top-level lines.
    ///
    /// After structural changes (insert/remove/reorder, or editing a
    /// polyline's children list) the caller must invalidate the flat cache.
    pub fn lines_mut(&mut self) -> &mut Vec<GcodeLine> {
        &mut self.lines
    }

    /// Append a top-level line.
    pub fn push_line(&mut self, line: GcodeLine) {
        self.lines.push(line);
        self.invalidate_cache();
    }

    /// Insert a top-level line at `index`.
    pub fn insert_line(&mut self, index: usize, line: GcodeLine) {
        self.lines.insert(index, line);
        self.invalidate_cache();
    }

    /// Remove and return the top-level line at `index`.
    pub fn remove_line(&mut self, index: usize) -> GcodeLine {
        let line = self.lines.remove(index);
        self.invalidate_cache();
        line
    }

    /// Drop the cached flat view. Must be called after any structural edit
    /// made through [`Document::lines_mut`].
    pub fn invalidate_cache(&mut self) {
        self.flat_cache.take();
    }

    fn flat_entries(&self) -> &[FlatEntry] {
        self.flat_cache.get_or_init(|| {
            let mut entries = Vec::new();
            for (top, line) in self.lines.iter().enumerate() {
                entries.push(FlatEntry { top, child: None });
                for child in 0..line.children.len() {
                    entries.push(FlatEntry {
                        top,
                        child: Some(child),
                    });
                }
            }
            entries
        })
    }

    /// The flattened (preorder) view of all lines.
    pub fn flat_lines(&self) -> Vec<&GcodeLine> {
        self.flat_entries()
            .iter()
            .map(|e| self.resolve(*e))
            .collect()
    }

    /// Number of lines in the flattened view.
    pub fn flat_len(&self) -> usize {
        self.flat_entries().len()
    }

    /// Line at a flattened index.
    pub fn line_at_flat(&self, index: usize) -> Option<&GcodeLine> {
        let entry = *self.flat_entries().get(index)?;
        Some(self.resolve(entry))
    }

    /// Mutable line at a flattened index, for field edits. Structural edits
    /// must not go through this accessor.
    pub fn line_at_flat_mut(&mut self, index: usize) -> Option<&mut GcodeLine> {
        let entry = *self.flat_entries().get(index)?;
        let line = &mut self.lines[entry.top];
        match entry.child {
            Some(c) => line.children.get_mut(c),
            None => Some(line),
        }
    }

    fn resolve(&self, entry: FlatEntry) -> &GcodeLine {
        let line = &self.lines[entry.top];
        match entry.child {
            Some(c) => &line.children[c],
            None => line,
        }
    }

    /// Lines visible in the list UI, honoring polyline collapse state.
    /// Each line is paired with its flattened index so selection stays in
    /// sync with the flat view.
    pub fn visible_lines(&self) -> Vec<(usize, &GcodeLine)> {
        let mut result = Vec::new();
        let mut flat_index = 0;
        for line in &self.lines {
            result.push((flat_index, line));
            flat_index += 1;
            if line.is_polyline() && !line.is_collapsed {
                for child in &line.children {
                    result.push((flat_index, child));
                    flat_index += 1;
                }
            } else {
                flat_index += line.children.len();
            }
        }
        result
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn set_selected_index(&mut self, index: Option<usize>) {
        self.selected_index = index;
    }

    /// The selected line, resolved through the flat view.
    pub fn selected_line(&self) -> Option<&GcodeLine> {
        self.line_at_flat(self.selected_index?)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    /// Regenerate G-code text: raw text verbatim when present, otherwise
    /// `"{command} {params}"`. Polyline containers emit nothing themselves;
    /// their children appear through the flat order.
    pub fn to_gcode(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        for line in self.flat_lines() {
            if !line.raw_text.is_empty() {
                out.push(line.raw_text.clone());
            } else if !line.is_polyline() {
                out.push(
                    format!("{} {}", line.command, line.parameters_string())
                        .trim()
                        .to_string(),
                );
            }
        }
        out.join("\n")
    }

    /// Padded bounding box `(min_x, min_y, max_x, max_y)` of the motion.
    ///
    /// Walks the flat view with a modal X/Y cursor starting at the origin
    /// and expands over Rapid, Linear and Polyline points only. Each axis
    /// is padded by 10% of its extent, or 10 units when the extent is zero.
    /// Returns `(0, 0, 100, 100)` when no qualifying point exists.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        let mut has_points = false;

        let mut cur_x = 0.0;
        let mut cur_y = 0.0;

        for line in self.flat_lines() {
            if let Some(x) = line.x {
                cur_x = x;
            }
            if let Some(y) = line.y {
                cur_y = y;
            }

            if matches!(
                line.kind,
                GcodeKind::Linear | GcodeKind::Rapid | GcodeKind::Polyline
            ) {
                min_x = min_x.min(cur_x);
                min_y = min_y.min(cur_y);
                max_x = max_x.max(cur_x);
                max_y = max_y.max(cur_y);
                has_points = true;
            }
        }

        if !has_points {
            return (0.0, 0.0, 100.0, 100.0);
        }

        let mut pad_x = (max_x - min_x) * 0.1;
        let mut pad_y = (max_y - min_y) * 0.1;
        if pad_x == 0.0 {
            pad_x = 10.0;
        }
        if pad_y == 0.0 {
            pad_y = 10.0;
        }

        (min_x - pad_x, min_y - pad_y, max_x + pad_x, max_y + pad_y)
    }

    /// Serialize to project JSON.
    pub fn to_project_json(&self) -> DocumentResult<String> {
        let data = ProjectData {
            version: PROJECT_VERSION.to_string(),
            file_name: self.file_name.clone(),
            lines: self.lines.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Deserialize from project JSON.
    ///
    /// Unknown `kind` names degrade to `Unknown`; parent back-references
    /// are rebuilt from the ownership tree rather than trusted from disk.
    pub fn from_project_json(json: &str) -> DocumentResult<Document> {
        let data: ProjectData = serde_json::from_str(json)?;
        let mut doc = Document::with_lines(data.lines);
        doc.file_name = data.file_name;
        for line in &mut doc.lines {
            let parent_number = line.line_number;
            for child in &mut line.children {
                child.parent = Some(parent_number);
            }
        }
        debug!(
            lines = doc.lines.len(),
            file = %doc.file_name,
            "loaded project document"
        );
        Ok(doc)
    }
}

const PROJECT_VERSION: &str = "1.0";

/// On-disk project payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct ProjectData {
    version: String,
    file_name: String,
    lines: Vec<GcodeLine>,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            file_name: String::new(),
            lines: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion_line(n: u32, kind: GcodeKind, x: f64, y: f64) -> GcodeLine {
        let mut line = GcodeLine::new(n);
        line.kind = kind;
        line.x = Some(x);
        line.y = Some(y);
        line
    }

    fn polyline_with_children(n: u32, count: usize) -> GcodeLine {
        let mut parent = GcodeLine::new(n);
        parent.kind = GcodeKind::Polyline;
        for c in 0..count {
            let mut child = motion_line(n + 1 + c as u32, GcodeKind::Linear, c as f64, 0.0);
            child.parent = Some(n);
            parent.children.push(child);
        }
        parent
    }

    #[test]
    fn test_flatten_is_preorder() {
        let mut doc = Document::new();
        doc.push_line(motion_line(1, GcodeKind::Rapid, 0.0, 0.0));
        doc.push_line(polyline_with_children(2, 3));
        doc.push_line(motion_line(6, GcodeKind::Linear, 9.0, 9.0));

        let flat = doc.flat_lines();
        let numbers: Vec<u32> = flat.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);

        let expected: usize = doc.lines().iter().map(|l| l.flat_count()).sum();
        assert_eq!(doc.flat_len(), expected);
    }

    #[test]
    fn test_field_edit_keeps_cache_structural_edit_invalidates() {
        let mut doc = Document::new();
        doc.push_line(motion_line(1, GcodeKind::Rapid, 0.0, 0.0));
        doc.push_line(motion_line(2, GcodeKind::Linear, 5.0, 5.0));

        let before: Vec<u32> = doc.flat_lines().iter().map(|l| l.line_number).collect();

        // Coordinate edit: identity sequence unchanged, no invalidation needed.
        doc.line_at_flat_mut(1).unwrap().x = Some(42.0);
        let after_edit: Vec<u32> = doc.flat_lines().iter().map(|l| l.line_number).collect();
        assert_eq!(before, after_edit);
        assert_eq!(doc.line_at_flat(1).unwrap().x, Some(42.0));

        // Structural edit through the mutator invalidates internally.
        doc.insert_line(0, motion_line(3, GcodeKind::Rapid, 1.0, 1.0));
        let after_insert: Vec<u32> = doc.flat_lines().iter().map(|l| l.line_number).collect();
        assert_eq!(after_insert, vec![3, 1, 2]);
    }

    #[test]
    fn test_lines_mut_requires_explicit_invalidation() {
        let mut doc = Document::new();
        doc.push_line(motion_line(1, GcodeKind::Rapid, 0.0, 0.0));
        assert_eq!(doc.flat_len(), 1);

        doc.lines_mut().push(motion_line(2, GcodeKind::Linear, 1.0, 1.0));
        // Stale until the caller invalidates.
        assert_eq!(doc.flat_len(), 1);
        doc.invalidate_cache();
        assert_eq!(doc.flat_len(), 2);
    }

    #[test]
    fn test_bounding_box_default_when_empty() {
        let doc = Document::new();
        assert_eq!(doc.bounding_box(), (0.0, 0.0, 100.0, 100.0));

        // Comment-only documents qualify no points either.
        let mut doc = Document::new();
        let mut comment = GcodeLine::new(1);
        comment.kind = GcodeKind::Comment;
        doc.push_line(comment);
        assert_eq!(doc.bounding_box(), (0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_bounding_box_padding() {
        let mut doc = Document::new();
        doc.push_line(motion_line(1, GcodeKind::Rapid, 0.0, 0.0));
        doc.push_line(motion_line(2, GcodeKind::Linear, 100.0, 50.0));

        let (min_x, min_y, max_x, max_y) = doc.bounding_box();
        assert!((min_x + 10.0).abs() < 1e-9);
        assert!((max_x - 110.0).abs() < 1e-9);
        assert!((min_y + 5.0).abs() < 1e-9);
        assert!((max_y - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box_zero_extent_min_padding() {
        let mut doc = Document::new();
        doc.push_line(motion_line(1, GcodeKind::Linear, 5.0, 5.0));
        let (min_x, min_y, max_x, max_y) = doc.bounding_box();
        assert_eq!((min_x, min_y, max_x, max_y), (-5.0, -5.0, 15.0, 15.0));
    }

    #[test]
    fn test_to_gcode_skips_polyline_parent_emits_children() {
        let mut doc = Document::new();
        let mut rapid = motion_line(1, GcodeKind::Rapid, 0.0, 0.0);
        rapid.raw_text = "G00 X0.000 Y0.000".to_string();
        rapid.command = "G00".to_string();
        doc.push_line(rapid);

        let mut parent = polyline_with_children(2, 2);
        for child in &mut parent.children {
            child.command = "G01".to_string();
            child.raw_text = format!("G01 X{:.3} Y0.000", child.x.unwrap());
        }
        doc.push_line(parent);

        let text = doc.to_gcode();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["G00 X0.000 Y0.000", "G01 X0.000 Y0.000", "G01 X1.000 Y0.000"]
        );
    }

    #[test]
    fn test_to_gcode_reconstructs_when_raw_missing() {
        let mut doc = Document::new();
        let mut line = motion_line(1, GcodeKind::Linear, 10.0, 20.0);
        line.command = "G01".to_string();
        doc.push_line(line);
        assert_eq!(doc.to_gcode(), "G01 X10 Y20");
    }

    #[test]
    fn test_visible_lines_collapse() {
        let mut doc = Document::new();
        doc.push_line(polyline_with_children(1, 2));
        doc.push_line(motion_line(4, GcodeKind::Rapid, 0.0, 0.0));

        // Collapsed: parent and trailing line only, flat indices preserved.
        let visible = doc.visible_lines();
        let indices: Vec<usize> = visible.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 3]);

        doc.lines_mut()[0].is_collapsed = false;
        let visible = doc.visible_lines();
        let indices: Vec<usize> = visible.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_project_round_trip() {
        let mut doc = Document::new();
        doc.set_file_name("part.nc");
        doc.push_line(motion_line(1, GcodeKind::Rapid, 1.0, 2.0));
        doc.push_line(polyline_with_children(2, 2));

        let json = doc.to_project_json().unwrap();
        let loaded = Document::from_project_json(&json).unwrap();

        assert_eq!(loaded.file_name(), "part.nc");
        assert_eq!(loaded.flat_len(), doc.flat_len());
        assert_eq!(loaded.lines()[1].children[0].parent, Some(2));
    }

    #[test]
    fn test_project_unknown_kind_degrades() {
        let json = r#"{
            "version": "9.9",
            "file_name": "future.nc",
            "lines": [
                { "line_number": 1, "kind": "HyperRapid", "command": "G99" }
            ]
        }"#;
        let doc = Document::from_project_json(json).unwrap();
        assert_eq!(doc.lines()[0].kind, GcodeKind::Unknown);
        assert_eq!(doc.lines()[0].command, "G99");
    }
}
