//! Burn-in label text and overlay geometry.
//!
//! A label is a bottom-anchored band of text lines rendered from selected
//! resolved fields. [`build_label`] chooses the lines; [`render_svg`] turns a
//! [`LabelSpec`] into an SVG document ready for rasterization.

use std::fmt::Write as _;

use serde::Serialize;

use crate::graph::{display_value, ResolvedFieldMap};

/// Vertical padding above and below the text block, in pixels.
pub const LABEL_PADDING: u32 = 8;

/// Distance between text baselines, in pixels.
pub const LABEL_LINE_HEIGHT: u32 = 22;

/// Font size of label text, in pixels.
pub const LABEL_FONT_SIZE: u32 = 18;

/// Left inset of label text, in pixels.
pub const LABEL_TEXT_X: u32 = 10;

const LABEL_FONT_FAMILY: &str = "Arial, Helvetica, sans-serif";
const LABEL_BACKGROUND_OPACITY: f32 = 0.55;

/// Text lines for one clip's overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSpec {
    pub lines: Vec<String>,
}

impl LabelSpec {
    /// `2 × padding + line height × line count`.
    pub fn overlay_height(&self) -> u32 {
        overlay_height(self.lines.len())
    }
}

pub fn overlay_height(line_count: usize) -> u32 {
    let lines = u32::try_from(line_count).unwrap_or(u32::MAX);
    LABEL_PADDING * 2 + LABEL_LINE_HEIGHT.saturating_mul(lines)
}

/// Build label lines from the selected keys, in caller order.
///
/// Keys whose value is missing, null or empty are skipped. When nothing is
/// left the label is the clip's display name (colons replaced so the name
/// cannot be mistaken for a `key: value` line).
pub fn build_label(fields: &ResolvedFieldMap, selected_keys: &[String], display_name: &str) -> LabelSpec {
    let mut lines: Vec<String> = selected_keys
        .iter()
        .filter_map(|key| {
            let value = display_value(fields.get(key)?);
            (!value.is_empty()).then(|| format!("{key}: {value}"))
        })
        .collect();

    if lines.is_empty() {
        lines.push(display_name.replace(':', "_"));
    }

    LabelSpec { lines }
}

/// Replace control characters that XML 1.0 forbids with spaces.
///
/// Tab, line feed and carriage return are legal and kept.
pub fn sanitize_line(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}' => ' ',
            other => other,
        })
        .collect()
}

/// Escape the five XML special characters.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Render the label as an SVG band `width` pixels wide.
pub fn render_svg(spec: &LabelSpec, width: u32) -> String {
    let height = spec.overlay_height();
    let mut svg = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <svg width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" \
         xmlns=\"http://www.w3.org/2000/svg\">\n  \
         <rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"black\" \
         fill-opacity=\"{LABEL_BACKGROUND_OPACITY}\"/>\n"
    );

    let first_baseline = LABEL_PADDING + LABEL_LINE_HEIGHT;
    for (idx, line) in spec.lines.iter().enumerate() {
        let y = first_baseline + LABEL_LINE_HEIGHT * idx as u32;
        let text = xml_escape(&sanitize_line(line));
        // Writing into a String cannot fail.
        let _ = writeln!(
            svg,
            "  <text x=\"{LABEL_TEXT_X}\" y=\"{y}\" font-size=\"{LABEL_FONT_SIZE}\" \
             fill=\"#fff\" font-family=\"{LABEL_FONT_FAMILY}\">{text}</text>"
        );
    }

    svg.push_str("</svg>\n");
    svg
}
