//! Format-state value types and inline-format classification.

use smol_str::SmolStr;
use vellum_common::config::FormatConfig;

use crate::dom::{Document, NodeId};

/// Horizontal text alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

impl std::fmt::Display for TextAlign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active formatting at a cursor position.
///
/// Produced fresh on every computation; callers replace their held value
/// rather than mutating one in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_size: SmolStr,
    pub font_family: SmolStr,
    pub text_align: TextAlign,
}

impl Default for FormatState {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            font_size: SmolStr::new_static("12pt"),
            font_family: SmolStr::new_static("Arial"),
            text_align: TextAlign::Left,
        }
    }
}

impl FormatState {
    /// The neutral state carrying the configured default fonts.
    pub fn neutral(format: &FormatConfig) -> Self {
        Self {
            font_size: SmolStr::new(&format.default_font_size),
            font_family: SmolStr::new(&format.default_font_family),
            ..Self::default()
        }
    }
}

/// The recognized inline-format element kinds.
///
/// A single classification point keeps the ancestor walk exhaustive: every
/// consumer folds over these variants instead of re-matching tag names.
#[derive(Clone, Debug, PartialEq)]
pub enum InlineFormatKind {
    Bold,
    Italic,
    Underline,
    StyledSpan(InlineStyle),
}

/// The subset of an inline `style` attribute the editor understands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InlineStyle {
    pub font_size: Option<SmolStr>,
    pub font_family: Option<SmolStr>,
    pub text_align: Option<TextAlign>,
}

impl InlineStyle {
    pub fn is_empty(&self) -> bool {
        self.font_size.is_none() && self.font_family.is_none() && self.text_align.is_none()
    }
}

/// Classify an element as an inline-format wrapper, if it is one.
///
/// `strong`/`b` are bold, `em`/`i` italic, `u` underline, and a `span`
/// with a style attribute contributes whatever of its declarations the
/// editor understands. A bare `span` is not a format wrapper.
pub fn classify_inline_format(
    doc: &Document,
    node: NodeId,
    px_to_pt_ratio: f32,
) -> Option<InlineFormatKind> {
    match doc.tag(node)? {
        "strong" | "b" => Some(InlineFormatKind::Bold),
        "em" | "i" => Some(InlineFormatKind::Italic),
        "u" => Some(InlineFormatKind::Underline),
        "span" => {
            let style = parse_inline_style(doc.attr(node, "style")?, px_to_pt_ratio);
            if style.is_empty() {
                None
            } else {
                Some(InlineFormatKind::StyledSpan(style))
            }
        }
        _ => None,
    }
}

/// Parse the understood declarations out of a `style` attribute value.
///
/// This is a declaration splitter, not a CSS engine: declarations are
/// separated by `;`, properties matched case-insensitively, unknown
/// declarations ignored. `px` font sizes are normalized to `pt`.
pub fn parse_inline_style(style: &str, px_to_pt_ratio: f32) -> InlineStyle {
    let mut out = InlineStyle::default();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        match property.as_str() {
            "font-size" => {
                if let Some(size) = normalize_font_size(value, px_to_pt_ratio) {
                    out.font_size = Some(size);
                }
            }
            "font-family" => {
                if let Some(family) = primary_font_family(value) {
                    out.font_family = Some(family);
                }
            }
            "text-align" => {
                out.text_align = TextAlign::parse(value);
            }
            _ => {}
        }
    }
    out
}

/// Normalize a CSS font-size value to points.
///
/// `pt` values pass through; `px` values convert at the configured ratio
/// (0.75 at the CSS reference density). Anything else is not understood.
pub fn normalize_font_size(value: &str, px_to_pt_ratio: f32) -> Option<SmolStr> {
    let value = value.trim().to_ascii_lowercase();
    if let Some(pt) = value.strip_suffix("pt") {
        let pt: f32 = pt.trim().parse().ok()?;
        return Some(format_pt(pt));
    }
    if let Some(px) = value.strip_suffix("px") {
        let px: f32 = px.trim().parse().ok()?;
        return Some(format_pt(px * px_to_pt_ratio));
    }
    None
}

fn format_pt(pt: f32) -> SmolStr {
    if (pt - pt.round()).abs() < 1e-4 {
        SmolStr::new(format!("{}pt", pt.round() as i64))
    } else {
        let mut s = format!("{pt:.2}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        SmolStr::new(format!("{s}pt"))
    }
}

/// First family of a font-family list, with quotes stripped.
pub fn primary_font_family(value: &str) -> Option<SmolStr> {
    let first = value.split(',').next()?.trim();
    let unquoted = first.trim_matches(|c| c == '"' || c == '\'').trim();
    if unquoted.is_empty() {
        None
    } else {
        Some(SmolStr::new(unquoted))
    }
}
