//! Static editor configuration.
//!
//! All values are read-only at runtime: components receive a reference to
//! the config at construction and never mutate it. The `Default` impl
//! carries the product constants; deployments may override them by loading
//! a JSON document with the same shape.

use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Top-level editor configuration, grouped by concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub performance: PerformanceConfig,
    pub security: SecurityConfig,
    pub format: FormatConfig,
}

/// Timing knobs for the live-editing hot path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Trailing-edge debounce delay for format-state recomputation, in
    /// milliseconds. 16ms keeps continuous updates within one frame at
    /// 60fps.
    pub debounce_delay_ms: u64,
}

/// Limits and allow-lists enforced at the trust boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum serialized content length accepted for paste or save.
    pub max_content_length: usize,
    /// Tags the editing surface is allowed to contain.
    pub allowed_tags: Vec<String>,
}

/// Font and alignment enumerations plus unit-conversion constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Conversion ratio applied when normalizing `px` sizes to `pt`.
    pub px_to_pt_ratio: f32,
    pub default_font_size: String,
    pub default_font_family: String,
    pub font_sizes: Vec<String>,
    pub font_families: Vec<String>,
    pub text_alignments: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            performance: PerformanceConfig::default(),
            security: SecurityConfig::default(),
            format: FormatConfig::default(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            debounce_delay_ms: 16,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_content_length: 50_000,
            allowed_tags: ["p", "strong", "em", "u", "span", "br"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            px_to_pt_ratio: 0.75,
            default_font_size: "12pt".to_owned(),
            default_font_family: "Arial".to_owned(),
            font_sizes: [
                "8pt", "9pt", "10pt", "11pt", "12pt", "14pt", "16pt", "18pt", "20pt", "24pt",
                "28pt", "36pt",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            font_families: [
                "Arial",
                "Georgia",
                "Helvetica",
                "Times New Roman",
                "Verdana",
                "Courier New",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            text_alignments: ["left", "center", "right", "justify"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from its JSON representation.
    ///
    /// Missing sections and fields fall back to the defaults, so a partial
    /// override document is valid input.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let config = EditorConfig::default();
        assert_eq!(config.performance.debounce_delay_ms, 16);
        assert_eq!(config.security.max_content_length, 50_000);
        assert_eq!(config.format.px_to_pt_ratio, 0.75);
        assert_eq!(config.format.default_font_size, "12pt");
        assert_eq!(config.format.default_font_family, "Arial");
        assert!(config.security.allowed_tags.contains(&"p".to_string()));
        assert!(config.security.allowed_tags.contains(&"br".to_string()));
    }

    #[test]
    fn test_json_round_trip() {
        let config = EditorConfig::default();
        let json = config.to_json().unwrap();
        let parsed = EditorConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_override() {
        let parsed =
            EditorConfig::from_json(r#"{"security": {"max_content_length": 1000}}"#).unwrap();
        assert_eq!(parsed.security.max_content_length, 1000);
        // Untouched sections keep their defaults.
        assert_eq!(parsed.performance.debounce_delay_ms, 16);
        assert_eq!(parsed.format.default_font_family, "Arial");
    }
}
