//! Edit scripts: a JSON array of commands tagged by `op`.
//!
//! ```json
//! [
//!   {"op": "add_rect", "name": "a", "x": 10, "y": 10, "width": 100, "height": 50},
//!   {"op": "move", "target": "a", "dx": 20, "dy": 0},
//!   {"op": "undo"},
//!   {"op": "export", "format": "png"}
//! ]
//! ```

use anyhow::{Context, Result, anyhow};
use inkboard_core::{RasterFormat, SerializableColor, ShapeStyle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Png,
    Jpeg,
}

impl ExportFormat {
    /// Raster format, or None for JSON.
    pub fn raster(self) -> Option<RasterFormat> {
        match self {
            ExportFormat::Json => None,
            ExportFormat::Png => Some(RasterFormat::Png),
            ExportFormat::Jpeg => Some(RasterFormat::Jpeg),
        }
    }
}

/// Style overrides. Colors are `#rrggbb`, `#rrggbbaa`, `#rgb` or `transparent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOverrides {
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub fill: Option<String>,
    pub opacity: Option<f64>,
}

fn parse_color(text: &str) -> Result<SerializableColor> {
    SerializableColor::from_hex(text).ok_or_else(|| anyhow!("invalid color '{}'", text))
}

impl StyleOverrides {
    /// Apply the overrides to `style`.
    pub fn apply(&self, style: &mut ShapeStyle) -> Result<()> {
        if let Some(stroke) = &self.stroke {
            style.stroke_color = parse_color(stroke)?;
        }
        if let Some(width) = self.stroke_width {
            style.stroke_width = width.max(0.0);
        }
        if let Some(fill) = &self.fill {
            style.fill_color = Some(parse_color(fill)?);
        }
        if let Some(opacity) = self.opacity {
            style.opacity = opacity.clamp(0.0, 1.0);
        }
        Ok(())
    }
}

/// One scripted operation. Elements are addressed by the `name` given when
/// they were added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    AddRect {
        name: Option<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        corner_radius: f64,
        #[serde(default)]
        style: StyleOverrides,
    },
    AddEllipse {
        name: Option<String>,
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        #[serde(default)]
        style: StyleOverrides,
    },
    AddText {
        name: Option<String>,
        x: f64,
        y: f64,
        text: String,
        font_size: Option<f64>,
        #[serde(default)]
        style: StyleOverrides,
    },
    AddPath {
        name: Option<String>,
        points: Vec<[f64; 2]>,
        /// Drop points within this distance of the simplified stroke.
        simplify: Option<f64>,
        #[serde(default)]
        style: StyleOverrides,
    },
    AddImage {
        name: Option<String>,
        x: f64,
        y: f64,
        file: PathBuf,
        max_width: Option<f64>,
        max_height: Option<f64>,
    },
    Move {
        target: String,
        dx: f64,
        dy: f64,
    },
    Skew {
        target: String,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Rotate {
        target: String,
        degrees: f64,
    },
    SetStyle {
        target: String,
        style: StyleOverrides,
    },
    Remove {
        target: String,
    },
    Group {
        targets: Vec<String>,
        name: Option<String>,
    },
    Undo,
    Redo,
    ClearHistory,
    Save,
    Load,
    Export {
        format: ExportFormat,
        out: Option<PathBuf>,
    },
    /// Destructive. Listing it in a script counts as confirmation.
    Reset,
}

/// Parse a script.
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    serde_json::from_str(text).context("invalid script")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let commands = parse_script(
            r##"[
                {"op": "add_rect", "name": "a", "x": 1, "y": 2, "width": 3, "height": 4,
                 "style": {"fill": "#ff0000"}},
                {"op": "skew", "target": "a", "x": 10},
                {"op": "undo"},
                {"op": "export", "format": "jpeg"}
            ]"##,
        )
        .unwrap();

        assert_eq!(commands.len(), 4);
        assert!(matches!(&commands[0], Command::AddRect { name: Some(n), corner_radius, .. } if n == "a" && *corner_radius == 0.0));
        assert_eq!(
            commands[1],
            Command::Skew {
                target: "a".into(),
                x: 10.0,
                y: 0.0
            }
        );
        assert_eq!(commands[2], Command::Undo);
        assert_eq!(
            commands[3],
            Command::Export {
                format: ExportFormat::Jpeg,
                out: None
            }
        );
    }

    #[test]
    fn test_optional_fields_default() {
        let commands = parse_script(
            r##"[
                {"op": "add_path", "points": [[0, 0], [1, 1]]},
                {"op": "set_style", "target": "a", "style": {"stroke_width": 4}}
            ]"##,
        )
        .unwrap();

        assert!(matches!(&commands[0], Command::AddPath { name: None, simplify: None, .. }));
        match &commands[1] {
            Command::SetStyle { target, style } => {
                assert_eq!(target, "a");
                assert_eq!(style.stroke_width, Some(4.0));
                assert_eq!(style.fill, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(parse_script(r#"[{"op": "explode"}]"#).is_err());
        assert!(parse_script(r#"{"op": "undo"}"#).is_err());
    }

    #[test]
    fn test_style_overrides() {
        let mut style = ShapeStyle::default();
        StyleOverrides {
            stroke: Some("#00f".into()),
            stroke_width: Some(-1.0),
            fill: Some("transparent".into()),
            opacity: Some(2.0),
        }
        .apply(&mut style)
        .unwrap();

        assert_eq!(style.stroke_color, SerializableColor::new(0, 0, 255, 255));
        assert_eq!(style.stroke_width, 0.0);
        assert_eq!(style.fill_color, Some(SerializableColor::transparent()));
        assert_eq!(style.opacity, 1.0);

        let bad = StyleOverrides {
            fill: Some("red".into()),
            ..Default::default()
        };
        assert!(bad.apply(&mut style).is_err());
    }
}
