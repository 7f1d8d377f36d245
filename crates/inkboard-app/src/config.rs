//! Application configuration.

use inkboard_core::{DEFAULT_CACHE_KEY, ExtraProps, HistoryConfig, SerializableColor};
use inkboard_render::RenderConfig;
use kurbo::Size;
use std::path::PathBuf;

/// Settings for a [`crate::Session`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory for cached boards. `None` uses the platform data directory.
    pub data_dir: Option<PathBuf>,
    /// Cache key of the board.
    pub cache_key: String,
    /// Board size, also the raster export size.
    pub size: Size,
    pub background: Option<SerializableColor>,
    /// Directory exports are written to.
    pub export_dir: PathBuf,
    pub history: HistoryConfig,
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            size: Size::new(800.0, 600.0),
            background: Some(SerializableColor::white()),
            export_dir: PathBuf::from("."),
            // Scripts address elements by name, so names must survive undo.
            history: HistoryConfig {
                extra_props: ExtraProps::new(["selectable", "name"]),
                ..Default::default()
            },
            render: RenderConfig::default(),
        }
    }
}
