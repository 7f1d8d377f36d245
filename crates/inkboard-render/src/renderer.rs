//! Renderer configuration, errors and the shape rendering seam.

use inkboard_core::Shape;
use kurbo::Affine;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid output size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Raster output settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Output pixels per board unit.
    pub scale: f64,
    /// JPEG quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Curve flattening tolerance in device pixels.
    pub tolerance: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            jpeg_quality: 90,
            tolerance: 0.1,
        }
    }
}

/// Draws shapes onto a target.
pub trait ShapeRenderer {
    /// Render a shape with the given board-to-device transform.
    fn render_shape(&mut self, shape: &Shape, transform: Affine);
}
