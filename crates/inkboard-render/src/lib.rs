//! InkBoard render library.
//!
//! CPU rasterization of board frames on tiny-skia, used for PNG and JPEG
//! export.

mod pixmap;
mod renderer;
mod software;

pub use pixmap::{encode_jpeg, encode_png, pixel_rgba8, to_rgba8};
pub use renderer::{RenderConfig, RenderResult, RendererError, ShapeRenderer};
pub use software::SoftwareRenderer;
pub use tiny_skia::Pixmap;
