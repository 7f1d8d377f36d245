//! CPU renderer for board frames.

use crate::pixmap::{encode_jpeg, encode_png, from_rgba_image, solid, to_skia_color, to_skia_path, to_transform};
use crate::renderer::{RenderConfig, RenderResult, RendererError, ShapeRenderer};
use inkboard_core::shapes::{Image, ShapeStyle, ShapeTrait, Text};
use inkboard_core::{Frame, RasterFormat, Rasterizer, SceneError, SceneResult, Shape};
use kurbo::{Affine, BezPath, Rect, Shape as KurboShape};
use peniko::Color;
use tiny_skia::{FillRule, FilterQuality, LineCap, LineJoin, Pixmap, PixmapPaint, Stroke};

/// Largest accepted output edge in pixels.
const MAX_DIMENSION: f64 = 16384.0;

const PLACEHOLDER_FILL: Color = Color::from_rgba8(200, 200, 200, 255);
const PLACEHOLDER_STROKE: Color = Color::from_rgba8(150, 150, 150, 255);

/// Rasterizes frames on the CPU and encodes them as PNG or JPEG.
#[derive(Debug, Clone, Default)]
pub struct SoftwareRenderer {
    config: RenderConfig,
}

impl SoftwareRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a frame into a pixmap of `frame.size * scale` pixels.
    pub fn render(&self, frame: &Frame<'_>) -> RenderResult<Pixmap> {
        let width = (frame.size.width * self.config.scale).round();
        let height = (frame.size.height * self.config.scale).round();
        if !(1.0..=MAX_DIMENSION).contains(&width) || !(1.0..=MAX_DIMENSION).contains(&height) {
            return Err(RendererError::InvalidSize { width, height });
        }

        let mut pixmap =
            Pixmap::new(width as u32, height as u32).ok_or(RendererError::InvalidSize { width, height })?;
        if let Some(background) = frame.background {
            pixmap.fill(to_skia_color(background));
        }

        let mut painter = Painter {
            pixmap: &mut pixmap,
            tolerance: self.config.tolerance,
        };
        let transform = Affine::scale(self.config.scale);
        for shape in &frame.shapes {
            painter.render_shape(shape, transform);
        }

        log::debug!(
            "Rendered {} shapes at {}x{}",
            frame.shapes.len(),
            pixmap.width(),
            pixmap.height()
        );
        Ok(pixmap)
    }

    /// Render and encode a frame.
    pub fn encode(&self, frame: &Frame<'_>, format: RasterFormat) -> RenderResult<Vec<u8>> {
        let pixmap = self.render(frame)?;
        match format {
            RasterFormat::Png => encode_png(&pixmap),
            RasterFormat::Jpeg => encode_jpeg(
                &pixmap,
                self.config.jpeg_quality,
                frame.background.unwrap_or(Color::WHITE),
            ),
        }
    }
}

impl Rasterizer for SoftwareRenderer {
    fn rasterize(&self, frame: &Frame<'_>, format: RasterFormat) -> SceneResult<Vec<u8>> {
        self.encode(frame, format)
            .map_err(|e| SceneError::Raster(e.to_string()))
    }
}

/// Paints shapes onto a pixmap.
struct Painter<'a> {
    pixmap: &'a mut Pixmap,
    tolerance: f64,
}

impl Painter<'_> {
    fn fill(&mut self, path: &BezPath, color: Color, transform: Affine) {
        if let Some(path) = to_skia_path(path) {
            self.pixmap
                .fill_path(&path, &solid(color), FillRule::Winding, to_transform(transform), None);
        }
    }

    fn stroke(&mut self, path: &BezPath, width: f64, color: Color, transform: Affine) {
        let Some(path) = to_skia_path(path) else {
            return;
        };
        let stroke = Stroke {
            width: width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &solid(color), &stroke, to_transform(transform), None);
    }

    fn render_path(&mut self, path: &BezPath, style: &ShapeStyle, transform: Affine) {
        if let Some(fill) = style.fill_with_opacity() {
            self.fill(path, fill, transform);
        }
        if style.stroke_width > 0.0 {
            self.stroke(path, style.stroke_width, style.stroke_with_opacity(), transform);
        }
    }

    /// Text is drawn greeked: one block per visible glyph cell.
    fn render_text(&mut self, text: &Text, transform: Affine) {
        let Some(color) = text.style.fill_with_opacity().or_else(|| {
            (text.style.stroke_width > 0.0).then(|| text.style.stroke_with_opacity())
        }) else {
            return;
        };

        let advance = text.font_size * Text::ADVANCE;
        let line_step = text.font_size * text.line_height;
        let mut blocks = BezPath::new();
        for (row, line) in text.lines().enumerate() {
            let top = text.position.y + row as f64 * line_step + text.font_size * 0.25;
            for (column, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let left = text.position.x + column as f64 * advance;
                let cell = Rect::new(left, top, left + advance * 0.8, top + text.font_size * 0.6);
                blocks.extend(cell.path_elements(self.tolerance));
            }
        }

        self.fill(&blocks, color, transform * text.affine());
    }

    fn render_image(&mut self, image: &Image, transform: Affine) {
        let decoded = image
            .bytes()
            .ok()
            .and_then(|bytes| ::image::load_from_memory(&bytes).ok())
            .and_then(|decoded| from_rgba_image(&decoded.to_rgba8()));

        let Some(source) = decoded else {
            log::warn!("Could not decode image {}", image.id());
            self.render_image_placeholder(image, transform);
            return;
        };

        let to_device = transform
            * image.affine()
            * Affine::translate(image.position.to_vec2())
            * Affine::scale_non_uniform(
                image.width / f64::from(source.width()),
                image.height / f64::from(source.height()),
            );
        let paint = PixmapPaint {
            opacity: image.style.opacity.clamp(0.0, 1.0) as f32,
            quality: FilterQuality::Nearest,
            ..Default::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, to_transform(to_device), None);

        if image.style.stroke_width > 0.0 {
            self.stroke(
                &image.to_path(),
                image.style.stroke_width,
                image.style.stroke_with_opacity(),
                transform,
            );
        }
    }

    fn render_image_placeholder(&mut self, image: &Image, transform: Affine) {
        let outline = image.to_path();
        self.fill(&outline, PLACEHOLDER_FILL, transform);

        let rect = image.as_rect();
        let mut cross = BezPath::new();
        cross.move_to((rect.x0, rect.y0));
        cross.line_to((rect.x1, rect.y1));
        cross.move_to((rect.x1, rect.y0));
        cross.line_to((rect.x0, rect.y1));
        cross.apply_affine(image.affine());
        cross.extend(outline);

        self.stroke(&cross, 2.0, PLACEHOLDER_STROKE, transform);
    }
}

impl ShapeRenderer for Painter<'_> {
    fn render_shape(&mut self, shape: &Shape, transform: Affine) {
        match shape {
            Shape::Text(text) => self.render_text(text, transform),
            Shape::Image(image) => self.render_image(image, transform),
            Shape::Group(group) => {
                for child in group.children() {
                    self.render_shape(child, transform);
                }
            }
            _ => self.render_path(&shape.to_path(), shape.style(), transform),
        }
    }
}
