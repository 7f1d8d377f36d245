//! tiny-skia glue: kurbo paths and transforms, peniko colours, and PNG/JPEG
//! encoding of finished pixmaps.

use crate::renderer::{RenderResult, RendererError};
use ::image::RgbaImage;
use ::image::codecs::jpeg::JpegEncoder;
use kurbo::{Affine, BezPath, PathEl};
use peniko::Color;
use tiny_skia::{ColorU8, Paint, PathBuilder, Pixmap, Transform};

/// Convert a kurbo path. `None` if the path has no drawable extent.
pub(crate) fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => builder.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => builder.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

pub(crate) fn to_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

pub(crate) fn to_skia_color(color: Color) -> tiny_skia::Color {
    let rgba = color.to_rgba8();
    tiny_skia::Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
}

/// Anti-aliased solid paint.
pub(crate) fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_skia_color(color));
    paint.anti_alias = true;
    paint
}

/// Copy a decoded image into a premultiplied pixmap.
pub(crate) fn from_rgba_image(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Straight (not premultiplied) RGBA8 value of a pixel.
pub fn pixel_rgba8(pixmap: &Pixmap, x: u32, y: u32) -> Option<[u8; 4]> {
    let color = pixmap.pixel(x, y)?.demultiply();
    Some([color.red(), color.green(), color.blue(), color.alpha()])
}

/// Straight RGBA8 bytes, row major.
pub fn to_rgba8(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

/// Encode as an 8-bit RGBA PNG.
pub fn encode_png(pixmap: &Pixmap) -> RenderResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Encode(e.to_string()))?;
        writer
            .write_image_data(&to_rgba8(pixmap))
            .map_err(|e| RendererError::Encode(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| RendererError::Encode(e.to_string()))?;
    }
    Ok(buf)
}

/// Encode as JPEG, flattening transparency onto `matte`.
pub fn encode_jpeg(pixmap: &Pixmap, quality: u8, matte: Color) -> RenderResult<Vec<u8>> {
    let matte = matte.to_rgba8();
    let matte = [matte.r, matte.g, matte.b];
    let mut rgb = Vec::with_capacity(pixmap.pixels().len() * 3);
    for px in pixmap.pixels() {
        // Premultiplied source over an opaque matte.
        let inv = 255 - u16::from(px.alpha());
        for (channel, m) in [px.red(), px.green(), px.blue()].into_iter().zip(matte) {
            let value = u16::from(channel) + (u16::from(m) * inv + 127) / 255;
            rgb.push(value.min(255) as u8);
        }
    }

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder
        .encode(&rgb, pixmap.width(), pixmap.height(), ::image::ExtendedColorType::Rgb8)
        .map_err(|e| RendererError::Encode(e.to_string()))?;
    Ok(buf)
}
