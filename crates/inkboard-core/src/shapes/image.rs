//! Embedded raster images.

use super::{Placement, ShapeId, ShapeStyle, ShapeTrait, placed_bounds};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Encoding of an embedded image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

/// Leading bytes identifying each format. WebP also needs `WEBP` at offset 8.
const SIGNATURES: [(ImageFormat, &[u8]); 3] = [
    (ImageFormat::Png, b"\x89PNG\r\n\x1a\n"),
    (ImageFormat::Jpeg, b"\xff\xd8\xff"),
    (ImageFormat::WebP, b"RIFF"),
];

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Guess from a file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Sniff the format from the payload itself.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        SIGNATURES
            .iter()
            .find(|(format, signature)| {
                data.starts_with(signature)
                    && (*format != ImageFormat::WebP || data.get(8..12) == Some(b"WEBP".as_slice()))
            })
            .map(|(format, _)| *format)
    }
}

/// An image placed on the board.
///
/// The encoded bytes travel inside the snapshot as base64, so a snapshot
/// never refers to files outside itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ShapeId,
    /// Top-left corner before placement.
    pub position: Point,
    /// Display size in board units.
    pub width: f64,
    pub height: f64,
    /// Pixel size of the encoded image.
    pub source_width: u32,
    pub source_height: u32,
    pub format: ImageFormat,
    /// Base64 of the encoded bytes.
    payload: String,
    #[serde(default)]
    pub placement: Placement,
    /// A stroke width above zero draws a border.
    pub style: ShapeStyle,
}

impl Image {
    /// Place `data` at its pixel size with no border.
    pub fn new(position: Point, data: &[u8], source_width: u32, source_height: u32, format: ImageFormat) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width: f64::from(source_width),
            height: f64::from(source_height),
            source_width,
            source_height,
            format,
            payload: STANDARD.encode(data),
            placement: Placement::default(),
            style: ShapeStyle {
                stroke_width: 0.0,
                ..Default::default()
            },
        }
    }

    /// Resize to the largest size that fits in `max_width` x `max_height`
    /// while keeping the source aspect ratio.
    pub fn fit_within(mut self, max_width: f64, max_height: f64) -> Self {
        let source = Size::new(f64::from(self.source_width), f64::from(self.source_height));
        if source.is_zero_area() {
            return self;
        }
        let scale = (max_width / source.width).min(max_height / source.height);
        self.width = source.width * scale;
        self.height = source.height * scale;
        self
    }

    /// The encoded image bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.payload)
    }

    /// Display rectangle before placement.
    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    pub fn affine(&self) -> Affine {
        self.placement.affine(self.as_rect().center())
    }
}

impl ShapeTrait for Image {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        placed_bounds(self.as_rect(), &self.placement)
    }

    fn to_path(&self) -> BezPath {
        self.affine() * self.as_rect().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        let [sx, _, _, sy, _, _] = affine.as_coeffs();
        self.position = affine * self.position;
        self.width *= sx.abs();
        self.height *= sy.abs();
    }
}
