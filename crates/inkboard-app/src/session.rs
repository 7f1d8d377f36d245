//! A board opened from the cache, with history and auto-save attached.

use crate::config::AppConfig;
use crate::script::{Command, ExportFormat, StyleOverrides};
use anyhow::{Context, Result, anyhow, bail};
use inkboard_core::shapes::{Ellipse, Image, ImageFormat, Path, Rectangle, Text};
use inkboard_core::{
    Attributes, AutoSaver, Board, BoardConfig, Element, ExportArtifact, HistoryRecorder,
    PersistenceGateway, RestoreMode, Shape, ShapeId, Storage,
};
use inkboard_render::SoftwareRenderer;
use kurbo::{Point, Vec2};
use std::path::PathBuf;
use std::sync::Arc;

/// What a command did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    Added(ShapeId),
    /// Undo or redo with an empty stack.
    Nothing,
    Loaded(bool),
    Exported(PathBuf),
}

/// Composition root: one board, its history, storage and auto-save.
///
/// Call [`Session::close`] when done so the history listener is detached
/// and pending changes are saved.
pub struct Session<S: Storage + ?Sized> {
    board: Board,
    history: HistoryRecorder,
    gateway: PersistenceGateway<S>,
    autosaver: AutoSaver,
    export_dir: PathBuf,
}

impl<S: Storage + ?Sized> Session<S> {
    /// Open the board stored under `config.cache_key`. Cached content, if
    /// any, becomes the undo baseline.
    pub fn open(config: &AppConfig, storage: Arc<S>) -> Result<Self> {
        let mut board = Board::new(BoardConfig {
            size: config.size,
            background: config.background,
            restore_mode: RestoreMode::Immediate,
        });
        board.set_rasterizer(Box::new(SoftwareRenderer::new(config.render.clone())));

        let gateway = PersistenceGateway::new(storage, config.history.extra_props.clone());
        let history = gateway
            .open(&mut board, &config.cache_key, config.history.clone())
            .with_context(|| format!("failed to open board '{}'", config.cache_key))?;

        let autosaver = AutoSaver::new(config.cache_key.clone());
        autosaver.watch(&history);

        log::info!(
            "Opened '{}' with {} elements",
            config.cache_key,
            board.len()
        );
        Ok(Self {
            board,
            history,
            gateway,
            autosaver,
            export_dir: config.export_dir.clone(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn key(&self) -> &str {
        self.autosaver.key()
    }

    /// Run commands in order, auto-saving between them. Stops at the first
    /// failure.
    pub fn run(&mut self, commands: &[Command]) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::with_capacity(commands.len());
        for (index, command) in commands.iter().enumerate() {
            let outcome = self
                .apply(command)
                .with_context(|| format!("command {} failed", index + 1))?;
            self.autosaver
                .maybe_save(&self.gateway, &self.board, &self.history)
                .context("auto-save failed")?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Apply one command.
    pub fn apply(&mut self, command: &Command) -> Result<Outcome> {
        log::debug!("Applying {:?}", command);
        match command {
            Command::AddRect { name, x, y, width, height, corner_radius, style } => {
                let mut rect = Rectangle::new(Point::new(*x, *y), *width, *height);
                rect.corner_radius = *corner_radius;
                self.add(Shape::Rectangle(rect), name, style)
            }
            Command::AddEllipse { name, cx, cy, rx, ry, style } => {
                let ellipse = Ellipse::new(Point::new(*cx, *cy), *rx, *ry);
                self.add(Shape::Ellipse(ellipse), name, style)
            }
            Command::AddText { name, x, y, text, font_size, style } => {
                let mut shape = Text::new(Point::new(*x, *y), text.clone());
                if let Some(size) = font_size {
                    shape.font_size = *size;
                }
                self.add(Shape::Text(shape), name, style)
            }
            Command::AddPath { name, points, simplify, style } => {
                if points.is_empty() {
                    bail!("path needs at least one point");
                }
                let mut path = Path::from_points(points.iter().map(|[x, y]| Point::new(*x, *y)).collect());
                if let Some(tolerance) = simplify {
                    path.simplify(*tolerance);
                }
                self.add(Shape::Path(path), name, style)
            }
            Command::AddImage { name, x, y, file, max_width, max_height } => {
                let image = load_image(Point::new(*x, *y), file, *max_width, *max_height)?;
                self.add(Shape::Image(image), name, &StyleOverrides::default())
            }
            Command::Move { target, dx, dy } => {
                let id = self.resolve(target)?;
                self.board.translate(id, Vec2::new(*dx, *dy))?;
                Ok(Outcome::Applied)
            }
            Command::Skew { target, x, y } => {
                let id = self.resolve(target)?;
                self.board.skew(id, *x, *y)?;
                Ok(Outcome::Applied)
            }
            Command::Rotate { target, degrees } => {
                let id = self.resolve(target)?;
                self.board.rotate(id, *degrees)?;
                Ok(Outcome::Applied)
            }
            Command::SetStyle { target, style } => {
                let id = self.resolve(target)?;
                let mut updated = self
                    .board
                    .get(id)
                    .map(|element| element.shape.style().clone())
                    .unwrap_or_default();
                style.apply(&mut updated)?;
                self.board.set_style(id, updated)?;
                Ok(Outcome::Applied)
            }
            Command::Remove { target } => {
                let id = self.resolve(target)?;
                self.board.remove(id);
                Ok(Outcome::Applied)
            }
            Command::Group { targets, name } => {
                let ids = targets
                    .iter()
                    .map(|t| self.resolve(t))
                    .collect::<Result<Vec<_>>>()?;
                let group = self
                    .board
                    .group(&ids)
                    .ok_or_else(|| anyhow!("group needs at least two elements"))?;
                if let Some(name) = name {
                    self.board.set_attributes(group, named(name))?;
                }
                Ok(Outcome::Added(group))
            }
            Command::Undo => self.replay(true),
            Command::Redo => self.replay(false),
            Command::ClearHistory => {
                self.history.clear();
                Ok(Outcome::Applied)
            }
            Command::Save => {
                self.save()?;
                Ok(Outcome::Applied)
            }
            Command::Load => {
                let key = self.key().to_string();
                let loaded = self
                    .gateway
                    .load_recorded(&key, &self.history, &mut self.board)?;
                Ok(Outcome::Loaded(loaded))
            }
            Command::Export { format, out } => {
                let artifact = self.export(*format)?;
                let dir = out.as_ref().unwrap_or(&self.export_dir);
                let path = artifact.write_to(dir)?;
                log::info!("Exported {} ({} bytes)", path.display(), artifact.bytes.len());
                Ok(Outcome::Exported(path))
            }
            Command::Reset => {
                self.reset()?;
                Ok(Outcome::Applied)
            }
        }
    }

    /// Export the current board.
    pub fn export(&self, format: ExportFormat) -> Result<ExportArtifact> {
        let artifact = match format.raster() {
            Some(raster) => self.gateway.export_raster(&self.board, raster)?,
            None => self.gateway.export_json(&self.board)?,
        };
        Ok(artifact)
    }

    /// Save now, regardless of the auto-save interval.
    pub fn save(&mut self) -> Result<()> {
        self.autosaver.save_now(&self.gateway, &self.board)?;
        Ok(())
    }

    /// Delete the cached board and its history and clear the board.
    /// Callers must have confirmed with the user.
    pub fn reset(&mut self) -> Result<()> {
        let key = self.key().to_string();
        self.gateway.reset(&key, &self.history, &mut self.board)?;
        self.autosaver.mark_clean();
        Ok(())
    }

    /// Save unsaved changes and detach history.
    pub fn close(self) -> Result<()> {
        let Session {
            mut board,
            history,
            gateway,
            mut autosaver,
            ..
        } = self;
        let saved = if autosaver.is_dirty() {
            autosaver.save_now(&gateway, &board)
        } else {
            Ok(())
        };
        history.detach(&mut board);
        saved?;
        Ok(())
    }

    fn add(&mut self, mut shape: Shape, name: &Option<String>, style: &StyleOverrides) -> Result<Outcome> {
        style.apply(shape.style_mut())?;
        let attributes = match name.as_deref() {
            Some(name) => {
                if self.find(name).is_some() {
                    bail!("an element named '{}' already exists", name);
                }
                named(name)
            }
            None => Attributes::default(),
        };
        let id = self.board.add_element(Element { shape, attributes });
        Ok(Outcome::Added(id))
    }

    fn replay(&mut self, undo: bool) -> Result<Outcome> {
        let replayed = if undo {
            self.history.undo(&mut self.board, None)?
        } else {
            self.history.redo(&mut self.board, None)?
        };
        Ok(if replayed { Outcome::Applied } else { Outcome::Nothing })
    }

    fn find(&self, name: &str) -> Option<ShapeId> {
        self.board
            .elements()
            .iter()
            .find(|e| e.attributes.name.as_deref() == Some(name))
            .map(Element::id)
    }

    fn resolve(&self, name: &str) -> Result<ShapeId> {
        self.find(name)
            .ok_or_else(|| anyhow!("no element named '{}'", name))
    }
}

fn named(name: &str) -> Attributes {
    Attributes {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn load_image(
    position: Point,
    file: &std::path::Path,
    max_width: Option<f64>,
    max_height: Option<f64>,
) -> Result<Image> {
    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let format = ImageFormat::from_magic_bytes(&bytes)
        .or_else(|| {
            file.extension()
                .and_then(|ext| ext.to_str())
                .and_then(ImageFormat::from_extension)
        })
        .ok_or_else(|| anyhow!("unsupported image format: {}", file.display()))?;
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode {}", file.display()))?;

    let image = Image::new(position, &bytes, decoded.width(), decoded.height(), format);
    Ok(match (max_width, max_height) {
        (None, None) => image,
        (w, h) => image.fit_within(w.unwrap_or(f64::MAX), h.unwrap_or(f64::MAX)),
    })
}
