//! Frame renderer trait and the headless implementation

use crate::camera::Camera;
use crate::error::{RenderError, Result};
use crate::scene::{MeshId, NodeId, Scene};
use crate::video::{BackgroundTexture, CoverFit};
use devices::Viewport;
use glam::{Mat4, Vec3};

/// A polyline drawn on top of the scene (e.g. a guide path)
#[derive(Debug, Clone, PartialEq)]
pub struct LineStrip {
    pub points: Vec<Vec3>,
    pub color: [f32; 4],
}

/// One mesh to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: MeshId,
    pub model: Mat4,
    pub color: [f32; 4],
}

/// Everything needed to draw a single frame
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub camera: &'a Camera,
    pub scene: &'a Scene,
    pub background: &'a BackgroundTexture,
    pub cover: CoverFit,
    pub lines: &'a [LineStrip],
}

impl<'a> RenderFrame<'a> {
    /// Visible mesh nodes with their world matrices
    pub fn draw_list(&self) -> Vec<DrawItem> {
        self.scene
            .iter()
            .filter_map(|(id, node)| {
                let mesh = node.mesh?;
                if !self.scene.is_visible(id) {
                    return None;
                }
                Some(DrawItem {
                    node: id,
                    mesh,
                    model: self.scene.world_matrix(id)?,
                    color: node.color,
                })
            })
            .collect()
    }
}

/// Draws the AR view
///
/// Implementations own their GPU (or other) resources and release them in
/// [`FrameRenderer::dispose`], which must be idempotent.
pub trait FrameRenderer {
    /// Match the drawable size to the viewport
    fn resize(&mut self, viewport: Viewport);

    /// Draw background, scene, and overlays
    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()>;

    /// Release all resources
    fn dispose(&mut self);

    /// Get the name of the renderer
    fn name(&self) -> &str;
}

/// Renderer that draws nothing and records what it was asked to draw
#[derive(Debug, Default, Clone)]
pub struct NullRenderer {
    frames: u64,
    last_draw_count: usize,
    last_line_count: usize,
    last_background: Option<u64>,
    viewport: Option<Viewport>,
    disposed: bool,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Meshes in the most recent frame
    pub fn last_draw_count(&self) -> usize {
        self.last_draw_count
    }

    pub fn last_line_count(&self) -> usize {
        self.last_line_count
    }

    /// Background frame sequence of the most recent frame
    pub fn last_background(&self) -> Option<u64> {
        self.last_background
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl FrameRenderer for NullRenderer {
    fn resize(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        self.frames += 1;
        self.last_draw_count = frame.draw_list().len();
        self.last_line_count = frame.lines.len();
        self.last_background = (!frame.background.is_empty()).then_some(frame.background.sequence);
        Ok(())
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn name(&self) -> &str {
        "null"
    }
}
