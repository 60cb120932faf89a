//! Live camera video background
//!
//! [`CameraVideoCompositor`] owns the rear camera stream for the lifetime of
//! the AR view and copies each new frame into a [`BackgroundTexture`] that
//! the frame renderer draws behind the scene. The texture is sampled with
//! cover-fit UVs so the video fills the viewport without distortion.

use devices::{CameraBackend, CameraError, VideoConstraints, VideoSettings, VideoStream, Viewport};
use glam::Vec2;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// UV transform that center-crops the video to the viewport aspect ratio
///
/// A texture coordinate `uv` in [0, 1] maps to `uv * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub scale: Vec2,
    pub offset: Vec2,
}

impl CoverFit {
    pub const IDENTITY: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    /// Compute the crop for a video and viewport aspect ratio (width / height)
    pub fn compute(video_aspect: f32, viewport_aspect: f32) -> Self {
        if !(video_aspect > 0.0 && viewport_aspect > 0.0) {
            return Self::IDENTITY;
        }
        let scale = if video_aspect > viewport_aspect {
            // Video is wider: crop the sides
            Vec2::new(viewport_aspect / video_aspect, 1.0)
        } else {
            // Video is taller: crop top and bottom
            Vec2::new(1.0, video_aspect / viewport_aspect)
        };
        Self {
            scale,
            offset: (Vec2::ONE - scale) * 0.5,
        }
    }

    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv * self.scale + self.offset
    }
}

impl Default for CoverFit {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// CPU copy of the most recent video frame
#[derive(Debug, Clone, Default)]
pub struct BackgroundTexture {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, `None` until the first frame arrives
    pub pixels: Option<Arc<[u8]>>,
    /// Sequence number of the frame currently held
    pub sequence: u64,
    uploads: u64,
}

impl BackgroundTexture {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_none()
    }

    /// Number of frames copied in so far
    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

/// Renders the rear camera feed as the scene background
pub struct CameraVideoCompositor {
    stream: Option<Box<dyn VideoStream>>,
    settings: VideoSettings,
    texture: BackgroundTexture,
    viewport: Viewport,
    cover: CoverFit,
}

impl CameraVideoCompositor {
    /// Confirm camera permission without keeping the stream
    ///
    /// Opens the camera and stops every track immediately.
    pub async fn probe(
        camera: &dyn CameraBackend,
        constraints: VideoConstraints,
    ) -> Result<VideoSettings, CameraError> {
        let mut stream = camera.open(constraints).await?;
        let settings = stream.settings();
        stream.stop();
        debug!(width = settings.width, height = settings.height, "camera probe succeeded");
        Ok(settings)
    }

    /// Open the rear camera for the AR view
    pub async fn acquire(
        camera: &dyn CameraBackend,
        constraints: VideoConstraints,
        viewport: Viewport,
    ) -> Result<Self, CameraError> {
        let stream = camera.open(constraints).await?;
        Ok(Self::from_stream(stream, viewport))
    }

    /// Wrap an already opened stream
    pub fn from_stream(stream: Box<dyn VideoStream>, viewport: Viewport) -> Self {
        let settings = stream.settings();
        info!(
            width = settings.width,
            height = settings.height,
            "camera stream acquired"
        );
        Self {
            stream: Some(stream),
            settings,
            texture: BackgroundTexture::default(),
            cover: CoverFit::compute(settings.aspect_ratio(), viewport.aspect_ratio()),
            viewport,
        }
    }

    /// Copy the latest frame into the background texture
    ///
    /// Returns true if a new frame was copied. Frames are only copied when
    /// the stream's sequence number advances.
    pub fn update(&mut self) -> bool {
        let Some(stream) = self.stream.as_ref().filter(|s| s.is_live()) else {
            return false;
        };
        let Some(frame) = stream.latest_frame() else {
            return false;
        };
        if !self.texture.is_empty() && frame.sequence == self.texture.sequence {
            return false;
        }
        if !frame.is_well_formed() {
            warn!(sequence = frame.sequence, "dropping malformed video frame");
            return false;
        }

        if frame.width != self.texture.width || frame.height != self.texture.height {
            self.settings = VideoSettings {
                width: frame.width,
                height: frame.height,
            };
            self.refit();
        }

        self.texture.width = frame.width;
        self.texture.height = frame.height;
        self.texture.sequence = frame.sequence;
        self.texture.pixels = Some(frame.pixels);
        self.texture.uploads += 1;
        true
    }

    /// Recompute the cover fit for a new viewport
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.refit();
    }

    fn refit(&mut self) {
        self.cover = CoverFit::compute(self.settings.aspect_ratio(), self.viewport.aspect_ratio());
    }

    /// Stop all tracks and release the frame; idempotent
    pub fn dispose(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!("camera stream released");
        }
        self.texture = BackgroundTexture::default();
    }

    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_live())
    }

    pub fn settings(&self) -> VideoSettings {
        self.settings
    }

    pub fn background(&self) -> &BackgroundTexture {
        &self.texture
    }

    pub fn cover_fit(&self) -> CoverFit {
        self.cover
    }
}

impl Drop for CameraVideoCompositor {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for CameraVideoCompositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraVideoCompositor")
            .field("active", &self.is_active())
            .field("settings", &self.settings)
            .field("sequence", &self.texture.sequence)
            .field("cover", &self.cover)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_fit_landscape_video_portrait_screen() {
        let fit = CoverFit::compute(16.0 / 9.0, 390.0 / 844.0);
        assert_eq!(fit.scale.y, 1.0);
        assert!(fit.scale.x < 0.3);
        // Center crop keeps the middle of the frame
        let mid = fit.apply(Vec2::splat(0.5));
        assert!((mid - Vec2::splat(0.5)).length() < 1e-6);
        assert!((fit.apply(Vec2::ZERO).x - fit.offset.x).abs() < 1e-6);
    }

    #[test]
    fn test_cover_fit_tall_video() {
        let fit = CoverFit::compute(0.5, 2.0);
        assert_eq!(fit.scale, Vec2::new(1.0, 0.25));
        assert_eq!(fit.offset, Vec2::new(0.0, 0.375));
    }

    #[test]
    fn test_cover_fit_degenerate() {
        assert_eq!(CoverFit::compute(0.0, 1.0), CoverFit::IDENTITY);
        assert_eq!(CoverFit::compute(f32::NAN, 1.0), CoverFit::IDENTITY);
    }
}
