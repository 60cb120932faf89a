//! Rendering for the location-based AR view
//!
//! # Modules
//!
//! - [`camera`]: Perspective camera and screen rays
//! - [`scene`]: Scene graph with geo-anchored nodes and marker tags
//! - [`mesh`]: Coin and quad geometry
//! - [`raycast`]: Ray/mesh intersection for picking
//! - [`video`]: Camera video background with cover-fit UVs
//! - [`frame`]: The [`FrameRenderer`] trait and a headless renderer
//! - [`gl_renderer`]: OpenGL implementation using `glow`

pub mod camera;
pub mod error;
pub mod frame;
pub mod gl_renderer;
pub mod mesh;
pub mod raycast;
pub mod scene;
pub mod shader_utils;
pub mod video;

pub use camera::{Camera, DEFAULT_VFOV};
pub use error::{RenderError, Result};
pub use frame::{DrawItem, FrameRenderer, LineStrip, NullRenderer, RenderFrame};
pub use gl_renderer::GlFrameRenderer;
pub use mesh::Mesh;
pub use raycast::{Ray, RayHit, Raycaster};
pub use scene::{GeoAnchor, MarkerId, MeshId, Node, NodeId, Scene, Transform};
pub use video::{BackgroundTexture, CameraVideoCompositor, CoverFit};
