//! Rendering errors

use geoar_map::ProjectionError;

/// Errors raised while building or drawing the AR scene
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A GLSL shader failed to compile
    #[error("Shader compilation error: {0}")]
    Shader(String),

    /// A shader program failed to link
    #[error("Program link error: {0}")]
    Link(String),

    /// A GL object (buffer, texture, vertex array) could not be created
    #[error("Failed to create {kind}: {message}")]
    Resource { kind: &'static str, message: String },

    /// The renderer was used after `dispose`
    #[error("Renderer has been disposed")]
    Disposed,

    /// The node handle does not refer to a live scene node
    #[error("Unknown scene node {0:?}")]
    UnknownNode(crate::scene::NodeId),

    /// A geo-anchored node could not be placed
    #[error("Failed to place geo anchor: {0}")]
    Projection(#[from] ProjectionError),
}

impl RenderError {
    pub(crate) fn resource(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Resource {
            kind,
            message: message.into(),
        }
    }
}

/// Result alias for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;
