//! OpenGL frame renderer
//!
//! Draws the camera video as a full-screen textured quad, then the scene
//! meshes with flat colour and simple lighting, then line overlays without
//! depth testing. Shaders target GLSL ES 3.00 so the same code runs on
//! desktop GL and WebGL 2.

use crate::error::{RenderError, Result};
use crate::frame::{FrameRenderer, RenderFrame};
use crate::mesh::Mesh;
use crate::scene::MeshId;
use crate::shader_utils::create_program;
use crate::video::BackgroundTexture;
use devices::Viewport;
use glam::Vec3;
use glow::*;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};

/// Direction towards the light (normalized)
const LIGHT_DIR: Vec3 = Vec3::new(0.431934, 0.863868, 0.259161);
const AMBIENT: f32 = 0.45;
const DIFFUSE_STRENGTH: f32 = 0.7;

/// Compiled mesh ready for GL rendering
struct GlMesh {
    vao: NativeVertexArray,
    vbo: NativeBuffer,
    ebo: NativeBuffer,
    index_count: i32,
}

/// Uploaded state of the background texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UploadedFrame {
    sequence: u64,
    width: u32,
    height: u32,
}

/// GL implementation of [`FrameRenderer`]
pub struct GlFrameRenderer {
    gl: Rc<Context>,
    background_program: NativeProgram,
    mesh_program: NativeProgram,
    line_program: NativeProgram,
    quad_vao: NativeVertexArray,
    quad_vbo: NativeBuffer,
    line_vao: NativeVertexArray,
    line_vbo: NativeBuffer,
    video_texture: NativeTexture,
    uploaded: Option<UploadedFrame>,
    meshes: HashMap<MeshId, GlMesh>,
    framebuffer_size: (i32, i32),
    disposed: bool,
}

impl GlFrameRenderer {
    /// Create GL resources
    ///
    /// # Safety
    ///
    /// Must be called with an active GL context on the current thread.
    pub unsafe fn new(gl: Rc<Context>, viewport: Viewport) -> Result<Self> {
        unsafe {
            let background_program = create_program(&gl, BACKGROUND_VERTEX, BACKGROUND_FRAGMENT)?;
            let mesh_program = create_program(&gl, MESH_VERTEX, MESH_FRAGMENT)?;
            let line_program = create_program(&gl, LINE_VERTEX, LINE_FRAGMENT)?;

            // Fullscreen quad (two triangles covering screen) in NDC
            #[rustfmt::skip]
            let vertices: [f32; 12] = [
                -1.0, -1.0,
                 1.0, -1.0,
                 1.0,  1.0,
                -1.0, -1.0,
                 1.0,  1.0,
                -1.0,  1.0,
            ];

            let quad_vao = gl
                .create_vertex_array()
                .map_err(|e| RenderError::resource("VAO", e))?;
            gl.bind_vertex_array(Some(quad_vao));
            let quad_vbo = gl
                .create_buffer()
                .map_err(|e| RenderError::resource("VBO", e))?;
            gl.bind_buffer(ARRAY_BUFFER, Some(quad_vbo));
            gl.buffer_data_u8_slice(ARRAY_BUFFER, bytemuck::cast_slice(&vertices), STATIC_DRAW);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, FLOAT, false, 8, 0);

            let line_vao = gl
                .create_vertex_array()
                .map_err(|e| RenderError::resource("VAO", e))?;
            gl.bind_vertex_array(Some(line_vao));
            let line_vbo = gl
                .create_buffer()
                .map_err(|e| RenderError::resource("VBO", e))?;
            gl.bind_buffer(ARRAY_BUFFER, Some(line_vbo));
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, FLOAT, false, 12, 0);

            gl.bind_vertex_array(None);
            gl.bind_buffer(ARRAY_BUFFER, None);

            let video_texture = gl
                .create_texture()
                .map_err(|e| RenderError::resource("texture", e))?;
            gl.bind_texture(TEXTURE_2D, Some(video_texture));
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MIN_FILTER, LINEAR as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MAG_FILTER, LINEAR as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_S, CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_T, CLAMP_TO_EDGE as i32);
            gl.bind_texture(TEXTURE_2D, None);

            info!("GL frame renderer initialized");

            let (width, height) = viewport.physical_size();
            Ok(Self {
                gl,
                background_program,
                mesh_program,
                line_program,
                quad_vao,
                quad_vbo,
                line_vao,
                line_vbo,
                video_texture,
                uploaded: None,
                meshes: HashMap::new(),
                framebuffer_size: (width as i32, height as i32),
                disposed: false,
            })
        }
    }

    /// Upload a scene mesh on first use
    unsafe fn ensure_mesh(&mut self, id: MeshId, mesh: &Mesh) -> Result<()> {
        if self.meshes.contains_key(&id) {
            return Ok(());
        }
        unsafe {
            let gl = &self.gl;
            let vao = gl
                .create_vertex_array()
                .map_err(|e| RenderError::resource("VAO", e))?;
            gl.bind_vertex_array(Some(vao));

            // Interleaved vertex data: [position(3), normal(3)]
            let vbo = gl
                .create_buffer()
                .map_err(|e| RenderError::resource("VBO", e))?;
            gl.bind_buffer(ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.vertex_data()),
                STATIC_DRAW,
            );
            let stride = 6 * std::mem::size_of::<f32>() as i32;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, FLOAT, false, stride, 3 * 4);

            let ebo = gl
                .create_buffer()
                .map_err(|e| RenderError::resource("EBO", e))?;
            gl.bind_buffer(ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.indices),
                STATIC_DRAW,
            );

            gl.bind_vertex_array(None);

            debug!(mesh = id.index(), triangles = mesh.triangle_count(), "uploaded mesh");
            self.meshes.insert(
                id,
                GlMesh {
                    vao,
                    vbo,
                    ebo,
                    index_count: mesh.indices.len() as i32,
                },
            );
        }
        Ok(())
    }

    /// Copy a new video frame into the texture if the sequence advanced
    unsafe fn upload_background(&mut self, background: &BackgroundTexture) {
        let Some(pixels) = background.pixels.as_ref() else {
            return;
        };
        let frame = UploadedFrame {
            sequence: background.sequence,
            width: background.width,
            height: background.height,
        };
        if self.uploaded == Some(frame) {
            return;
        }

        unsafe {
            let gl = &self.gl;
            gl.bind_texture(TEXTURE_2D, Some(self.video_texture));
            let same_size = self
                .uploaded
                .is_some_and(|u| u.width == frame.width && u.height == frame.height);
            if same_size {
                gl.tex_sub_image_2d(
                    TEXTURE_2D,
                    0,
                    0,
                    0,
                    frame.width as i32,
                    frame.height as i32,
                    RGBA,
                    UNSIGNED_BYTE,
                    PixelUnpackData::Slice(Some(&pixels[..])),
                );
            } else {
                gl.tex_image_2d(
                    TEXTURE_2D,
                    0,
                    RGBA8 as i32,
                    frame.width as i32,
                    frame.height as i32,
                    0,
                    RGBA,
                    UNSIGNED_BYTE,
                    PixelUnpackData::Slice(Some(&pixels[..])),
                );
            }
            gl.bind_texture(TEXTURE_2D, None);
        }
        self.uploaded = Some(frame);
    }

    unsafe fn draw_background(&mut self, frame: &RenderFrame<'_>) {
        unsafe {
            self.upload_background(frame.background);
            if self.uploaded.is_none() {
                return;
            }

            let gl = &self.gl;
            gl.disable(DEPTH_TEST);
            gl.depth_mask(false);

            gl.use_program(Some(self.background_program));
            gl.active_texture(TEXTURE0);
            gl.bind_texture(TEXTURE_2D, Some(self.video_texture));

            let program = self.background_program;
            let sampler_loc = gl.get_uniform_location(program, "uVideo");
            gl.uniform_1_i32(sampler_loc.as_ref(), 0);
            let scale_loc = gl.get_uniform_location(program, "uUvScale");
            gl.uniform_2_f32(scale_loc.as_ref(), frame.cover.scale.x, frame.cover.scale.y);
            let offset_loc = gl.get_uniform_location(program, "uUvOffset");
            gl.uniform_2_f32(offset_loc.as_ref(), frame.cover.offset.x, frame.cover.offset.y);

            gl.bind_vertex_array(Some(self.quad_vao));
            gl.draw_arrays(TRIANGLES, 0, 6);

            gl.bind_vertex_array(None);
            gl.bind_texture(TEXTURE_2D, None);
            gl.use_program(None);
            gl.depth_mask(true);
        }
    }

    unsafe fn draw_meshes(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        let view_proj = frame.camera.view_projection();
        let items = frame.draw_list();

        for item in &items {
            if let Some(mesh) = frame.scene.mesh(item.mesh) {
                unsafe { self.ensure_mesh(item.mesh, mesh)? };
            }
        }

        unsafe {
            let gl = &self.gl;
            let program = self.mesh_program;
            gl.enable(DEPTH_TEST);
            gl.depth_func(LESS);
            gl.enable(BLEND);
            gl.blend_func(SRC_ALPHA, ONE_MINUS_SRC_ALPHA);
            gl.use_program(Some(program));

            let light_dir_loc = gl.get_uniform_location(program, "uLightDir");
            gl.uniform_3_f32(light_dir_loc.as_ref(), LIGHT_DIR.x, LIGHT_DIR.y, LIGHT_DIR.z);
            let ambient_loc = gl.get_uniform_location(program, "uAmbient");
            gl.uniform_1_f32(ambient_loc.as_ref(), AMBIENT);
            let diffuse_strength_loc = gl.get_uniform_location(program, "uDiffuseStrength");
            gl.uniform_1_f32(diffuse_strength_loc.as_ref(), DIFFUSE_STRENGTH);

            let mvp_loc = gl.get_uniform_location(program, "uMVP");
            let model_loc = gl.get_uniform_location(program, "uModel");
            let color_loc = gl.get_uniform_location(program, "uColor");

            for item in &items {
                let Some(mesh) = self.meshes.get(&item.mesh) else {
                    continue;
                };
                let mvp = view_proj * item.model;
                gl.uniform_matrix_4_f32_slice(mvp_loc.as_ref(), false, &mvp.to_cols_array());
                gl.uniform_matrix_4_f32_slice(model_loc.as_ref(), false, &item.model.to_cols_array());
                let [r, g, b, a] = item.color;
                gl.uniform_4_f32(color_loc.as_ref(), r, g, b, a);

                gl.bind_vertex_array(Some(mesh.vao));
                gl.draw_elements(TRIANGLES, mesh.index_count, UNSIGNED_INT, 0);
            }

            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
        Ok(())
    }

    unsafe fn draw_lines(&mut self, frame: &RenderFrame<'_>) {
        if frame.lines.is_empty() {
            return;
        }
        let view_proj = frame.camera.view_projection();

        unsafe {
            let gl = &self.gl;
            let program = self.line_program;
            gl.disable(DEPTH_TEST);
            gl.use_program(Some(program));
            let mvp_loc = gl.get_uniform_location(program, "uMVP");
            gl.uniform_matrix_4_f32_slice(mvp_loc.as_ref(), false, &view_proj.to_cols_array());
            let color_loc = gl.get_uniform_location(program, "uColor");

            gl.bind_vertex_array(Some(self.line_vao));
            gl.bind_buffer(ARRAY_BUFFER, Some(self.line_vbo));
            for strip in frame.lines.iter().filter(|s| s.points.len() >= 2) {
                let data: Vec<f32> = strip.points.iter().flat_map(|p| p.to_array()).collect();
                gl.buffer_data_u8_slice(ARRAY_BUFFER, bytemuck::cast_slice(&data), DYNAMIC_DRAW);
                let [r, g, b, a] = strip.color;
                gl.uniform_4_f32(color_loc.as_ref(), r, g, b, a);
                gl.draw_arrays(LINE_STRIP, 0, strip.points.len() as i32);
            }

            gl.bind_buffer(ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.enable(DEPTH_TEST);
        }
    }

    /// Number of meshes uploaded to the GPU
    pub fn uploaded_meshes(&self) -> usize {
        self.meshes.len()
    }
}

impl FrameRenderer for GlFrameRenderer {
    fn resize(&mut self, viewport: Viewport) {
        let (width, height) = viewport.physical_size();
        self.framebuffer_size = (width as i32, height as i32);
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        unsafe {
            let (width, height) = self.framebuffer_size;
            self.gl.viewport(0, 0, width, height);
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl.clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT);

            self.draw_background(frame);
            self.draw_meshes(frame)?;
            self.draw_lines(frame);
        }
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        unsafe {
            let gl = &self.gl;
            for (_, mesh) in self.meshes.drain() {
                gl.delete_vertex_array(mesh.vao);
                gl.delete_buffer(mesh.vbo);
                gl.delete_buffer(mesh.ebo);
            }
            gl.delete_vertex_array(self.quad_vao);
            gl.delete_buffer(self.quad_vbo);
            gl.delete_vertex_array(self.line_vao);
            gl.delete_buffer(self.line_vbo);
            gl.delete_texture(self.video_texture);
            gl.delete_program(self.background_program);
            gl.delete_program(self.mesh_program);
            gl.delete_program(self.line_program);
        }
        self.uploaded = None;
        info!("GL frame renderer disposed");
    }

    fn name(&self) -> &str {
        "gl"
    }
}

const BACKGROUND_VERTEX: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec2 aPosition;

uniform vec2 uUvScale;
uniform vec2 uUvOffset;

out vec2 vUv;

void main() {
    // Video rows are stored top-first
    vec2 uv = vec2(aPosition.x * 0.5 + 0.5, 0.5 - aPosition.y * 0.5);
    vUv = uv * uUvScale + uUvOffset;
    gl_Position = vec4(aPosition, 0.0, 1.0);
}
"#;

const BACKGROUND_FRAGMENT: &str = r#"#version 300 es
precision highp float;

in vec2 vUv;

uniform sampler2D uVideo;

out vec4 FragColor;

void main() {
    FragColor = vec4(texture(uVideo, vUv).rgb, 1.0);
}
"#;

const MESH_VERTEX: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec3 aPosition;
layout(location = 1) in vec3 aNormal;

uniform mat4 uMVP;
uniform mat4 uModel;

out vec3 vNormal;

void main() {
    gl_Position = uMVP * vec4(aPosition, 1.0);
    vNormal = mat3(uModel) * aNormal;
}
"#;

const MESH_FRAGMENT: &str = r#"#version 300 es
precision highp float;

in vec3 vNormal;

uniform vec3 uLightDir;
uniform float uAmbient;
uniform float uDiffuseStrength;
uniform vec4 uColor;

out vec4 FragColor;

void main() {
    vec3 normal = normalize(vNormal);
    // Two-sided: coins and cards are seen from both faces
    float diffuse = abs(dot(normal, uLightDir));
    vec3 lighting = uColor.rgb * (uAmbient + diffuse * uDiffuseStrength);
    FragColor = vec4(min(lighting, vec3(1.0)), uColor.a);
}
"#;

const LINE_VERTEX: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec3 aPosition;

uniform mat4 uMVP;

void main() {
    gl_Position = uMVP * vec4(aPosition, 1.0);
}
"#;

const LINE_FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform vec4 uColor;

out vec4 FragColor;

void main() {
    FragColor = uColor;
}
"#;
