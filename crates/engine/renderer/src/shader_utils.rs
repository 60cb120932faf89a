//! Shared shader compilation utilities for OpenGL renderers

use crate::error::{RenderError, Result};
use glow::*;

/// Compile a shader from source code
///
/// # Safety
/// Requires an active OpenGL context
pub unsafe fn compile_shader(gl: &Context, shader_type: u32, source: &str) -> Result<Shader> {
    unsafe {
        let shader = gl
            .create_shader(shader_type)
            .map_err(RenderError::Shader)?;

        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(RenderError::Shader(log));
        }

        Ok(shader)
    }
}

/// Create and link a shader program from vertex and fragment shader sources
///
/// # Safety
/// Requires an active OpenGL context
pub unsafe fn create_program(gl: &Context, vertex_src: &str, fragment_src: &str) -> Result<Program> {
    unsafe {
        let program = gl.create_program().map_err(RenderError::Link)?;

        let vertex_shader = compile_shader(gl, VERTEX_SHADER, vertex_src)?;
        let fragment_shader = compile_shader(gl, FRAGMENT_SHADER, fragment_src)?;

        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.link_program(program);

        let linked = gl.get_program_link_status(program);
        let log = if linked {
            String::new()
        } else {
            gl.get_program_info_log(program)
        };

        gl.detach_shader(program, vertex_shader);
        gl.detach_shader(program, fragment_shader);
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        if !linked {
            gl.delete_program(program);
            return Err(RenderError::Link(log));
        }

        Ok(program)
    }
}
