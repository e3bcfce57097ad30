use core::{ffi::c_void, mem, ptr};

use anyhow::bail;
use tracing::trace;

use crate::gl::{
    self,
    types::{GLenum, GLint, GLuint},
};

#[derive(Clone, Copy)]
#[repr(C)]
struct Vertex {
    pub pos: (f32, f32),
}
type VertexArray = [Vertex; 4];
const VERTICES: VertexArray = [
    Vertex { pos: (0.0, 1.0) }, // bottom left
    Vertex { pos: (0.0, 0.0) }, // top left
    Vertex { pos: (1.0, 1.0) }, // bottom right
    Vertex { pos: (1.0, 0.0) }, // top right
];

static VERTEX_SHADER: &str = include_str!("opengl/shaders/texture.vert");
static FRAGMENT_SHADER: &str = include_str!("opengl/shaders/texture.frag");

/// Frame texture living in the GL context of the owning backend.
pub struct GlTexture {
    id: GLuint,
    size: (u32, u32),
}

impl GlTexture {
    /// Allocate BGRA texture storage of `size`. Contents are undefined until uploaded.
    ///
    /// # Safety
    /// The owning GL context must be current.
    pub unsafe fn new(size: (u32, u32)) -> Self {
        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
            gl::BindTexture(gl::TEXTURE_2D, id);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as _);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as _);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as _);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as _);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as _,
                size.0 as _,
                size.1 as _,
                0,
                gl::BGRA,
                gl::UNSIGNED_BYTE,
                ptr::null(),
            );
        }

        Self { id, size }
    }

    /// Replace the whole texture contents.
    ///
    /// # Safety
    /// The owning GL context must be current and `pixels` must cover the texture size.
    pub unsafe fn upload(&mut self, pixels: &[u8]) {
        debug_assert!(pixels.len() >= self.size.0 as usize * self.size.1 as usize * 4);

        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, self.id);
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 4);
            gl::TexSubImage2D(
                gl::TEXTURE_2D,
                0,
                0,
                0,
                self.size.0 as _,
                self.size.1 as _,
                gl::BGRA,
                gl::UNSIGNED_BYTE,
                pixels.as_ptr().cast(),
            );
        }
    }

    /// # Safety
    /// The owning GL context must be current.
    pub unsafe fn delete(self) {
        unsafe {
            gl::DeleteTextures(1, &self.id);
        }
    }
}

/// Draws a texture over the whole viewport.
pub struct QuadRenderer {
    vertex_buffer: GLuint,
    vao: GLuint,
    program: GLuint,
    tex_loc: GLint,
}

impl QuadRenderer {
    /// # Safety
    /// A GL context must be current and stay current for the renderer's whole lifetime use.
    #[tracing::instrument]
    pub unsafe fn new() -> anyhow::Result<Self> {
        unsafe {
            let vert_shader = compile_shader(gl::VERTEX_SHADER, VERTEX_SHADER)?;
            let frag_shader = match compile_shader(gl::FRAGMENT_SHADER, FRAGMENT_SHADER) {
                Ok(shader) => shader,
                Err(err) => {
                    gl::DeleteShader(vert_shader);
                    return Err(err);
                }
            };

            let program = gl::CreateProgram();
            gl::AttachShader(program, vert_shader);
            gl::AttachShader(program, frag_shader);
            gl::BindAttribLocation(program, 0, b"pos\0".as_ptr().cast());
            gl::LinkProgram(program);

            gl::DeleteShader(vert_shader);
            gl::DeleteShader(frag_shader);

            let mut status = 0;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
            if status == 0 {
                gl::DeleteProgram(program);
                bail!("texture program failed to link");
            }

            let tex_loc = gl::GetUniformLocation(program, b"tex\0".as_ptr().cast());

            let mut vertex_buffer = 0;
            gl::GenBuffers(1, &mut vertex_buffer);
            gl::BindBuffer(gl::ARRAY_BUFFER, vertex_buffer);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                mem::size_of::<VertexArray>() as _,
                &VERTICES as *const _ as _,
                gl::STATIC_DRAW,
            );

            let mut vao = 0;
            gl::GenVertexArrays(1, &mut vao);
            gl::BindVertexArray(vao);
            gl::VertexAttribPointer(
                0,
                2,
                gl::FLOAT,
                gl::FALSE,
                mem::size_of::<Vertex>() as _,
                ptr::null::<c_void>().with_addr(mem::offset_of!(Vertex, pos)),
            );
            gl::EnableVertexAttribArray(0);

            gl::Disable(gl::DEPTH_TEST);
            gl::Disable(gl::CULL_FACE);
            gl::Disable(gl::STENCIL_TEST);
            gl::ClearColor(0.0, 0.0, 0.0, 0.0);

            Ok(Self {
                vertex_buffer,
                vao,
                program,
                tex_loc,
            })
        }
    }

    /// # Safety
    /// The GL context the renderer was created in must be current.
    pub unsafe fn set_viewport(&self, size: (u32, u32)) {
        unsafe {
            gl::Viewport(0, 0, size.0 as _, size.1 as _);
        }
    }

    /// Clear to transparent and draw `texture` as one full-surface quad.
    ///
    /// # Safety
    /// The GL context the renderer was created in must be current.
    pub unsafe fn draw(&self, texture: &GlTexture) {
        unsafe {
            gl::Clear(gl::COLOR_BUFFER_BIT);

            gl::Enable(gl::BLEND);
            gl::BlendEquation(gl::FUNC_ADD);
            gl::BlendFuncSeparate(
                gl::SRC_ALPHA,
                gl::ONE_MINUS_SRC_ALPHA,
                gl::ONE,
                gl::ONE_MINUS_SRC_ALPHA,
            );

            gl::BindBuffer(gl::ARRAY_BUFFER, self.vertex_buffer);
            gl::BindVertexArray(self.vao);
            gl::UseProgram(self.program);

            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, texture.id);
            gl::Uniform1i(self.tex_loc, 0);

            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, 4);
        }
    }
}

impl Drop for QuadRenderer {
    #[tracing::instrument(skip(self))]
    fn drop(&mut self) {
        unsafe {
            gl::DeleteVertexArrays(1, &self.vao);
            gl::DeleteBuffers(1, &self.vertex_buffer);
            gl::DeleteProgram(self.program);
        }
        trace!("OpenGL resources freed");
    }
}

unsafe fn compile_shader(ty: GLenum, source: &str) -> anyhow::Result<GLuint> {
    unsafe {
        let shader = gl::CreateShader(ty);
        gl::ShaderSource(
            shader,
            1,
            &source.as_ptr().cast(),
            &(source.len() as GLint),
        );
        gl::CompileShader(shader);

        let mut status = 0;
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        if status == 0 {
            gl::DeleteShader(shader);
            bail!("shader {ty:#x} failed to compile");
        }

        Ok(shader)
    }
}
