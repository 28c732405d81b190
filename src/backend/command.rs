//! Backend-neutral command buffer entries

use crate::backend::objects::*;
use crate::backend::types::*;

/// One contiguous range of a multi-draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    pub first: u32,
    pub count: u32,
}

impl DrawRange {
    pub fn new(first: u32, count: u32) -> Self {
        Self { first, count }
    }
}

/// Draw call shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Array {
        first: u32,
        count: u32,
    },
    Indexed {
        first: u32,
        count: u32,
    },
    InstancedArray {
        first: u32,
        count: u32,
        instances: u32,
    },
    InstancedArrayBaseInstance {
        first: u32,
        count: u32,
        instances: u32,
        base_instance: u32,
    },
    InstancedIndexed {
        first: u32,
        count: u32,
        instances: u32,
    },
    MultiArray {
        ranges: Vec<DrawRange>,
    },
    MultiIndexed {
        ranges: Vec<DrawRange>,
    },
    IndexedBaseVertex {
        first: u32,
        count: u32,
        base_vertex: i32,
    },
    InstancedIndexedBaseVertex {
        first: u32,
        count: u32,
        instances: u32,
        base_vertex: i32,
    },
    MultiIndexedBaseVertex {
        ranges: Vec<DrawRange>,
        base_vertices: Vec<i32>,
    },
}

impl DrawCall {
    /// Whether the call reads the bound index buffer.
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            DrawCall::Indexed { .. }
                | DrawCall::InstancedIndexed { .. }
                | DrawCall::MultiIndexed { .. }
                | DrawCall::IndexedBaseVertex { .. }
                | DrawCall::InstancedIndexedBaseVertex { .. }
                | DrawCall::MultiIndexedBaseVertex { .. }
        )
    }

    pub fn instance_count(&self) -> u32 {
        match self {
            DrawCall::InstancedArray { instances, .. }
            | DrawCall::InstancedArrayBaseInstance { instances, .. }
            | DrawCall::InstancedIndexed { instances, .. }
            | DrawCall::InstancedIndexedBaseVertex { instances, .. } => *instances,
            _ => 1,
        }
    }

    /// Total number of vertices or indices consumed per instance.
    pub fn element_count(&self) -> u32 {
        match self {
            DrawCall::Array { count, .. }
            | DrawCall::Indexed { count, .. }
            | DrawCall::InstancedArray { count, .. }
            | DrawCall::InstancedArrayBaseInstance { count, .. }
            | DrawCall::InstancedIndexed { count, .. }
            | DrawCall::IndexedBaseVertex { count, .. }
            | DrawCall::InstancedIndexedBaseVertex { count, .. } => *count,
            DrawCall::MultiArray { ranges }
            | DrawCall::MultiIndexed { ranges }
            | DrawCall::MultiIndexedBaseVertex { ranges, .. } => {
                ranges.iter().map(|r| r.count).sum()
            }
        }
    }
}

/// A command recorded into a [`CommandBuffer`].
///
/// Buffer commands (uploads, copies, blits) and render commands (everything
/// between `BeginRenderPass` and `EndRenderPass`) are recorded into separate
/// command buffers by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    UploadBuffer {
        buffer: BufferObject,
        offset: u64,
        data: Vec<u8>,
    },
    UploadTexture {
        texture: TextureBuffer,
        image: Image,
    },
    UploadCubeMapFace {
        texture: TextureBuffer,
        face: CubeMapFace,
        image: Image,
    },
    UploadTextureArrayLayer {
        texture: TextureArrayBuffer,
        layer: u32,
        image: Image,
    },
    CopyBuffer {
        source: BufferObject,
        target: BufferObject,
    },
    CopyTexture {
        source: TextureBuffer,
        target: TextureBuffer,
    },
    CopyTextureArray {
        source: TextureArrayBuffer,
        target: TextureArrayBuffer,
    },
    SetAttachments {
        target: RenderTarget,
        colors: Vec<Attachment>,
        depth_stencil: Option<Attachment>,
    },
    Blit {
        source: RenderTarget,
        target: RenderTarget,
        source_rect: Rect,
        target_rect: Rect,
        kind: BlitKind,
        filter: FilterMode,
    },
    BeginRenderPass {
        pass: RenderPass,
        target: RenderTarget,
    },
    Clear(ClearValues),
    SetViewport(Viewport),
    BindPipeline(RenderPipeline),
    BindVertexArray {
        vertex_array: VertexArrayObject,
        vertices: VertexBuffer,
        indices: Option<IndexBuffer>,
        instances: Option<VertexBuffer>,
    },
    BindShaderResources(Vec<ShaderResource>),
    Draw(DrawCall),
    EndRenderPass,
}

impl GpuCommand {
    /// Short name used in trace logs.
    pub fn name(&self) -> &'static str {
        match self {
            GpuCommand::UploadBuffer { .. } => "upload_buffer",
            GpuCommand::UploadTexture { .. } => "upload_texture",
            GpuCommand::UploadCubeMapFace { .. } => "upload_cube_map_face",
            GpuCommand::UploadTextureArrayLayer { .. } => "upload_texture_array_layer",
            GpuCommand::CopyBuffer { .. } => "copy_buffer",
            GpuCommand::CopyTexture { .. } => "copy_texture",
            GpuCommand::CopyTextureArray { .. } => "copy_texture_array",
            GpuCommand::SetAttachments { .. } => "set_attachments",
            GpuCommand::Blit { .. } => "blit",
            GpuCommand::BeginRenderPass { .. } => "begin_render_pass",
            GpuCommand::Clear(_) => "clear",
            GpuCommand::SetViewport(_) => "set_viewport",
            GpuCommand::BindPipeline(_) => "bind_pipeline",
            GpuCommand::BindVertexArray { .. } => "bind_vertex_array",
            GpuCommand::BindShaderResources(_) => "bind_shader_resources",
            GpuCommand::Draw(_) => "draw",
            GpuCommand::EndRenderPass => "end_render_pass",
        }
    }
}
