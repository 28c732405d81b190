//! Core backend abstraction traits
//!
//! [`RenderDevice`] is everything the runtime needs from a graphics API: a
//! factory per descriptor kind, command buffers, queue submission and the
//! back buffer.

use crate::backend::command::GpuCommand;
use crate::backend::objects::*;
use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create object: {0}")]
    ObjectCreationFailed(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Feature not supported: {0}")]
    FeatureNotSupported(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
    #[error("Internal backend error: {0}")]
    Internal(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Graphics device the runtime drives
pub trait RenderDevice {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    // === Object creation ===

    fn create_vertex_buffer(&mut self, desc: &VertexBufferDesc) -> BackendResult<VertexBuffer>;

    fn create_index_buffer(&mut self, desc: &IndexBufferDesc) -> BackendResult<IndexBuffer>;

    fn create_texture_buffer(&mut self, desc: &TextureBufferDesc) -> BackendResult<TextureBuffer>;

    fn create_texture_array_buffer(
        &mut self,
        desc: &TextureArrayBufferDesc,
    ) -> BackendResult<TextureArrayBuffer>;

    fn create_shader_uniform_buffer(
        &mut self,
        desc: &ShaderUniformBufferDesc,
    ) -> BackendResult<ShaderUniformBuffer>;

    fn create_shader_storage_buffer(
        &mut self,
        desc: &ShaderStorageBufferDesc,
    ) -> BackendResult<ShaderStorageBuffer>;

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> BackendResult<RenderTarget>;

    /// Create a pipeline. Shader sources are passed through untouched.
    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDesc,
    ) -> BackendResult<RenderPipeline>;

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> BackendResult<RenderPass>;

    fn create_vertex_array_object(
        &mut self,
        desc: &VertexArrayObjectDesc,
    ) -> BackendResult<VertexArrayObject>;

    fn create_command_buffer(&mut self) -> BackendResult<CommandBuffer>;

    // === Recording and submission ===

    /// Append a command to an unsubmitted command buffer.
    fn record(&mut self, buffer: &CommandBuffer, command: GpuCommand);

    /// Number of render command queues.
    fn render_queue_count(&self) -> usize;

    /// Enqueue `buffer` on render queue `queue`. Submission consumes the
    /// command buffer; completion is not awaited.
    fn submit(&mut self, queue: usize, buffer: CommandBuffer) -> BackendResult<()>;

    // === Back buffer ===

    /// The presentable render target. Owned by the device, never destroyed by the runtime.
    fn back_buffer(&self) -> RenderTarget;

    fn back_buffer_desc(&self) -> RenderTargetDesc {
        *self.back_buffer().desc()
    }

    // === Destruction ===

    /// Release an object. Destroying an object twice is a contract violation.
    fn destroy(&mut self, object: RenderObject);
}
