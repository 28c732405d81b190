//! Graph-level command stream
//!
//! Pass callbacks record [`Command`]s through a
//! [`PassRecorder`](crate::render_graph::PassRecorder). Commands refer to
//! abstract resource handles; the runtime resolves them to pooled objects.

use std::collections::BTreeSet;

use crate::backend::command::DrawCall;
use crate::backend::types::*;
use crate::render_graph::resource::{Allocation, ResourceHandle};

/// Upload payload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadData {
    /// Bytes for a vertex, index, uniform or storage buffer
    Buffer { offset: u64, data: Vec<u8> },
    /// Full contents of a 2D texture
    Image(Image),
    CubeMapFace { face: CubeMapFace, image: Image },
    TextureArrayLayer { layer: u32, image: Image },
}

/// Target of a render pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginPass {
    /// Render into textures. Missing depth and color attachments are synthesized.
    Attachments {
        colors: Vec<ResourceHandle>,
        depth_stencil: Option<ResourceHandle>,
    },
    /// Render into the device's back buffer
    BackBuffer,
}

/// Vertex input of subsequent draws
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferBinding {
    pub vertices: ResourceHandle,
    pub indices: Option<ResourceHandle>,
    pub instances: Option<ResourceHandle>,
    pub vertex_layout: VertexBufferLayout,
    pub instance_layout: Option<VertexBufferLayout>,
}

impl VertexBufferBinding {
    pub fn new(vertices: ResourceHandle, vertex_layout: VertexBufferLayout) -> Self {
        Self {
            vertices,
            indices: None,
            instances: None,
            vertex_layout,
            instance_layout: None,
        }
    }

    pub fn with_indices(mut self, indices: ResourceHandle) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_instances(
        mut self,
        instances: ResourceHandle,
        instance_layout: VertexBufferLayout,
    ) -> Self {
        self.instances = Some(instances);
        self.instance_layout = Some(instance_layout);
        self
    }

    pub fn buffers(&self) -> impl Iterator<Item = ResourceHandle> + '_ {
        std::iter::once(self.vertices)
            .chain(self.indices)
            .chain(self.instances)
    }
}

/// A shader resource binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBinding {
    pub resource: ResourceHandle,
    pub access: ShaderAccess,
}

impl ShaderBinding {
    pub fn read(resource: ResourceHandle) -> Self {
        Self {
            resource,
            access: ShaderAccess::READ,
        }
    }

    pub fn write(resource: ResourceHandle) -> Self {
        Self {
            resource,
            access: ShaderAccess::WRITE,
        }
    }

    pub fn read_write(resource: ResourceHandle) -> Self {
        Self {
            resource,
            access: ShaderAccess::READ_WRITE,
        }
    }
}

/// One recorded graph operation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        resource: ResourceHandle,
        allocation: Allocation,
    },
    Upload {
        target: ResourceHandle,
        data: UploadData,
    },
    Copy {
        source: ResourceHandle,
        target: ResourceHandle,
    },
    /// Rectangles default to the full extent of their operand.
    Blit {
        source: ResourceHandle,
        target: ResourceHandle,
        kind: BlitKind,
        source_rect: Option<Rect>,
        target_rect: Option<Rect>,
        filter: FilterMode,
    },
    BeginPass(BeginPass),
    Clear(ClearValues),
    BindPipeline(ResourceHandle),
    BindVertexBuffers(VertexBufferBinding),
    BindShaderResources(Vec<ShaderBinding>),
    SetViewport(Viewport),
    Draw(DrawCall),
    FinishPass,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Upload { .. } => "upload",
            Command::Copy { .. } => "copy",
            Command::Blit { .. } => "blit",
            Command::BeginPass(_) => "begin_pass",
            Command::Clear(_) => "clear",
            Command::BindPipeline(_) => "bind_pipeline",
            Command::BindVertexBuffers(_) => "bind_vertex_buffers",
            Command::BindShaderResources(_) => "bind_shader_resources",
            Command::SetViewport(_) => "set_viewport",
            Command::Draw(_) => "draw",
            Command::FinishPass => "finish_pass",
        }
    }

    /// Handles the command reads or writes. `Create` references none.
    pub fn resources(&self) -> Vec<ResourceHandle> {
        match self {
            Command::Create { .. } => Vec::new(),
            Command::Upload { target, .. } => vec![*target],
            Command::Copy { source, target } | Command::Blit { source, target, .. } => {
                vec![*source, *target]
            }
            Command::BeginPass(BeginPass::Attachments {
                colors,
                depth_stencil,
            }) => colors.iter().copied().chain(*depth_stencil).collect(),
            Command::BeginPass(BeginPass::BackBuffer) => Vec::new(),
            Command::BindPipeline(pipeline) => vec![*pipeline],
            Command::BindVertexBuffers(binding) => binding.buffers().collect(),
            Command::BindShaderResources(bindings) => {
                bindings.iter().map(|b| b.resource).collect()
            }
            Command::Clear(_) | Command::SetViewport(_) | Command::Draw(_) | Command::FinishPass => {
                Vec::new()
            }
        }
    }
}

/// Translated commands of one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassContext {
    pub name: String,
    pub commands: Vec<Command>,
    /// Handles moved to the persistent registry once every command has run
    pub persists: BTreeSet<ResourceHandle>,
}

impl PassContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
