//! Concrete backend objects
//!
//! Objects are small values: a device-assigned id plus the descriptor they were
//! created from. The device owns the actual memory behind each id.

use crate::backend::types::*;
use std::fmt;

/// Device-assigned identity of a backend object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj{}", self.0)
    }
}

macro_rules! backend_object {
    ($(#[$meta:meta])* $name:ident, $desc:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            id: ObjectId,
            desc: $desc,
        }

        impl $name {
            pub fn new(id: ObjectId, desc: $desc) -> Self {
                Self { id, desc }
            }

            pub fn id(&self) -> ObjectId {
                self.id
            }

            pub fn desc(&self) -> &$desc {
                &self.desc
            }
        }
    };
}

backend_object!(VertexBuffer, VertexBufferDesc);
backend_object!(IndexBuffer, IndexBufferDesc);
backend_object!(
    /// 2D texture or cube map
    TextureBuffer,
    TextureBufferDesc
);
backend_object!(TextureArrayBuffer, TextureArrayBufferDesc);
backend_object!(ShaderUniformBuffer, ShaderUniformBufferDesc);
backend_object!(ShaderStorageBuffer, ShaderStorageBufferDesc);
backend_object!(
    /// Framebuffer; attachments are bound with `GpuCommand::SetAttachments`
    RenderTarget,
    RenderTargetDesc
);
backend_object!(RenderPipeline, RenderPipelineDesc);
backend_object!(RenderPass, RenderPassDesc);
backend_object!(
    /// Vertex binding object; buffers are attached when it is bound
    VertexArrayObject,
    VertexArrayObjectDesc
);

/// A recordable command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBuffer {
    id: ObjectId,
}

impl CommandBuffer {
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

/// Object kind, used for bookkeeping and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    VertexBuffer,
    IndexBuffer,
    TextureBuffer,
    TextureArrayBuffer,
    ShaderUniformBuffer,
    ShaderStorageBuffer,
    RenderTarget,
    RenderPipeline,
    RenderPass,
    VertexArrayObject,
    CommandBuffer,
}

/// Any backend object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenderObject {
    VertexBuffer(VertexBuffer),
    IndexBuffer(IndexBuffer),
    TextureBuffer(TextureBuffer),
    TextureArrayBuffer(TextureArrayBuffer),
    ShaderUniformBuffer(ShaderUniformBuffer),
    ShaderStorageBuffer(ShaderStorageBuffer),
    RenderTarget(RenderTarget),
    RenderPipeline(RenderPipeline),
    RenderPass(RenderPass),
    VertexArrayObject(VertexArrayObject),
    CommandBuffer(CommandBuffer),
}

impl RenderObject {
    pub fn id(&self) -> ObjectId {
        match self {
            RenderObject::VertexBuffer(o) => o.id(),
            RenderObject::IndexBuffer(o) => o.id(),
            RenderObject::TextureBuffer(o) => o.id(),
            RenderObject::TextureArrayBuffer(o) => o.id(),
            RenderObject::ShaderUniformBuffer(o) => o.id(),
            RenderObject::ShaderStorageBuffer(o) => o.id(),
            RenderObject::RenderTarget(o) => o.id(),
            RenderObject::RenderPipeline(o) => o.id(),
            RenderObject::RenderPass(o) => o.id(),
            RenderObject::VertexArrayObject(o) => o.id(),
            RenderObject::CommandBuffer(o) => o.id(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            RenderObject::VertexBuffer(_) => ObjectKind::VertexBuffer,
            RenderObject::IndexBuffer(_) => ObjectKind::IndexBuffer,
            RenderObject::TextureBuffer(_) => ObjectKind::TextureBuffer,
            RenderObject::TextureArrayBuffer(_) => ObjectKind::TextureArrayBuffer,
            RenderObject::ShaderUniformBuffer(_) => ObjectKind::ShaderUniformBuffer,
            RenderObject::ShaderStorageBuffer(_) => ObjectKind::ShaderStorageBuffer,
            RenderObject::RenderTarget(_) => ObjectKind::RenderTarget,
            RenderObject::RenderPipeline(_) => ObjectKind::RenderPipeline,
            RenderObject::RenderPass(_) => ObjectKind::RenderPass,
            RenderObject::VertexArrayObject(_) => ObjectKind::VertexArrayObject,
            RenderObject::CommandBuffer(_) => ObjectKind::CommandBuffer,
        }
    }

    /// Descriptor the object was created from. Command buffers have none.
    pub fn desc(&self) -> Option<ObjectDesc> {
        Some(match self {
            RenderObject::VertexBuffer(o) => ObjectDesc::VertexBuffer(*o.desc()),
            RenderObject::IndexBuffer(o) => ObjectDesc::IndexBuffer(*o.desc()),
            RenderObject::TextureBuffer(o) => ObjectDesc::TextureBuffer(o.desc().clone()),
            RenderObject::TextureArrayBuffer(o) => {
                ObjectDesc::TextureArrayBuffer(o.desc().clone())
            }
            RenderObject::ShaderUniformBuffer(o) => ObjectDesc::ShaderUniformBuffer(*o.desc()),
            RenderObject::ShaderStorageBuffer(o) => ObjectDesc::ShaderStorageBuffer(*o.desc()),
            RenderObject::RenderTarget(o) => ObjectDesc::RenderTarget(*o.desc()),
            RenderObject::RenderPipeline(o) => ObjectDesc::RenderPipeline(o.desc().clone()),
            RenderObject::RenderPass(o) => ObjectDesc::RenderPass(*o.desc()),
            RenderObject::VertexArrayObject(o) => ObjectDesc::VertexArrayObject(o.desc().clone()),
            RenderObject::CommandBuffer(_) => return None,
        })
    }
}

macro_rules! impl_from_object {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for RenderObject {
                fn from(object: $variant) -> Self {
                    RenderObject::$variant(object)
                }
            }
        )*
    };
}

impl_from_object!(
    VertexBuffer,
    IndexBuffer,
    TextureBuffer,
    TextureArrayBuffer,
    ShaderUniformBuffer,
    ShaderStorageBuffer,
    RenderTarget,
    RenderPipeline,
    RenderPass,
    VertexArrayObject,
    CommandBuffer,
);

/// Any object that holds linear memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferObject {
    Vertex(VertexBuffer),
    Index(IndexBuffer),
    Uniform(ShaderUniformBuffer),
    Storage(ShaderStorageBuffer),
}

impl BufferObject {
    pub fn id(&self) -> ObjectId {
        match self {
            BufferObject::Vertex(b) => b.id(),
            BufferObject::Index(b) => b.id(),
            BufferObject::Uniform(b) => b.id(),
            BufferObject::Storage(b) => b.id(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            BufferObject::Vertex(b) => b.desc().size,
            BufferObject::Index(b) => b.desc().size,
            BufferObject::Uniform(b) => b.desc().size,
            BufferObject::Storage(b) => b.desc().size,
        }
    }
}

/// A texture that can be bound as a render-target attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Texture(TextureBuffer),
    TextureArray(TextureArrayBuffer),
}

impl Attachment {
    pub fn id(&self) -> ObjectId {
        match self {
            Attachment::Texture(t) => t.id(),
            Attachment::TextureArray(t) => t.id(),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Attachment::Texture(t) => t.desc().width,
            Attachment::TextureArray(t) => t.desc().width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Attachment::Texture(t) => t.desc().height,
            Attachment::TextureArray(t) => t.desc().height,
        }
    }

    pub fn format(&self) -> TextureFormat {
        match self {
            Attachment::Texture(t) => t.desc().format,
            Attachment::TextureArray(t) => t.desc().format,
        }
    }

    pub fn samples(&self) -> u32 {
        match self {
            Attachment::Texture(t) => t.desc().samples,
            Attachment::TextureArray(t) => t.desc().samples,
        }
    }

    /// 1 for plain textures, the layer count for texture arrays.
    pub fn layers(&self) -> u32 {
        match self {
            Attachment::Texture(_) => 1,
            Attachment::TextureArray(t) => t.desc().layers,
        }
    }
}

/// Object a shader can bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderResourceObject {
    Texture(TextureBuffer),
    TextureArray(TextureArrayBuffer),
    Uniform(ShaderUniformBuffer),
    Storage(ShaderStorageBuffer),
}

impl ShaderResourceObject {
    pub fn id(&self) -> ObjectId {
        match self {
            ShaderResourceObject::Texture(o) => o.id(),
            ShaderResourceObject::TextureArray(o) => o.id(),
            ShaderResourceObject::Uniform(o) => o.id(),
            ShaderResourceObject::Storage(o) => o.id(),
        }
    }
}

/// A bound shader resource together with its access modes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub object: ShaderResourceObject,
    pub access: ShaderAccess,
}
