//! Abstract resources of a render graph

use std::collections::BTreeMap;
use std::fmt;

use crate::backend::objects::ObjectKind;
use crate::backend::types::*;

/// Unique identifier for a render graph resource.
///
/// Handles are minted in increasing order by the builder and are only
/// meaningful within the graph that minted them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub(crate) u32);

impl ResourceHandle {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a handle is backed by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Allocation {
    VertexBuffer(VertexBufferDesc),
    IndexBuffer(IndexBufferDesc),
    UniformBuffer(ShaderUniformBufferDesc),
    StorageBuffer(ShaderStorageBufferDesc),
    Texture(TextureBufferDesc),
    TextureArray(TextureArrayBufferDesc),
    Pipeline(RenderPipelineDesc),
}

impl Allocation {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Allocation::VertexBuffer(_) => ObjectKind::VertexBuffer,
            Allocation::IndexBuffer(_) => ObjectKind::IndexBuffer,
            Allocation::UniformBuffer(_) => ObjectKind::ShaderUniformBuffer,
            Allocation::StorageBuffer(_) => ObjectKind::ShaderStorageBuffer,
            Allocation::Texture(_) => ObjectKind::TextureBuffer,
            Allocation::TextureArray(_) => ObjectKind::TextureArrayBuffer,
            Allocation::Pipeline(_) => ObjectKind::RenderPipeline,
        }
    }

    /// Descriptor of the pooled object serving this allocation.
    pub fn object_desc(&self) -> ObjectDesc {
        match self {
            Allocation::VertexBuffer(d) => ObjectDesc::VertexBuffer(*d),
            Allocation::IndexBuffer(d) => ObjectDesc::IndexBuffer(*d),
            Allocation::UniformBuffer(d) => ObjectDesc::ShaderUniformBuffer(*d),
            Allocation::StorageBuffer(d) => ObjectDesc::ShaderStorageBuffer(*d),
            Allocation::Texture(d) => ObjectDesc::TextureBuffer(d.clone()),
            Allocation::TextureArray(d) => ObjectDesc::TextureArrayBuffer(d.clone()),
            Allocation::Pipeline(d) => ObjectDesc::RenderPipeline(d.clone()),
        }
    }
}

/// Allocation maps of a graph, one per resource kind
#[derive(Debug, Clone, Default)]
pub struct Allocations {
    pub vertex_buffers: BTreeMap<ResourceHandle, VertexBufferDesc>,
    pub index_buffers: BTreeMap<ResourceHandle, IndexBufferDesc>,
    pub uniform_buffers: BTreeMap<ResourceHandle, ShaderUniformBufferDesc>,
    pub storage_buffers: BTreeMap<ResourceHandle, ShaderStorageBufferDesc>,
    pub textures: BTreeMap<ResourceHandle, TextureBufferDesc>,
    pub texture_arrays: BTreeMap<ResourceHandle, TextureArrayBufferDesc>,
    pub pipelines: BTreeMap<ResourceHandle, RenderPipelineDesc>,
}

impl Allocations {
    pub(crate) fn insert(&mut self, handle: ResourceHandle, allocation: Allocation) {
        match allocation {
            Allocation::VertexBuffer(d) => {
                self.vertex_buffers.insert(handle, d);
            }
            Allocation::IndexBuffer(d) => {
                self.index_buffers.insert(handle, d);
            }
            Allocation::UniformBuffer(d) => {
                self.uniform_buffers.insert(handle, d);
            }
            Allocation::StorageBuffer(d) => {
                self.storage_buffers.insert(handle, d);
            }
            Allocation::Texture(d) => {
                self.textures.insert(handle, d);
            }
            Allocation::TextureArray(d) => {
                self.texture_arrays.insert(handle, d);
            }
            Allocation::Pipeline(d) => {
                self.pipelines.insert(handle, d);
            }
        }
    }

    /// Look a handle up in every map.
    pub fn get(&self, handle: ResourceHandle) -> Option<Allocation> {
        if let Some(d) = self.vertex_buffers.get(&handle) {
            return Some(Allocation::VertexBuffer(*d));
        }
        if let Some(d) = self.index_buffers.get(&handle) {
            return Some(Allocation::IndexBuffer(*d));
        }
        if let Some(d) = self.uniform_buffers.get(&handle) {
            return Some(Allocation::UniformBuffer(*d));
        }
        if let Some(d) = self.storage_buffers.get(&handle) {
            return Some(Allocation::StorageBuffer(*d));
        }
        if let Some(d) = self.textures.get(&handle) {
            return Some(Allocation::Texture(d.clone()));
        }
        if let Some(d) = self.texture_arrays.get(&handle) {
            return Some(Allocation::TextureArray(d.clone()));
        }
        self.pipelines
            .get(&handle)
            .map(|d| Allocation::Pipeline(d.clone()))
    }

    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.vertex_buffers.len()
            + self.index_buffers.len()
            + self.uniform_buffers.len()
            + self.storage_buffers.len()
            + self.textures.len()
            + self.texture_arrays.len()
            + self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
