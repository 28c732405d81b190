//! Descriptor-keyed object pools
//!
//! Each descriptor maps to a list of instances and a counter of how many were
//! handed out since the last collection. The Nth request for a descriptor
//! gets the Nth instance, so a stable workload gets the same objects in the
//! same order every execution.

use std::collections::HashMap;
use std::hash::Hash;

use crate::backend::objects::*;
use crate::backend::traits::{BackendResult, RenderDevice};
use crate::backend::types::*;
use crate::render_graph::resource::Allocation;

#[derive(Debug)]
struct PoolEntry<O> {
    objects: Vec<O>,
    used: usize,
}

impl<O> Default for PoolEntry<O> {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            used: 0,
        }
    }
}

/// Pool of objects of one kind
#[derive(Debug)]
pub struct ObjectPool<D, O> {
    entries: HashMap<D, PoolEntry<O>>,
}

impl<D, O> Default for ObjectPool<D, O> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<D: Clone + Eq + Hash, O: Clone> ObjectPool<D, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next unused instance for `desc`, creating one when every
    /// instance is already in use.
    pub fn acquire<E>(
        &mut self,
        desc: &D,
        create: impl FnOnce(&D) -> Result<O, E>,
    ) -> Result<O, E> {
        let entry = self.entries.entry(desc.clone()).or_default();
        if entry.used == entry.objects.len() {
            entry.objects.push(create(desc)?);
        }
        let object = entry.objects[entry.used].clone();
        entry.used += 1;
        Ok(object)
    }

    /// Take an instance out of the pool. Counts as one fewer use.
    pub fn detach(&mut self, desc: &D, matches: impl Fn(&O) -> bool) -> Option<O> {
        let entry = self.entries.get_mut(desc)?;
        let index = entry.objects.iter().position(matches)?;
        let object = entry.objects.remove(index);
        if index < entry.used {
            entry.used -= 1;
        }
        Some(object)
    }

    /// Evict descriptors that went unused, shrink the rest to their use count
    /// and reset every counter. Returns the evicted instances.
    pub fn collect(&mut self) -> Vec<O> {
        let mut evicted = Vec::new();
        self.entries.retain(|_, entry| {
            evicted.extend(entry.objects.drain(entry.used..));
            let keep = entry.used > 0;
            entry.used = 0;
            keep
        });
        evicted
    }

    /// Reset every counter without evicting anything.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.used = 0;
        }
    }

    /// Remove every instance.
    pub fn drain(&mut self) -> Vec<O> {
        self.entries
            .drain()
            .flat_map(|(_, entry)| entry.objects)
            .collect()
    }

    /// Number of pooled instances for `desc`.
    pub fn len(&self, desc: &D) -> usize {
        self.entries.get(desc).map_or(0, |e| e.objects.len())
    }

    /// Number of instances of `desc` handed out since the last collection.
    pub fn used(&self, desc: &D) -> usize {
        self.entries.get(desc).map_or(0, |e| e.used)
    }

    pub fn contains(&self, desc: &D) -> bool {
        self.entries.contains_key(desc)
    }

    /// Number of descriptors with a pool entry.
    pub fn descriptor_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One pool per object kind
#[derive(Debug, Default)]
pub struct Pools {
    pub(crate) vertex_buffers: ObjectPool<VertexBufferDesc, VertexBuffer>,
    pub(crate) index_buffers: ObjectPool<IndexBufferDesc, IndexBuffer>,
    pub(crate) textures: ObjectPool<TextureBufferDesc, TextureBuffer>,
    pub(crate) texture_arrays: ObjectPool<TextureArrayBufferDesc, TextureArrayBuffer>,
    pub(crate) uniform_buffers: ObjectPool<ShaderUniformBufferDesc, ShaderUniformBuffer>,
    pub(crate) storage_buffers: ObjectPool<ShaderStorageBufferDesc, ShaderStorageBuffer>,
    pub(crate) render_targets: ObjectPool<RenderTargetDesc, RenderTarget>,
    pub(crate) pipelines: ObjectPool<RenderPipelineDesc, RenderPipeline>,
    pub(crate) render_passes: ObjectPool<RenderPassDesc, RenderPass>,
    pub(crate) vertex_arrays: ObjectPool<VertexArrayObjectDesc, VertexArrayObject>,
}

impl Pools {
    /// Serve a graph allocation from its pool.
    pub(crate) fn create<R: RenderDevice>(
        &mut self,
        device: &mut R,
        allocation: &Allocation,
    ) -> BackendResult<RenderObject> {
        Ok(match allocation {
            Allocation::VertexBuffer(desc) => self
                .vertex_buffers
                .acquire(desc, |d| device.create_vertex_buffer(d))?
                .into(),
            Allocation::IndexBuffer(desc) => self
                .index_buffers
                .acquire(desc, |d| device.create_index_buffer(d))?
                .into(),
            Allocation::UniformBuffer(desc) => self
                .uniform_buffers
                .acquire(desc, |d| device.create_shader_uniform_buffer(d))?
                .into(),
            Allocation::StorageBuffer(desc) => self
                .storage_buffers
                .acquire(desc, |d| device.create_shader_storage_buffer(d))?
                .into(),
            Allocation::Texture(desc) => self
                .textures
                .acquire(desc, |d| device.create_texture_buffer(d))?
                .into(),
            Allocation::TextureArray(desc) => self
                .texture_arrays
                .acquire(desc, |d| device.create_texture_array_buffer(d))?
                .into(),
            Allocation::Pipeline(desc) => self
                .pipelines
                .acquire(desc, |d| device.create_render_pipeline(d))?
                .into(),
        })
    }

    /// Remove `object` from its pool so the pool no longer owns it.
    pub(crate) fn detach(&mut self, object: &RenderObject) -> bool {
        let id = object.id();
        match object {
            RenderObject::VertexBuffer(o) => {
                self.vertex_buffers.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::IndexBuffer(o) => {
                self.index_buffers.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::TextureBuffer(o) => {
                self.textures.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::TextureArrayBuffer(o) => {
                self.texture_arrays.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::ShaderUniformBuffer(o) => {
                self.uniform_buffers.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::ShaderStorageBuffer(o) => {
                self.storage_buffers.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::RenderTarget(o) => {
                self.render_targets.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::RenderPipeline(o) => {
                self.pipelines.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::RenderPass(o) => {
                self.render_passes.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::VertexArrayObject(o) => {
                self.vertex_arrays.detach(o.desc(), |p| p.id() == id).is_some()
            }
            RenderObject::CommandBuffer(_) => false,
        }
    }

    /// Pooled instance count for a descriptor.
    pub(crate) fn len(&self, desc: &ObjectDesc) -> usize {
        match desc {
            ObjectDesc::VertexBuffer(d) => self.vertex_buffers.len(d),
            ObjectDesc::IndexBuffer(d) => self.index_buffers.len(d),
            ObjectDesc::TextureBuffer(d) => self.textures.len(d),
            ObjectDesc::TextureArrayBuffer(d) => self.texture_arrays.len(d),
            ObjectDesc::ShaderUniformBuffer(d) => self.uniform_buffers.len(d),
            ObjectDesc::ShaderStorageBuffer(d) => self.storage_buffers.len(d),
            ObjectDesc::RenderTarget(d) => self.render_targets.len(d),
            ObjectDesc::RenderPipeline(d) => self.pipelines.len(d),
            ObjectDesc::RenderPass(d) => self.render_passes.len(d),
            ObjectDesc::VertexArrayObject(d) => self.vertex_arrays.len(d),
        }
    }

    /// Instances of a descriptor handed out since the last collection.
    pub(crate) fn used(&self, desc: &ObjectDesc) -> usize {
        match desc {
            ObjectDesc::VertexBuffer(d) => self.vertex_buffers.used(d),
            ObjectDesc::IndexBuffer(d) => self.index_buffers.used(d),
            ObjectDesc::TextureBuffer(d) => self.textures.used(d),
            ObjectDesc::TextureArrayBuffer(d) => self.texture_arrays.used(d),
            ObjectDesc::ShaderUniformBuffer(d) => self.uniform_buffers.used(d),
            ObjectDesc::ShaderStorageBuffer(d) => self.storage_buffers.used(d),
            ObjectDesc::RenderTarget(d) => self.render_targets.used(d),
            ObjectDesc::RenderPipeline(d) => self.pipelines.used(d),
            ObjectDesc::RenderPass(d) => self.render_passes.used(d),
            ObjectDesc::VertexArrayObject(d) => self.vertex_arrays.used(d),
        }
    }

    pub(crate) fn contains(&self, desc: &ObjectDesc) -> bool {
        match desc {
            ObjectDesc::VertexBuffer(d) => self.vertex_buffers.contains(d),
            ObjectDesc::IndexBuffer(d) => self.index_buffers.contains(d),
            ObjectDesc::TextureBuffer(d) => self.textures.contains(d),
            ObjectDesc::TextureArrayBuffer(d) => self.texture_arrays.contains(d),
            ObjectDesc::ShaderUniformBuffer(d) => self.uniform_buffers.contains(d),
            ObjectDesc::ShaderStorageBuffer(d) => self.storage_buffers.contains(d),
            ObjectDesc::RenderTarget(d) => self.render_targets.contains(d),
            ObjectDesc::RenderPipeline(d) => self.pipelines.contains(d),
            ObjectDesc::RenderPass(d) => self.render_passes.contains(d),
            ObjectDesc::VertexArrayObject(d) => self.vertex_arrays.contains(d),
        }
    }

    /// Collect every pool. Returns the evicted objects.
    pub(crate) fn collect(&mut self) -> Vec<RenderObject> {
        let mut evicted: Vec<RenderObject> = Vec::new();
        evicted.extend(self.vertex_buffers.collect().into_iter().map(Into::into));
        evicted.extend(self.index_buffers.collect().into_iter().map(Into::into));
        evicted.extend(self.textures.collect().into_iter().map(Into::into));
        evicted.extend(self.texture_arrays.collect().into_iter().map(Into::into));
        evicted.extend(self.uniform_buffers.collect().into_iter().map(Into::into));
        evicted.extend(self.storage_buffers.collect().into_iter().map(Into::into));
        evicted.extend(self.render_targets.collect().into_iter().map(Into::into));
        evicted.extend(self.pipelines.collect().into_iter().map(Into::into));
        evicted.extend(self.render_passes.collect().into_iter().map(Into::into));
        evicted.extend(self.vertex_arrays.collect().into_iter().map(Into::into));
        evicted
    }

    /// Reset every pool's counters, keeping all instances.
    pub(crate) fn reset(&mut self) {
        self.vertex_buffers.reset();
        self.index_buffers.reset();
        self.textures.reset();
        self.texture_arrays.reset();
        self.uniform_buffers.reset();
        self.storage_buffers.reset();
        self.render_targets.reset();
        self.pipelines.reset();
        self.render_passes.reset();
        self.vertex_arrays.reset();
    }

    /// Empty every pool. Returns all pooled objects.
    pub(crate) fn drain(&mut self) -> Vec<RenderObject> {
        let mut objects: Vec<RenderObject> = Vec::new();
        objects.extend(self.vertex_buffers.drain().into_iter().map(Into::into));
        objects.extend(self.index_buffers.drain().into_iter().map(Into::into));
        objects.extend(self.textures.drain().into_iter().map(Into::into));
        objects.extend(self.texture_arrays.drain().into_iter().map(Into::into));
        objects.extend(self.uniform_buffers.drain().into_iter().map(Into::into));
        objects.extend(self.storage_buffers.drain().into_iter().map(Into::into));
        objects.extend(self.render_targets.drain().into_iter().map(Into::into));
        objects.extend(self.pipelines.drain().into_iter().map(Into::into));
        objects.extend(self.render_passes.drain().into_iter().map(Into::into));
        objects.extend(self.vertex_arrays.drain().into_iter().map(Into::into));
        objects
    }
}
