//! Graph builder

use glam::UVec2;

use crate::backend::types::*;
use crate::render_graph::graph::Graph;
use crate::render_graph::pass::{Pass, PassHandle};
use crate::render_graph::recorder::PassRecorder;
use crate::render_graph::resource::{Allocation, Allocations, ResourceHandle};

/// Accumulates passes and resource allocations into a [`Graph`].
///
/// Building performs no device work; pass callbacks only run when the graph
/// is compiled by a [`Runtime`](crate::runtime::Runtime).
pub struct GraphBuilder {
    passes: Vec<Pass>,
    allocations: Allocations,
    next_resource: u32,
    back_buffer: Option<ResourceHandle>,
    back_buffer_size: UVec2,
}

impl GraphBuilder {
    pub fn new(back_buffer_size: UVec2) -> Self {
        Self {
            passes: Vec::new(),
            allocations: Allocations::default(),
            next_resource: 0,
            back_buffer: None,
            back_buffer_size,
        }
    }

    /// Size of the back buffer the graph is built for.
    pub fn back_buffer_size(&self) -> UVec2 {
        self.back_buffer_size
    }

    fn mint(&mut self) -> ResourceHandle {
        let handle = ResourceHandle(self.next_resource);
        self.next_resource += 1;
        handle
    }

    fn allocate(&mut self, allocation: Allocation) -> ResourceHandle {
        let handle = self.mint();
        log::trace!("GraphBuilder: {} -> {:?}", handle, allocation);
        self.allocations.insert(handle, allocation);
        handle
    }

    pub fn create_vertex_buffer(&mut self, size: u64) -> ResourceHandle {
        self.allocate(Allocation::VertexBuffer(VertexBufferDesc { size }))
    }

    pub fn create_index_buffer(&mut self, size: u64) -> ResourceHandle {
        self.allocate(Allocation::IndexBuffer(IndexBufferDesc { size }))
    }

    /// Create a shader storage buffer.
    pub fn create_shader_buffer(&mut self, size: u64) -> ResourceHandle {
        self.allocate(Allocation::StorageBuffer(ShaderStorageBufferDesc { size }))
    }

    pub fn create_uniform_buffer(&mut self, size: u64) -> ResourceHandle {
        self.allocate(Allocation::UniformBuffer(ShaderUniformBufferDesc { size }))
    }

    pub fn create_texture(&mut self, desc: TextureBufferDesc) -> ResourceHandle {
        self.allocate(Allocation::Texture(desc))
    }

    pub fn create_texture_array(&mut self, desc: TextureArrayBufferDesc) -> ResourceHandle {
        self.allocate(Allocation::TextureArray(desc))
    }

    /// Create a render pipeline.
    pub fn create_shader(&mut self, desc: RenderPipelineDesc) -> ResourceHandle {
        self.allocate(Allocation::Pipeline(desc))
    }

    /// The handle standing for the back buffer. Minted on first call and
    /// returned unchanged afterwards.
    pub fn get_screen_texture(&mut self) -> ResourceHandle {
        match self.back_buffer {
            Some(handle) => handle,
            None => {
                let handle = self.mint();
                self.back_buffer = Some(handle);
                handle
            }
        }
    }

    /// Append a pass. `callback` runs once, when the graph is compiled.
    pub fn add_pass(
        &mut self,
        name: impl Into<String>,
        callback: impl FnOnce(&mut PassRecorder<'_>) + 'static,
    ) -> PassHandle {
        let handle = PassHandle(self.passes.len() as u32);
        self.passes.push(Pass::new(name, Box::new(callback)));
        handle
    }

    fn pass_mut(&mut self, pass: PassHandle) -> &mut Pass {
        let count = self.passes.len();
        match self.passes.get_mut(pass.index()) {
            Some(pass) => pass,
            None => panic!(
                "pass handle {} out of range ({} passes recorded)",
                pass.index(),
                count
            ),
        }
    }

    pub fn read(&mut self, pass: PassHandle, resource: ResourceHandle) {
        let pass = self.pass_mut(pass);
        if !pass.reads.contains(&resource) {
            pass.reads.push(resource);
        }
    }

    pub fn write(&mut self, pass: PassHandle, resource: ResourceHandle) {
        let pass = self.pass_mut(pass);
        if !pass.writes.contains(&resource) {
            pass.writes.push(resource);
        }
    }

    /// Same as [`read`](Self::read) followed by [`write`](Self::write).
    pub fn read_write(&mut self, pass: PassHandle, resource: ResourceHandle) {
        self.read(pass, resource);
        self.write(pass, resource);
    }

    /// Keep `resource`'s object alive past this execution. The move into the
    /// persistent registry happens after every command of `pass` has run.
    pub fn persist(&mut self, pass: PassHandle, resource: ResourceHandle) {
        self.pass_mut(pass).persists.insert(resource);
    }

    pub fn build(self) -> Graph {
        log::debug!(
            "GraphBuilder: built graph with {} passes and {} allocations",
            self.passes.len(),
            self.allocations.len()
        );
        Graph {
            passes: self.passes,
            allocations: self.allocations,
            back_buffer: self.back_buffer,
            back_buffer_size: self.back_buffer_size,
        }
    }
}
