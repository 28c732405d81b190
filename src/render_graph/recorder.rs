//! Command recording for pass callbacks

use std::collections::HashSet;

use bytemuck::Pod;
use glam::Vec4;

use crate::backend::command::DrawCall;
use crate::backend::types::*;
use crate::render_graph::command::*;
use crate::render_graph::graph::Graph;
use crate::render_graph::resource::{Allocations, ResourceHandle};

/// Records the commands of one pass.
///
/// Every handle a command refers to is created on first use: the recorder
/// emits a `Create` for it before the command itself. Referring to a handle
/// the graph has no allocation for panics.
pub struct PassRecorder<'a> {
    allocations: &'a Allocations,
    back_buffer: Option<ResourceHandle>,
    created: &'a mut HashSet<ResourceHandle>,
    context: PassContext,
}

impl<'a> PassRecorder<'a> {
    pub(crate) fn new(
        name: &str,
        allocations: &'a Allocations,
        back_buffer: Option<ResourceHandle>,
        created: &'a mut HashSet<ResourceHandle>,
    ) -> Self {
        Self {
            allocations,
            back_buffer,
            created,
            context: PassContext::new(name),
        }
    }

    /// Name of the pass being recorded.
    pub fn name(&self) -> &str {
        &self.context.name
    }

    /// The graph's back buffer handle, if the builder minted one.
    pub fn back_buffer(&self) -> Option<ResourceHandle> {
        self.back_buffer
    }

    pub(crate) fn ensure_created(&mut self, resource: ResourceHandle) {
        if Some(resource) == self.back_buffer || self.created.contains(&resource) {
            return;
        }
        let allocation = match self.allocations.get(resource) {
            Some(allocation) => allocation,
            None => panic!(
                "pass '{}' refers to resource {} which has no allocation",
                self.context.name, resource
            ),
        };
        self.created.insert(resource);
        self.context.commands.push(Command::Create {
            resource,
            allocation,
        });
    }

    /// Append a command, creating any resource it refers to first.
    pub fn record(&mut self, command: Command) {
        for resource in command.resources() {
            self.ensure_created(resource);
        }
        self.context.commands.push(command);
    }

    pub(crate) fn finish(self) -> PassContext {
        self.context
    }

    // === Buffer commands ===

    pub fn upload_buffer(&mut self, target: ResourceHandle, offset: u64, data: &[u8]) {
        self.record(Command::Upload {
            target,
            data: UploadData::Buffer {
                offset,
                data: data.to_vec(),
            },
        });
    }

    /// Upload a slice of plain values at a byte offset.
    pub fn upload_slice<T: Pod>(&mut self, target: ResourceHandle, offset: u64, values: &[T]) {
        self.upload_buffer(target, offset, bytemuck::cast_slice(values));
    }

    pub fn upload_texture(&mut self, target: ResourceHandle, image: Image) {
        self.record(Command::Upload {
            target,
            data: UploadData::Image(image),
        });
    }

    pub fn upload_cube_map_face(&mut self, target: ResourceHandle, face: CubeMapFace, image: Image) {
        self.record(Command::Upload {
            target,
            data: UploadData::CubeMapFace { face, image },
        });
    }

    pub fn upload_texture_array_layer(&mut self, target: ResourceHandle, layer: u32, image: Image) {
        self.record(Command::Upload {
            target,
            data: UploadData::TextureArrayLayer { layer, image },
        });
    }

    /// Copy `source` into `target`. Both must be the same kind of resource.
    pub fn copy(&mut self, source: ResourceHandle, target: ResourceHandle) {
        self.record(Command::Copy { source, target });
    }

    pub fn blit(
        &mut self,
        source: ResourceHandle,
        target: ResourceHandle,
        kind: BlitKind,
        source_rect: Option<Rect>,
        target_rect: Option<Rect>,
        filter: FilterMode,
    ) {
        self.record(Command::Blit {
            source,
            target,
            kind,
            source_rect,
            target_rect,
            filter,
        });
    }

    pub fn blit_color(&mut self, source: ResourceHandle, target: ResourceHandle) {
        self.blit(source, target, BlitKind::Color, None, None, FilterMode::Linear);
    }

    pub fn blit_depth(&mut self, source: ResourceHandle, target: ResourceHandle) {
        self.blit(source, target, BlitKind::Depth, None, None, FilterMode::Nearest);
    }

    pub fn blit_stencil(&mut self, source: ResourceHandle, target: ResourceHandle) {
        self.blit(source, target, BlitKind::Stencil, None, None, FilterMode::Nearest);
    }

    // === Render commands ===

    /// Begin a pass rendering into textures.
    pub fn begin_pass(&mut self, colors: &[ResourceHandle], depth_stencil: Option<ResourceHandle>) {
        self.record(Command::BeginPass(BeginPass::Attachments {
            colors: colors.to_vec(),
            depth_stencil,
        }));
    }

    pub fn begin_back_buffer_pass(&mut self) {
        self.record(Command::BeginPass(BeginPass::BackBuffer));
    }

    pub fn clear(&mut self, values: ClearValues) {
        self.record(Command::Clear(values));
    }

    pub fn clear_color(&mut self, color: Vec4) {
        self.clear(ClearValues {
            color: Some(color),
            ..Default::default()
        });
    }

    pub fn clear_depth(&mut self, depth: f32) {
        self.clear(ClearValues {
            depth: Some(depth),
            ..Default::default()
        });
    }

    pub fn clear_stencil(&mut self, stencil: u32) {
        self.clear(ClearValues {
            stencil: Some(stencil),
            ..Default::default()
        });
    }

    pub fn bind_pipeline(&mut self, pipeline: ResourceHandle) {
        self.record(Command::BindPipeline(pipeline));
    }

    pub fn bind_vertex_buffers(&mut self, binding: VertexBufferBinding) {
        self.record(Command::BindVertexBuffers(binding));
    }

    pub fn bind_shader_resources(&mut self, bindings: &[ShaderBinding]) {
        self.record(Command::BindShaderResources(bindings.to_vec()));
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.record(Command::SetViewport(viewport));
    }

    pub fn draw(&mut self, call: DrawCall) {
        self.record(Command::Draw(call));
    }

    pub fn draw_array(&mut self, first: u32, count: u32) {
        self.draw(DrawCall::Array { first, count });
    }

    pub fn draw_indexed(&mut self, first: u32, count: u32) {
        self.draw(DrawCall::Indexed { first, count });
    }

    pub fn draw_instanced(&mut self, first: u32, count: u32, instances: u32) {
        self.draw(DrawCall::InstancedArray {
            first,
            count,
            instances,
        });
    }

    pub fn finish_pass(&mut self) {
        self.record(Command::FinishPass);
    }
}

/// Run every pass callback of `graph` and collect the recorded contexts.
///
/// Handles a pass declares (reads, then writes, then persists) are created
/// before its callback runs. A handle is created once per graph.
pub(crate) fn translate(graph: &mut Graph) -> Vec<PassContext> {
    let mut created = HashSet::new();
    let allocations = &graph.allocations;
    let back_buffer = graph.back_buffer;

    let mut contexts = Vec::with_capacity(graph.passes.len());
    for pass in graph.passes.iter_mut() {
        let mut recorder = PassRecorder::new(&pass.name, allocations, back_buffer, &mut created);
        for resource in pass.reads.iter().chain(&pass.writes).chain(&pass.persists) {
            recorder.ensure_created(*resource);
        }
        match pass.callback.take() {
            Some(callback) => callback(&mut recorder),
            None => log::warn!("pass '{}' was already translated", pass.name),
        }

        let mut context = recorder.finish();
        context.persists = pass.persists.clone();
        log::trace!(
            "translated pass '{}': {} commands",
            context.name,
            context.commands.len()
        );
        contexts.push(context);
    }
    contexts
}
