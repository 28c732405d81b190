//! Command dispatch for one graph execution
//!
//! Buffer commands (uploads, copies, blits) and render commands are recorded
//! into two separate command buffers. Buffer commands are held back until a
//! render command needs their result: every handle they touch is marked
//! dirty, and binding or attaching a dirty handle flushes them. Flushing
//! always submits the render commands recorded so far first, so the device
//! observes commands in recorded order.

use std::collections::{HashMap, HashSet};

use glam::UVec2;

use crate::backend::command::GpuCommand;
use crate::backend::objects::*;
use crate::backend::traits::RenderDevice;
use crate::backend::types::*;
use crate::error::{RuntimeError, RuntimeResult};
use crate::render_graph::command::*;
use crate::render_graph::resource::ResourceHandle;
use crate::runtime::pool::Pools;

/// Shape shared by every attachment of a render target
#[derive(Debug, Clone, Copy)]
struct TargetShape {
    width: u32,
    height: u32,
    samples: u32,
    layers: u32,
    array: bool,
}

pub(crate) struct Dispatcher<'a, R: RenderDevice> {
    device: &'a mut R,
    pools: &'a mut Pools,
    objects: &'a mut HashMap<ResourceHandle, RenderObject>,
    persistent: &'a mut HashMap<ResourceHandle, RenderObject>,
    back_buffer: Option<ResourceHandle>,
    queue: usize,
    pass_name: String,
    buffer_commands: Option<CommandBuffer>,
    render_commands: Option<CommandBuffer>,
    dirty: HashSet<ResourceHandle>,
    current_pass: Option<RenderPass>,
    back_buffer_pending: bool,
    discarded: Vec<RenderTarget>,
}

impl<'a, R: RenderDevice> Dispatcher<'a, R> {
    pub(crate) fn new(
        device: &'a mut R,
        pools: &'a mut Pools,
        objects: &'a mut HashMap<ResourceHandle, RenderObject>,
        persistent: &'a mut HashMap<ResourceHandle, RenderObject>,
        back_buffer: Option<ResourceHandle>,
        queue: usize,
    ) -> Self {
        Self {
            device,
            pools,
            objects,
            persistent,
            back_buffer,
            queue,
            pass_name: String::new(),
            buffer_commands: None,
            render_commands: None,
            dirty: HashSet::new(),
            current_pass: None,
            back_buffer_pending: false,
            discarded: Vec::new(),
        }
    }

    /// Dispatch every context and flush. On error, unsubmitted work is
    /// released before the error is returned.
    pub(crate) fn run(mut self, contexts: &[PassContext]) -> RuntimeResult<()> {
        let result = self.dispatch_all(contexts);
        if result.is_err() {
            self.abandon();
        }
        result
    }

    fn dispatch_all(&mut self, contexts: &[PassContext]) -> RuntimeResult<()> {
        for context in contexts {
            self.pass_name.clone_from(&context.name);
            log::trace!("dispatching pass '{}'", context.name);

            for command in &context.commands {
                self.dispatch(command)?;
            }
            if self.current_pass.is_some() {
                panic!("pass '{}' left a render pass open", context.name);
            }
            for &resource in &context.persists {
                self.persist(resource);
            }
        }
        self.flush_buffer_commands()
    }

    fn dispatch(&mut self, command: &Command) -> RuntimeResult<()> {
        log::trace!("'{}': {}", self.pass_name, command.name());
        match command {
            Command::Create {
                resource,
                allocation,
            } => {
                if let Some(persisted) = self.persistent.get(resource) {
                    if persisted.desc() == Some(allocation.object_desc()) {
                        log::trace!("{} is persistent, skipping create", resource);
                        return Ok(());
                    }
                    // A recompiled graph reused the handle for another shape.
                    if let Some(stale) = self.persistent.remove(resource) {
                        log::trace!("{} changed shape, destroying {}", resource, stale.id());
                        self.device.destroy(stale);
                    }
                }
                if self.objects.contains_key(resource) {
                    panic!(
                        "pass '{}' creates resource {} twice",
                        self.pass_name, resource
                    );
                }
                let object = self.pools.create(&mut *self.device, allocation)?;
                self.objects.insert(*resource, object);
            }
            Command::Upload { target, data } => self.upload(*target, data)?,
            Command::Copy { source, target } => self.copy(*source, *target)?,
            Command::Blit {
                source,
                target,
                kind,
                source_rect,
                target_rect,
                filter,
            } => self.blit(*source, *target, *kind, *source_rect, *target_rect, *filter)?,
            Command::BeginPass(BeginPass::Attachments {
                colors,
                depth_stencil,
            }) => self.begin_pass(colors, *depth_stencil)?,
            Command::BeginPass(BeginPass::BackBuffer) => self.begin_back_buffer_pass()?,
            Command::Clear(values) => {
                self.require_pass("clear");
                self.record_render(GpuCommand::Clear(*values))?;
            }
            Command::BindPipeline(pipeline) => {
                self.require_pass("bind_pipeline");
                let pipeline = match self.object(*pipeline) {
                    RenderObject::RenderPipeline(p) => p,
                    other => panic!(
                        "pass '{}' binds {:?} {} as a pipeline",
                        self.pass_name,
                        other.kind(),
                        pipeline
                    ),
                };
                self.record_render(GpuCommand::BindPipeline(pipeline))?;
            }
            Command::BindVertexBuffers(binding) => self.bind_vertex_buffers(binding)?,
            Command::BindShaderResources(bindings) => self.bind_shader_resources(bindings)?,
            Command::SetViewport(viewport) => {
                self.require_pass("set_viewport");
                self.record_render(GpuCommand::SetViewport(*viewport))?;
            }
            Command::Draw(call) => {
                self.require_pass("draw");
                self.record_render(GpuCommand::Draw(call.clone()))?;
            }
            Command::FinishPass => {
                self.require_pass("finish_pass");
                self.record_render(GpuCommand::EndRenderPass)?;
                self.current_pass = None;
                self.flush_render_commands()?;
            }
        }
        Ok(())
    }

    // === Resolution ===

    fn object(&self, resource: ResourceHandle) -> RenderObject {
        if Some(resource) == self.back_buffer {
            return self.device.back_buffer().into();
        }
        if let Some(object) = self.persistent.get(&resource) {
            return object.clone();
        }
        match self.objects.get(&resource) {
            Some(object) => object.clone(),
            None => panic!(
                "pass '{}' uses resource {} before it was created",
                self.pass_name, resource
            ),
        }
    }

    fn attachment(&self, resource: ResourceHandle) -> Attachment {
        match self.object(resource) {
            RenderObject::TextureBuffer(t) => Attachment::Texture(t),
            RenderObject::TextureArrayBuffer(t) => Attachment::TextureArray(t),
            other => panic!(
                "pass '{}' attaches {:?} {} to a render target",
                self.pass_name,
                other.kind(),
                resource
            ),
        }
    }

    fn require_pass(&self, command: &str) {
        if self.current_pass.is_none() {
            panic!(
                "pass '{}' records {} outside of a render pass",
                self.pass_name, command
            );
        }
    }

    // === Recording and flushing ===

    fn record_buffer(&mut self, command: GpuCommand) -> RuntimeResult<()> {
        let buffer = match self.buffer_commands {
            Some(buffer) => buffer,
            None => {
                let buffer = self.device.create_command_buffer()?;
                self.buffer_commands = Some(buffer);
                buffer
            }
        };
        self.device.record(&buffer, command);
        Ok(())
    }

    fn record_render(&mut self, command: GpuCommand) -> RuntimeResult<()> {
        let buffer = match self.render_commands {
            Some(buffer) => buffer,
            None => {
                let buffer = self.device.create_command_buffer()?;
                self.render_commands = Some(buffer);
                buffer
            }
        };
        self.device.record(&buffer, command);
        Ok(())
    }

    fn flush_render_commands(&mut self) -> RuntimeResult<()> {
        if let Some(buffer) = self.render_commands.take() {
            log::trace!("flushing render commands {}", buffer.id());
            self.device.submit(self.queue, buffer)?;
        }
        Ok(())
    }

    fn flush_buffer_commands(&mut self) -> RuntimeResult<()> {
        self.flush_render_commands()?;
        if let Some(buffer) = self.buffer_commands.take() {
            log::trace!(
                "flushing buffer commands {} ({} dirty)",
                buffer.id(),
                self.dirty.len()
            );
            self.device.submit(self.queue, buffer)?;
        }
        self.dirty.clear();
        self.back_buffer_pending = false;
        for target in self.discarded.drain(..) {
            self.device.destroy(target.into());
        }
        Ok(())
    }

    fn flush_if_dirty(&mut self, resources: impl IntoIterator<Item = ResourceHandle>) -> RuntimeResult<()> {
        if resources.into_iter().any(|r| self.dirty.contains(&r)) {
            self.flush_buffer_commands()?;
        }
        Ok(())
    }

    fn abandon(&mut self) {
        log::debug!("abandoning execution in pass '{}'", self.pass_name);
        if let Some(buffer) = self.render_commands.take() {
            self.device.destroy(buffer.into());
        }
        if let Some(buffer) = self.buffer_commands.take() {
            self.device.destroy(buffer.into());
        }
        for target in self.discarded.drain(..) {
            self.device.destroy(target.into());
        }
        self.current_pass = None;
    }

    // === Buffer commands ===

    fn upload(&mut self, target: ResourceHandle, data: &UploadData) -> RuntimeResult<()> {
        let command = match (self.object(target), data.clone()) {
            (RenderObject::VertexBuffer(b), UploadData::Buffer { offset, data }) => {
                GpuCommand::UploadBuffer {
                    buffer: BufferObject::Vertex(b),
                    offset,
                    data,
                }
            }
            (RenderObject::IndexBuffer(b), UploadData::Buffer { offset, data }) => {
                GpuCommand::UploadBuffer {
                    buffer: BufferObject::Index(b),
                    offset,
                    data,
                }
            }
            (RenderObject::ShaderUniformBuffer(b), UploadData::Buffer { offset, data }) => {
                GpuCommand::UploadBuffer {
                    buffer: BufferObject::Uniform(b),
                    offset,
                    data,
                }
            }
            (RenderObject::ShaderStorageBuffer(b), UploadData::Buffer { offset, data }) => {
                GpuCommand::UploadBuffer {
                    buffer: BufferObject::Storage(b),
                    offset,
                    data,
                }
            }
            (RenderObject::TextureBuffer(texture), UploadData::Image(image)) => {
                GpuCommand::UploadTexture { texture, image }
            }
            (RenderObject::TextureBuffer(texture), UploadData::CubeMapFace { face, image }) => {
                GpuCommand::UploadCubeMapFace {
                    texture,
                    face,
                    image,
                }
            }
            (
                RenderObject::TextureArrayBuffer(texture),
                UploadData::TextureArrayLayer { layer, image },
            ) => GpuCommand::UploadTextureArrayLayer {
                texture,
                layer,
                image,
            },
            (object, _) => panic!(
                "pass '{}' uploads mismatched data to {:?} {}",
                self.pass_name,
                object.kind(),
                target
            ),
        };
        self.record_buffer(command)?;
        self.dirty.insert(target);
        Ok(())
    }

    fn copy(&mut self, source: ResourceHandle, target: ResourceHandle) -> RuntimeResult<()> {
        let command = match (self.object(source), self.object(target)) {
            (RenderObject::VertexBuffer(s), RenderObject::VertexBuffer(t)) => GpuCommand::CopyBuffer {
                source: BufferObject::Vertex(s),
                target: BufferObject::Vertex(t),
            },
            (RenderObject::IndexBuffer(s), RenderObject::IndexBuffer(t)) => GpuCommand::CopyBuffer {
                source: BufferObject::Index(s),
                target: BufferObject::Index(t),
            },
            (RenderObject::ShaderUniformBuffer(s), RenderObject::ShaderUniformBuffer(t)) => {
                GpuCommand::CopyBuffer {
                    source: BufferObject::Uniform(s),
                    target: BufferObject::Uniform(t),
                }
            }
            (RenderObject::ShaderStorageBuffer(s), RenderObject::ShaderStorageBuffer(t)) => {
                GpuCommand::CopyBuffer {
                    source: BufferObject::Storage(s),
                    target: BufferObject::Storage(t),
                }
            }
            (RenderObject::TextureBuffer(source), RenderObject::TextureBuffer(target)) => {
                GpuCommand::CopyTexture { source, target }
            }
            (RenderObject::TextureArrayBuffer(source), RenderObject::TextureArrayBuffer(target)) => {
                GpuCommand::CopyTextureArray { source, target }
            }
            (s, t) => panic!(
                "pass '{}' copies {:?} {} into {:?} {}",
                self.pass_name,
                s.kind(),
                source,
                t.kind(),
                target
            ),
        };
        self.record_buffer(command)?;
        self.dirty.insert(source);
        self.dirty.insert(target);
        Ok(())
    }

    /// Resolve a blit operand to a render target, wrapping textures in a
    /// throwaway target destroyed after the next buffer flush.
    fn blit_operand(
        &mut self,
        resource: ResourceHandle,
        kind: BlitKind,
    ) -> RuntimeResult<(RenderTarget, UVec2)> {
        let (attachment, layers) = match self.object(resource) {
            RenderObject::RenderTarget(target) => {
                let size = UVec2::new(target.desc().width, target.desc().height);
                return Ok((target, size));
            }
            RenderObject::TextureBuffer(t) => (Attachment::Texture(t), 1),
            RenderObject::TextureArrayBuffer(t) => {
                let layers = t.desc().layers;
                (Attachment::TextureArray(t), layers)
            }
            other => panic!(
                "pass '{}' blits {:?} {}",
                self.pass_name,
                other.kind(),
                resource
            ),
        };

        let color = kind == BlitKind::Color;
        let desc = RenderTargetDesc {
            width: attachment.width(),
            height: attachment.height(),
            samples: attachment.samples(),
            layers,
            color_attachments: u32::from(color),
            has_depth_stencil: !color,
        };
        let wrapper = self.device.create_render_target(&desc)?;
        self.discarded.push(wrapper.clone());
        let size = UVec2::new(desc.width, desc.height);
        let (colors, depth_stencil) = if color {
            (vec![attachment], None)
        } else {
            (Vec::new(), Some(attachment))
        };
        self.record_buffer(GpuCommand::SetAttachments {
            target: wrapper.clone(),
            colors,
            depth_stencil,
        })?;
        Ok((wrapper, size))
    }

    fn blit(
        &mut self,
        source: ResourceHandle,
        target: ResourceHandle,
        kind: BlitKind,
        source_rect: Option<Rect>,
        target_rect: Option<Rect>,
        filter: FilterMode,
    ) -> RuntimeResult<()> {
        let source_is_screen = Some(source) == self.back_buffer;
        let target_is_screen = Some(target) == self.back_buffer;
        if source_is_screen && target_is_screen {
            return Err(RuntimeError::BackBufferSelfBlit);
        }

        let (source_target, source_size) = self.blit_operand(source, kind)?;
        let (target_target, target_size) = self.blit_operand(target, kind)?;
        self.record_buffer(GpuCommand::Blit {
            source: source_target,
            target: target_target,
            source_rect: source_rect.unwrap_or(Rect::new(UVec2::ZERO, source_size)),
            target_rect: target_rect.unwrap_or(Rect::new(UVec2::ZERO, target_size)),
            kind,
            filter,
        })?;

        if source_is_screen || target_is_screen {
            self.back_buffer_pending = true;
        }
        if !source_is_screen {
            self.dirty.insert(source);
        }
        if !target_is_screen {
            self.dirty.insert(target);
        }
        Ok(())
    }

    // === Render commands ===

    fn synthesize(&mut self, shape: TargetShape, format: TextureFormat) -> RuntimeResult<Attachment> {
        let device = &mut *self.device;
        Ok(if shape.array {
            let desc = TextureArrayBufferDesc::new(shape.width, shape.height, shape.layers, format)
                .with_samples(shape.samples);
            let texture = self
                .pools
                .texture_arrays
                .acquire(&desc, |d| device.create_texture_array_buffer(d))?;
            Attachment::TextureArray(texture)
        } else {
            let desc = TextureBufferDesc::new(shape.width, shape.height, format)
                .with_samples(shape.samples);
            let texture = self
                .pools
                .textures
                .acquire(&desc, |d| device.create_texture_buffer(d))?;
            Attachment::Texture(texture)
        })
    }

    fn open_pass(&mut self, target: RenderTarget) -> RuntimeResult<()> {
        let device = &mut *self.device;
        let pass_desc = RenderPassDesc::from(target.desc());
        let pass = self
            .pools
            .render_passes
            .acquire(&pass_desc, |d| device.create_render_pass(d))?;
        self.record_render(GpuCommand::BeginRenderPass {
            pass: pass.clone(),
            target,
        })?;
        self.current_pass = Some(pass);
        Ok(())
    }

    fn begin_pass(
        &mut self,
        colors: &[ResourceHandle],
        depth_stencil: Option<ResourceHandle>,
    ) -> RuntimeResult<()> {
        if self.current_pass.is_some() {
            panic!("pass '{}' begins a render pass while one is open", self.pass_name);
        }
        self.flush_if_dirty(colors.iter().copied().chain(depth_stencil))?;

        let mut colors: Vec<Attachment> = colors.iter().map(|&c| self.attachment(c)).collect();
        let depth_stencil = depth_stencil.map(|d| self.attachment(d));

        let shape = match colors.first().or(depth_stencil.as_ref()) {
            Some(reference) => TargetShape {
                width: reference.width(),
                height: reference.height(),
                samples: reference.samples(),
                layers: reference.layers(),
                array: matches!(reference, Attachment::TextureArray(_)),
            },
            None => {
                let screen = self.device.back_buffer_desc();
                TargetShape {
                    width: screen.width,
                    height: screen.height,
                    samples: screen.samples,
                    layers: 1,
                    array: false,
                }
            }
        };

        let depth_stencil = match depth_stencil {
            Some(depth_stencil) => depth_stencil,
            None => self.synthesize(shape, TextureFormat::DEPTH_STENCIL)?,
        };
        if colors.is_empty() {
            colors.push(self.synthesize(shape, TextureFormat::RGBA)?);
        }

        let target_desc = RenderTargetDesc {
            width: shape.width,
            height: shape.height,
            samples: shape.samples,
            layers: shape.layers,
            color_attachments: colors.len() as u32,
            has_depth_stencil: true,
        };
        let device = &mut *self.device;
        let target = self
            .pools
            .render_targets
            .acquire(&target_desc, |d| device.create_render_target(d))?;
        self.record_render(GpuCommand::SetAttachments {
            target: target.clone(),
            colors,
            depth_stencil: Some(depth_stencil),
        })?;
        self.open_pass(target)
    }

    fn begin_back_buffer_pass(&mut self) -> RuntimeResult<()> {
        if self.current_pass.is_some() {
            panic!("pass '{}' begins a render pass while one is open", self.pass_name);
        }
        if self.back_buffer_pending {
            self.flush_buffer_commands()?;
        }
        let target = self.device.back_buffer();
        self.open_pass(target)
    }

    fn bind_vertex_buffers(&mut self, binding: &VertexBufferBinding) -> RuntimeResult<()> {
        self.require_pass("bind_vertex_buffers");
        self.flush_if_dirty(binding.buffers())?;

        let vertices = self.vertex_buffer(binding.vertices);
        let indices = binding.indices.map(|handle| match self.object(handle) {
            RenderObject::IndexBuffer(b) => b,
            other => panic!(
                "pass '{}' binds {:?} {} as an index buffer",
                self.pass_name,
                other.kind(),
                handle
            ),
        });
        let instances = binding.instances.map(|handle| self.vertex_buffer(handle));

        let desc = VertexArrayObjectDesc {
            vertex_layout: binding.vertex_layout.clone(),
            instance_layout: binding.instance_layout.clone(),
        };
        let device = &mut *self.device;
        let vertex_array = self
            .pools
            .vertex_arrays
            .acquire(&desc, |d| device.create_vertex_array_object(d))?;
        self.record_render(GpuCommand::BindVertexArray {
            vertex_array,
            vertices,
            indices,
            instances,
        })
    }

    fn vertex_buffer(&self, handle: ResourceHandle) -> VertexBuffer {
        match self.object(handle) {
            RenderObject::VertexBuffer(b) => b,
            other => panic!(
                "pass '{}' binds {:?} {} as a vertex buffer",
                self.pass_name,
                other.kind(),
                handle
            ),
        }
    }

    fn bind_shader_resources(&mut self, bindings: &[ShaderBinding]) -> RuntimeResult<()> {
        self.require_pass("bind_shader_resources");
        let mut resources = Vec::with_capacity(bindings.len());
        for binding in bindings {
            self.flush_if_dirty([binding.resource])?;
            let object = match self.object(binding.resource) {
                RenderObject::TextureBuffer(t) => ShaderResourceObject::Texture(t),
                RenderObject::TextureArrayBuffer(t) => ShaderResourceObject::TextureArray(t),
                RenderObject::ShaderUniformBuffer(b) => ShaderResourceObject::Uniform(b),
                RenderObject::ShaderStorageBuffer(b) => ShaderResourceObject::Storage(b),
                other => panic!(
                    "pass '{}' binds {:?} {} as a shader resource",
                    self.pass_name,
                    other.kind(),
                    binding.resource
                ),
            };
            resources.push(ShaderResource {
                object,
                access: binding.access,
            });
        }
        self.record_render(GpuCommand::BindShaderResources(resources))
    }

    // === Persistence ===

    /// Move a handle's object to the persistent registry. Persisting twice is a no-op.
    fn persist(&mut self, resource: ResourceHandle) {
        if self.persistent.contains_key(&resource) {
            return;
        }
        let object = match self.objects.remove(&resource) {
            Some(object) => object,
            None => panic!(
                "pass '{}' persists resource {} which was never created",
                self.pass_name, resource
            ),
        };
        self.pools.detach(&object);
        log::trace!("persisting {} as {}", resource, object.id());
        self.persistent.insert(resource, object);
    }
}
