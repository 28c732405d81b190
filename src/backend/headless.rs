//! Headless backend
//!
//! Executes submitted command buffers against simulated memory instead of a
//! GPU. Buffers and textures are byte arrays, draws are logged together with a
//! snapshot of the data they read, and every submission is kept for
//! inspection. Used by the test suite and the `headless` demo.

use std::collections::HashMap;

use glam::Vec4;

use crate::backend::command::{DrawCall, GpuCommand};
use crate::backend::objects::*;
use crate::backend::traits::{BackendError, BackendResult, RenderDevice};
use crate::backend::types::*;

/// Configuration for a [`HeadlessDevice`]
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub back_buffer_width: u32,
    pub back_buffer_height: u32,
    pub back_buffer_format: TextureFormat,
    /// Number of render queues the device exposes
    pub render_queues: usize,
    /// Object creation fails with `OutOfMemory` once this many objects are live
    pub max_live_objects: Option<usize>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            back_buffer_width: 800,
            back_buffer_height: 600,
            back_buffer_format: TextureFormat::Rgba8Unorm,
            render_queues: 1,
            max_live_objects: None,
        }
    }
}

impl HeadlessConfig {
    pub fn with_back_buffer(mut self, width: u32, height: u32) -> Self {
        self.back_buffer_width = width;
        self.back_buffer_height = height;
        self
    }

    pub fn with_render_queues(mut self, render_queues: usize) -> Self {
        self.render_queues = render_queues;
        self
    }

    pub fn with_max_live_objects(mut self, max_live_objects: usize) -> Self {
        self.max_live_objects = Some(max_live_objects);
        self
    }
}

/// A draw executed by the device
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub call: DrawCall,
    pub target: ObjectId,
    pub pipeline: Option<ObjectId>,
    pub viewport: Option<Viewport>,
    pub vertex_buffer: Option<ObjectId>,
    pub index_buffer: Option<ObjectId>,
    pub instance_buffer: Option<ObjectId>,
    /// Contents of the vertex buffer at draw time
    pub vertex_data: Option<Vec<u8>>,
    /// Bound shader resources with their contents at draw time
    pub shader_resources: Vec<(ObjectId, Vec<u8>)>,
}

/// A submitted command buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub queue: usize,
    pub buffer: ObjectId,
    pub commands: Vec<&'static str>,
}

#[derive(Debug, Clone)]
struct BoundAttachments {
    colors: Vec<Attachment>,
    depth_stencil: Option<Attachment>,
}

/// Pipeline state between `BeginRenderPass` and `EndRenderPass`
#[derive(Debug, Default)]
struct PassState {
    target: Option<RenderTarget>,
    pipeline: Option<ObjectId>,
    viewport: Option<Viewport>,
    vertices: Option<ObjectId>,
    indices: Option<ObjectId>,
    instances: Option<ObjectId>,
    shader_resources: Vec<ObjectId>,
}

/// Region of memory a blit reads or writes
#[derive(Debug, Clone, Copy)]
struct Surface {
    id: ObjectId,
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
}

/// In-memory [`RenderDevice`]
#[derive(Debug)]
pub struct HeadlessDevice {
    config: HeadlessConfig,
    next_id: u64,
    back_buffer: RenderTarget,
    live: HashMap<ObjectId, ObjectKind>,
    created: HashMap<ObjectKind, usize>,
    recording: HashMap<ObjectId, Vec<GpuCommand>>,
    memory: HashMap<ObjectId, Vec<u8>>,
    attachments: HashMap<ObjectId, BoundAttachments>,
    state: PassState,
    draws: Vec<DrawRecord>,
    submissions: Vec<Submission>,
}

impl HeadlessDevice {
    pub fn new(config: HeadlessConfig) -> Self {
        let mut device = Self {
            back_buffer: RenderTarget::new(ObjectId(0), Self::back_buffer_shape(&config)),
            config,
            next_id: 1,
            live: HashMap::new(),
            created: HashMap::new(),
            recording: HashMap::new(),
            memory: HashMap::new(),
            attachments: HashMap::new(),
            state: PassState::default(),
            draws: Vec::new(),
            submissions: Vec::new(),
        };
        device.replace_back_buffer();
        device
    }

    fn back_buffer_shape(config: &HeadlessConfig) -> RenderTargetDesc {
        RenderTargetDesc {
            width: config.back_buffer_width,
            height: config.back_buffer_height,
            samples: 1,
            layers: 1,
            color_attachments: 1,
            has_depth_stencil: false,
        }
    }

    fn replace_back_buffer(&mut self) {
        self.memory.remove(&self.back_buffer.id());
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        let desc = Self::back_buffer_shape(&self.config);
        let size = (desc.width * desc.height * self.config.back_buffer_format.bytes_per_pixel())
            as usize;
        self.memory.insert(id, vec![0; size]);
        self.back_buffer = RenderTarget::new(id, desc);
        log::debug!(
            "HeadlessDevice: back buffer {} ({}x{})",
            id,
            desc.width,
            desc.height
        );
    }

    /// Replace the back buffer with a new one of the given size. The old
    /// contents are lost.
    pub fn resize_back_buffer(&mut self, width: u32, height: u32) {
        self.config.back_buffer_width = width;
        self.config.back_buffer_height = height;
        self.replace_back_buffer();
    }

    pub fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    /// Every draw executed so far, in execution order.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Every command buffer submitted so far, in submission order.
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Forget recorded draws and submissions.
    pub fn clear_history(&mut self) {
        self.draws.clear();
        self.submissions.clear();
    }

    /// Current contents of a buffer or texture.
    pub fn contents(&self, id: ObjectId) -> Option<&[u8]> {
        self.memory.get(&id).map(Vec::as_slice)
    }

    pub fn back_buffer_contents(&self) -> &[u8] {
        self.memory
            .get(&self.back_buffer.id())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live objects, command buffers excluded.
    pub fn live_object_count(&self) -> usize {
        self.live
            .values()
            .filter(|kind| **kind != ObjectKind::CommandBuffer)
            .count()
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    /// Number of objects of `kind` created over the device's lifetime.
    pub fn created_count(&self, kind: ObjectKind) -> usize {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    fn allocate(&mut self, kind: ObjectKind) -> BackendResult<ObjectId> {
        if kind != ObjectKind::CommandBuffer {
            if let Some(max) = self.config.max_live_objects {
                if self.live_object_count() >= max {
                    log::trace!("HeadlessDevice: out of memory creating {:?}", kind);
                    return Err(BackendError::OutOfMemory);
                }
            }
        }

        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, kind);
        *self.created.entry(kind).or_default() += 1;
        log::trace!("HeadlessDevice: creating {:?} {}", kind, id);
        Ok(id)
    }

    fn allocate_memory(&mut self, kind: ObjectKind, size: usize) -> BackendResult<ObjectId> {
        let id = self.allocate(kind)?;
        self.memory.insert(id, vec![0; size]);
        Ok(id)
    }

    fn memory(&self, id: ObjectId) -> BackendResult<&Vec<u8>> {
        self.memory
            .get(&id)
            .ok_or_else(|| BackendError::InvalidParameter(format!("{id} has no memory")))
    }

    fn memory_mut(&mut self, id: ObjectId) -> BackendResult<&mut Vec<u8>> {
        self.memory
            .get_mut(&id)
            .ok_or_else(|| BackendError::InvalidParameter(format!("{id} has no memory")))
    }

    fn write(&mut self, id: ObjectId, offset: usize, data: &[u8]) -> BackendResult<()> {
        let memory = self.memory_mut(id)?;
        let end = offset + data.len();
        if end > memory.len() {
            return Err(BackendError::InvalidParameter(format!(
                "write of {} bytes at offset {} overflows {} ({} bytes)",
                data.len(),
                offset,
                id,
                memory.len()
            )));
        }
        memory[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn check_image(
        image: &Image,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> BackendResult<()> {
        if image.width != width || image.height != height || image.format != format {
            return Err(BackendError::InvalidParameter(format!(
                "image {}x{} {:?} does not match texture {}x{} {:?}",
                image.width, image.height, image.format, width, height, format
            )));
        }
        if image.data.len() != image.byte_size() {
            return Err(BackendError::InvalidParameter(format!(
                "image holds {} bytes, expected {}",
                image.data.len(),
                image.byte_size()
            )));
        }
        Ok(())
    }

    fn color_surfaces(&self, target: &RenderTarget) -> BackendResult<Vec<(ObjectId, TextureFormat)>> {
        if target.id() == self.back_buffer.id() {
            return Ok(vec![(target.id(), self.config.back_buffer_format)]);
        }
        let bound = self.bound_attachments(target)?;
        Ok(bound
            .colors
            .iter()
            .map(|attachment| (attachment.id(), attachment.format()))
            .collect())
    }

    fn bound_attachments(&self, target: &RenderTarget) -> BackendResult<&BoundAttachments> {
        self.attachments.get(&target.id()).ok_or_else(|| {
            BackendError::InvalidParameter(format!("render target {} has no attachments", target.id()))
        })
    }

    fn blit_surface(&self, target: &RenderTarget, kind: BlitKind) -> BackendResult<Surface> {
        if target.id() == self.back_buffer.id() {
            if kind != BlitKind::Color {
                return Err(BackendError::InvalidParameter(
                    "back buffer has no depth/stencil attachment".to_string(),
                ));
            }
            let desc = self.back_buffer.desc();
            return Ok(Surface {
                id: target.id(),
                width: desc.width,
                height: desc.height,
                bytes_per_pixel: self.config.back_buffer_format.bytes_per_pixel(),
            });
        }

        let bound = self.bound_attachments(target)?;
        let attachment = match kind {
            BlitKind::Color => bound.colors.first(),
            BlitKind::Depth => bound.depth_stencil.as_ref(),
            BlitKind::Stencil => bound
                .depth_stencil
                .as_ref()
                .filter(|attachment| attachment.format().has_stencil()),
        }
        .ok_or_else(|| {
            BackendError::InvalidParameter(format!(
                "render target {} has no {:?} attachment",
                target.id(),
                kind
            ))
        })?;

        Ok(Surface {
            id: attachment.id(),
            width: attachment.width(),
            height: attachment.height(),
            bytes_per_pixel: attachment.format().bytes_per_pixel(),
        })
    }

    fn check_rect(surface: &Surface, rect: &Rect) -> BackendResult<()> {
        let end = rect.offset + rect.size;
        if end.x > surface.width || end.y > surface.height {
            return Err(BackendError::InvalidParameter(format!(
                "blit rectangle {:?} exceeds {}x{} surface {}",
                rect, surface.width, surface.height, surface.id
            )));
        }
        Ok(())
    }

    /// Nearest-neighbour blit between two surfaces.
    fn blit(
        &mut self,
        source: &RenderTarget,
        target: &RenderTarget,
        source_rect: Rect,
        target_rect: Rect,
        kind: BlitKind,
    ) -> BackendResult<()> {
        let src = self.blit_surface(source, kind)?;
        let dst = self.blit_surface(target, kind)?;
        if src.bytes_per_pixel != dst.bytes_per_pixel {
            return Err(BackendError::FeatureNotSupported(format!(
                "blit between {}-byte and {}-byte pixel formats",
                src.bytes_per_pixel, dst.bytes_per_pixel
            )));
        }
        Self::check_rect(&src, &source_rect)?;
        Self::check_rect(&dst, &target_rect)?;
        if target_rect.size.x == 0 || target_rect.size.y == 0 {
            return Ok(());
        }

        let bpp = src.bytes_per_pixel as usize;
        let pixels = self.memory(src.id)?.clone();
        let memory = self.memory_mut(dst.id)?;
        for y in 0..target_rect.size.y {
            for x in 0..target_rect.size.x {
                let sx = source_rect.offset.x + x * source_rect.size.x / target_rect.size.x;
                let sy = source_rect.offset.y + y * source_rect.size.y / target_rect.size.y;
                let s = (sy * src.width + sx) as usize * bpp;
                let d = ((target_rect.offset.y + y) * dst.width + target_rect.offset.x + x)
                    as usize
                    * bpp;
                memory[d..d + bpp].copy_from_slice(&pixels[s..s + bpp]);
            }
        }
        Ok(())
    }

    fn encode_color(color: Vec4, format: TextureFormat) -> Option<Vec<u8>> {
        let unorm = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        match format {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => Some(vec![
                unorm(color.x),
                unorm(color.y),
                unorm(color.z),
                unorm(color.w),
            ]),
            TextureFormat::Bgra8Unorm => Some(vec![
                unorm(color.z),
                unorm(color.y),
                unorm(color.x),
                unorm(color.w),
            ]),
            TextureFormat::R8Unorm => Some(vec![unorm(color.x)]),
            TextureFormat::Rg8Unorm => Some(vec![unorm(color.x), unorm(color.y)]),
            TextureFormat::R32Float => Some(bytemuck::bytes_of(&color.x).to_vec()),
            TextureFormat::Rgba32Float => Some(bytemuck::bytes_of(&color.to_array()).to_vec()),
            _ => None,
        }
    }

    fn fill(&mut self, id: ObjectId, pixel: &[u8]) -> BackendResult<()> {
        let memory = self.memory_mut(id)?;
        for chunk in memory.chunks_exact_mut(pixel.len()) {
            chunk.copy_from_slice(pixel);
        }
        Ok(())
    }

    /// `Depth24PlusStencil8` texels hold 24-bit unorm depth in the low bytes
    /// and stencil in the high byte.
    fn clear_depth_stencil(
        &mut self,
        attachment: &Attachment,
        depth: Option<f32>,
        stencil: Option<u32>,
    ) -> BackendResult<()> {
        match attachment.format() {
            TextureFormat::Depth32Float => {
                if let Some(depth) = depth {
                    self.fill(attachment.id(), bytemuck::bytes_of(&depth))?;
                }
            }
            TextureFormat::Depth24PlusStencil8 => {
                let depth = depth.map(|d| (d.clamp(0.0, 1.0) * 0xff_ffff as f32).round() as u32);
                let memory = self.memory_mut(attachment.id())?;
                for texel in memory.chunks_exact_mut(4) {
                    if let Some(depth) = depth {
                        texel[..3].copy_from_slice(&depth.to_le_bytes()[..3]);
                    }
                    if let Some(stencil) = stencil {
                        texel[3] = (stencil & 0xff) as u8;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_target(&self, command: &str) -> BackendResult<&RenderTarget> {
        self.state.target.as_ref().ok_or_else(|| {
            BackendError::InvalidParameter(format!("{command} outside of a render pass"))
        })
    }

    fn snapshot(&self, id: ObjectId) -> Vec<u8> {
        self.memory.get(&id).cloned().unwrap_or_default()
    }

    fn execute(&mut self, command: GpuCommand) -> BackendResult<()> {
        match command {
            GpuCommand::UploadBuffer {
                buffer,
                offset,
                data,
            } => self.write(buffer.id(), offset as usize, &data)?,
            GpuCommand::UploadTexture { texture, image } => {
                let desc = texture.desc();
                Self::check_image(&image, desc.width, desc.height, desc.format)?;
                self.write(texture.id(), 0, &image.data)?;
            }
            GpuCommand::UploadCubeMapFace {
                texture,
                face,
                image,
            } => {
                let desc = texture.desc();
                if desc.texture_type != TextureType::CubeMap {
                    return Err(BackendError::InvalidParameter(format!(
                        "texture {} is not a cube map",
                        texture.id()
                    )));
                }
                Self::check_image(&image, desc.width, desc.height, desc.format)?;
                let offset = face.index() * desc.face_size();
                self.write(texture.id(), offset, &image.data)?;
            }
            GpuCommand::UploadTextureArrayLayer {
                texture,
                layer,
                image,
            } => {
                let desc = texture.desc();
                if layer >= desc.layers {
                    return Err(BackendError::InvalidParameter(format!(
                        "layer {} out of range for {}-layer texture array {}",
                        layer,
                        desc.layers,
                        texture.id()
                    )));
                }
                Self::check_image(&image, desc.width, desc.height, desc.format)?;
                let offset = layer as usize * desc.layer_size();
                self.write(texture.id(), offset, &image.data)?;
            }
            GpuCommand::CopyBuffer { source, target } => {
                let data = self.memory(source.id())?.clone();
                let len = data.len().min(self.memory(target.id())?.len());
                self.write(target.id(), 0, &data[..len])?;
            }
            GpuCommand::CopyTexture { source, target } => {
                if source.desc() != target.desc() {
                    return Err(BackendError::InvalidParameter(format!(
                        "texture copy between mismatched shapes {} and {}",
                        source.id(),
                        target.id()
                    )));
                }
                let data = self.memory(source.id())?.clone();
                self.write(target.id(), 0, &data)?;
            }
            GpuCommand::CopyTextureArray { source, target } => {
                if source.desc() != target.desc() {
                    return Err(BackendError::InvalidParameter(format!(
                        "texture array copy between mismatched shapes {} and {}",
                        source.id(),
                        target.id()
                    )));
                }
                let data = self.memory(source.id())?.clone();
                self.write(target.id(), 0, &data)?;
            }
            GpuCommand::SetAttachments {
                target,
                colors,
                depth_stencil,
            } => {
                self.attachments.insert(
                    target.id(),
                    BoundAttachments {
                        colors,
                        depth_stencil,
                    },
                );
            }
            GpuCommand::Blit {
                source,
                target,
                source_rect,
                target_rect,
                kind,
                filter: _,
            } => self.blit(&source, &target, source_rect, target_rect, kind)?,
            GpuCommand::BeginRenderPass { pass, target } => {
                if self.state.target.is_some() {
                    return Err(BackendError::InvalidParameter(
                        "render pass begun while another is open".to_string(),
                    ));
                }
                if *pass.desc() != RenderPassDesc::from(target.desc()) {
                    return Err(BackendError::InvalidParameter(format!(
                        "render pass {} is incompatible with target {}",
                        pass.id(),
                        target.id()
                    )));
                }
                self.state = PassState {
                    target: Some(target),
                    ..PassState::default()
                };
            }
            GpuCommand::Clear(values) => {
                let target = self.open_target("clear")?.clone();
                if let Some(color) = values.color {
                    for (id, format) in self.color_surfaces(&target)? {
                        if let Some(pixel) = Self::encode_color(color, format) {
                            self.fill(id, &pixel)?;
                        }
                    }
                }
                let clears_depth_stencil = values.depth.is_some() || values.stencil.is_some();
                if clears_depth_stencil && target.id() != self.back_buffer.id() {
                    let depth_stencil = self.bound_attachments(&target)?.depth_stencil.clone();
                    if let Some(attachment) = depth_stencil {
                        self.clear_depth_stencil(&attachment, values.depth, values.stencil)?;
                    }
                }
            }
            GpuCommand::SetViewport(viewport) => {
                self.open_target("set_viewport")?;
                self.state.viewport = Some(viewport);
            }
            GpuCommand::BindPipeline(pipeline) => {
                self.open_target("bind_pipeline")?;
                self.state.pipeline = Some(pipeline.id());
            }
            GpuCommand::BindVertexArray {
                vertex_array: _,
                vertices,
                indices,
                instances,
            } => {
                self.open_target("bind_vertex_array")?;
                self.state.vertices = Some(vertices.id());
                self.state.indices = indices.map(|b| b.id());
                self.state.instances = instances.map(|b| b.id());
            }
            GpuCommand::BindShaderResources(resources) => {
                self.open_target("bind_shader_resources")?;
                self.state.shader_resources = resources.iter().map(|r| r.object.id()).collect();
            }
            GpuCommand::Draw(call) => {
                let target = self.open_target("draw")?.id();
                if call.is_indexed() && self.state.indices.is_none() {
                    return Err(BackendError::InvalidParameter(
                        "indexed draw without an index buffer".to_string(),
                    ));
                }
                let record = DrawRecord {
                    call,
                    target,
                    pipeline: self.state.pipeline,
                    viewport: self.state.viewport,
                    vertex_buffer: self.state.vertices,
                    index_buffer: self.state.indices,
                    instance_buffer: self.state.instances,
                    vertex_data: self.state.vertices.map(|id| self.snapshot(id)),
                    shader_resources: self
                        .state
                        .shader_resources
                        .iter()
                        .map(|id| (*id, self.snapshot(*id)))
                        .collect(),
                };
                self.draws.push(record);
            }
            GpuCommand::EndRenderPass => {
                self.open_target("end_render_pass")?;
                self.state = PassState::default();
            }
        }
        Ok(())
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl RenderDevice for HeadlessDevice {
    fn name(&self) -> &'static str {
        "Headless"
    }

    fn create_vertex_buffer(&mut self, desc: &VertexBufferDesc) -> BackendResult<VertexBuffer> {
        let id = self.allocate_memory(ObjectKind::VertexBuffer, desc.size as usize)?;
        Ok(VertexBuffer::new(id, *desc))
    }

    fn create_index_buffer(&mut self, desc: &IndexBufferDesc) -> BackendResult<IndexBuffer> {
        let id = self.allocate_memory(ObjectKind::IndexBuffer, desc.size as usize)?;
        Ok(IndexBuffer::new(id, *desc))
    }

    fn create_texture_buffer(&mut self, desc: &TextureBufferDesc) -> BackendResult<TextureBuffer> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::ObjectCreationFailed(format!(
                "texture with zero extent {}x{}",
                desc.width, desc.height
            )));
        }
        let size = desc.face_size() * desc.face_count();
        let id = self.allocate_memory(ObjectKind::TextureBuffer, size)?;
        Ok(TextureBuffer::new(id, desc.clone()))
    }

    fn create_texture_array_buffer(
        &mut self,
        desc: &TextureArrayBufferDesc,
    ) -> BackendResult<TextureArrayBuffer> {
        if desc.width == 0 || desc.height == 0 || desc.layers == 0 {
            return Err(BackendError::ObjectCreationFailed(format!(
                "texture array with zero extent {}x{}x{}",
                desc.width, desc.height, desc.layers
            )));
        }
        let size = desc.layer_size() * desc.layers as usize;
        let id = self.allocate_memory(ObjectKind::TextureArrayBuffer, size)?;
        Ok(TextureArrayBuffer::new(id, desc.clone()))
    }

    fn create_shader_uniform_buffer(
        &mut self,
        desc: &ShaderUniformBufferDesc,
    ) -> BackendResult<ShaderUniformBuffer> {
        let id = self.allocate_memory(ObjectKind::ShaderUniformBuffer, desc.size as usize)?;
        Ok(ShaderUniformBuffer::new(id, *desc))
    }

    fn create_shader_storage_buffer(
        &mut self,
        desc: &ShaderStorageBufferDesc,
    ) -> BackendResult<ShaderStorageBuffer> {
        let id = self.allocate_memory(ObjectKind::ShaderStorageBuffer, desc.size as usize)?;
        Ok(ShaderStorageBuffer::new(id, *desc))
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> BackendResult<RenderTarget> {
        let id = self.allocate(ObjectKind::RenderTarget)?;
        Ok(RenderTarget::new(id, *desc))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDesc,
    ) -> BackendResult<RenderPipeline> {
        if desc.vertex_shader.is_empty() {
            return Err(BackendError::ObjectCreationFailed(
                "pipeline without a vertex shader".to_string(),
            ));
        }
        let id = self.allocate(ObjectKind::RenderPipeline)?;
        Ok(RenderPipeline::new(id, desc.clone()))
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> BackendResult<RenderPass> {
        let id = self.allocate(ObjectKind::RenderPass)?;
        Ok(RenderPass::new(id, *desc))
    }

    fn create_vertex_array_object(
        &mut self,
        desc: &VertexArrayObjectDesc,
    ) -> BackendResult<VertexArrayObject> {
        let id = self.allocate(ObjectKind::VertexArrayObject)?;
        Ok(VertexArrayObject::new(id, desc.clone()))
    }

    fn create_command_buffer(&mut self) -> BackendResult<CommandBuffer> {
        let id = self.allocate(ObjectKind::CommandBuffer)?;
        self.recording.insert(id, Vec::new());
        Ok(CommandBuffer::new(id))
    }

    fn record(&mut self, buffer: &CommandBuffer, command: GpuCommand) {
        match self.recording.get_mut(&buffer.id()) {
            Some(commands) => commands.push(command),
            None => panic!("command buffer {} is not recording", buffer.id()),
        }
    }

    fn render_queue_count(&self) -> usize {
        self.config.render_queues
    }

    fn submit(&mut self, queue: usize, buffer: CommandBuffer) -> BackendResult<()> {
        if queue >= self.config.render_queues {
            return Err(BackendError::InvalidParameter(format!(
                "render queue {} out of range ({} available)",
                queue, self.config.render_queues
            )));
        }
        let commands = match self.recording.remove(&buffer.id()) {
            Some(commands) => commands,
            None => panic!("command buffer {} submitted twice", buffer.id()),
        };
        self.live.remove(&buffer.id());

        log::trace!(
            "HeadlessDevice: submitting {} ({} commands) to queue {}",
            buffer.id(),
            commands.len(),
            queue
        );

        let names = commands.iter().map(GpuCommand::name).collect();
        for command in commands {
            self.execute(command)?;
        }
        self.submissions.push(Submission {
            queue,
            buffer: buffer.id(),
            commands: names,
        });
        Ok(())
    }

    fn back_buffer(&self) -> RenderTarget {
        self.back_buffer.clone()
    }

    fn destroy(&mut self, object: RenderObject) {
        let id = object.id();
        if id == self.back_buffer.id() {
            panic!("the back buffer is owned by the device and cannot be destroyed");
        }
        if self.live.remove(&id).is_none() {
            panic!("{:?} {} destroyed twice", object.kind(), id);
        }
        log::trace!("HeadlessDevice: destroying {:?} {}", object.kind(), id);
        self.memory.remove(&id);
        self.attachments.remove(&id);
        self.recording.remove(&id);
    }
}
