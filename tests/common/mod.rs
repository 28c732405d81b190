//! Common utilities for runtime integration tests.

#![allow(dead_code)]

use glam::UVec2;

use render_graph_runtime::prelude::*;

pub const SCREEN_WIDTH: u32 = 64;
pub const SCREEN_HEIGHT: u32 = 64;

/// Initialise logging once for the test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn screen_size() -> UVec2 {
    UVec2::new(SCREEN_WIDTH, SCREEN_HEIGHT)
}

pub fn headless_config() -> HeadlessConfig {
    HeadlessConfig::default().with_back_buffer(SCREEN_WIDTH, SCREEN_HEIGHT)
}

/// A runtime over a fresh headless device.
pub fn runtime(config: RuntimeConfig) -> Runtime<HeadlessDevice> {
    init_logging();
    Runtime::new(HeadlessDevice::new(headless_config()), config)
        .expect("headless device exposes queue 0")
}

/// A runtime that leaves garbage collection to the caller.
pub fn manual_gc_runtime() -> Runtime<HeadlessDevice> {
    runtime(RuntimeConfig::default().with_collect_garbage(false))
}

pub fn builder() -> GraphBuilder {
    GraphBuilder::new(screen_size())
}

pub fn rgba_texture(width: u32, height: u32) -> TextureBufferDesc {
    TextureBufferDesc::new(width, height, TextureFormat::Rgba8Unorm)
}

pub fn solid_pipeline() -> RenderPipelineDesc {
    RenderPipelineDesc::new("solid.vert", "solid.frag")
        .with_vertex_layout(position_layout())
}

pub fn position_layout() -> VertexBufferLayout {
    VertexBufferLayout::packed(0, &[VertexFormat::Float32x2])
}

/// Bytes of one RGBA8 pixel of `image` at (x, y).
pub fn pixel(contents: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let offset = ((y * width + x) * 4) as usize;
    [
        contents[offset],
        contents[offset + 1],
        contents[offset + 2],
        contents[offset + 3],
    ]
}

/// Object id behind a graph resource.
pub fn object_id(runtime: &Runtime<HeadlessDevice>, graph: GraphHandle, resource: ResourceHandle) -> ObjectId {
    runtime.get_object(graph, resource).id()
}

/// Contents of the object behind a graph resource.
pub fn contents(
    runtime: &Runtime<HeadlessDevice>,
    graph: GraphHandle,
    resource: ResourceHandle,
) -> Vec<u8> {
    let id = object_id(runtime, graph, resource);
    runtime
        .device()
        .contents(id)
        .expect("resource has device memory")
        .to_vec()
}
