//! Runtime integration tests.
//!
//! Graphs are executed on the headless device, whose recorded draws and
//! submissions show what the runtime sent and in which order.
//!
//! # Test Categories
//!
//! - **Pool Tests**: watermark shrinking, eviction, reuse across executions
//! - **Persistence Tests**: reclamation, idempotence, survival across recompiles
//! - **Ordering Tests**: pass ordering, dirty flushes, back buffer hazards
//! - **Command Tests**: draw shapes, blits, implicit attachments
//! - **Failure Tests**: reported errors and contract violations

mod common;

use glam::{UVec2, Vec4};
use rstest::rstest;

use common::{builder, contents, manual_gc_runtime, object_id, pixel, rgba_texture, runtime};
use render_graph_runtime::prelude::*;

fn uniform(size: u64) -> ObjectDesc {
    ObjectDesc::ShaderUniformBuffer(ShaderUniformBufferDesc { size })
}

fn vertex(size: u64) -> ObjectDesc {
    ObjectDesc::VertexBuffer(VertexBufferDesc { size })
}

/// Record a pass that draws into `colors`, reading `bindings`.
fn draw_into(
    rec: &mut PassRecorder<'_>,
    pipeline: ResourceHandle,
    colors: &[ResourceHandle],
    bindings: &[ShaderBinding],
) {
    rec.begin_pass(colors, None);
    rec.bind_pipeline(pipeline);
    rec.bind_shader_resources(bindings);
    rec.draw_array(0, 3);
    rec.finish_pass();
}

/// Graph with one pass declaring `count` uniform buffers of 16 bytes.
fn uniform_graph(count: usize) -> Graph {
    let mut builder = builder();
    let buffers: Vec<_> = (0..count).map(|_| builder.create_uniform_buffer(16)).collect();
    let pass = builder.add_pass("allocate", |_| {});
    for buffer in buffers {
        builder.read(pass, buffer);
    }
    builder.build()
}

// ============================================================================
// Pool Tests
// ============================================================================

#[rstest]
#[case::one(1)]
#[case::two(2)]
#[case::three(3)]
fn test_pool_shrinks_to_request_count(#[case] k: usize) {
    let mut runtime = manual_gc_runtime();
    let graph = runtime.compile(uniform_graph(4));
    runtime.execute(graph).unwrap();
    runtime.collect_garbage();
    assert_eq!(runtime.pooled_count(&uniform(16)), 4);

    runtime.recompile(graph, uniform_graph(k));
    runtime.execute(graph).unwrap();
    assert_eq!(runtime.pooled_used(&uniform(16)), k);
    runtime.collect_garbage();

    assert_eq!(runtime.pooled_count(&uniform(16)), k);
    assert_eq!(runtime.pooled_used(&uniform(16)), 0);
    assert_eq!(
        runtime.device().live_count(ObjectKind::ShaderUniformBuffer),
        k
    );
}

#[test]
fn test_unrequested_descriptor_is_evicted() {
    let mut runtime = runtime(RuntimeConfig::default());

    let mut first = builder();
    let small = first.create_vertex_buffer(32);
    let large = first.create_vertex_buffer(64);
    let pass = first.add_pass("both", |_| {});
    first.read(pass, small);
    first.read(pass, large);
    let graph = runtime.compile(first.build());
    runtime.execute(graph).unwrap();
    assert!(runtime.is_pooled(&vertex(32)));

    let mut second = builder();
    let large = second.create_vertex_buffer(64);
    let pass = second.add_pass("large", |_| {});
    second.read(pass, large);
    runtime.recompile(graph, second.build());
    runtime.execute(graph).unwrap();

    assert!(!runtime.is_pooled(&vertex(32)));
    assert_eq!(runtime.pooled_count(&vertex(64)), 1);
    assert_eq!(runtime.device().live_count(ObjectKind::VertexBuffer), 1);
}

#[test]
fn test_stable_graph_reuses_objects() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let pipeline = builder.create_shader(common::solid_pipeline());
    let color = builder.create_texture(rgba_texture(16, 16));
    let pass = builder.add_pass("draw", move |rec| draw_into(rec, pipeline, &[color], &[]));
    builder.write(pass, color);
    let graph = runtime.compile(builder.build());

    runtime.execute(graph).unwrap();
    let first_color = object_id(&runtime, graph, color);
    let created = runtime.device().created_count(ObjectKind::TextureBuffer);

    for _ in 0..3 {
        runtime.execute(graph).unwrap();
    }
    assert_eq!(object_id(&runtime, graph, color), first_color);
    assert_eq!(
        runtime.device().created_count(ObjectKind::TextureBuffer),
        created
    );
    assert_eq!(runtime.device().created_count(ObjectKind::RenderTarget), 1);
    assert_eq!(runtime.device().created_count(ObjectKind::RenderPass), 1);
}

#[test]
fn test_collection_releases_earlier_graph_tables() {
    let mut runtime = manual_gc_runtime();
    let a = runtime.compile(uniform_graph(1));
    let b = runtime.compile(uniform_graph(1));
    runtime.execute(a).unwrap();
    let shared = object_id(&runtime, a, ResourceHandle::new(0));
    runtime.collect_garbage();

    runtime.execute(b).unwrap();
    assert_eq!(object_id(&runtime, b, ResourceHandle::new(0)), shared);
    assert!(runtime.try_get_object(a, ResourceHandle::new(0)).is_none());
}

#[test]
fn test_pools_are_shared_between_graphs() {
    let mut runtime = manual_gc_runtime();
    let a = runtime.compile(uniform_graph(1));
    let b = runtime.compile(uniform_graph(1));
    runtime.execute_many(&[a, b]).unwrap();

    assert_eq!(runtime.pooled_used(&uniform(16)), 2);
    assert_ne!(
        object_id(&runtime, a, ResourceHandle::new(0)),
        object_id(&runtime, b, ResourceHandle::new(0))
    );
}

// ============================================================================
// Persistence Tests
// ============================================================================

fn persisting_graph(upload: Option<u8>, persist: bool) -> (Graph, ResourceHandle, ResourceHandle) {
    let mut builder = builder();
    let texture = builder.create_texture(rgba_texture(4, 4));
    let pipeline = builder.create_shader(common::solid_pipeline());
    let color = builder.create_texture(rgba_texture(4, 4));
    let pass = builder.add_pass("history", move |rec| {
        if let Some(value) = upload {
            rec.upload_texture(texture, Image::filled(4, 4, TextureFormat::Rgba8Unorm, &[value; 4]));
        }
        draw_into(rec, pipeline, &[color], &[ShaderBinding::read(texture)]);
    });
    builder.read_write(pass, texture);
    if persist {
        builder.persist(pass, texture);
    }
    (builder.build(), texture, pipeline)
}

#[test]
fn test_persistent_object_survives_executions() {
    let mut runtime = runtime(RuntimeConfig::default());
    let (graph, texture, _) = persisting_graph(Some(3), true);
    let graph = runtime.compile(graph);

    runtime.execute(graph).unwrap();
    assert!(runtime.is_persistent(graph, texture));
    let id = object_id(&runtime, graph, texture);

    runtime.execute(graph).unwrap();
    assert_eq!(object_id(&runtime, graph, texture), id);
    assert_eq!(runtime.persistent_count(graph), 1);
    assert!(runtime.device().is_live(id));
    // Only the color attachment of the same shape stays pooled.
    assert_eq!(
        runtime.pooled_count(&ObjectDesc::TextureBuffer(rgba_texture(4, 4))),
        1
    );
}

#[test]
fn test_persisted_contents_survive_recompile() {
    let mut runtime = runtime(RuntimeConfig::default());
    let (first, texture, _) = persisting_graph(Some(7), true);
    let graph = runtime.compile(first);
    runtime.execute(graph).unwrap();
    let id = object_id(&runtime, graph, texture);

    let (second, _, _) = persisting_graph(None, true);
    runtime.recompile(graph, second);
    runtime.device_mut().clear_history();
    runtime.execute(graph).unwrap();

    let draws = runtime.device().draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].shader_resources[0].0, id);
    assert!(draws[0].shader_resources[0].1.iter().all(|&b| b == 7));
}

#[test]
fn test_unpersisted_object_is_reclaimed() {
    let mut runtime = runtime(RuntimeConfig::default());
    let (first, texture, _) = persisting_graph(Some(1), true);
    let graph = runtime.compile(first);
    runtime.execute(graph).unwrap();
    let id = object_id(&runtime, graph, texture);

    let (second, _, _) = persisting_graph(None, false);
    runtime.recompile(graph, second);
    runtime.execute(graph).unwrap();

    assert_eq!(runtime.persistent_count(graph), 0);
    assert!(runtime.try_get_object(graph, texture).is_none());
    assert!(!runtime.device().is_live(id));
}

/// Graph with one pass that writes and persists the resource `allocate` declares.
fn persisted_first(
    allocate: impl FnOnce(&mut GraphBuilder) -> ResourceHandle,
) -> (Graph, ResourceHandle) {
    let mut builder = builder();
    let resource = allocate(&mut builder);
    let pass = builder.add_pass("fill", |_| {});
    builder.write(pass, resource);
    builder.persist(pass, resource);
    (builder.build(), resource)
}

#[test]
fn test_recompiled_persistent_texture_follows_new_size() {
    let mut runtime = runtime(RuntimeConfig::default());
    let (first, texture) = persisted_first(|b| b.create_texture(rgba_texture(4, 4)));
    let graph = runtime.compile(first);
    runtime.execute(graph).unwrap();
    let old = object_id(&runtime, graph, texture);

    let (second, resized) = persisted_first(|b| b.create_texture(rgba_texture(8, 8)));
    assert_eq!(resized, texture);
    runtime.recompile(graph, second);
    runtime.execute(graph).unwrap();

    assert_eq!(
        runtime.descriptor_of(graph, texture),
        Some(ObjectDesc::TextureBuffer(rgba_texture(8, 8)))
    );
    assert_eq!(runtime.persistent_count(graph), 1);
    assert!(!runtime.device().is_live(old));
    assert_eq!(runtime.device().live_count(ObjectKind::TextureBuffer), 1);
}

#[test]
fn test_recompiled_persistent_handle_can_change_kind() {
    let mut runtime = runtime(RuntimeConfig::default());
    let (first, texture) = persisted_first(|b| b.create_texture(rgba_texture(4, 4)));
    let graph = runtime.compile(first);
    runtime.execute(graph).unwrap();
    let old = object_id(&runtime, graph, texture);

    let mut builder = builder();
    let vertices = builder.create_vertex_buffer(8);
    let pass = builder.add_pass("fill", move |rec| rec.upload_buffer(vertices, 0, &[5; 8]));
    builder.write(pass, vertices);
    builder.persist(pass, vertices);
    assert_eq!(vertices, texture);
    runtime.recompile(graph, builder.build());
    runtime.execute(graph).unwrap();

    assert_eq!(runtime.descriptor_of(graph, vertices), Some(vertex(8)));
    assert_eq!(contents(&runtime, graph, vertices), vec![5u8; 8]);
    assert!(!runtime.device().is_live(old));
}

#[test]
fn test_persist_is_idempotent() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let buffer = builder.create_shader_buffer(32);
    let first = builder.add_pass("first", move |rec| rec.upload_buffer(buffer, 0, &[1; 32]));
    let second = builder.add_pass("second", |_| {});
    builder.persist(first, buffer);
    builder.persist(first, buffer);
    builder.persist(second, buffer);
    let graph = runtime.compile(builder.build());

    runtime.execute(graph).unwrap();
    runtime.execute(graph).unwrap();
    assert_eq!(runtime.persistent_count(graph), 1);
    let id = object_id(&runtime, graph, buffer);
    assert_eq!(
        runtime.device().created_count(ObjectKind::ShaderStorageBuffer),
        1
    );

    runtime.destroy(graph);
    assert!(!runtime.device().is_live(id));
}

#[test]
fn test_persist_applies_after_the_pass() {
    let mut runtime = manual_gc_runtime();
    let mut builder = builder();
    let buffer = builder.create_vertex_buffer(16);
    let pass = builder.add_pass("write", move |rec| {
        rec.upload_buffer(buffer, 0, &[1; 8]);
        rec.upload_buffer(buffer, 8, &[2; 8]);
    });
    builder.persist(pass, buffer);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    assert_eq!(runtime.pooled_count(&vertex(16)), 0);
    assert_eq!(contents(&runtime, graph, buffer), [[1u8; 8], [2u8; 8]].concat());
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[test]
fn test_passes_observe_previous_writes() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let r = builder.create_uniform_buffer(4);
    let pipeline = builder.create_shader(common::solid_pipeline());
    let color = builder.create_texture(rgba_texture(8, 8));

    let p0 = builder.add_pass("p0", move |rec| rec.upload_slice(r, 0, &[1u32]));
    let p1 = builder.add_pass("p1", move |rec| {
        draw_into(rec, pipeline, &[color], &[ShaderBinding::read(r)]);
        rec.upload_slice(r, 0, &[2u32]);
    });
    let p2 = builder.add_pass("p2", move |rec| {
        draw_into(rec, pipeline, &[color], &[ShaderBinding::read(r)]);
    });
    builder.write(p0, r);
    builder.read_write(p1, r);
    builder.read(p2, r);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let draws = runtime.device().draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].shader_resources[0].1, bytemuck::bytes_of(&1u32));
    assert_eq!(draws[1].shader_resources[0].1, bytemuck::bytes_of(&2u32));
}

#[test]
fn test_scenario_vertex_buffer_and_texture() {
    let mut runtime = manual_gc_runtime();
    let mut builder = builder();
    let vb = builder.create_vertex_buffer(64);
    let tex = builder.create_texture(rgba_texture(256, 256));
    assert_eq!((vb, tex), (ResourceHandle::new(0), ResourceHandle::new(1)));
    let pipeline = builder.create_shader(common::solid_pipeline());
    let screen = builder.get_screen_texture();

    let vertices: Vec<f32> = (0..16).map(|i| i as f32).collect();
    let uploaded = bytemuck::cast_slice::<f32, u8>(&vertices).to_vec();
    let first = builder.add_pass("fill", move |rec| {
        rec.upload_slice(vb, 0, &vertices);
        rec.begin_pass(&[tex], None);
        rec.clear_color(Vec4::ONE);
        rec.finish_pass();
    });
    let second = builder.add_pass("present", move |rec| {
        rec.begin_back_buffer_pass();
        rec.bind_pipeline(pipeline);
        rec.bind_vertex_buffers(VertexBufferBinding::new(vb, common::position_layout()));
        rec.bind_shader_resources(&[ShaderBinding::read(tex)]);
        rec.draw_array(0, 8);
        rec.finish_pass();
    });
    builder.write(first, tex);
    builder.write(first, vb);
    builder.read(second, tex);
    builder.read(second, vb);
    builder.write(second, screen);

    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let texture_desc = ObjectDesc::TextureBuffer(rgba_texture(256, 256));
    assert_eq!(runtime.pooled_count(&texture_desc), 1);
    assert_eq!(runtime.pooled_count(&vertex(64)), 1);
    assert_eq!(runtime.pooled_used(&texture_desc), 1);
    assert_eq!(runtime.pooled_used(&vertex(64)), 1);

    let device = runtime.device();
    let submissions = device.submissions();
    let upload = submissions
        .iter()
        .position(|s| s.commands.contains(&"upload_buffer"))
        .unwrap();
    let bind = submissions
        .iter()
        .position(|s| s.commands.contains(&"bind_vertex_array"))
        .unwrap();
    assert!(upload < bind);
    assert_eq!(submissions[bind].commands[0], "bind_vertex_array");
    assert_eq!(device.draws()[0].vertex_data.as_deref(), Some(uploaded.as_slice()));

    runtime.collect_garbage();
    assert_eq!(runtime.pooled_used(&texture_desc), 0);
    assert_eq!(runtime.pooled_used(&vertex(64)), 0);
    assert_eq!(runtime.pooled_count(&texture_desc), 1);
}

#[test]
fn test_dirty_attachment_flushed_before_pass() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let texture = builder.create_texture(rgba_texture(4, 4));
    let upload = builder.add_pass("upload", move |rec| {
        rec.upload_texture(texture, Image::filled(4, 4, TextureFormat::Rgba8Unorm, &[9; 4]));
    });
    let clear = builder.add_pass("clear", move |rec| {
        rec.begin_pass(&[texture], None);
        rec.clear_color(Vec4::new(0.0, 1.0, 0.0, 1.0));
        rec.finish_pass();
    });
    builder.write(upload, texture);
    builder.write(clear, texture);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let contents = contents(&runtime, graph, texture);
    assert_eq!(pixel(&contents, 4, 3, 3), [0, 255, 0, 255]);
}

#[test]
fn test_back_buffer_blit_flushed_before_back_buffer_pass() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let texture = builder.create_texture(rgba_texture(common::SCREEN_WIDTH, common::SCREEN_HEIGHT));
    let screen = builder.get_screen_texture();
    let blit = builder.add_pass("blit", move |rec| {
        let image = Image::filled(
            common::SCREEN_WIDTH,
            common::SCREEN_HEIGHT,
            TextureFormat::Rgba8Unorm,
            &[5; 4],
        );
        rec.upload_texture(texture, image);
        rec.blit_color(texture, screen);
    });
    let clear = builder.add_pass("clear", |rec| {
        rec.begin_back_buffer_pass();
        rec.clear_color(Vec4::new(1.0, 0.0, 0.0, 1.0));
        rec.finish_pass();
    });
    builder.write(blit, screen);
    builder.write(clear, screen);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let back_buffer = runtime.device().back_buffer_contents();
    assert_eq!(pixel(back_buffer, common::SCREEN_WIDTH, 10, 10), [255, 0, 0, 255]);
}

#[test]
fn test_graphs_observe_earlier_back_buffer_writes() {
    let mut runtime = runtime(RuntimeConfig::default());

    let mut first = builder();
    let screen = first.get_screen_texture();
    let clear = first.add_pass("clear", |rec| {
        rec.begin_back_buffer_pass();
        rec.clear_color(Vec4::new(0.0, 0.0, 1.0, 1.0));
        rec.finish_pass();
    });
    first.write(clear, screen);

    let mut second = builder();
    let screen = second.get_screen_texture();
    let capture = second.create_texture(rgba_texture(common::SCREEN_WIDTH, common::SCREEN_HEIGHT));
    let grab = second.add_pass("grab", move |rec| rec.blit_color(screen, capture));
    second.read(grab, screen);
    second.write(grab, capture);

    let a = runtime.compile(first.build());
    let b = runtime.compile(second.build());
    runtime.execute_many(&[a, b]).unwrap();

    let captured = contents(&runtime, b, capture);
    assert_eq!(pixel(&captured, common::SCREEN_WIDTH, 0, 0), [0, 0, 255, 255]);
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn test_texture_descriptor_round_trip() {
    let mut runtime = runtime(RuntimeConfig::default());
    let desc = TextureBufferDesc::cube_map(32, TextureFormat::Rgba16Float)
        .with_mip_levels(4)
        .with_filter(FilterMode::Nearest)
        .with_address_mode(AddressMode::Repeat);
    let mut builder = builder();
    let texture = builder.create_texture(desc.clone());
    let pass = builder.add_pass("allocate", |_| {});
    builder.write(pass, texture);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    assert_eq!(
        runtime.descriptor_of(graph, texture),
        Some(ObjectDesc::TextureBuffer(desc))
    );
}

#[rstest]
#[case::array(DrawCall::Array { first: 0, count: 3 })]
#[case::indexed(DrawCall::Indexed { first: 0, count: 6 })]
#[case::instanced_array(DrawCall::InstancedArray { first: 0, count: 3, instances: 4 })]
#[case::instanced_array_base_instance(DrawCall::InstancedArrayBaseInstance {
    first: 0,
    count: 3,
    instances: 4,
    base_instance: 2,
})]
#[case::instanced_indexed(DrawCall::InstancedIndexed { first: 0, count: 6, instances: 2 })]
#[case::multi_array(DrawCall::MultiArray {
    ranges: vec![DrawRange::new(0, 3), DrawRange::new(3, 3)],
})]
#[case::multi_indexed(DrawCall::MultiIndexed {
    ranges: vec![DrawRange::new(0, 6), DrawRange::new(6, 6)],
})]
#[case::indexed_base_vertex(DrawCall::IndexedBaseVertex { first: 0, count: 6, base_vertex: 4 })]
#[case::instanced_indexed_base_vertex(DrawCall::InstancedIndexedBaseVertex {
    first: 0,
    count: 6,
    instances: 3,
    base_vertex: 4,
})]
#[case::multi_indexed_base_vertex(DrawCall::MultiIndexedBaseVertex {
    ranges: vec![DrawRange::new(0, 6), DrawRange::new(6, 6)],
    base_vertices: vec![0, 4],
})]
fn test_draw_shapes(#[case] call: DrawCall) {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let vertices = builder.create_vertex_buffer(96);
    let indices = builder.create_index_buffer(48);
    let instances = builder.create_vertex_buffer(64);
    let pipeline = builder.create_shader(
        common::solid_pipeline().with_instance_layout(VertexBufferLayout::packed(
            1,
            &[VertexFormat::Float32x4],
        )),
    );
    let screen = builder.get_screen_texture();
    let recorded = call.clone();
    let pass = builder.add_pass("draw", move |rec| {
        rec.begin_back_buffer_pass();
        rec.bind_pipeline(pipeline);
        rec.bind_vertex_buffers(
            VertexBufferBinding::new(vertices, common::position_layout())
                .with_indices(indices)
                .with_instances(
                    instances,
                    VertexBufferLayout::packed(1, &[VertexFormat::Float32x4]),
                ),
        );
        rec.draw(recorded);
        rec.finish_pass();
    });
    builder.write(pass, screen);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let device = runtime.device();
    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].call, call);
    assert_eq!(draws[0].target, device.back_buffer().id());
    assert_eq!(draws[0].pipeline, Some(object_id(&runtime, graph, pipeline)));
    assert_eq!(draws[0].index_buffer, Some(object_id(&runtime, graph, indices)));
    assert_eq!(draws[0].instance_buffer, Some(object_id(&runtime, graph, instances)));
}

#[test]
fn test_viewport_is_scoped_to_its_pass() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let vertices = builder.create_vertex_buffer(24);
    let pipeline = builder.create_shader(common::solid_pipeline());
    let screen = builder.get_screen_texture();
    let viewport = Viewport::new(UVec2::new(8, 8), UVec2::new(16, 16));
    let pass = builder.add_pass("viewports", move |rec| {
        for set in [true, false] {
            rec.begin_back_buffer_pass();
            if set {
                rec.set_viewport(viewport);
            }
            rec.bind_pipeline(pipeline);
            rec.bind_vertex_buffers(VertexBufferBinding::new(vertices, common::position_layout()));
            rec.draw_array(0, 3);
            rec.finish_pass();
        }
    });
    builder.write(pass, screen);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let viewports: Vec<_> = runtime.device().draws().iter().map(|d| d.viewport).collect();
    assert_eq!(viewports, vec![Some(viewport), None]);
}

#[derive(Debug, Clone, Copy)]
enum BlitRoute {
    TextureToTexture,
    TextureToScreen,
    ScreenToTexture,
}

#[rstest]
#[case::texture_to_texture(BlitRoute::TextureToTexture, 2)]
#[case::texture_to_screen(BlitRoute::TextureToScreen, 1)]
#[case::screen_to_texture(BlitRoute::ScreenToTexture, 1)]
fn test_blit_routes(#[case] route: BlitRoute, #[case] wrappers: usize) {
    const PATTERN: [u8; 4] = [10, 20, 30, 40];
    let (w, h) = (common::SCREEN_WIDTH, common::SCREEN_HEIGHT);

    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let source = builder.create_texture(rgba_texture(w, h));
    let target = builder.create_texture(rgba_texture(w, h));
    let screen = builder.get_screen_texture();

    let prepare = builder.add_pass("prepare", move |rec| match route {
        BlitRoute::ScreenToTexture => {
            rec.begin_back_buffer_pass();
            rec.clear_color(Vec4::new(
                PATTERN[0] as f32 / 255.0,
                PATTERN[1] as f32 / 255.0,
                PATTERN[2] as f32 / 255.0,
                PATTERN[3] as f32 / 255.0,
            ));
            rec.finish_pass();
        }
        _ => rec.upload_texture(source, Image::filled(w, h, TextureFormat::Rgba8Unorm, &PATTERN)),
    });
    let blit = builder.add_pass("blit", move |rec| match route {
        BlitRoute::TextureToTexture => rec.blit_color(source, target),
        BlitRoute::TextureToScreen => rec.blit_color(source, screen),
        BlitRoute::ScreenToTexture => rec.blit_color(screen, target),
    });
    builder.write(prepare, source);
    builder.read(blit, source);
    builder.write(blit, target);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let written = match route {
        BlitRoute::TextureToScreen => runtime.device().back_buffer_contents().to_vec(),
        _ => contents(&runtime, graph, target),
    };
    assert_eq!(pixel(&written, w, w - 1, h - 1), PATTERN);

    let device = runtime.device();
    assert_eq!(device.created_count(ObjectKind::RenderTarget), wrappers);
    assert_eq!(device.live_count(ObjectKind::RenderTarget), 0);
}

#[test]
fn test_blit_sub_rectangle() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let source = builder.create_texture(rgba_texture(4, 4));
    let target = builder.create_texture(rgba_texture(8, 8));
    let pass = builder.add_pass("blit", move |rec| {
        rec.upload_texture(source, Image::filled(4, 4, TextureFormat::Rgba8Unorm, &[1, 2, 3, 4]));
        rec.blit(
            source,
            target,
            BlitKind::Color,
            None,
            Some(Rect::new(UVec2::new(4, 4), UVec2::new(4, 4))),
            FilterMode::Nearest,
        );
    });
    builder.write(pass, target);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let written = contents(&runtime, graph, target);
    assert_eq!(pixel(&written, 8, 0, 0), [0, 0, 0, 0]);
    assert_eq!(pixel(&written, 8, 5, 6), [1, 2, 3, 4]);
}

#[test]
fn test_missing_depth_attachment_is_synthesized() {
    let mut runtime = manual_gc_runtime();
    let mut builder = builder();
    let pipeline = builder.create_shader(common::solid_pipeline());
    let color = builder.create_texture(rgba_texture(32, 16));
    let pass = builder.add_pass("color", move |rec| draw_into(rec, pipeline, &[color], &[]));
    builder.write(pass, color);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let depth = TextureBufferDesc::new(32, 16, TextureFormat::DEPTH_STENCIL);
    assert_eq!(runtime.pooled_used(&ObjectDesc::TextureBuffer(depth)), 1);
    let target = RenderTargetDesc {
        width: 32,
        height: 16,
        samples: 1,
        layers: 1,
        color_attachments: 1,
        has_depth_stencil: true,
    };
    assert_eq!(runtime.pooled_count(&ObjectDesc::RenderTarget(target)), 1);
    assert_eq!(
        runtime.pooled_count(&ObjectDesc::RenderPass(RenderPassDesc::from(&target))),
        1
    );
}

#[test]
fn test_missing_color_attachment_is_synthesized() {
    let mut runtime = manual_gc_runtime();
    let mut builder = builder();
    let depth = builder.create_texture(TextureBufferDesc::new(16, 8, TextureFormat::Depth32Float));
    let pass = builder.add_pass("depth only", move |rec| {
        rec.begin_pass(&[], Some(depth));
        rec.clear_depth(1.0);
        rec.finish_pass();
    });
    builder.write(pass, depth);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let color = TextureBufferDesc::new(16, 8, TextureFormat::RGBA);
    assert_eq!(runtime.pooled_used(&ObjectDesc::TextureBuffer(color)), 1);
    let cleared = contents(&runtime, graph, depth);
    assert_eq!(&cleared[..4], bytemuck::bytes_of(&1.0f32));
}

#[test]
fn test_stencil_clear_keeps_depth() {
    let mut runtime = manual_gc_runtime();
    let mut builder = builder();
    let depth = builder.create_texture(TextureBufferDesc::new(4, 4, TextureFormat::Depth24PlusStencil8));
    let pass = builder.add_pass("depth stencil", move |rec| {
        rec.begin_pass(&[], Some(depth));
        rec.clear_depth(1.0);
        rec.clear_stencil(7);
        rec.finish_pass();
    });
    builder.write(pass, depth);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let cleared = contents(&runtime, graph, depth);
    assert_eq!(cleared.len(), 4 * 4 * 4);
    assert!(cleared.chunks_exact(4).all(|texel| texel == [0xffu8, 0xff, 0xff, 7]));
}

#[test]
fn test_texture_array_attachments_get_array_depth() {
    let mut runtime = manual_gc_runtime();
    let mut builder = builder();
    let layers = builder.create_texture_array(TextureArrayBufferDesc::new(
        8,
        8,
        3,
        TextureFormat::Rgba8Unorm,
    ));
    let pass = builder.add_pass("layered", move |rec| {
        rec.begin_pass(&[layers], None);
        rec.finish_pass();
    });
    builder.write(pass, layers);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let depth = TextureArrayBufferDesc::new(8, 8, 3, TextureFormat::DEPTH_STENCIL);
    assert_eq!(runtime.pooled_used(&ObjectDesc::TextureArrayBuffer(depth)), 1);
}

#[test]
fn test_cube_map_and_array_uploads() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let cube = builder.create_texture(TextureBufferDesc::cube_map(2, TextureFormat::Rgba8Unorm));
    let array = builder.create_texture_array(TextureArrayBufferDesc::new(
        2,
        2,
        2,
        TextureFormat::Rgba8Unorm,
    ));
    let pass = builder.add_pass("upload", move |rec| {
        for face in CubeMapFace::ALL {
            let value = face.index() as u8 + 1;
            rec.upload_cube_map_face(cube, face, Image::filled(2, 2, TextureFormat::Rgba8Unorm, &[value; 4]));
        }
        rec.upload_texture_array_layer(array, 1, Image::filled(2, 2, TextureFormat::Rgba8Unorm, &[8; 4]));
    });
    builder.write(pass, cube);
    builder.write(pass, array);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let faces = contents(&runtime, graph, cube);
    assert_eq!(faces[0], 1);
    assert_eq!(faces[5 * 16], 6);
    let layers = contents(&runtime, graph, array);
    assert_eq!(&layers[..16], &[0; 16]);
    assert_eq!(&layers[16..], &[8; 16]);
}

#[test]
fn test_copy_between_buffers() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let source = builder.create_shader_buffer(8);
    let target = builder.create_shader_buffer(8);
    let pass = builder.add_pass("copy", move |rec| {
        rec.upload_slice(source, 0, &[3u32, 4u32]);
        rec.copy(source, target);
    });
    builder.read(pass, source);
    builder.write(pass, target);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();

    let copied = contents(&runtime, graph, target);
    assert_eq!(bytemuck::cast_slice::<u8, u32>(&copied), &[3, 4]);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_back_buffer_self_blit_is_reported() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let buffer = builder.create_uniform_buffer(4);
    let screen = builder.get_screen_texture();
    let pass = builder.add_pass("self blit", move |rec| {
        rec.upload_buffer(buffer, 0, &[1; 4]);
        rec.blit_color(screen, screen);
    });
    builder.read_write(pass, screen);
    let graph = runtime.compile(builder.build());

    assert_eq!(runtime.execute(graph), Err(RuntimeError::BackBufferSelfBlit));
    let device = runtime.device();
    assert_eq!(device.live_count(ObjectKind::CommandBuffer), 0);
    assert!(device.submissions().is_empty());
}

#[test]
fn test_failed_execution_does_not_inflate_pools() {
    let mut runtime = runtime(RuntimeConfig::default());
    let scratch = ObjectDesc::TextureBuffer(rgba_texture(4, 4));

    let mut failing = builder();
    let texture = failing.create_texture(rgba_texture(4, 4));
    let screen = failing.get_screen_texture();
    let pass = failing.add_pass("self blit", move |rec| rec.blit_color(screen, screen));
    failing.write(pass, texture);
    failing.read_write(pass, screen);
    let failing = runtime.compile(failing.build());
    assert_eq!(runtime.execute(failing), Err(RuntimeError::BackBufferSelfBlit));
    assert_eq!(runtime.pooled_used(&scratch), 0);
    assert!(runtime.try_get_object(failing, texture).is_none());

    let mut good = builder();
    let texture = good.create_texture(rgba_texture(4, 4));
    let pass = good.add_pass("allocate", |_| {});
    good.read(pass, texture);
    let good = runtime.compile(good.build());
    runtime.execute(good).unwrap();

    assert_eq!(runtime.pooled_count(&scratch), 1);
    assert_eq!(runtime.device().created_count(ObjectKind::TextureBuffer), 1);
}

#[test]
fn test_backend_failure_propagates() {
    common::init_logging();
    let device = HeadlessDevice::new(common::headless_config().with_max_live_objects(1));
    let mut runtime = Runtime::new(device, RuntimeConfig::default()).unwrap();
    let mut builder = builder();
    let a = builder.create_vertex_buffer(4);
    let b = builder.create_vertex_buffer(8);
    let pass = builder.add_pass("allocate", |_| {});
    builder.read(pass, a);
    builder.read(pass, b);
    let graph = runtime.compile(builder.build());

    assert_eq!(
        runtime.execute(graph),
        Err(RuntimeError::Backend(BackendError::OutOfMemory))
    );
    assert_eq!(runtime.device().live_count(ObjectKind::CommandBuffer), 0);
}

#[test]
fn test_unavailable_queue_is_reported() {
    let device = HeadlessDevice::new(common::headless_config());
    let result = Runtime::new(device, RuntimeConfig::default().with_render_queue(2));
    assert!(matches!(
        result,
        Err(RuntimeError::QueueUnavailable {
            queue: 2,
            available: 1
        })
    ));
}

#[test]
fn test_into_device_releases_everything() {
    let mut runtime = runtime(RuntimeConfig::default());
    let (graph, _, _) = persisting_graph(Some(2), true);
    let graph = runtime.compile(graph);
    runtime.execute(graph).unwrap();
    assert!(runtime.device().live_object_count() > 0);

    let device = runtime.into_device();
    assert_eq!(device.live_object_count(), 0);
}

#[test]
#[should_panic(expected = "outside of a render pass")]
fn test_draw_without_pass_panics() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    builder.add_pass("stray draw", |rec| rec.draw_array(0, 3));
    let graph = runtime.compile(builder.build());
    let _ = runtime.execute(graph);
}

#[test]
#[should_panic(expected = "copies")]
fn test_cross_kind_copy_panics() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let vertices = builder.create_vertex_buffer(16);
    let uniforms = builder.create_uniform_buffer(16);
    builder.add_pass("bad copy", move |rec| rec.copy(vertices, uniforms));
    let graph = runtime.compile(builder.build());
    let _ = runtime.execute(graph);
}

#[test]
#[should_panic(expected = "left a render pass open")]
fn test_unfinished_pass_panics() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    builder.add_pass("open", |rec| rec.begin_back_buffer_pass());
    let graph = runtime.compile(builder.build());
    let _ = runtime.execute(graph);
}

#[test]
#[should_panic(expected = "twice")]
fn test_double_create_panics() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let buffer = builder.create_index_buffer(12);
    let pass = builder.add_pass("create twice", move |rec| {
        rec.record(Command::Create {
            resource: buffer,
            allocation: Allocation::IndexBuffer(IndexBufferDesc { size: 12 }),
        });
    });
    builder.read(pass, buffer);
    let graph = runtime.compile(builder.build());
    let _ = runtime.execute(graph);
}

#[test]
#[should_panic(expected = "has no object")]
fn test_get_object_without_object_panics() {
    let mut runtime = runtime(RuntimeConfig::default());
    let mut builder = builder();
    let buffer = builder.create_vertex_buffer(4);
    let graph = runtime.compile(builder.build());
    runtime.execute(graph).unwrap();
    runtime.get_object(graph, buffer);
}

#[test]
#[should_panic(expected = "is not compiled")]
fn test_destroyed_graph_cannot_execute() {
    let mut runtime = runtime(RuntimeConfig::default());
    let graph = runtime.compile(uniform_graph(1));
    runtime.destroy(graph);
    let _ = runtime.execute(graph);
}
