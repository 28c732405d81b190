//! # Headless Demo
//!
//! Demonstrates:
//! - Building a graph out of scheduled passes
//! - Rendering into an offscreen texture with implicit depth
//! - Presenting through a blit to the back buffer
//! - Rebuilding the graph after the back buffer is resized
//!
//! ```text
//! RUST_LOG=debug cargo run --example headless -- --frames 4 --resize-at 2
//! ```

use clap::Parser;
use glam::{UVec2, Vec4};
use render_graph_runtime::prelude::*;

/// Headless render graph demo.
#[derive(Parser, Debug)]
#[command(name = "headless", about = "Render a few frames on the headless device", version)]
struct Args {
    /// Back buffer width in pixels.
    #[arg(long, default_value = "320")]
    width: u32,

    /// Back buffer height in pixels.
    #[arg(long, default_value = "240")]
    height: u32,

    /// Number of frames to render.
    #[arg(long, default_value = "3")]
    frames: u32,

    /// Halve the back buffer before rendering this frame.
    #[arg(long)]
    resize_at: Option<u32>,
}

// === Scene ===

/// Draws a triangle into an offscreen target and blits it to the screen.
struct ScenePass {
    built_for: Option<UVec2>,
}

/// Position and color of one triangle corner.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl Vertex {
    const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    fn layout() -> VertexBufferLayout {
        VertexBufferLayout::packed(0, &[VertexFormat::Float32x2, VertexFormat::Float32x4])
    }
}

const TRIANGLE: [Vertex; 3] = [
    Vertex::new(-0.5, -0.5, [1.0, 0.0, 0.0, 1.0]),
    Vertex::new(0.5, -0.5, [0.0, 1.0, 0.0, 1.0]),
    Vertex::new(0.0, 0.5, [0.0, 0.0, 1.0, 1.0]),
];

impl GraphPass for ScenePass {
    fn create(&mut self, builder: &mut GraphBuilder) {
        let size = builder.back_buffer_size();
        let layout = Vertex::layout();

        let vertices = builder.create_vertex_buffer(std::mem::size_of_val(&TRIANGLE) as u64);
        let color = builder.create_texture(TextureBufferDesc::new(
            size.x,
            size.y,
            TextureFormat::Rgba8Unorm,
        ));
        let pipeline = builder.create_shader(
            RenderPipelineDesc::new("triangle.vert", "triangle.frag")
                .with_vertex_layout(layout.clone())
                .with_depth_test(DepthTest::default()),
        );
        let screen = builder.get_screen_texture();

        let scene = builder.add_pass("scene", move |rec| {
            rec.upload_slice(vertices, 0, &TRIANGLE);
            rec.begin_pass(&[color], None);
            rec.clear(ClearValues {
                color: Some(Vec4::new(0.1, 0.1, 0.1, 1.0)),
                depth: Some(1.0),
                stencil: None,
            });
            rec.bind_pipeline(pipeline);
            rec.bind_vertex_buffers(VertexBufferBinding::new(vertices, layout));
            rec.draw_array(0, 3);
            rec.finish_pass();
        });
        builder.write(scene, color);

        let present = builder.add_pass("present", move |rec| rec.blit_color(color, screen));
        builder.read(present, color);
        builder.write(present, screen);

        self.built_for = Some(size);
    }

    fn should_rebuild(&self, back_buffer_size: UVec2) -> bool {
        self.built_for != Some(back_buffer_size)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_module("headless", log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let device = HeadlessDevice::new(HeadlessConfig::default().with_back_buffer(args.width, args.height));
    let runtime = Runtime::new(device, RuntimeConfig::default())?;
    let mut scheduler = RenderPassScheduler::new(runtime);
    let graph = scheduler.add_graph(vec![Box::new(ScenePass { built_for: None })]);

    for frame in 0..args.frames {
        if args.resize_at == Some(frame) {
            let desc = scheduler.runtime().device().back_buffer_desc();
            let (width, height) = ((desc.width / 2).max(1), (desc.height / 2).max(1));
            log::info!("frame {}: resizing back buffer to {}x{}", frame, width, height);
            scheduler.runtime_mut().device_mut().resize_back_buffer(width, height);
        }

        scheduler.runtime_mut().device_mut().clear_history();
        scheduler.execute(graph)?;

        let device = scheduler.runtime().device();
        log::info!(
            "frame {}: {} draws, {} submissions, {} live objects",
            frame,
            device.draws().len(),
            device.submissions().len(),
            device.live_object_count()
        );
    }

    let device = scheduler.into_runtime().into_device();
    log::info!("done, {} objects left on the device", device.live_object_count());
    Ok(())
}
