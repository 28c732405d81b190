//! Render Graph Runtime - turns declarative render passes into ordered GPU command streams
//!
//! Passes declare the resources they read and write and record their
//! commands through a callback. The runtime executes the resulting graph
//! against a [`RenderDevice`]:
//! - resources are served from descriptor-keyed object pools that are reused
//!   across executions and shrunk by garbage collection
//! - resources a pass persists survive across executions and recompiles
//! - missing depth and color attachments are synthesized
//! - buffer writes are batched and flushed before anything reads them
//!
//! # Example
//!
//! ```
//! use glam::{UVec2, Vec4};
//! use render_graph_runtime::prelude::*;
//!
//! let device = HeadlessDevice::new(HeadlessConfig::default().with_back_buffer(64, 64));
//! let mut runtime = Runtime::new(device, RuntimeConfig::default()).unwrap();
//!
//! let mut builder = GraphBuilder::new(UVec2::new(64, 64));
//! let screen = builder.get_screen_texture();
//! let clear = builder.add_pass("clear", |rec| {
//!     rec.begin_back_buffer_pass();
//!     rec.clear_color(Vec4::new(0.0, 0.0, 1.0, 1.0));
//!     rec.finish_pass();
//! });
//! builder.write(clear, screen);
//!
//! let graph = runtime.compile(builder.build());
//! runtime.execute(graph).unwrap();
//! assert_eq!(&runtime.device().back_buffer_contents()[..4], &[0, 0, 255, 255]);
//! ```

pub mod backend;
pub mod error;
pub mod render_graph;
pub mod runtime;
pub mod scheduler;

pub use backend::{HeadlessConfig, HeadlessDevice, RenderDevice};
pub use error::{RuntimeError, RuntimeResult};
pub use render_graph::{Graph, GraphBuilder, PassRecorder, ResourceHandle};
pub use runtime::{GraphHandle, Runtime, RuntimeConfig};
pub use scheduler::{GraphPass, RenderPassScheduler};

/// Commonly used types
pub mod prelude {
    pub use crate::backend::command::*;
    pub use crate::backend::objects::*;
    pub use crate::backend::traits::*;
    pub use crate::backend::types::*;
    pub use crate::backend::{DrawRecord, HeadlessConfig, HeadlessDevice, Submission};
    pub use crate::error::{RuntimeError, RuntimeResult};
    pub use crate::render_graph::command::*;
    pub use crate::render_graph::graph::*;
    pub use crate::render_graph::pass::*;
    pub use crate::render_graph::resource::*;
    pub use crate::render_graph::{GraphBuilder, PassRecorder};
    pub use crate::runtime::{GraphHandle, Runtime, RuntimeConfig};
    pub use crate::scheduler::{GraphPass, RenderPassScheduler};
}
