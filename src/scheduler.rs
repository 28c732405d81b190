//! Render pass scheduling
//!
//! A [`GraphPass`] knows how to add itself to a graph and when it needs to be
//! rebuilt. The [`RenderPassScheduler`] builds graphs out of such passes,
//! rebuilds them when a pass asks for it (typically after the back buffer was
//! resized) and executes them through its [`Runtime`].

use std::collections::HashMap;

use glam::UVec2;

use crate::backend::traits::RenderDevice;
use crate::error::RuntimeResult;
use crate::render_graph::builder::GraphBuilder;
use crate::render_graph::graph::Graph;
use crate::runtime::{GraphHandle, Runtime};

/// A pass author that contributes to a scheduled graph
pub trait GraphPass {
    /// Declare resources and passes for a new graph.
    fn create(&mut self, builder: &mut GraphBuilder);

    /// Declare resources and passes for a rebuilt graph.
    fn recreate(&mut self, builder: &mut GraphBuilder) {
        self.create(builder);
    }

    /// Whether the graph must be rebuilt for the current back buffer size.
    fn should_rebuild(&self, back_buffer_size: UVec2) -> bool;
}

/// Builds, rebuilds and executes graphs made of [`GraphPass`]es
pub struct RenderPassScheduler<R: RenderDevice> {
    runtime: Runtime<R>,
    passes: HashMap<GraphHandle, Vec<Box<dyn GraphPass>>>,
}

impl<R: RenderDevice> RenderPassScheduler<R> {
    pub fn new(runtime: Runtime<R>) -> Self {
        Self {
            runtime,
            passes: HashMap::new(),
        }
    }

    pub fn runtime(&self) -> &Runtime<R> {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime<R> {
        &mut self.runtime
    }

    pub fn into_runtime(self) -> Runtime<R> {
        self.runtime
    }

    fn back_buffer_size(&self) -> UVec2 {
        let desc = self.runtime.device().back_buffer_desc();
        UVec2::new(desc.width, desc.height)
    }

    fn build(
        size: UVec2,
        passes: &mut [Box<dyn GraphPass>],
        rebuild: bool,
    ) -> Graph {
        let mut builder = GraphBuilder::new(size);
        for pass in passes.iter_mut() {
            if rebuild {
                pass.recreate(&mut builder);
            } else {
                pass.create(&mut builder);
            }
        }
        builder.build()
    }

    /// Build a graph from `passes` at the current back buffer size and compile it.
    pub fn add_graph(&mut self, mut passes: Vec<Box<dyn GraphPass>>) -> GraphHandle {
        let graph = Self::build(self.back_buffer_size(), &mut passes, false);
        let handle = self.runtime.compile(graph);
        self.passes.insert(handle, passes);
        handle
    }

    /// Rebuild `handle` if any of its passes asks for it.
    fn rebuild_if_needed(&mut self, handle: GraphHandle) -> bool {
        let size = self.back_buffer_size();
        let passes = match self.passes.get_mut(&handle) {
            Some(passes) => passes,
            None => panic!("{handle} is not registered with the scheduler"),
        };
        if !passes.iter().any(|pass| pass.should_rebuild(size)) {
            return false;
        }

        log::warn!(
            "RenderPassScheduler: rebuilding {} for {}x{} back buffer",
            handle,
            size.x,
            size.y
        );
        let graph = Self::build(size, passes, true);
        self.runtime.recompile(handle, graph);
        true
    }

    pub fn execute(&mut self, handle: GraphHandle) -> RuntimeResult<()> {
        self.rebuild_if_needed(handle);
        self.runtime.execute(handle)
    }

    /// Rebuild where needed, then execute every graph in one batch, in order.
    pub fn execute_many(&mut self, handles: &[GraphHandle]) -> RuntimeResult<()> {
        for &handle in handles {
            self.rebuild_if_needed(handle);
        }
        self.runtime.execute_many(handles)
    }

    pub fn destroy(&mut self, handle: GraphHandle) {
        if self.passes.remove(&handle).is_none() {
            panic!("{handle} is not registered with the scheduler");
        }
        self.runtime.destroy(handle);
    }
}
