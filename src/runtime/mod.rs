//! Graph runtime
//!
//! The [`Runtime`] compiles graphs, executes them against pooled device
//! objects and reclaims objects between executions.
//!
//! # Object lifetime
//!
//! Every resource a graph creates is served from a pool keyed by its
//! descriptor. Pools are shared by every graph compiled on one runtime. After
//! each execution, garbage collection
//!
//! 1. destroys persistent objects no pass of an executed graph persists any more,
//! 2. evicts every descriptor that was not requested since the last collection,
//! 3. shrinks every other descriptor's pool to the number of requests and
//!    resets the request counters.
//!
//! A resource a pass persists is moved out of its pool into the graph's
//! persistent registry, so its contents survive across executions and
//! recompiles.

mod dispatch;
pub mod pool;

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::backend::objects::RenderObject;
use crate::backend::traits::RenderDevice;
use crate::backend::types::ObjectDesc;
use crate::error::{RuntimeError, RuntimeResult};
use crate::render_graph::command::PassContext;
use crate::render_graph::graph::Graph;
use crate::render_graph::recorder::translate;
use crate::render_graph::resource::ResourceHandle;

use dispatch::Dispatcher;
use pool::Pools;

/// Handle to a compiled graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphHandle(pub(crate) u32);

impl GraphHandle {
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph{}", self.0)
    }
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Render queue all command buffers are submitted to
    pub render_queue: usize,
    /// Run garbage collection at the end of every execute call
    pub collect_garbage: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            render_queue: 0,
            collect_garbage: true,
        }
    }
}

impl RuntimeConfig {
    pub fn with_render_queue(mut self, render_queue: usize) -> Self {
        self.render_queue = render_queue;
        self
    }

    pub fn with_collect_garbage(mut self, collect_garbage: bool) -> Self {
        self.collect_garbage = collect_garbage;
        self
    }
}

struct GraphState {
    graph: Graph,
    contexts: Vec<PassContext>,
    /// Transient objects of the last execution
    objects: HashMap<ResourceHandle, RenderObject>,
    persistent: HashMap<ResourceHandle, RenderObject>,
}

impl GraphState {
    fn persisted_handles(&self) -> HashSet<ResourceHandle> {
        self.contexts
            .iter()
            .flat_map(|context| context.persists.iter().copied())
            .collect()
    }
}

/// Executes compiled graphs on a [`RenderDevice`]
pub struct Runtime<R: RenderDevice> {
    device: R,
    config: RuntimeConfig,
    pools: Pools,
    graphs: HashMap<GraphHandle, GraphState>,
    next_graph: u32,
    executed: HashSet<GraphHandle>,
}

impl<R: RenderDevice> Runtime<R> {
    pub fn new(device: R, config: RuntimeConfig) -> RuntimeResult<Self> {
        let available = device.render_queue_count();
        if config.render_queue >= available {
            return Err(RuntimeError::QueueUnavailable {
                queue: config.render_queue,
                available,
            });
        }
        log::debug!(
            "Runtime: using {} device, render queue {}",
            device.name(),
            config.render_queue
        );

        Ok(Self {
            device,
            config,
            pools: Pools::default(),
            graphs: HashMap::new(),
            next_graph: 0,
            executed: HashSet::new(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn device(&self) -> &R {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut R {
        &mut self.device
    }

    fn state(&self, handle: GraphHandle) -> &GraphState {
        match self.graphs.get(&handle) {
            Some(state) => state,
            None => panic!("{handle} is not compiled on this runtime"),
        }
    }

    fn state_mut(&mut self, handle: GraphHandle) -> &mut GraphState {
        match self.graphs.get_mut(&handle) {
            Some(state) => state,
            None => panic!("{handle} is not compiled on this runtime"),
        }
    }

    /// Translate every pass of `graph` into commands.
    pub fn compile(&mut self, mut graph: Graph) -> GraphHandle {
        let handle = GraphHandle(self.next_graph);
        self.next_graph += 1;

        let contexts = translate(&mut graph);
        log::debug!(
            "Runtime: compiled {} ({} passes)",
            handle,
            contexts.len()
        );
        self.graphs.insert(
            handle,
            GraphState {
                graph,
                contexts,
                objects: HashMap::new(),
                persistent: HashMap::new(),
            },
        );
        handle
    }

    /// Replace the graph behind `handle`. Persistent objects are inherited;
    /// those the new graph no longer persists are reclaimed by the next
    /// collection after it executes. An inherited object whose handle now
    /// names a different descriptor is destroyed when the new graph creates
    /// that handle.
    pub fn recompile(&mut self, handle: GraphHandle, mut graph: Graph) {
        let contexts = translate(&mut graph);
        let state = self.state_mut(handle);
        state.graph = graph;
        state.contexts = contexts;
        state.objects.clear();
        log::debug!(
            "Runtime: recompiled {} ({} passes, {} persistent objects inherited)",
            handle,
            state.contexts.len(),
            state.persistent.len()
        );
    }

    /// Compiled graph behind `handle`.
    pub fn graph(&self, handle: GraphHandle) -> &Graph {
        &self.state(handle).graph
    }

    /// Translated pass contexts of a compiled graph.
    pub fn contexts(&self, handle: GraphHandle) -> &[PassContext] {
        &self.state(handle).contexts
    }

    pub fn execute(&mut self, handle: GraphHandle) -> RuntimeResult<()> {
        self.execute_many(&[handle])
    }

    /// Execute several graphs in order. Each graph is fully submitted before
    /// the next one starts, so later graphs observe earlier graphs' back
    /// buffer writes.
    ///
    /// If a graph fails, the request counters of every pool are reset and
    /// the transient tables of the graphs executed since the last collection
    /// are dropped, so the next execution starts from the first slot.
    pub fn execute_many(&mut self, handles: &[GraphHandle]) -> RuntimeResult<()> {
        for &handle in handles {
            if let Err(err) = self.execute_graph(handle) {
                self.discard_executions();
                return Err(err);
            }
        }
        if self.config.collect_garbage {
            self.collect_garbage();
        }
        Ok(())
    }

    fn discard_executions(&mut self) {
        for handle in self.executed.drain() {
            if let Some(state) = self.graphs.get_mut(&handle) {
                state.objects.clear();
            }
        }
        self.pools.reset();
    }

    fn execute_graph(&mut self, handle: GraphHandle) -> RuntimeResult<()> {
        log::debug!("Runtime: executing {}", handle);
        // Tables from before the last collection point at slots this
        // execution may be handed.
        for (other, state) in self.graphs.iter_mut() {
            if *other == handle || !self.executed.contains(other) {
                state.objects.clear();
            }
        }

        let state = match self.graphs.get_mut(&handle) {
            Some(state) => state,
            None => panic!("{handle} is not compiled on this runtime"),
        };
        self.executed.insert(handle);

        let dispatcher = Dispatcher::new(
            &mut self.device,
            &mut self.pools,
            &mut state.objects,
            &mut state.persistent,
            state.graph.back_buffer(),
            self.config.render_queue,
        );
        let result = dispatcher.run(&state.contexts);
        match &result {
            Ok(()) => log::debug!("Runtime: executed {}", handle),
            Err(err) => log::debug!("Runtime: {} failed: {}", handle, err),
        }
        result
    }

    /// Reclaim unused objects (see the module documentation).
    pub fn collect_garbage(&mut self) {
        let mut evicted: Vec<RenderObject> = Vec::new();
        let mut persistent_evicted = 0;

        for (handle, state) in self.graphs.iter_mut() {
            if !self.executed.contains(handle) {
                // Pooled slots may be handed to other graphs after this collection.
                state.objects.clear();
                continue;
            }
            let keep = state.persisted_handles();
            let stale: Vec<ResourceHandle> = state
                .persistent
                .keys()
                .filter(|resource| !keep.contains(resource))
                .copied()
                .collect();
            for resource in stale {
                if let Some(object) = state.persistent.remove(&resource) {
                    log::trace!("Runtime: {} no longer persisted", resource);
                    persistent_evicted += 1;
                    evicted.push(object);
                }
            }
        }

        evicted.extend(self.pools.collect());
        log::debug!(
            "Runtime: collected {} objects ({} persistent)",
            evicted.len(),
            persistent_evicted
        );
        for object in evicted {
            self.device.destroy(object);
        }
        self.executed.clear();
    }

    /// Forget a compiled graph. Its persistent objects are destroyed now;
    /// its pooled objects are reclaimed by later collections.
    pub fn destroy(&mut self, handle: GraphHandle) {
        let state = match self.graphs.remove(&handle) {
            Some(state) => state,
            None => panic!("{handle} is not compiled on this runtime"),
        };
        self.executed.remove(&handle);
        log::debug!(
            "Runtime: destroying {} ({} persistent objects)",
            handle,
            state.persistent.len()
        );
        for (_, object) in state.persistent {
            self.device.destroy(object);
        }
    }

    /// Resolve a resource of a compiled graph to its object.
    ///
    /// # Panics
    ///
    /// Panics if the resource has no object.
    pub fn get_object(&self, handle: GraphHandle, resource: ResourceHandle) -> RenderObject {
        match self.try_get_object(handle, resource) {
            Some(object) => object,
            None => panic!("resource {resource} of {handle} has no object"),
        }
    }

    /// Resolve a resource, checking the persistent registry first.
    pub fn try_get_object(
        &self,
        handle: GraphHandle,
        resource: ResourceHandle,
    ) -> Option<RenderObject> {
        let state = self.state(handle);
        if state.graph.back_buffer() == Some(resource) {
            return Some(self.device.back_buffer().into());
        }
        state
            .persistent
            .get(&resource)
            .or_else(|| state.objects.get(&resource))
            .cloned()
    }

    /// Descriptor of the object currently serving a resource.
    pub fn descriptor_of(&self, handle: GraphHandle, resource: ResourceHandle) -> Option<ObjectDesc> {
        self.try_get_object(handle, resource)
            .and_then(|object| object.desc())
    }

    /// Number of pooled instances for a descriptor.
    pub fn pooled_count(&self, desc: &ObjectDesc) -> usize {
        self.pools.len(desc)
    }

    /// Requests for a descriptor since the last collection.
    pub fn pooled_used(&self, desc: &ObjectDesc) -> usize {
        self.pools.used(desc)
    }

    /// Whether a descriptor has a pool entry.
    pub fn is_pooled(&self, desc: &ObjectDesc) -> bool {
        self.pools.contains(desc)
    }

    pub fn persistent_count(&self, handle: GraphHandle) -> usize {
        self.state(handle).persistent.len()
    }

    pub fn is_persistent(&self, handle: GraphHandle, resource: ResourceHandle) -> bool {
        self.state(handle).persistent.contains_key(&resource)
    }

    /// Destroy every object and hand the device back.
    pub fn into_device(mut self) -> R {
        let handles: Vec<GraphHandle> = self.graphs.keys().copied().collect();
        for handle in handles {
            self.destroy(handle);
        }
        for object in self.pools.drain() {
            self.device.destroy(object);
        }
        self.device
    }
}
