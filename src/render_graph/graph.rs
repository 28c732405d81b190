//! Immutable render graph value

use glam::UVec2;

use crate::render_graph::pass::{Pass, PassHandle};
use crate::render_graph::resource::{Allocations, ResourceHandle};

/// How a later pass depends on an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hazard {
    ReadAfterWrite,
    WriteAfterWrite,
    WriteAfterRead,
}

/// Ordering edge between two passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// The earlier pass
    pub from: PassHandle,
    /// The later pass, which must observe `from`'s accesses
    pub to: PassHandle,
    pub resource: ResourceHandle,
    pub hazard: Hazard,
}

/// Ordered passes plus the allocations they refer to.
///
/// Produced by [`GraphBuilder::build`](crate::render_graph::GraphBuilder::build)
/// and consumed by the runtime. Passes execute in insertion order.
#[derive(Debug)]
pub struct Graph {
    pub(crate) passes: Vec<Pass>,
    pub(crate) allocations: Allocations,
    pub(crate) back_buffer: Option<ResourceHandle>,
    pub(crate) back_buffer_size: UVec2,
}

impl Graph {
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn pass(&self, handle: PassHandle) -> &Pass {
        &self.passes[handle.index()]
    }

    pub fn allocations(&self) -> &Allocations {
        &self.allocations
    }

    /// Handle of the back buffer, if any pass asked for it.
    pub fn back_buffer(&self) -> Option<ResourceHandle> {
        self.back_buffer
    }

    /// Back buffer size the graph was built for.
    pub fn back_buffer_size(&self) -> UVec2 {
        self.back_buffer_size
    }

    /// Whether any pass declares a write to the back buffer.
    pub fn writes_back_buffer(&self) -> bool {
        self.back_buffer
            .is_some_and(|screen| self.passes.iter().any(|p| p.writes_resource(screen)))
    }

    /// Every ordering edge implied by the declared reads and writes.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut dependencies = Vec::new();
        for (to, later) in self.passes.iter().enumerate() {
            for (from, earlier) in self.passes[..to].iter().enumerate() {
                let edge = |resource, hazard| Dependency {
                    from: PassHandle(from as u32),
                    to: PassHandle(to as u32),
                    resource,
                    hazard,
                };

                for &resource in &earlier.writes {
                    if later.reads_resource(resource) {
                        dependencies.push(edge(resource, Hazard::ReadAfterWrite));
                    }
                    if later.writes_resource(resource) {
                        dependencies.push(edge(resource, Hazard::WriteAfterWrite));
                    }
                }
                for &resource in &earlier.reads {
                    if later.writes_resource(resource) && !earlier.writes_resource(resource) {
                        dependencies.push(edge(resource, Hazard::WriteAfterRead));
                    }
                }
            }
        }
        dependencies
    }

    /// Group passes into waves whose members have no dependency on each other.
    ///
    /// Wave `n` only depends on waves before it, so a backend may overlap the
    /// passes of one wave.
    pub fn parallel_levels(&self) -> Vec<Vec<PassHandle>> {
        let mut level = vec![0usize; self.passes.len()];
        for dependency in self.dependencies() {
            let candidate = level[dependency.from.index()] + 1;
            let slot = &mut level[dependency.to.index()];
            *slot = (*slot).max(candidate);
        }

        let depth = level.iter().copied().max().map_or(0, |max| max + 1);
        let mut levels = vec![Vec::new(); depth];
        for (index, &l) in level.iter().enumerate() {
            levels[l].push(PassHandle(index as u32));
        }
        levels
    }
}
