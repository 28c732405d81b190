//! Render graph passes

use std::collections::BTreeSet;
use std::fmt;

use crate::render_graph::recorder::PassRecorder;
use crate::render_graph::resource::ResourceHandle;

/// Index of a pass within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassHandle(pub(crate) u32);

impl PassHandle {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Records a pass's commands. Invoked once, when the graph is compiled.
pub type PassCallback = Box<dyn FnOnce(&mut PassRecorder<'_>)>;

/// A named unit of work with declared resource accesses
pub struct Pass {
    pub(crate) name: String,
    pub(crate) reads: Vec<ResourceHandle>,
    pub(crate) writes: Vec<ResourceHandle>,
    pub(crate) persists: BTreeSet<ResourceHandle>,
    pub(crate) callback: Option<PassCallback>,
}

impl Pass {
    pub(crate) fn new(name: impl Into<String>, callback: PassCallback) -> Self {
        Self {
            name: name.into(),
            reads: Vec::new(),
            writes: Vec::new(),
            persists: BTreeSet::new(),
            callback: Some(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handles read by this pass, in declaration order.
    pub fn reads(&self) -> &[ResourceHandle] {
        &self.reads
    }

    /// Handles written by this pass, in declaration order.
    pub fn writes(&self) -> &[ResourceHandle] {
        &self.writes
    }

    pub fn persists(&self) -> &BTreeSet<ResourceHandle> {
        &self.persists
    }

    pub fn reads_resource(&self, resource: ResourceHandle) -> bool {
        self.reads.contains(&resource)
    }

    pub fn writes_resource(&self, resource: ResourceHandle) -> bool {
        self.writes.contains(&resource)
    }

    /// Whether the command callback has already been consumed.
    pub fn is_translated(&self) -> bool {
        self.callback.is_none()
    }
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("persists", &self.persists)
            .field("translated", &self.is_translated())
            .finish()
    }
}
