//! Render Graph System
//!
//! Passes declare the resources they read and write and record their
//! commands through a callback. The [`GraphBuilder`] turns those declarations
//! into an immutable [`Graph`] that the runtime executes.

pub mod builder;
pub mod command;
pub mod graph;
pub mod pass;
pub mod recorder;
pub mod resource;

pub use builder::*;
pub use command::*;
pub use graph::*;
pub use pass::*;
pub use recorder::PassRecorder;
pub use resource::*;
