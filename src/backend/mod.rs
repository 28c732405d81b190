//! Backend abstraction layer
//!
//! Descriptors, concrete objects, command buffer entries and the
//! [`RenderDevice`] trait every backend implements.

pub mod command;
pub mod headless;
pub mod objects;
pub mod traits;
pub mod types;

pub use command::*;
pub use headless::{DrawRecord, HeadlessConfig, HeadlessDevice, Submission};
pub use objects::*;
pub use traits::*;
pub use types::*;
