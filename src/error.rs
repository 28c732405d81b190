//! Runtime error types

use thiserror::Error;

use crate::backend::traits::BackendError;

/// Errors reported by [`Runtime`](crate::runtime::Runtime).
///
/// Malformed graphs are not errors: referring to a missing resource, mixing
/// resource kinds or drawing outside a pass panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Cannot blit the back buffer onto itself")]
    BackBufferSelfBlit,
    #[error("Render queue {queue} unavailable: device exposes {available}")]
    QueueUnavailable { queue: usize, available: usize },
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
