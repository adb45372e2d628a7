//! Orchestrator-level error types.

use engine_component::ComponentError;

/// Errors raised by the [`World`](crate::World) and its snapshot codecs.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Registry, id pool, or aspect failure.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// A system with this key is already registered.
    #[error("system '{0}' already registered")]
    DuplicateSystem(String),

    /// An observer with this key is already registered.
    #[error("observer '{0}' already registered")]
    DuplicateObserver(String),

    /// A system's aspect names components this world's registry never issued.
    #[error("system '{system}' uses component bit {bit}, unknown to this world's registry")]
    ForeignAspect {
        /// Key of the rejected system.
        system: String,
        /// The first unknown bit.
        bit: usize,
    },

    /// The tick loop needs a finite, positive rate.
    #[error("invalid tick rate: {0}")]
    InvalidTickRate(f64),

    /// JSON parsing or value conversion failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to encode a snapshot to MessagePack.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a snapshot from MessagePack.
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
