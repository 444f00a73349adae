use std::error::Error as StdError;

use thiserror::Error;

/// Errors raised while applying a batch of patch operations to the room document.
///
/// Any of these rejects the whole batch; the store keeps its previous document.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The operation kind is not one of `add`, `replace` or `remove`.
    #[error("unsupported patch operation at index {index} (path `{path}`)")]
    Unsupported {
        /// Position of the offending operation in the batch.
        index: usize,
        /// Target path of the offending operation.
        path: String,
    },
    /// The operation could not be expressed as an RFC 6902 operation (e.g. bad pointer).
    #[error("malformed patch operation at index {index} (path `{path}`)")]
    Malformed {
        /// Position of the offending operation in the batch.
        index: usize,
        /// Target path of the offending operation.
        path: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The operation was well formed but could not be applied to the document.
    #[error("patch operation at index {index} failed (path `{path}`)")]
    Rejected {
        /// Position of the offending operation in the batch.
        index: usize,
        /// Target path of the offending operation.
        path: String,
        /// Application failure.
        #[source]
        source: json_patch::PatchError,
    },
}

/// Result alias for calls made to outbound collaborators.
pub type ActionResult<T> = Result<T, ActionError>;

/// Failures reported by the vote, announcement and role collaborators.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The chat backend answered but refused the action.
    #[error("{action} rejected by backend (status {status})")]
    Rejected {
        /// Name of the action that was attempted.
        action: &'static str,
        /// Status code returned by the backend.
        status: u16,
    },
    /// The request never produced a usable answer.
    #[error("{action} failed in transport")]
    Transport {
        /// Name of the action that was attempted.
        action: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ActionError {
    /// Wrap any transport failure for the given action.
    pub fn transport(action: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        ActionError::Transport {
            action,
            source: Box::new(source),
        }
    }
}

/// Errors raised while decoding signals coming from the room transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The raw payload is not a recognized transport signal.
    #[error("malformed transport signal")]
    Decode(#[source] serde_json::Error),
}
