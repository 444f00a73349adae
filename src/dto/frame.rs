//! Wire shapes of the frames delivered by the room transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Everything the room transport can hand to a session, tagged by channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "channel")]
pub enum TransportSignal {
    /// Frame on the state-diff channel.
    #[serde(rename = "statefulMessage")]
    Stateful(StatefulFrame),
    /// Frame on the ephemeral-event channel.
    #[serde(rename = "statelessMessage")]
    Stateless(StatelessFrame),
    /// Frame on the server-notification channel.
    #[serde(rename = "serverMessage")]
    Server(ServerFrame),
    /// The transport reconnected and supplied a fresh full-state snapshot.
    #[serde(rename = "reconnect")]
    Reconnect {
        /// Complete room document as seen by the remote side.
        state: Value,
    },
    /// The transport raised an error signal.
    #[serde(rename = "error")]
    Error {
        /// Human-readable reason sent by the remote side.
        reason: String,
    },
}

impl TransportSignal {
    /// Decode a signal from its JSON text form.
    pub fn from_json_str(raw: &str) -> Result<Self, TransportError> {
        serde_json::from_str(raw).map_err(TransportError::Decode)
    }
}

/// One raw frame, already split by channel but not yet classified.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// State-diff channel frame.
    Stateful(StatefulFrame),
    /// Ephemeral-event channel frame.
    Stateless(StatelessFrame),
    /// Server-notification channel frame.
    Server(ServerFrame),
}

/// Named state change, optionally carrying the diff to apply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulFrame {
    /// Event name.
    pub name: String,
    /// Diff to apply to the room document.
    #[serde(default)]
    pub state_patch: Option<Vec<PatchOp>>,
}

/// Named ephemeral event; never patches the mirrored document.
#[derive(Debug, Clone, Deserialize)]
pub struct StatelessFrame {
    /// Event name.
    pub name: String,
    /// Free-form event parameters.
    #[serde(default)]
    pub params: Value,
}

/// Server notification wrapping its own named message.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerFrame {
    /// The wrapped server message.
    pub message: ServerMessage,
}

/// Message nested inside a [`ServerFrame`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    /// Message name.
    pub name: String,
    /// Free-form message parameters.
    #[serde(default)]
    pub params: Value,
    /// Diff to apply to the room document.
    #[serde(default)]
    pub state_patch: Option<Vec<PatchOp>>,
}

/// Kind of a single patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    /// Insert a value.
    Add,
    /// Overwrite an existing value.
    Replace,
    /// Delete a value.
    Remove,
    /// Any other operation name (`move`, `copy`, `test`, ...); always rejected.
    #[serde(other)]
    Unsupported,
}

/// A single add/replace/remove operation targeting a slash-delimited path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    /// Operation kind.
    pub op: PatchOpKind,
    /// JSON pointer of the target.
    pub path: String,
    /// New value for `add` and `replace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    /// Build an `add` operation.
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Build a `replace` operation.
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Build a `remove` operation.
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: path.into(),
            value: None,
        }
    }
}

/// Parameters of a one-time animation (reaction) event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionParams {
    /// User who sent the reaction.
    pub user_uuid: String,
    /// Animation name.
    #[serde(default)]
    pub animation: Option<String>,
    /// Reaction symbol, present for emoji animations.
    #[serde(default)]
    pub emoji: Option<String>,
}
