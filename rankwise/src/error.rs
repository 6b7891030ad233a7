use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by group formation, partitioning, and engine runs.
#[derive(Debug, Error)]
pub enum Error {
    /// The process group could not be established.
    #[error("group formation failed: {0}")]
    GroupFormation(String),

    /// The workload does not divide evenly over the group. Rejected, never
    /// padded or truncated, so output length stays exactly predictable.
    #[error("workload of {total_len} elements does not divide over {group_size} ranks")]
    IndivisibleWorkload { total_len: usize, group_size: usize },

    /// An operand or result had the wrong length or count.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// The role handed to the engine does not match this rank.
    #[error("rank {rank} was given the {given} role")]
    RoleMismatch { rank: u32, given: &'static str },

    /// A send, receive, or collective failed mid-run.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures of the underlying message channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A peer did not produce the expected frame within the liveness window.
    #[error("rank {peer} sent nothing on tag {tag} within {waited:?}")]
    PeerUnresponsive { peer: u32, tag: u32, waited: Duration },

    /// A peer's endpoint vanished mid-run.
    #[error("rank {peer} disconnected")]
    Disconnected { peer: u32 },

    /// The named rank is outside the group.
    #[error("rank {peer} is outside this group of {size}")]
    UnknownPeer { peer: u32, size: u32 },

    /// The next frame from a peer carried an unexpected tag. Indicates a
    /// sender/receiver protocol mismatch, not a transient fault.
    #[error("tag mismatch from rank {peer}: expected {expected}, got {got}")]
    TagMismatch { peer: u32, expected: u32, got: u32 },

    /// The group was torn down before the operation.
    #[error("group already torn down")]
    TornDown,

    /// A launched rank panicked before completing its run.
    #[error("rank {rank} failed")]
    RankFailed { rank: u32 },

    /// A payload could not be encoded or decoded.
    #[error("payload codec error: {0}")]
    Payload(String),
}
