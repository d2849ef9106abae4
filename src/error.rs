//! Error types.
//!
//! Only a bad cluster id is surfaced to callers. Invalid coordinates are
//! reported as diagnostics on the index (see [`crate::RejectedRecord`]) and
//! placement never fails.

use crate::cluster::ClusterId;

/// Errors returned by [`crate::ClusterIndex`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum ClusterError {
    /// The id was not produced by a query against this index generation.
    #[error("invalid cluster id {id}: {reason}")]
    InvalidClusterId { id: ClusterId, reason: &'static str },
}

impl ClusterError {
    pub(crate) fn invalid(id: ClusterId, reason: &'static str) -> Self {
        ClusterError::InvalidClusterId { id, reason }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
