//! Reconciliation error type.

use thiserror::Error;

use openflow_common::{OfcError, StoreError};
use openflow_types::ProviderError;

/// Result type alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Anything that aborts one reconciliation task.
///
/// Subordinate store, controller and codec failures convert via `From`; the
/// worker loop turns any of these into a controller status write and moves
/// on to the next task.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ofc(#[from] OfcError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The requested connectivity cannot be expressed as flows.
    #[error("{0}")]
    Topology(String),
}

impl ReconcileError {
    pub fn topology(message: impl Into<String>) -> Self {
        Self::Topology(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subordinate_errors_convert() {
        let err: ReconcileError = StoreError::new("select nets", "gone").into();
        assert!(matches!(err, ReconcileError::Store(_)));

        let err: ReconcileError = OfcError::Unreachable("timeout".to_string()).into();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_topology_display_is_bare() {
        let err = ReconcileError::topology("'ptp' type network cannot connect 3 interfaces, only 2");
        assert_eq!(
            err.to_string(),
            "'ptp' type network cannot connect 3 interfaces, only 2"
        );
    }
}
