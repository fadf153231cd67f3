//! Store contract consumed by the reconciliation worker.
//!
//! Tables behind this trait:
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `nets` | Declarative network state, including bindings |
//! | `ports` | Ports attached to networks |
//! | `of_flows` | Flows the worker has programmed (`net_id` is ON DELETE SET NULL) |
//! | `ofcs` | Controller health rows |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use openflow_types::{FlowRow, NetRow, PortRow};

use crate::error::StoreResult;

/// Controller / network health as written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfcStatus {
    Active,
    Inactive,
    Error,
}

impl OfcStatus {
    /// Returns the status string as stored in the `ofcs` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfcStatus::Active => "ACTIVE",
            OfcStatus::Inactive => "INACTIVE",
            OfcStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for OfcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relational store serving one reconciliation worker.
///
/// Implementations translate these calls into the filtered SELECTs, INSERTs,
/// UPDATEs and DELETEs of the actual SQL engine. All mutation of `of_flows`
/// goes through the worker, so implementations need no cross-worker locking
/// beyond their own connection handling.
#[async_trait]
pub trait Store: Send + Sync {
    /// Single network row by uuid.
    async fn get_net(&self, uuid: &str) -> StoreResult<Option<NetRow>>;

    /// The binding group around `anchor`: the anchor row itself plus every
    /// network whose `bind_net` references it.
    async fn nets_in_group(&self, anchor: &str) -> StoreResult<Vec<NetRow>>;

    /// Ports of `net_id` that are admin-up and in `ACTIVE` status.
    async fn active_ports(&self, net_id: &str) -> StoreResult<Vec<PortRow>>;

    /// Flow rows owned by `net_id`, or the orphaned rows (`net_id` NULL)
    /// when `None` is passed.
    async fn flows_for_net(&self, net_id: Option<&str>) -> StoreResult<Vec<FlowRow>>;

    /// Inserts a flow row and returns the assigned row id.
    async fn insert_flow(&self, flow: FlowRow) -> StoreResult<i64>;

    /// Deletes one flow row by id.
    async fn delete_flow(&self, id: i64) -> StoreResult<()>;

    /// Deletes every flow row.
    async fn delete_all_flows(&self) -> StoreResult<()>;

    /// Records per-network programming status on the `nets` row.
    async fn update_net_status(
        &self,
        uuid: &str,
        status: OfcStatus,
        last_error: Option<&str>,
    ) -> StoreResult<()>;

    /// Records controller health on the `ofcs` row.
    async fn update_ofc_status(
        &self,
        uuid: &str,
        status: OfcStatus,
        last_error: Option<&str>,
    ) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(OfcStatus::Active.as_str(), "ACTIVE");
        assert_eq!(OfcStatus::Inactive.as_str(), "INACTIVE");
        assert_eq!(OfcStatus::Error.as_str(), "ERROR");
        assert_eq!(OfcStatus::Error.to_string(), "ERROR");
    }
}
