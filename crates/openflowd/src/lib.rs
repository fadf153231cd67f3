//! Openflow reconciliation worker.
//!
//! One worker serves one openflow controller: it takes the declarative
//! network and port state from the store, computes the forwarding rules that
//! realize it, and drives the controller toward that rule set while keeping
//! the store's `of_flows` table converged.
//!
//! # Responsibilities
//!
//! - Compute the canonical flow set for a network binding group (unicast,
//!   broadcast, and the point-to-point unification pass)
//! - Diff desired flows against store-known and controller-known rules and
//!   issue the minimal create/delete traffic
//! - Re-install rules the controller lost without touching the store
//! - Serve `update-net` / `clear-all` / `exit` tasks from a bounded queue
//!   and publish controller health to the store
//!
//! # Module map
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `planner` | Pure flow computation from network state |
//! | `reconciler` | Store/controller diffing and convergence |
//! | `worker` | Task queue and the per-controller serving loop |
//! | `config` | Worker tunables |

pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;
pub mod worker;

pub use config::{WorkerConfig, DEFAULT_OFC_UUID};
pub use error::{ReconcileError, ReconcileResult};
pub use planner::{check_same_vlan_mix, compute_net_flows, PlannerOptions};
pub use reconciler::Reconciler;
pub use worker::{EnqueueError, OfcWorker, Task, TaskParseError, WorkerHandle};
