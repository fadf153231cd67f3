//! Shared data model for the openflow reconciliation worker.
//!
//! This crate holds the plain data the worker crates exchange:
//!
//! - Network and port rows as the store hands them out ([`NetRow`],
//!   [`PortRow`], [`NetState`]), including the `openflow:` provider grammar
//!   that synthesizes external ports.
//! - Flow descriptors ([`FlowRule`]) with their ordered [`Action`] list, the
//!   store row form ([`FlowRow`]), and the textual action codec between the
//!   two.
//! - Reconciliation equality over flow descriptors ([`find_equal`]).
//!
//! Nothing here performs I/O; the store and controller contracts live in
//! `openflow-common`.

mod codec;
mod flow;
mod net;

pub use codec::{decode_actions, encode_actions, FlowFormatError};
pub use flow::{find_equal, Action, FlowRow, FlowRule, BROADCAST_MAC};
pub use net::{
    NetKind, NetRow, NetState, OpenflowProvider, PortKind, PortModel, PortRow, ProviderError,
    PORT_STATUS_ACTIVE,
};
