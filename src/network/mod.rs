//! Node network coordination.
//!
//! This module contains:
//! - `node_set`: Node membership and drift detection
//! - `epoch`: Epoch cache and effective-epoch computation
//! - `consensus`: Plurality and majority votes over node-reported values
//! - `endpoint`: Endpoint paths and URL composition
//! - `transport`: Node transport trait and HTTP implementation
//! - `dispatcher`: Fan-out to all nodes with threshold classification
//! - `handshake`: Handshake orchestration and agreed node config
//! - `state`: Shared node set / epoch state

pub mod consensus;
pub mod dispatcher;
pub mod endpoint;
pub mod epoch;
pub mod handshake;
pub mod node_set;
pub mod state;
pub mod transport;

// Re-export key types
pub use dispatcher::{BatchResult, NodeFailure, NodeTarget, RequestDispatcher};
pub use endpoint::{Endpoint, Endpoints};
pub use epoch::{EpochCache, EpochPolicy, EpochTracker};
pub use handshake::{CoreNodeConfig, HandshakeCoordinator, RawHandshakeResponse};
pub use node_set::NodeSet;
pub use state::{NetworkSnapshot, NetworkState};
pub use transport::{HttpNodeTransport, NodeRequest, NodeTransport};
