//! A single-decree Paxos consensus core: proposal numbers, the
//! Acceptor/Proposer/Learner state machines, a `Node` dispatcher, and a
//! quorum oracle, all driven through an injected `Transport`.
//!
//! The core has no socket code, no CLI, and no fault-injection layer of its
//! own — those are named interfaces (`Transport`) or test-only scaffolding
//! (`testing`), never the protocol's concern.

#[macro_use]
extern crate serde_derive;

pub mod acceptor;
pub mod config;
pub mod driver;
pub mod learner;
pub mod message;
pub mod node;
pub mod proposal;
pub mod proposer;
pub mod quorum;
pub mod testing;
pub mod transport;
pub mod value;
pub mod wire;
