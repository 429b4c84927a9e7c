//! The five Paxos protocol messages (§3), modeled after the teacher's
//! `Message<T>` enum in the original multi-instance `multi_paxos.rs` but
//! narrowed to the single-decree variant set the spec names. Every variant
//! carries a `sender`.

use crate::node::NodeId;
use crate::proposal::ProposalNumber;
use crate::value::Value;

/// A single Paxos protocol message, tagged by phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Prepare(Prepare),
    Promise(Promise),
    AcceptRequest(AcceptRequest),
    Accepted(Accepted),
    Learn(Learn),
}

impl Message {
    pub fn sender(&self) -> NodeId {
        match self {
            Message::Prepare(m) => m.sender,
            Message::Promise(m) => m.sender,
            Message::AcceptRequest(m) => m.sender,
            Message::Accepted(m) => m.sender,
            Message::Learn(m) => m.sender,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prepare {
    pub sender: NodeId,
    pub n: ProposalNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promise {
    pub sender: NodeId,
    pub n: ProposalNumber,
    pub last_accepted: Option<(ProposalNumber, Value)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptRequest {
    pub sender: NodeId,
    pub n: ProposalNumber,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accepted {
    pub sender: NodeId,
    pub n: ProposalNumber,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learn {
    pub sender: NodeId,
    pub n: ProposalNumber,
    pub value: Value,
}
