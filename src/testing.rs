//! Test-only scaffolding (§2a): an in-memory `Transport` used by this
//! crate's own unit tests and by the `tests/` integration suite. Grounded on
//! `camirmas-paxos`'s channel-based `ChannelMessenger` (one `mpsc` channel
//! per recipient, a dedicated thread draining each), adapted to the
//! `Transport` trait and given a configurable drop rate.
//!
//! This module is not a production transport. It has no socket code, no
//! wire codec, and no reconnection logic — it exists purely so §8's
//! scenarios and property tests can exercise `Node` across real OS threads
//! without standing up real sockets. [`Network::partition`],
//! [`Network::limit_accept_requests`], and [`Network::delivered`] exist so
//! those tests can drive specific interleavings deterministically instead
//! of relying on wall-clock sleeps racing the protocol's actual speed.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use rand::{thread_rng, Rng};

use crate::message::Message;
use crate::node::{Node, NodeId};
use crate::transport::Transport;

/// The shared routing table a `BusTransport` looks senders up in. Lives
/// independently of any `Node`, so there is no `Node` → `Transport` → `Node`
/// reference cycle (§9's cyclic-dispatch note): the bus only ever holds
/// channel `Sender`s, never a node reference.
struct Bus {
    senders: Mutex<HashMap<NodeId, Sender<Message>>>,
    drop_rate: f64,
    /// Nodes currently isolated by [`Network::partition`]. A message
    /// crossing the boundary (exactly one of `from`/`to` isolated) is
    /// dropped; messages on the same side of the boundary are unaffected.
    isolated: Mutex<HashSet<NodeId>>,
    /// Set by [`Network::limit_accept_requests`]: an `AcceptRequest`
    /// broadcast from the given sender is delivered only to the listed
    /// recipients, regardless of timing — this is what lets a test
    /// deterministically withhold a proposal's Accept phase from a chosen
    /// majority of acceptors instead of racing a wall-clock sleep against
    /// it.
    accept_request_limit: Mutex<Option<(NodeId, HashSet<NodeId>)>>,
    /// Every message this bus has actually handed to a recipient's channel,
    /// in delivery order. Lets a test wait for a concrete piece of traffic
    /// (e.g. "N2's Accepted reply reached N1") instead of guessing how long
    /// the protocol takes to settle.
    log: Mutex<Vec<(NodeId, NodeId, Message)>>,
}

impl Bus {
    fn deliver(&self, from: NodeId, to: NodeId, msg: Message) -> bool {
        if let Some((sender, allowed)) = &*self.accept_request_limit.lock().unwrap() {
            if from == *sender && !allowed.contains(&to) && matches!(msg, Message::AcceptRequest(_)) {
                return false;
            }
        }
        if self.drop_rate > 0.0 && thread_rng().gen_range(0.0, 1.0) < self.drop_rate {
            return false;
        }
        {
            let isolated = self.isolated.lock().unwrap();
            if isolated.contains(&from) != isolated.contains(&to) {
                return false;
            }
        }
        let delivered = match self.senders.lock().unwrap().get(&to) {
            Some(sender) => sender.send(msg.clone()).is_ok(),
            None => false,
        };
        if delivered {
            self.log.lock().unwrap().push((from, to, msg));
        }
        delivered
    }

    fn peer_ids_except(&self, self_id: NodeId) -> Vec<NodeId> {
        self.senders
            .lock()
            .unwrap()
            .keys()
            .filter(|&&id| id != self_id)
            .cloned()
            .collect()
    }
}

/// A `Transport` that hands every `send`/`broadcast` to a background worker
/// thread via an `mpsc` channel, never calling back into the receiving
/// node's dispatch synchronously on the sender's own thread (§5's
/// non-reentrancy contract).
struct BusTransport {
    id: NodeId,
    bus: Arc<Bus>,
}

impl Transport for BusTransport {
    fn send(&self, to: NodeId, msg: Message) -> bool {
        self.bus.deliver(self.id, to, msg)
    }

    fn broadcast(&self, self_id: NodeId, msg: Message) -> usize {
        self.bus
            .peer_ids_except(self_id)
            .into_iter()
            .filter(|&peer| self.bus.deliver(self_id, peer, msg.clone()))
            .count()
    }
}

/// A running cluster of `Node`s wired together over an in-memory bus, each
/// dispatching on its own worker thread. Dropped at the end of the test; the
/// worker threads exit once their channel's sender side is gone.
pub struct Network {
    bus: Arc<Bus>,
    nodes: HashMap<NodeId, Arc<Node>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl Network {
    /// Builds a fully connected cluster over `ids` with no message loss.
    pub fn new(ids: Vec<NodeId>) -> Self {
        Network::with_drop_rate(ids, 0.0)
    }

    /// Builds a fully connected cluster where every `send` independently
    /// drops with probability `drop_rate` (§8, scenario 5).
    pub fn with_drop_rate(ids: Vec<NodeId>, drop_rate: f64) -> Self {
        let bus = Arc::new(Bus {
            senders: Mutex::new(HashMap::new()),
            drop_rate,
            isolated: Mutex::new(HashSet::new()),
            accept_request_limit: Mutex::new(None),
            log: Mutex::new(Vec::new()),
        });

        let mut receivers = HashMap::new();
        for &id in &ids {
            let (tx, rx) = mpsc::channel();
            bus.senders.lock().unwrap().insert(id, tx);
            receivers.insert(id, rx);
        }

        let mut nodes = HashMap::new();
        let mut workers = Vec::new();
        for &id in &ids {
            let peers: Vec<NodeId> = ids.iter().filter(|&&p| p != id).cloned().collect();
            let transport = Arc::new(BusTransport { id, bus: bus.clone() });
            let node = Arc::new(Node::new(id, peers, transport));
            nodes.insert(id, node.clone());

            let rx = receivers.remove(&id).unwrap();
            workers.push(thread::spawn(move || {
                for msg in rx {
                    node.dispatch(msg);
                }
            }));
        }

        Network { bus, nodes, workers }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[&id]
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn drop_rate(&self) -> f64 {
        self.bus.drop_rate
    }

    /// Isolates `ids` from every other node in the cluster (§8, scenario 6):
    /// messages crossing the boundary are dropped in both directions,
    /// messages within either side are unaffected.
    pub fn partition(&self, ids: &[NodeId]) {
        let mut isolated = self.bus.isolated.lock().unwrap();
        isolated.extend(ids.iter().cloned());
    }

    /// Heals any partition previously imposed by [`Network::partition`].
    pub fn heal(&self) {
        self.bus.isolated.lock().unwrap().clear();
    }

    /// Restricts `from`'s future `AcceptRequest` broadcasts to land only on
    /// `allowed_recipients` (§8, scenario 4: "3 of 9 acceptors record it").
    /// Every other variant, and `AcceptRequest`s from any other sender, are
    /// unaffected. Deterministic by construction — it does not matter how
    /// fast or slow the cluster's worker threads happen to run, the excluded
    /// acceptors can never see this sender's AcceptRequest.
    pub fn limit_accept_requests(&self, from: NodeId, allowed_recipients: &[NodeId]) {
        let allowed = allowed_recipients.iter().cloned().collect();
        *self.bus.accept_request_limit.lock().unwrap() = Some((from, allowed));
    }

    /// A snapshot, in delivery order, of every message the bus has actually
    /// handed to a recipient so far. Meant for polling a precise condition
    /// (e.g. "has N2's Accepted reply reached N1 yet") instead of sleeping
    /// for a guessed amount of wall-clock time.
    pub fn delivered(&self) -> Vec<(NodeId, NodeId, Message)> {
        self.bus.log.lock().unwrap().clone()
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        self.bus.senders.lock().unwrap().clear();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// A `Transport` double for single-role unit tests: records every `send`
/// and `broadcast` instead of delivering it anywhere. Used by
/// [`crate::acceptor`] and [`crate::proposer`]'s own unit tests, which only
/// need to observe what a role *tried* to send, not have it arrive.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<HashMap<NodeId, Vec<Message>>>,
    broadcasts: Mutex<Vec<(NodeId, Message)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        RecordingTransport::default()
    }

    pub fn sent_to(&self, id: NodeId) -> Vec<Message> {
        self.sent.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    pub fn broadcasts(&self) -> Vec<(NodeId, Message)> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.broadcasts.lock().unwrap().clear();
    }
}

impl Transport for RecordingTransport {
    fn send(&self, to: NodeId, msg: Message) -> bool {
        self.sent.lock().unwrap().entry(to).or_insert_with(Vec::new).push(msg);
        true
    }

    fn broadcast(&self, self_id: NodeId, msg: Message) -> usize {
        self.broadcasts.lock().unwrap().push((self_id, msg));
        1
    }
}
