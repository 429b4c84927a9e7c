//! The Node dispatcher (§4.5): owns one instance of each role, routes
//! inbound messages by variant, and exposes the public `propose`/`decided`
//! API (§6).
//!
//! Grounded on the teacher's per-role `Runnable::run` dispatch `match` arms
//! in `multi_paxos.rs`, collapsed from three standalone processes (each
//! polling its own `NetNode::receive()` loop) into one `Node` holding three
//! role structs behind independent locks, dispatching whatever its
//! `Transport` hands it via `dispatch` instead of blocking on a socket read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, log_enabled, warn, Level};

use crate::acceptor::Acceptor;
use crate::learner::Learner;
use crate::message::{Message, Prepare};
use crate::proposer::{Proposer, RoundOutcome};
use crate::transport::Transport;
use crate::value::Value;

/// A node's identity. Must have a fixed, network-wide total order, since
/// `ProposalNumber` tie-breaks on it (§4.1). A plain integer, handed out by
/// the membership configuration (§4.7), satisfies that with no extra
/// indirection.
pub type NodeId = u64;

/// The outcome of a call to `Node::propose` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposeOutcome {
    Initiated,
    Busy,
    AlreadyDecided,
    Crashed,
}

type OnDecided = Box<dyn Fn(Value) + Send + 'static>;

/// One cluster member: owns a Proposer, an Acceptor, and a Learner, and
/// dispatches inbound messages to the role that owns each variant.
pub struct Node {
    id: NodeId,
    peer_count: usize,
    transport: Arc<dyn Transport>,
    proposer: Proposer,
    acceptor: Acceptor,
    learner: Learner,
    crashed: AtomicBool,
    on_decided: Mutex<Option<OnDecided>>,
}

impl Node {
    /// `peer_ids` must NOT include `self_id`; the peer count used for
    /// quorum calculations is `peer_ids.len() + 1` (§4.6: "all nodes in the
    /// deployment including self").
    pub fn new(self_id: NodeId, peer_ids: Vec<NodeId>, transport: Arc<dyn Transport>) -> Self {
        let peer_count = peer_ids.len() + 1;
        Node {
            id: self_id,
            peer_count,
            transport,
            proposer: Proposer::new(self_id, peer_count),
            acceptor: Acceptor::new(self_id),
            learner: Learner::new(),
            crashed: AtomicBool::new(false),
            on_decided: Mutex::new(None),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn peer_count(&self) -> usize {
        self.peer_count
    }

    /// Initiates a new proposal round for `value`.
    ///
    /// Checks run in this order: a simulated crash short-circuits everything
    /// (§7: "all handlers become no-ops until recover" — `propose` itself is
    /// not reached via dispatch, so it gets its own explicit `Crashed`
    /// outcome rather than silently no-op'ing, per the open-question
    /// decision recorded in DESIGN.md); then the Learner is consulted,
    /// since a value decided by *another* node's round must short-circuit
    /// even if this node's own Proposer is still `Idle`; only then does the
    /// Proposer's own busy check run.
    pub fn propose(&self, value: Value) -> ProposeOutcome {
        if self.crashed.load(Ordering::SeqCst) {
            return ProposeOutcome::Crashed;
        }
        if self.learner.decided().is_some() {
            return ProposeOutcome::AlreadyDecided;
        }
        match self.proposer.propose(value, &*self.transport) {
            RoundOutcome::Initiated(n) => {
                // `broadcast` reaches every peer except self (§6); feed the
                // same Prepare to this node's own Acceptor so its vote
                // counts toward the majority the quorum math (§4.6) already
                // assumes includes self.
                self.acceptor.handle_prepare(&Prepare { sender: self.id, n }, &*self.transport);
                ProposeOutcome::Initiated
            }
            RoundOutcome::Busy => ProposeOutcome::Busy,
        }
    }

    /// Non-blocking observation of the Learner's decision.
    pub fn decided(&self) -> Option<Value> {
        self.learner.decided()
    }

    /// Registers a callback that fires exactly once, the moment this node's
    /// Learner transitions from undecided to decided. Overwrites any
    /// previously registered callback.
    pub fn on_decided(&self, callback: impl Fn(Value) + Send + 'static) {
        *self.on_decided.lock().unwrap() = Some(Box::new(callback));
    }

    /// The Transport's inbound callback entry point. Routes by variant:
    /// Prepare/AcceptRequest → Acceptor, Promise/Accepted → Proposer,
    /// Learn → Learner. If simulated-crashed, the message is dropped and no
    /// role state advances.
    pub fn dispatch(&self, msg: Message) {
        if self.crashed.load(Ordering::SeqCst) {
            if log_enabled!(Level::Info) {
                info!("[node {}] crashed — dropping {:?}", self.id, msg);
            }
            return;
        }

        match msg {
            Message::Prepare(prepare) => {
                self.acceptor.handle_prepare(&prepare, &*self.transport);
            }
            Message::AcceptRequest(request) => {
                self.acceptor.handle_accept_request(&request, &*self.transport);
            }
            Message::Promise(promise) => {
                if let Some(request) = self.proposer.handle_promise(&promise, &*self.transport) {
                    // Same reasoning as the self-Prepare above: the
                    // AcceptRequest this round just broadcast to peers is
                    // also fed straight to this node's own Acceptor.
                    self.acceptor.handle_accept_request(&request, &*self.transport);
                }
            }
            Message::Accepted(accepted) => {
                if let Some(learn) = self.proposer.handle_accepted(&accepted, &*self.transport) {
                    self.feed_learn(&learn);
                }
            }
            Message::Learn(learn) => {
                self.feed_learn(&learn);
            }
        }
    }

    fn feed_learn(&self, learn: &crate::message::Learn) {
        if self.learner.handle_learn(learn) {
            if let Some(callback) = self.on_decided.lock().unwrap().as_ref() {
                callback(learn.value.clone());
            }
        }
    }

    /// Test-only: sets the simulated-crashed flag. Acceptor state survives
    /// (no persistence, but no state loss either — reboot-with-loss is out
    /// of scope, §4.5).
    pub fn simulate_crash(&self) {
        warn!("[node {}] simulating crash", self.id);
        self.crashed.store(true, Ordering::SeqCst);
    }

    /// Test-only: clears the simulated-crashed flag.
    pub fn recover(&self) {
        if log_enabled!(Level::Info) {
            info!("[node {}] recovering from simulated crash", self.id);
        }
        self.crashed.store(false, Ordering::SeqCst);
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    /// Test-only: resets all three roles to their initial state and clears
    /// the crashed flag. Never triggered by normal protocol events (§3).
    pub fn reset(&self) {
        self.proposer.reset();
        self.acceptor.reset();
        self.learner.reset();
        self.crashed.store(false, Ordering::SeqCst);
        *self.on_decided.lock().unwrap() = None;
    }
}
