//! The Proposer role (§4.3): round state, driving the Prepare/Promise and
//! AcceptRequest/Accepted phases to a decision.
//!
//! Grounded on the teacher's `Proposer<T>`/`ProposerState<T>` `prepare`/
//! `propose`/`decide` methods in `multi_paxos.rs`, collapsed to a single
//! active round (single-decree has one instance, not a
//! `HashMap<usize, ProposerState<T>>`), and the "adopt highest
//! previously-accepted value" rule ported from the teacher's
//! `highest_v_rnd_received`/`associated_v_val_received` tracking.

use std::collections::HashSet;
use std::sync::Mutex;

use log::{debug, info, log_enabled, Level};

use crate::message::{AcceptRequest, Accepted, Learn, Message, Prepare, Promise};
use crate::node::NodeId;
use crate::proposal::ProposalNumber;
use crate::quorum::has_majority;
use crate::transport::Transport;
use crate::value::Value;

/// The outcome of a call to `Proposer::propose`. `Node::propose` (§6) wraps
/// this into the richer `node::ProposeOutcome` that also covers
/// `AlreadyDecided`/`Crashed`, which only `Node` has enough context to
/// decide.
///
/// `Initiated` carries the freshly minted proposal number. `Transport::
/// broadcast` sends to every peer *except* self (§6), so the proposer's own
/// vote never arrives through the transport; `Node` uses this number to feed
/// its own Prepare straight to its own Acceptor, the same way it would
/// handle an inbound one, so the proposer counts itself among `peer_count`
/// like the quorum math (§4.6) assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Initiated(ProposalNumber),
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Preparing,
    Accepting,
    Decided,
}

struct Round {
    n: ProposalNumber,
    my_value: Value,
    chosen_value: Value,
    highest_seen: Option<ProposalNumber>,
    promises_from: HashSet<NodeId>,
    accepts_from: HashSet<NodeId>,
    phase: Phase,
}

struct ProposerState {
    counter: u64,
    // Invariant: `round` is `None` exactly when the conceptual phase is
    // `Idle` (§3: "phase ≠ Idle iff n is set").
    round: Option<Round>,
}

/// Holds one node's proposer state behind its own lock, independent of the
/// Acceptor's lock (§5).
pub struct Proposer {
    id: NodeId,
    peer_count: usize,
    state: Mutex<ProposerState>,
}

impl Proposer {
    pub fn new(id: NodeId, peer_count: usize) -> Self {
        Proposer {
            id,
            peer_count,
            state: Mutex::new(ProposerState { counter: 0, round: None }),
        }
    }

    /// Starts a new round, unless one is already active (`Busy`). Per §4.3,
    /// "if phase ≠ Idle, return Busy" covers `Decided` too, not just
    /// `Preparing`/`Accepting`: `handle_accepted` sets `Decided` and
    /// releases this lock before `Node::feed_learn` updates the Learner, so
    /// a concurrent `propose` landing in that window must not find the
    /// proposer merely idle-looking and mint a spurious second round — it
    /// has to wait for the Learner to catch up and report `AlreadyDecided`
    /// instead. Does not itself check whether a value has already been
    /// decided elsewhere — that's `Node::propose`'s job, since it requires
    /// consulting the Learner.
    pub fn propose(&self, value: Value, transport: &dyn Transport) -> RoundOutcome {
        let mut state = self.state.lock().unwrap();

        if state.round.is_some() {
            debug!("[proposer {}] propose() rejected: round already active", self.id);
            return RoundOutcome::Busy;
        }

        let n = ProposalNumber::fresh(&mut state.counter, self.id);
        state.round = Some(Round {
            n,
            my_value: value.clone(),
            chosen_value: value,
            highest_seen: None,
            promises_from: HashSet::new(),
            accepts_from: HashSet::new(),
            phase: Phase::Preparing,
        });

        if log_enabled!(Level::Info) {
            info!("[proposer {}] starting round {:?}", self.id, n);
        }
        transport.broadcast(self.id, Message::Prepare(Prepare { sender: self.id, n }));

        RoundOutcome::Initiated(n)
    }

    /// On `Promise{ pn, last_accepted }` from S. Ignored unless the proposer
    /// is `Preparing` its current round and `pn == n` (stale/foreign
    /// Promises are dropped). Applies the adoption rule, then checks for a
    /// quorum of promises, returning the `AcceptRequest` the caller should
    /// both broadcast and feed to its own Acceptor (the proposer's own vote,
    /// same reasoning as `RoundOutcome::Initiated`) — but only on the call
    /// that first reaches quorum.
    pub fn handle_promise(&self, promise: &Promise, transport: &dyn Transport) -> Option<AcceptRequest> {
        let mut state = self.state.lock().unwrap();

        let round = match &mut state.round {
            Some(round) if round.phase == Phase::Preparing && round.n == promise.n => round,
            _ => {
                debug!(
                    "[proposer {}] ignoring Promise({:?}) from {} — not my active Preparing round",
                    self.id, promise.n, promise.sender
                );
                return None;
            }
        };

        round.promises_from.insert(promise.sender);

        if let Some((na, va)) = &promise.last_accepted {
            let adopt = match round.highest_seen {
                None => true,
                Some(highest) => *na > highest,
            };
            if adopt {
                round.highest_seen = Some(*na);
                round.chosen_value = va.clone();
                debug!(
                    "[proposer {}] adopting previously-accepted value {:?} from {:?}",
                    self.id, va, na
                );
            }
        }

        let quorum_count = round.promises_from.len();
        if !has_majority(quorum_count, self.peer_count) {
            return None;
        }
        if round.phase != Phase::Preparing {
            // Already advanced past Preparing by an earlier call that hit
            // the quorum first; further Promises for this round no-op here.
            return None;
        }

        round.phase = Phase::Accepting;
        let n = round.n;
        let chosen_value = round.chosen_value.clone();

        if log_enabled!(Level::Info) {
            info!(
                "[proposer {}] quorum of {} promises reached for {:?}, proposing {:?}",
                self.id, quorum_count, n, chosen_value
            );
        }
        let request = AcceptRequest { sender: self.id, n, value: chosen_value };
        transport.broadcast(self.id, Message::AcceptRequest(request.clone()));
        Some(request)
    }

    /// On `Accepted{ pn, v }` from S. Ignored unless the proposer is
    /// `Accepting` its current round and `pn == n`. Returns the `Learn`
    /// payload the caller should both broadcast and feed directly to the
    /// local Learner, but only on the call that first reaches a quorum —
    /// later calls return `None` even though the round stays `Decided`.
    pub fn handle_accepted(&self, accepted: &Accepted, transport: &dyn Transport) -> Option<Learn> {
        let mut state = self.state.lock().unwrap();

        let round = match &mut state.round {
            Some(round) if round.phase == Phase::Accepting && round.n == accepted.n => round,
            _ => {
                debug!(
                    "[proposer {}] ignoring Accepted({:?}) from {} — not my active Accepting round",
                    self.id, accepted.n, accepted.sender
                );
                return None;
            }
        };

        round.accepts_from.insert(accepted.sender);

        let quorum_count = round.accepts_from.len();
        if !has_majority(quorum_count, self.peer_count) {
            return None;
        }

        round.phase = Phase::Decided;
        let n = round.n;
        let value = round.chosen_value.clone();

        if log_enabled!(Level::Info) {
            info!(
                "[proposer {}] quorum of {} accepts reached for {:?}, deciding {:?}",
                self.id, quorum_count, n, value
            );
        }
        let learn = Learn { sender: self.id, n, value: value.clone() };
        transport.broadcast(self.id, Message::Learn(learn.clone()));
        Some(learn)
    }

    /// Test-only: resets the proposer to `Idle` with a fresh counter.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.counter = 0;
        state.round = None;
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.state.lock().unwrap().round.is_none()
    }
}
