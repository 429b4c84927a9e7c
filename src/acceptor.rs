//! The Acceptor role (§4.2): per-node promise/accept state, handling
//! `Prepare` and `AcceptRequest`.
//!
//! Grounded on the teacher's `Acceptor<T>`/`AcceptorState<T>` in
//! `multi_paxos.rs`, collapsed from a `HashMap<usize, AcceptorState<T>>`
//! keyed by Paxos instance down to a single `AcceptorState`, since
//! single-decree Paxos has exactly one instance.

use std::sync::Mutex;

use log::{debug, info, log_enabled, Level};

use crate::message::{AcceptRequest, Accepted, Message, Prepare, Promise};
use crate::node::NodeId;
use crate::proposal::ProposalNumber;
use crate::transport::Transport;
use crate::value::Value;

#[derive(Default)]
struct AcceptorState {
    promised: Option<ProposalNumber>,
    accepted: Option<(ProposalNumber, Value)>,
}

/// Holds one node's acceptor state behind its own lock, independent of the
/// Proposer's lock (§5), so a node processing its own Prepare (as acceptor)
/// and its own Promise replies (as proposer) can't self-deadlock.
pub struct Acceptor {
    id: NodeId,
    state: Mutex<AcceptorState>,
}

impl Acceptor {
    pub fn new(id: NodeId) -> Self {
        Acceptor {
            id,
            state: Mutex::new(AcceptorState::default()),
        }
    }

    /// On `Prepare{ n }` from S: if `promised` is `None` or `n > promised`,
    /// promise `n` and reply. Otherwise, silently ignore — no NACK. Liveness
    /// is then driven by higher-round retries, not by negative replies.
    pub fn handle_prepare(&self, prepare: &Prepare, transport: &dyn Transport) {
        let mut state = self.state.lock().unwrap();

        let should_promise = match state.promised {
            None => true,
            Some(promised) => prepare.n > promised,
        };

        if !should_promise {
            debug!(
                "[acceptor {}] ignoring stale Prepare({:?}) <= promised {:?}",
                self.id, prepare.n, state.promised
            );
            return;
        }

        state.promised = Some(prepare.n);
        let reply = Message::Promise(Promise {
            sender: self.id,
            n: prepare.n,
            last_accepted: state.accepted.clone(),
        });

        if log_enabled!(Level::Info) {
            info!(
                "[acceptor {}] promised {:?}, replying to {}",
                self.id, prepare.n, prepare.sender
            );
        }
        transport.send(prepare.sender, reply);
    }

    /// On `AcceptRequest{ n, v }` from S: if `promised` is `None` or
    /// `n >= promised` (note `>=`, not `>` — the acceptor may accept the
    /// very proposal it promised), accept `(n, v)` and reply. Otherwise,
    /// silently ignore.
    ///
    /// If the acceptor had previously accepted `(n', v')` with `n' < n`,
    /// `v'` is overwritten and lost. This is the standard Paxos rule, not a
    /// bug: the higher-numbered accept wins and nothing needs to remember
    /// the superseded value (§9 open question).
    pub fn handle_accept_request(&self, request: &AcceptRequest, transport: &dyn Transport) {
        let mut state = self.state.lock().unwrap();

        let should_accept = match state.promised {
            None => true,
            Some(promised) => request.n >= promised,
        };

        if !should_accept {
            debug!(
                "[acceptor {}] ignoring stale AcceptRequest({:?}) < promised {:?}",
                self.id, request.n, state.promised
            );
            return;
        }

        state.promised = Some(request.n);
        state.accepted = Some((request.n, request.value.clone()));

        let reply = Message::Accepted(Accepted {
            sender: self.id,
            n: request.n,
            value: request.value.clone(),
        });

        if log_enabled!(Level::Info) {
            info!(
                "[acceptor {}] accepted {:?} = {:?}, replying to {}",
                self.id, request.n, request.value, request.sender
            );
        }
        transport.send(request.sender, reply);
    }

    /// The highest-numbered proposal this acceptor has promised, if any.
    #[cfg(test)]
    pub fn promised(&self) -> Option<ProposalNumber> {
        self.state.lock().unwrap().promised
    }

    /// The `(n, v)` this acceptor has most recently accepted, if any.
    #[cfg(test)]
    pub fn accepted(&self) -> Option<(ProposalNumber, Value)> {
        self.state.lock().unwrap().accepted.clone()
    }

    /// Test-only: clears all acceptor state. Never called during normal
    /// protocol operation (§3 lifecycle: "reset only on explicit test
    /// reset").
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.promised = None;
        state.accepted = None;
    }
}
