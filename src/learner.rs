//! The Learner role (§4.4): absorbs the first `Learn`, exposes the decided
//! value.
//!
//! Grounded on the teacher's `Learner<T>::handle_learning`, minus the
//! multi-instance ordering buffer (`print_learned_values`/
//! `num_of_instances`) since single-decree Paxos has exactly one instance to
//! learn, so there's no later-instance ordering to preserve.

use std::sync::Mutex;

use log::{info, log_enabled, warn, Level};

use crate::message::Learn;
use crate::proposal::ProposalNumber;
use crate::value::Value;

#[derive(Default)]
struct LearnerState {
    decided: Option<(ProposalNumber, Value)>,
}

/// Holds one node's learner state behind its own lock.
pub struct Learner {
    state: Mutex<LearnerState>,
}

impl Learner {
    pub fn new() -> Self {
        Learner { state: Mutex::new(LearnerState::default()) }
    }

    /// On `Learn{ n, v }`: if `decided` is `None`, sets it and returns `true`
    /// (the caller should fire `onDecided` exactly once on `true`).
    /// Subsequent Learns — even carrying a different value — are logged and
    /// never overwrite the decision; a conflicting Learn is a protocol
    /// violation alarm, not a state change.
    pub fn handle_learn(&self, learn: &Learn) -> bool {
        let mut state = self.state.lock().unwrap();

        match &state.decided {
            None => {
                if log_enabled!(Level::Info) {
                    info!("[learner] decided {:?} = {:?}", learn.n, learn.value);
                }
                state.decided = Some((learn.n, learn.value.clone()));
                true
            }
            Some((_, decided_value)) => {
                if *decided_value != learn.value {
                    warn!(
                        "[learner] protocol-violation alarm: received conflicting Learn {:?} while already decided {:?}; ignoring",
                        learn.value, decided_value
                    );
                } else if log_enabled!(Level::Info) {
                    info!("[learner] idempotently absorbed duplicate Learn for already-decided value");
                }
                false
            }
        }
    }

    /// Non-blocking observation of the decided value, if any.
    pub fn decided(&self) -> Option<Value> {
        self.state.lock().unwrap().decided.as_ref().map(|(_, v)| v.clone())
    }

    /// Test-only: clears the learner's decision.
    pub fn reset(&self) {
        self.state.lock().unwrap().decided = None;
    }
}
