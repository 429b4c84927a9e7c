//! An optional retry-with-backoff driver (enrichment, §2b / §4.9).
//!
//! §9 notes "An optional 'driver' component above the core may add
//! timeouts." `Node`/`Proposer` has no internal retry timer by design — this
//! module is that optional layer, grounded on `stepchowfun-paxos`'s
//! `propose` retry-with-jitter loop ("Paxos failed. Start over." after a
//! jittered delay). It composes with `Node` purely through its public
//! `propose`/`decided` API; it never reaches into `Proposer`/`Acceptor`
//! internals.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::{thread_rng, Rng};

use crate::node::{Node, ProposeOutcome};
use crate::value::Value;

/// The outcome of [`run_until_decided`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverOutcome {
    /// Some value was decided; not necessarily `value` — another proposer
    /// may have won the race, per the adoption rule (§4.3).
    Decided(Value),
    /// No decision within the deadline.
    TimedOut,
}

/// Calls `node.propose(value)`, polling `node.decided()` on a bounded
/// cadence; if no decision appears before `deadline` elapses, calls
/// `propose` again with a jittered backoff in `backoff_range`. `Node` mints
/// a fresh, strictly higher round on every `propose` call automatically
/// (the proposer's round counter is monotonic and never reset by a failed
/// round), so the driver never constructs a round number itself.
pub fn run_until_decided(
    node: &Node,
    value: Value,
    backoff_range: (Duration, Duration),
    poll_interval: Duration,
    deadline: Duration,
) -> DriverOutcome {
    let deadline_at = Instant::now() + deadline;

    loop {
        match node.propose(value.clone()) {
            ProposeOutcome::Initiated => info!("[driver {}] initiated a new round", node.id()),
            ProposeOutcome::Busy => debug!("[driver {}] proposer busy, waiting on the active round", node.id()),
            ProposeOutcome::AlreadyDecided => {}
            ProposeOutcome::Crashed => {
                debug!("[driver {}] node crashed, nothing to do", node.id());
                return DriverOutcome::TimedOut;
            }
        }

        let (lo, hi) = backoff_range;
        let jitter_ms = thread_rng().gen_range(lo.as_millis() as u64, hi.as_millis() as u64 + 1);
        let attempt_deadline = Instant::now() + Duration::from_millis(jitter_ms);

        loop {
            if let Some(decided) = node.decided() {
                return DriverOutcome::Decided(decided);
            }
            let now = Instant::now();
            if now >= deadline_at {
                return DriverOutcome::TimedOut;
            }
            if now >= attempt_deadline {
                debug!("[driver {}] round timed out after {} ms, retrying with a fresh round", node.id(), jitter_ms);
                break;
            }
            thread::sleep(poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Network;

    #[test]
    fn decides_without_needing_a_retry_when_the_network_is_healthy() {
        let net = Network::new(vec![1, 2, 3]);
        let outcome = run_until_decided(
            net.node(1),
            Value::from("M5"),
            (Duration::from_millis(1), Duration::from_millis(5)),
            Duration::from_millis(5),
            Duration::from_secs(2),
        );
        assert_eq!(outcome, DriverOutcome::Decided(Value::from("M5")));
    }

    #[test]
    fn reports_already_decided_values_from_another_proposer() {
        let net = Network::new(vec![1, 2, 3]);
        net.node(2).propose(Value::from("M8"));
        for _ in 0..200 {
            if net.node(1).decided().is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let outcome = run_until_decided(
            net.node(1),
            Value::from("M5"),
            (Duration::from_millis(1), Duration::from_millis(5)),
            Duration::from_millis(5),
            Duration::from_secs(2),
        );
        assert_eq!(outcome, DriverOutcome::Decided(Value::from("M8")));
    }
}
