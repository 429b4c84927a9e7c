//! The `Transport` contract (§6) consumed by the core.
//!
//! The core never implements a socket, a wire codec invocation, or a
//! dispatch loop of its own over real I/O — it only ever calls `send` and
//! `broadcast` on whatever `Transport` the application wired up at
//! construction time (design note §9: "define the sender as a
//! capability/interface injected at construction, never a back-pointer
//! discovered at runtime"). That's how the Node ↔ role ↔ Node-as-sender
//! cycle is broken at the type level: `Node` happens to also implement
//! `Transport`-adjacent dispatch, but each role only ever holds a
//! `&dyn Transport`, never a `&Node`.

use crate::message::Message;
use crate::node::NodeId;

/// A point-to-point, best-effort message transport.
///
/// Implementations may reorder, delay arbitrarily, or drop messages. They
/// must never call back synchronously into the same node on the sending
/// thread (§5); if that can't be guaranteed, the implementation must buffer
/// sends and deliver them after the caller's lock is released.
pub trait Transport: Send + Sync {
    /// Best-effort send to a single peer. Returns whether the transport
    /// accepted the message for delivery; `false` does not necessarily mean
    /// the message won't arrive, only that the transport is telling the
    /// caller not to count on it.
    fn send(&self, to: NodeId, msg: Message) -> bool;

    /// Sends `msg` to every peer except `self_id`. Returns the number of
    /// peers the transport accepted the message for.
    fn broadcast(&self, self_id: NodeId, msg: Message) -> usize;
}
