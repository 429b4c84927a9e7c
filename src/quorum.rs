//! The quorum oracle (§4.6): derives majority size from peer-set cardinality.

/// Majority = floor(peers / 2) + 1, where `peers` counts every node in the
/// deployment, including self. Fixed at startup; dynamic membership is out
/// of scope (§1).
pub fn majority(peer_count: usize) -> usize {
    peer_count / 2 + 1
}

/// Whether `count` acknowledgements constitute a majority of `peer_count`.
pub fn has_majority(count: usize, peer_count: usize) -> bool {
    count >= majority(peer_count)
}
