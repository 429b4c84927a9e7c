//! An example which simulates single-decree Paxos locally (on one machine),
//! over the in-memory `testing::Network` bus instead of real sockets.
//!
//! Run this example as follows
//!     RUST_LOG=single_paxos=info cargo run --example simulate

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate single_paxos;

use std::thread;
use std::time::Duration;

use single_paxos::testing::Network;
use single_paxos::value::Value;

fn main() {
    env_logger::init();

    let net = Network::new(vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);

    let outcome = net.node(4).propose(Value::from("M5"));
    info!("node 4 propose() -> {:?}", outcome);

    for _ in 0..200 {
        if net.node_ids().iter().all(|&id| net.node(id).decided().is_some()) {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    for id in net.node_ids() {
        info!("node {} decided {:?}", id, net.node(id).decided());
    }
}
