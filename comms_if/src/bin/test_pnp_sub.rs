//! Prints every message published by the pick-and-place executable.

use comms_if::net::{MonitoredSocket, SocketOptions};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "test_pnp_sub")]
struct Opt {
    /// Endpoint the executable publishes on
    #[structopt(long, default_value = "tcp://localhost:5100")]
    endpoint: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let ctx = zmq::Context::new();
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::SUB,
        SocketOptions::default(),
        &opt.endpoint
    )?;

    // Subscribe to every topic
    socket.set_subscribe(b"")?;

    loop {
        if let Some((topic, payload)) = socket.recv_topic()? {
            println!("{:>24}: {}", topic, payload);
        }
    }
}
