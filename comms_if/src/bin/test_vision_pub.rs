//! Publishes object observations, standing in for the vision pipeline during bench tests.

use comms_if::{
    eqpt::vision::ObjectObservation,
    net::{MonitoredSocket, SocketOptions},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "test_vision_pub")]
struct Opt {
    /// Endpoint to bind the publisher to
    #[structopt(long, default_value = "tcp://*:5101")]
    endpoint: String,

    /// Period between observations in seconds
    #[structopt(long, default_value = "30")]
    period_s: u64,

    /// The nine observation fields: pick x y z heading, grip width, place x y z heading
    #[structopt(allow_hyphen_values = true)]
    fields: Vec<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let obs = ObjectObservation::from_slice(&opt.fields)?;

    let ctx = zmq::Context::new();
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::PUB,
        SocketOptions::bound_pub(),
        &opt.endpoint
    )?;

    println!("Vision publisher open on {}", opt.endpoint);

    loop {
        match socket.send_topic("vision", &obs) {
            Ok(_) => println!("Sent {}", obs),
            Err(e) => println!("Failed to send observation: {}", e)
        }

        std::thread::sleep(std::time::Duration::from_secs(opt.period_s));
    }
}
