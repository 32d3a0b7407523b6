//! Main pick-and-place executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and the sequencer
//!     - Main loop:
//!         - Trigger acquisition, either from a script or from the network:
//!             - Object observations from vision
//!             - Operator commands
//!             - Motor control acknowledgements
//!         - Trigger handling, one at a time in arrival order
//!         - Archiving of the sequencer status report
//!
//! The sequencer is the only consumer of triggers, all outputs go through a single sink.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::{
    net::{zmq, NetParams},
    tc::OperatorNotice,
    trigger::Trigger,
};
use pnp_lib::{
    data_store::{DataStore, Link},
    mech_client::{MechClient, MechClientError},
    operator_client::{OperatorClient, OperatorClientError},
    pnp_seq::{PnpSeq, PnpSeqError},
    pnp_server::PnpServer,
    sink::{LogSink, MotionCommandSink},
    vision_client::{VisionClient, VisionClientError},
};
use util::{
    archive::Archived,
    host,
    logger::{self, logger_init},
    script_interpreter::{PendingTriggers, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one loop.
const LOOP_PERIOD_S: f64 = 0.02;

/// Number of consecutive triggers whose outputs could not be published before an error is raised
/// to the operator log.
const MAX_SINK_ERROR_LIMIT: u64 = 5;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "pnp_exec", about = "Pick-and-place sequencer for a five joint arm")]
struct Opt {
    /// Run the triggers in this script instead of connecting to the network
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Minimum level of messages to log (info, debug or trace)
    #[structopt(short, long, default_value = "info")]
    log_level: String,
}

/// Subscribers for every trigger channel.
struct NetClients {
    vision: VisionClient,
    operator: OperatorClient,
    mech: MechClient,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the triggers incoming to the exec.
enum TriggerSource {
    Remote(NetClients),
    Script(ScriptInterpreter),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("pnp_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level = logger::parse_level(&opt.log_level).wrap_err("Invalid log level")?;
    logger_init(log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Pick and Place Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut pnp_seq = PnpSeq::init("pnp_seq.toml", "kin.toml", &session)
        .wrap_err("Failed to initialise PnpSeq")?;
    info!("PnpSeq init complete");

    let mut ds = DataStore::default();

    info!("Module initialisation complete\n");

    // ---- INITIALISE TRIGGER SOURCE AND SINK ----

    // The context must outlive every socket created from it
    let zmq_ctx = zmq::Context::new();

    let (mut source, mut sink): (TriggerSource, Box<dyn MotionCommandSink>) = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} triggers\n",
                si.get_duration(),
                si.get_num_triggers()
            );

            (TriggerSource::Script(si), Box::new(LogSink::default()))
        }
        None => {
            info!("No script provided, triggers will be recieved from the network\n");

            let net_params: NetParams =
                util::params::load("pnp_exec.toml").wrap_err("Could not load net params")?;

            let clients = NetClients {
                vision: VisionClient::new(&zmq_ctx, &net_params)
                    .wrap_err("Failed to initialise VisionClient")?,
                operator: OperatorClient::new(&zmq_ctx, &net_params)
                    .wrap_err("Failed to initialise OperatorClient")?,
                mech: MechClient::new(&zmq_ctx, &net_params)
                    .wrap_err("Failed to initialise MechClient")?,
            };
            info!("Clients initialised");

            let server =
                PnpServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise PnpServer")?;
            info!("PnpServer initialised");

            (TriggerSource::Remote(clients), Box::new(server))
        }
    };

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        let loop_start_instant = Instant::now();
        let mut end_of_script = false;

        // ---- TRIGGER ACQUISITION ----

        match source {
            TriggerSource::Remote(ref clients) => {
                poll_network(clients, &mut ds, sink.as_mut())
                    .wrap_err("An error occured while recieving triggers")?;
            }
            TriggerSource::Script(ref mut si) => match si.get_pending_triggers() {
                PendingTriggers::None => (),
                PendingTriggers::Some(triggers) => {
                    for t in triggers {
                        ds.push_trigger(t);
                    }
                }
                PendingTriggers::EndOfScript => {
                    info!("End of trigger script reached, stopping");
                    end_of_script = true;
                }
            },
        }

        // ---- TRIGGER HANDLING ----

        while let Some(trigger) = ds.pop_trigger() {
            handle_trigger(&mut pnp_seq, &trigger, sink.as_mut(), &mut ds, &session);
        }

        if end_of_script {
            break;
        }

        // ---- LOOP MANAGEMENT ----

        let loop_dur = Instant::now() - loop_start_instant;

        if let Some(d) = Duration::from_secs_f64(LOOP_PERIOD_S).checked_sub(loop_dur) {
            thread::sleep(d);
        }

        ds.num_loops += 1;
    }

    // ---- SHUTDOWN ----

    info!(
        "{} triggers handled ({} rejected), {} cycles complete",
        ds.num_triggers_handled, ds.num_triggers_rejected, ds.num_cycles_complete
    );
    info!("End of execution");

    session.exit();

    Ok(())
}

/// Queue every trigger currently pending on the network.
fn poll_network(
    clients: &NetClients,
    ds: &mut DataStore,
    sink: &mut dyn MotionCommandSink,
) -> Result<(), Report> {
    ds.update_link(Link::Vision, clients.vision.is_connected());
    ds.update_link(Link::Operator, clients.operator.is_connected());
    ds.update_link(Link::MotorAck, clients.mech.is_connected());

    // Acknowledgements are queued ahead of observations from the same poll
    loop {
        match clients.mech.recieve_ack() {
            Ok(Some(ack)) => ds.push_trigger(Trigger::Ack(ack)),
            Ok(None) => break,
            Err(MechClientError::SocketError(e)) => {
                warn!("Could not read acknowledgement: {}", e);
                break;
            }
            Err(e) => return Err(e).wrap_err("MechClient error"),
        }
    }

    loop {
        match clients.operator.recieve_tc() {
            Ok(Some(tc)) => ds.push_trigger(Trigger::Operator(tc)),
            Ok(None) => break,
            Err(OperatorClientError::TcParseError(e)) => warn!("{}", e),
            Err(OperatorClientError::SocketError(e)) => {
                warn!("Could not read operator command: {}", e);
                break;
            }
            Err(e) => return Err(e).wrap_err("OperatorClient error"),
        }
    }

    loop {
        match clients.vision.recieve_observation() {
            Ok(Some(obs)) => ds.push_trigger(Trigger::Observation(obs)),
            Ok(None) => break,
            Err(VisionClientError::InvalidObservation(e)) => {
                warn!("Observation rejected: {}", e);
                ds.num_triggers_rejected += 1;

                if let Err(e) = sink.send_notice(OperatorNotice::InvalidObservation) {
                    warn!("Could not notify the operator: {}", e);
                }
            }
            Err(VisionClientError::SocketError(e)) => {
                warn!("Could not read observation: {}", e);
                break;
            }
            Err(e) => return Err(e).wrap_err("VisionClient error"),
        }
    }

    Ok(())
}

/// Pass one trigger to the sequencer and deal with the result.
fn handle_trigger(
    pnp_seq: &mut PnpSeq,
    trigger: &Trigger,
    sink: &mut dyn MotionCommandSink,
    ds: &mut DataStore,
    session: &Session,
) {
    debug!("Handling {:?}", trigger);

    match pnp_seq.handle(trigger, sink) {
        Ok(report) => {
            ds.record_report(&report);
            debug!("PnpSeq status: {:?}", report);

            if report.new_cycle {
                if let Some(ctx) = pnp_seq.cycle() {
                    session.save(
                        format!("cycles/cycle_{}.json", ctx.cycle_number),
                        ctx.clone(),
                    );
                }
            }
        }
        Err(PnpSeqError::SinkError(e)) => {
            ds.num_consec_sink_errors += 1;
            warn!("Could not publish sequencer output: {}", e);

            if ds.num_consec_sink_errors == MAX_SINK_ERROR_LIMIT {
                error!(
                    "Outputs of the last {} triggers could not be published",
                    MAX_SINK_ERROR_LIMIT
                );
            }
        }
        Err(e) => error!("Error handling {:?}: {}", trigger, e),
    }

    if let Err(e) = pnp_seq.write() {
        warn!("Could not archive the PnpSeq status report: {}", e);
    }
}
