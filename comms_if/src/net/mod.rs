//! # Network Module
//!
//! This module provides networking abstractions over ZMQ. All messages are topic-framed strings
//! of the form `"<topic> <json payload>"`, so that subscribers can filter with
//! `set_subscribe(topic)`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Number of monitors that are registered. Used to provide unique IDs for each mointor endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

/// Receive timeout of the monitor socket, so the monitor thread can notice shutdown.
const MONITOR_RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoints used by the pick-and-place executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Endpoint the vision pipeline publishes observations on.
    pub vision_endpoint: String,

    /// Endpoint the operator control surface publishes commands on.
    pub operator_endpoint: String,

    /// Endpoint motor control publishes acknowledgements on.
    pub motor_ack_endpoint: String,

    /// Endpoint the executable binds to publish demands, notices and cycle completion.
    pub pnp_pub_endpoint: String,
}

/// A zmq socket which is monitored providing additional information.
///
/// A background thread is run in order to monitor activity on the socket and update visible
/// information to the user. Currently this is only whether or not the socket is actually connected.
pub struct MonitoredSocket {
    socket: Socket,

    join_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,

    connected: Arc<AtomicBool>
}

/// Represents options which can be set on a monitored socket.
///
/// Options here correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) documentation.
pub struct SocketOptions {
    /// Indicates if the socket should bind itself to the endpoint. Publishers should have this
    /// value set as `true`, subscribers should have it set as `false`.
    ///
    /// The default value is `false`.
    pub bind: bool,

    /// If true the `MonitoredSocket::new()` function will block until the socket is connected.
    ///
    /// The default value is `false`.
    pub block_on_first_connect: bool,

    /// `ZMQ_LINGER`: Set linger period for socket shutdown
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`: Set reconnection interval
    pub reconnect_ivl: i32,

    /// `ZMQ_CONNECT_TIMEOUT`: Set `connect()` timeout
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`: Maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not connect the socket: {0:?}")]
    CouldNotConnect(Option<zmq::Error>),

    #[error("Could not read event from monitor socket: {0}")]
    EventReadError(zmq::Error),

    #[error("Monitor event frame is {0} bytes long, expected at least 2")]
    MalformedEvent(usize),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),

    #[error("Could not send on the socket: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive on the socket: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the message payload: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the payload of a \"{0}\" message: {1}")]
    DeserializationError(String, serde_json::Error),

    #[error("Received a message which is not valid UTF-8 or has no topic")]
    MalformedMessage,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a new monitored socket.
    ///
    /// ## Arguments
    /// - `ctx`: the zmq context which will be used to create the socket
    /// - `socket_type`: the type of zmq socket to create
    /// - `socket_options`: a [`SocketOptions`] struct specifying how to configure the socket
    /// - `endpoint`: a zmq endpoint string, such as `"tcp://localhost:4000"`
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str
    ) -> Result<Self, MonitoredSocketError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));

        let socket = ctx.socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // Enable, create, and connect monitor
        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );
        socket.monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx.socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor.connect(&monitor_endpoint)
            .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        socket_options.set(&socket)?;

        match socket_options.bind {
            false => socket.connect(endpoint),
            true => socket.bind(endpoint)
        }.map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        if socket_options.block_on_first_connect {
            loop {
                match read_event(&monitor)? {
                    SocketEvent::CONNECTED => break,
                    SocketEvent::CONNECT_DELAYED => continue,
                    _ => return Err(MonitoredSocketError::CouldNotConnect(None))
                }
            }

            connected.store(true, Ordering::Relaxed);
        }

        // The monitor thread must be able to wake up to check for shutdown
        monitor.set_rcvtimeo(MONITOR_RECV_TIMEOUT_MS)
            .map_err(|e| MonitoredSocketError::SocketOptionError("set_rcvtimeo".into(), e))?;

        let shutdown_clone = shutdown.clone();
        let connected_clone = connected.clone();
        let join_handle = thread::spawn(move || monitor_socket(
            monitor,
            monitor_endpoint,
            shutdown_clone,
            connected_clone
        ));

        Ok(Self {
            socket,
            join_handle: Some(join_handle),
            shutdown,
            connected
        })
    }

    /// Return if the socket is connected or not.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Send a topic-framed message with a JSON payload.
    pub fn send_topic<T: Serialize>(
        &self,
        topic: &str,
        payload: &T
    ) -> Result<(), MonitoredSocketError> {
        let payload = serde_json::to_string(payload)
            .map_err(MonitoredSocketError::SerializationError)?;

        self.socket
            .send(frame_topic_msg(topic, &payload).as_str(), 0)
            .map_err(MonitoredSocketError::SendError)
    }

    /// Receive a single topic-framed message, returning the topic and raw payload.
    ///
    /// `Ok(None)` is returned if no message arrived within the socket's receive timeout.
    pub fn recv_topic(&self) -> Result<Option<(String, String)>, MonitoredSocketError> {
        let msg = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(MonitoredSocketError::MalformedMessage),
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(MonitoredSocketError::RecvError(e))
        };

        split_topic_msg(&msg)
            .map(|(t, p)| Some((t.to_string(), p.to_string())))
            .ok_or(MonitoredSocketError::MalformedMessage)
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        Ok(())
    }

    /// Options for a subscriber which polls without blocking the main loop.
    pub fn polling_sub() -> Self {
        Self {
            recv_timeout: 0,
            linger: 1,
            ..Default::default()
        }
    }

    /// Options for a bound publisher.
    pub fn bound_pub() -> Self {
        Self {
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        }
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Defaults for sockopts taken from http://api.zeromq.org/4-2:zmq-setsockopt
        Self {
            bind: false,
            block_on_first_connect: false,
            connect_timeout: 0,
            linger: 30_000,
            reconnect_ivl: 100,
            recv_timeout: -1,
            send_timeout: -1
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a topic-framed message.
pub fn frame_topic_msg(topic: &str, payload: &str) -> String {
    format!("{} {}", topic, payload)
}

/// Split a topic-framed message into its topic and payload.
pub fn split_topic_msg(msg: &str) -> Option<(&str, &str)> {
    let mut parts = msg.splitn(2, ' ');

    match (parts.next(), parts.next()) {
        (Some(topic), Some(payload)) if !topic.is_empty() => Some((topic, payload.trim())),
        _ => None
    }
}

/// Deserialize the JSON payload of a message received on `topic`.
pub fn parse_payload<T: DeserializeOwned>(
    topic: &str,
    payload: &str
) -> Result<T, MonitoredSocketError> {
    serde_json::from_str(payload)
        .map_err(|e| MonitoredSocketError::DeserializationError(topic.to_string(), e))
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a socket.
fn read_event(socket: &Socket) -> Result<SocketEvent, MonitoredSocketError> {
    let msg = socket.recv_msg(0).map_err(MonitoredSocketError::EventReadError)?;

    // The second frame holds the address, which is not needed
    if socket.get_rcvmore().map_err(MonitoredSocketError::EventReadError)? {
        let _ = socket.recv_msg(0).map_err(MonitoredSocketError::EventReadError)?;
    }

    Ok(SocketEvent::from_raw(event_id(&msg)?))
}

/// The event number at the start of a monitor event frame.
fn event_id(frame: &[u8]) -> Result<u16, MonitoredSocketError> {
    match frame {
        [lo, hi, ..] => Ok(u16::from_ne_bytes([*lo, *hi])),
        _ => Err(MonitoredSocketError::MalformedEvent(frame.len()))
    }
}

fn monitor_socket(
    monitor: Socket,
    monitor_endpoint: String,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>
) {
    while !shutdown.load(Ordering::Relaxed) {
        match read_event(&monitor) {
            Ok(SocketEvent::CONNECTED) | Ok(SocketEvent::ACCEPTED) => {
                connected.store(true, Ordering::Relaxed)
            }
            Ok(SocketEvent::DISCONNECTED) => connected.store(false, Ordering::Relaxed),
            Ok(_) | Err(MonitoredSocketError::EventReadError(zmq::Error::EAGAIN)) => (),
            Err(e @ MonitoredSocketError::MalformedEvent(_)) => {
                warn!("Ignoring event from monitor {}: {}", monitor_endpoint, e)
            }
            Err(e) => {
                warn!("Error reading event from monitor {}: {}", monitor_endpoint, e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_topic_framing() {
        let msg = frame_topic_msg("goal_pose", "[0.0,90.0,-90.0,-40.0,0.0]");
        assert_eq!(
            split_topic_msg(&msg),
            Some(("goal_pose", "[0.0,90.0,-90.0,-40.0,0.0]"))
        );
        assert_eq!(split_topic_msg("state_done"), None);
        assert_eq!(split_topic_msg(" true"), None);

        let done: bool = parse_payload("state_done", "true").unwrap();
        assert!(done);
    }

    #[test]
    fn test_event_id() {
        let connected = (SocketEvent::CONNECTED as u16).to_ne_bytes();
        let frame = [connected[0], connected[1], 7, 0, 0, 0];

        assert_eq!(event_id(&frame).unwrap(), SocketEvent::CONNECTED as u16);
        assert!(matches!(event_id(&[1]), Err(MonitoredSocketError::MalformedEvent(1))));
        assert!(matches!(event_id(&[]), Err(MonitoredSocketError::MalformedEvent(0))));
    }
}
