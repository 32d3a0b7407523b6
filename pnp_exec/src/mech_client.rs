//! # Mechanisms Client
//!
//! Subscribes to the acknowledgements published by motor control.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::mech::MotorAck,
    net::{self, zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct MechClient {
    ack_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MechClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to {0}: {1}")]
    SubscribeError(&'static str, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MechClient {
    /// Create a new instance of the mechanisms client, subscribed to every acknowledgement topic.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, MechClientError> {
        let ack_socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            SocketOptions::polling_sub(),
            &params.motor_ack_endpoint,
        )
        .map_err(MechClientError::SocketError)?;

        for topic in MotorAck::TOPICS.iter() {
            ack_socket
                .set_subscribe(topic.as_bytes())
                .map_err(|e| MechClientError::SubscribeError(*topic, e))?;
        }

        Ok(Self { ack_socket })
    }

    pub fn is_connected(&self) -> bool {
        self.ack_socket.connected()
    }

    /// Recieve a single acknowledgement.
    ///
    /// `false` messages carry no acknowledgement and are skipped. Returns `Ok(None)` once no more
    /// messages are pending.
    pub fn recieve_ack(&self) -> Result<Option<MotorAck>, MechClientError> {
        loop {
            let (topic, payload) = match self.ack_socket.recv_topic() {
                Ok(Some(m)) => m,
                Ok(None) => return Ok(None),
                Err(e) => return Err(MechClientError::SocketError(e)),
            };

            let value: bool =
                net::parse_payload(&topic, &payload).map_err(MechClientError::SocketError)?;

            if let Some(ack) = MotorAck::from_topic(&topic, value) {
                return Ok(Some(ack));
            }
        }
    }
}
