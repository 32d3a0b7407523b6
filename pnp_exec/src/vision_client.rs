//! # Vision Client
//!
//! Subscribes to the object observations published by the perception pipeline.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::vision::{ObjectObservation, ObservationError},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Topic observations are published on.
pub const VISION_TOPIC: &str = "vision";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Vision client
pub struct VisionClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum VisionClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the vision topic: {0}")]
    SubscribeError(zmq::Error),

    #[error("Recieved an invalid observation: {0}")]
    InvalidObservation(ObservationError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionClient {
    /// Create a new instance of the vision client.
    ///
    /// This function will not block until the publisher connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, VisionClientError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            SocketOptions::polling_sub(),
            &params.vision_endpoint,
        )
        .map_err(VisionClientError::SocketError)?;

        socket
            .set_subscribe(VISION_TOPIC.as_bytes())
            .map_err(VisionClientError::SubscribeError)?;

        Ok(Self { socket })
    }

    /// Check if the client is connected to the publisher
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Recieve a single observation.
    ///
    /// Call in a loop until `Ok(None)` is returned, which means no more observations are pending
    /// right now.
    pub fn recieve_observation(&self) -> Result<Option<ObjectObservation>, VisionClientError> {
        loop {
            let (topic, payload) = match self.socket.recv_topic() {
                Ok(Some(m)) => m,
                Ok(None) => return Ok(None),
                Err(e) => return Err(VisionClientError::SocketError(e)),
            };

            // Prefix subscriptions can match longer topics
            if topic != VISION_TOPIC {
                continue;
            }

            return ObjectObservation::from_json(&payload)
                .map(Some)
                .map_err(VisionClientError::InvalidObservation);
        }
    }
}
