//! # Pick-and-place Server
//!
//! Publishes everything the sequencer emits: demands to motor control, cycle completion and
//! operator notices.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::mech::MotorDems,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    tc::OperatorNotice,
};
use log::trace;

use crate::sink::{MotionCommandSink, SinkError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Topic the cycle completion flag is published on.
pub const CYCLE_COMPLETE_TOPIC: &str = "pnp_done";

/// Topic operator notices are published on.
pub const NOTICE_TOPIC: &str = "input_task";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Publisher for the sequencer's outputs.
pub struct PnpServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PnpServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PnpServer {
    /// Create a new instance of the server, bound to the publish endpoint.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, PnpServerError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            SocketOptions::bound_pub(),
            &params.pnp_pub_endpoint,
        )
        .map_err(PnpServerError::SocketError)?;

        Ok(Self { socket })
    }

    fn publish<T: serde::Serialize>(
        &self,
        topic: &'static str,
        payload: &T,
    ) -> Result<(), SinkError> {
        self.socket
            .send_topic(topic, payload)
            .map_err(|e| SinkError::PublishError(topic, e))?;

        trace!("Published on {}", topic);

        Ok(())
    }
}

impl MotionCommandSink for PnpServer {
    fn send_dems(&mut self, dems: &MotorDems) -> Result<(), SinkError> {
        let topic = dems.topic();

        match dems {
            MotorDems::GoalPose(angles) => self.publish(topic, angles),
            MotorDems::GripSeparation(sep_mm) => self.publish(topic, sep_mm),
            MotorDems::Task(task) => self.publish(topic, &task.token()),
            MotorDems::Start(start) => self.publish(topic, start),
        }
    }

    fn send_cycle_complete(&mut self, complete: bool) -> Result<(), SinkError> {
        self.publish(CYCLE_COMPLETE_TOPIC, &complete)
    }

    fn send_notice(&mut self, notice: OperatorNotice) -> Result<(), SinkError> {
        self.publish(NOTICE_TOPIC, &notice.token())
    }
}
