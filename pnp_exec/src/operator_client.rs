//! # Operator Client
//!
//! Subscribes to the commands issued from the operator control surface.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    tc::{Tc, TcParseError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Topic operator commands are published on.
pub const OPERATOR_TOPIC: &str = "task_type";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Operator command client
pub struct OperatorClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OperatorClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the operator topic: {0}")]
    SubscribeError(zmq::Error),

    #[error("Could not parse the recieved command: {0}")]
    TcParseError(TcParseError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OperatorClient {
    /// Create a new instance of the operator client.
    ///
    /// This function will not block until the control surface connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, OperatorClientError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            SocketOptions::polling_sub(),
            &params.operator_endpoint,
        )
        .map_err(OperatorClientError::SocketError)?;

        socket
            .set_subscribe(OPERATOR_TOPIC.as_bytes())
            .map_err(OperatorClientError::SubscribeError)?;

        Ok(Self { socket })
    }

    /// Check if the client is connected to the control surface
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Recieve a single operator command.
    ///
    /// Call in a loop until `Ok(None)` is returned, indicating that there are no pending commands.
    pub fn recieve_tc(&self) -> Result<Option<Tc>, OperatorClientError> {
        loop {
            let (topic, payload) = match self.socket.recv_topic() {
                Ok(Some(m)) => m,
                Ok(None) => return Ok(None),
                Err(e) => return Err(OperatorClientError::SocketError(e)),
            };

            if topic != OPERATOR_TOPIC {
                continue;
            }

            return parse_tc(&payload).map(Some);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a command payload, which is either a JSON string (`"gui_start"`) or the bare token.
fn parse_tc(payload: &str) -> Result<Tc, OperatorClientError> {
    let token = serde_json::from_str::<String>(payload).unwrap_or_else(|_| payload.to_string());

    Tc::from_token(&token).map_err(OperatorClientError::TcParseError)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_tc() {
        assert_eq!(parse_tc("\"gui_start\"").unwrap(), Tc::Start);
        assert_eq!(parse_tc("gui_parking").unwrap(), Tc::Parking);
        assert_eq!(parse_tc("previous").unwrap(), Tc::Previous);

        match parse_tc("\"gui_jump\"") {
            Err(OperatorClientError::TcParseError(_)) => (),
            r => panic!("Expected a parse error, got {:?}", r),
        }
    }
}
