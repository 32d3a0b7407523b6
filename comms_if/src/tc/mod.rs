//! # Telecommand module
//!
//! Commands sent by the operator to the sequencer, and the notifications the sequencer sends back
//! to the operator.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An operator command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tc {
    /// Enable motor control and move to the ready pose.
    Start,

    /// Move directly to the ready pose.
    MoveToInit,

    /// Move directly to the parking pose.
    Parking,

    /// Stop the current motion and wait for motor control to acknowledge.
    Stop,

    /// Pause the current motion, handled identically to `Stop`.
    Pause,

    /// Retry the interrupted state after a fault or kinematics failure, or move to the ready
    /// pose if nothing was interrupted.
    Previous,
}

/// A notification sent to the operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperatorNotice {
    /// Motor control reported an impact, command emission is suspended.
    Impact,

    /// No joint solution could be found for the current waypoint.
    IkUnreachable,

    /// An observation was rejected.
    InvalidObservation,

    /// A command was rejected because the sequencer is suspended after a fault.
    FaultSuspended,

    /// An advance was rejected because the current state's command was not executed.
    Halted,

    /// An advance was rejected while waiting for motor control to acknowledge a stop.
    Paused,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("\"{0}\" is not a recognised operator command")]
    UnknownToken(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse an operator command from the token sent by the control surface.
    pub fn from_token(token: &str) -> Result<Self, TcParseError> {
        match token.trim() {
            "gui_start" => Ok(Tc::Start),
            "gui_init_pose" => Ok(Tc::MoveToInit),
            "gui_parking" => Ok(Tc::Parking),
            "gui_stop" => Ok(Tc::Stop),
            "gui_pause" => Ok(Tc::Pause),
            "previous" => Ok(Tc::Previous),
            t => Err(TcParseError::UnknownToken(t.to_string())),
        }
    }

    /// The token for this command.
    pub fn token(&self) -> &'static str {
        match self {
            Tc::Start => "gui_start",
            Tc::MoveToInit => "gui_init_pose",
            Tc::Parking => "gui_parking",
            Tc::Stop => "gui_stop",
            Tc::Pause => "gui_pause",
            Tc::Previous => "previous",
        }
    }
}

impl FromStr for Tc {
    type Err = TcParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tc::from_token(s)
    }
}

impl OperatorNotice {
    /// The token sent to the operator for this notice.
    pub fn token(&self) -> &'static str {
        match self {
            OperatorNotice::Impact => "impact",
            OperatorNotice::IkUnreachable => "ik_unreachable",
            OperatorNotice::InvalidObservation => "invalid_observation",
            OperatorNotice::FaultSuspended => "fault_suspended",
            OperatorNotice::Halted => "halted",
            OperatorNotice::Paused => "paused",
        }
    }
}
