//! # Pick-and-place sequencer
//!
//! The sequencer walks the arm through a fixed list of actions for each observed object:
//!
//! ```text
//! parking -> init_pose -> pick_above -> pick_grip -> grip_on -> pick_lift
//!         -> place_above -> place_grip -> grip_off -> place_lift -> init_pose (cycle end)
//! ```
//!
//! A new observation always (re)starts the cycle at `pick_above`. Each `state_done`
//! acknowledgement from motor control advances one action. Reaching the end of the list returns
//! the arm to `init_pose` and signals cycle completion, after which advances are ignored until
//! the next observation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod cycle;
mod execute;
mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{eqpt::vision::ObservationError, tc::OperatorNotice};
use serde::{Deserialize, Serialize};

use crate::{kin::KinError, sink::SinkError};

pub use cycle::*;
pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The canonical action list. The final `InitPose` is the cycle end and is never entered by
/// index, reaching it is handled by [`Transition::CompleteCycle`].
pub const ACTION_LIST: [ActionState; 11] = [
    ActionState::Parking,
    ActionState::InitPose,
    ActionState::PickAbove,
    ActionState::PickGrip,
    ActionState::GripOn,
    ActionState::PickLift,
    ActionState::PlaceAbove,
    ActionState::PlaceGrip,
    ActionState::GripOff,
    ActionState::PlaceLift,
    ActionState::InitPose,
];

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An action of the pick-and-place cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionState {
    Parking,
    InitPose,
    PickAbove,
    PickGrip,
    GripOn,
    PickLift,
    PlaceAbove,
    PlaceGrip,
    GripOff,
    PlaceLift,
}

/// What an advance does from a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to and execute the given state.
    Next(ActionState),

    /// Return to `InitPose` and signal that the cycle is complete.
    CompleteCycle,

    /// Advances are ignored until a new observation arrives.
    AwaitObservation,
}

/// Possible errors that can occur in the sequencer.
#[derive(Debug, thiserror::Error)]
pub enum PnpSeqError {
    #[error("Failed to load sequencer parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Failed to initialise kinematics: {0}")]
    KinInitError(KinError),

    #[error("Failed to create archive: {0}")]
    ArchiveError(util::archive::ArchiveError),

    #[error("Observation rejected: {0}")]
    InvalidObservation(ObservationError),

    #[error("Observation rejected: grip width {width_mm} mm exceeds the maximum of {max_mm} mm")]
    GripTooWide { width_mm: f64, max_mm: f64 },

    #[error("No joint solution for {0:?}: {1}")]
    IkUnreachable(ActionState, KinError),

    #[error("Advance ignored in {0:?}, waiting for a new observation")]
    OutOfSequenceAdvance(ActionState),

    #[error("Command emission is suspended after an impact, resume with \"previous\"")]
    FaultSuspended,

    #[error("Halted in {0:?}, retry with \"previous\"")]
    Halted(ActionState),

    #[error("Advance rejected while paused, waiting for task_done")]
    Paused,

    #[error("State {0:?} needs a cycle context but no observation has been received")]
    NoCycleContext(ActionState),

    #[error("Could not emit command: {0}")]
    SinkError(SinkError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActionState {
    /// Successor table of the action list.
    pub fn transition(&self) -> Transition {
        use ActionState::*;

        match self {
            Parking => Transition::Next(InitPose),
            InitPose => Transition::AwaitObservation,
            PickAbove => Transition::Next(PickGrip),
            PickGrip => Transition::Next(GripOn),
            GripOn => Transition::Next(PickLift),
            PickLift => Transition::Next(PlaceAbove),
            PlaceAbove => Transition::Next(PlaceGrip),
            PlaceGrip => Transition::Next(GripOff),
            GripOff => Transition::Next(PlaceLift),
            PlaceLift => Transition::CompleteCycle,
        }
    }
}

impl Default for ActionState {
    fn default() -> Self {
        ActionState::Parking
    }
}

impl PnpSeqError {
    /// The notice to send to the operator when this error rejects a trigger, if any.
    pub fn notice(&self) -> Option<OperatorNotice> {
        match self {
            PnpSeqError::InvalidObservation(_) | PnpSeqError::GripTooWide { .. } => {
                Some(OperatorNotice::InvalidObservation)
            }
            PnpSeqError::IkUnreachable(_, _) => Some(OperatorNotice::IkUnreachable),
            PnpSeqError::FaultSuspended => Some(OperatorNotice::FaultSuspended),
            PnpSeqError::Halted(_) => Some(OperatorNotice::Halted),
            PnpSeqError::Paused => Some(OperatorNotice::Paused),
            _ => None,
        }
    }

    /// True if the error only rejects the current trigger and the sequencer can carry on.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PnpSeqError::InvalidObservation(_)
                | PnpSeqError::GripTooWide { .. }
                | PnpSeqError::IkUnreachable(_, _)
                | PnpSeqError::OutOfSequenceAdvance(_)
                | PnpSeqError::FaultSuspended
                | PnpSeqError::Halted(_)
                | PnpSeqError::Paused
        )
    }
}

impl From<SinkError> for PnpSeqError {
    fn from(e: SinkError) -> Self {
        PnpSeqError::SinkError(e)
    }
}
