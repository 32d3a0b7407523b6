//! Per-object working set of the sequencer

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::vision::ObjectObservation;
use serde::Serialize;

use super::{ActionState, ObservationFrame};
use crate::planner::{Pose4, WaypointId, WaypointPlanner, Waypoints};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the sequencer knows about the object currently being moved.
///
/// Built from a single observation and replaced whole when the next one arrives.
#[derive(Debug, Clone, Serialize)]
pub struct CycleContext {
    /// Number of this cycle in the session, starting at 1.
    pub cycle_number: u64,

    /// The observation as received.
    pub observation: ObjectObservation,

    /// Pick pose in the base frame.
    pub pick: Pose4,

    /// Place pose in the base frame.
    pub place: Pose4,

    /// Units: millimeters
    pub grip_width_mm: f64,

    pub waypoints: Waypoints,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CycleContext {
    /// Build the context for an already validated observation.
    pub fn new(
        cycle_number: u64,
        observation: ObjectObservation,
        frame: &ObservationFrame,
        planner: &WaypointPlanner,
    ) -> Self {
        let [px, py, pz] = frame.apply([observation.pick_x, observation.pick_y, observation.pick_z]);
        let pick = Pose4::new(px, py, pz, observation.pick_heading);

        let [qx, qy, qz] =
            frame.apply([observation.place_x, observation.place_y, observation.place_z]);
        let place = Pose4::new(qx, qy, qz, observation.place_heading);

        Self {
            cycle_number,
            observation,
            pick,
            place,
            grip_width_mm: observation.grip_width,
            waypoints: planner.plan(pick, place),
        }
    }

    /// The waypoint targeted by a state, if it has one.
    pub fn waypoint_for(&self, state: ActionState) -> Option<Pose4> {
        waypoint_id(state).map(|id| self.waypoints.get(id))
    }
}

/// Map a state onto the waypoint it moves to.
pub fn waypoint_id(state: ActionState) -> Option<WaypointId> {
    match state {
        ActionState::PickAbove => Some(WaypointId::PickAbove),
        ActionState::PickGrip => Some(WaypointId::PickGrip),
        ActionState::PickLift => Some(WaypointId::PickLift),
        ActionState::PlaceAbove => Some(WaypointId::PlaceAbove),
        ActionState::PlaceGrip => Some(WaypointId::PlaceGrip),
        ActionState::PlaceLift => Some(WaypointId::PlaceLift),
        _ => None,
    }
}
