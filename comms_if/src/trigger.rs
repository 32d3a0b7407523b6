//! # Sequencer triggers
//!
//! Every input to the sequencer, whatever channel it arrived on, is represented as a
//! [`Trigger`]. Triggers are queued and handled strictly one at a time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    eqpt::{mech::MotorAck, vision::ObjectObservation},
    tc::Tc,
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An input to the sequencer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Trigger {
    /// A new object observation from perception.
    Observation(ObjectObservation),

    /// An operator command.
    Operator(Tc),

    /// An acknowledgement from motor control.
    Ack(MotorAck),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Trigger {
    /// Parse a trigger from its JSON representation, for example `{"Operator": "Start"}` or
    /// `{"Ack": "StateDone"}`.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trigger_json() {
        assert_eq!(
            Trigger::from_json(r#"{"Ack": "StateDone"}"#).unwrap(),
            Trigger::Ack(MotorAck::StateDone)
        );
        assert_eq!(
            Trigger::from_json(r#"{"Operator": "Previous"}"#).unwrap(),
            Trigger::Operator(Tc::Previous)
        );

        match Trigger::from_json(
            r#"{"Observation": {"pick_x": 150, "pick_y": 0, "pick_z": 100, "pick_heading": 0,
                "grip_width": 40, "place_x": 300, "place_y": 0, "place_z": 100,
                "place_heading": 90}}"#,
        ) {
            Ok(Trigger::Observation(obs)) => assert_eq!(obs.grip_width, 40.0),
            t => panic!("Unexpected trigger {:?}", t),
        }
    }
}
