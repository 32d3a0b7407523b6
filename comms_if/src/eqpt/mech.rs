//! # Mechanisms Equipment Commands
//!
//! Demands sent to the motor controller and the acknowledgements it sends back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of actuated joints on the arm.
pub const NUM_JOINTS: usize = 5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Joint angle demands for the five arm joints, base first, wrist last.
///
/// Units: degrees
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct JointAngles5(pub [f64; NUM_JOINTS]);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Tasks which can be handed to the motor controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorTask {
    /// Start (or restart) motion, moving to the ready pose.
    Start,

    /// Stop the current motion. The controller acknowledges with [`MotorAck::TaskDone`].
    Stop,
}

/// Demands that are sent from the sequencer to the motor controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MotorDems {
    /// Move the arm to the given joint angles.
    GoalPose(JointAngles5),

    /// Move the gripper fingers to the given separation.
    ///
    /// Units: millimeters
    GripSeparation(f64),

    /// Perform a motor task.
    Task(MotorTask),

    /// Enable the motor controller.
    Start(bool),
}

/// Acknowledgements sent by the motor controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorAck {
    /// The last joint or gripper demand has been reached.
    StateDone,

    /// The last [`MotorTask`] has been completed.
    TaskDone,

    /// An impact was detected, the arm has been frozen.
    Impact,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointAngles5 {
    /// Angle of the wrist joint, the last joint of the arm.
    pub fn wrist_deg(&self) -> f64 {
        self.0[NUM_JOINTS - 1]
    }

    /// Angle of the base joint, the first joint of the arm.
    pub fn base_deg(&self) -> f64 {
        self.0[0]
    }
}

impl From<[f64; NUM_JOINTS]> for JointAngles5 {
    fn from(angles: [f64; NUM_JOINTS]) -> Self {
        Self(angles)
    }
}

impl fmt::Display for JointAngles5 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1} {:.1} {:.1} {:.1} {:.1})",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4]
        )
    }
}

impl MotorTask {
    /// The token sent to the motor controller for this task.
    pub fn token(&self) -> &'static str {
        match self {
            MotorTask::Start => "start",
            MotorTask::Stop => "stop",
        }
    }
}

impl MotorDems {
    /// The network topic these demands are published on.
    pub fn topic(&self) -> &'static str {
        match self {
            MotorDems::GoalPose(_) => "goal_pose",
            MotorDems::GripSeparation(_) => "grip_separation",
            MotorDems::Task(_) => "task_to_motor_control",
            MotorDems::Start(_) => "start",
        }
    }
}

impl MotorAck {
    /// Topics on which the motor controller publishes acknowledgements.
    pub const TOPICS: [&'static str; 3] = ["state_done", "task_done", "impact_feedback"];

    /// Get the acknowledgement corresponding to a boolean message on the given topic.
    ///
    /// Only `true` messages carry an acknowledgement, `false` (and unknown topics) give `None`.
    pub fn from_topic(topic: &str, value: bool) -> Option<Self> {
        if !value {
            return None;
        }

        match topic {
            "state_done" => Some(MotorAck::StateDone),
            "task_done" => Some(MotorAck::TaskDone),
            "impact_feedback" => Some(MotorAck::Impact),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ack_from_topic() {
        assert_eq!(MotorAck::from_topic("state_done", true), Some(MotorAck::StateDone));
        assert_eq!(MotorAck::from_topic("impact_feedback", true), Some(MotorAck::Impact));
        assert_eq!(MotorAck::from_topic("state_done", false), None);
        assert_eq!(MotorAck::from_topic("goal_pose", true), None);
    }

    #[test]
    fn test_joint_angles_json() {
        let angles = JointAngles5([0.0, 90.0, -90.0, -40.0, 0.0]);
        assert_eq!(
            serde_json::to_string(&angles).unwrap(),
            "[0.0,90.0,-90.0,-40.0,0.0]"
        );
        assert_eq!(format!("{}", angles), "(0.0 90.0 -90.0 -40.0 0.0)");
    }
}
