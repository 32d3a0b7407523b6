//! Parameters structure for the sequencer

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::mech::NUM_JOINTS;
use serde::{Deserialize, Serialize};

use crate::planner::OffsetParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the pick-and-place sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnpSeqParams {
    // ---- FIXED POSES ----
    /// Joint angles of the parking (rest) pose.
    ///
    /// Units: degrees
    pub parking_deg: [f64; NUM_JOINTS],

    /// Joint angles of the ready pose, where the camera can see the workspace.
    ///
    /// Units: degrees
    pub init_pose_deg: [f64; NUM_JOINTS],

    // ---- GRIPPER ----
    /// Gripper separation when fully open.
    ///
    /// Units: millimeters
    pub grip_open_mm: f64,

    /// Largest grip width accepted in an observation.
    ///
    /// Units: millimeters
    pub max_grip_width_mm: f64,

    // ---- WAYPOINTS ----
    pub offsets: OffsetParams,

    pub observation_frame: ObservationFrame,
}

/// Transform from the frame observations are reported in to the arm base frame.
///
/// Positions are first rotated about the x-axis then translated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationFrame {
    pub enabled: bool,

    /// Units: degrees
    pub rotate_x_deg: f64,

    /// Units: millimeters
    pub translate_mm: [f64; 3],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ObservationFrame {
    /// Transform a position into the base frame, doing nothing if the transform is disabled.
    pub fn apply(&self, position_mm: [f64; 3]) -> [f64; 3] {
        if !self.enabled {
            return position_mm;
        }

        let (s, c) = self.rotate_x_deg.to_radians().sin_cos();
        let [x, y, z] = position_mm;

        [
            x + self.translate_mm[0],
            c * y - s * z + self.translate_mm[1],
            s * y + c * z + self.translate_mm[2],
        ]
    }
}

impl Default for ObservationFrame {
    fn default() -> Self {
        Self {
            enabled: false,
            rotate_x_deg: 0.0,
            translate_mm: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_observation_frame() {
        let p = [100.0, 50.0, 20.0];

        assert_eq!(ObservationFrame::default().apply(p), p);

        let frame = ObservationFrame {
            enabled: true,
            rotate_x_deg: 90.0,
            translate_mm: [1.0, 2.0, 3.0],
        };
        let q = frame.apply(p);

        // y -> z and z -> -y
        assert!((q[0] - 101.0).abs() < 1e-9);
        assert!((q[1] - (-20.0 + 2.0)).abs() < 1e-9);
        assert!((q[2] - (50.0 + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_params_file() {
        let params: PnpSeqParams =
            util::params::parse(include_str!("../../../params/pnp_seq.toml")).unwrap();

        assert_eq!(params.init_pose_deg, [0.0, 90.0, -90.0, -40.0, 0.0]);
        assert_eq!(params.offsets, crate::planner::test::offsets());
        assert!(!params.observation_frame.enabled);
    }
}
