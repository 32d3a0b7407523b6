//! # Waypoint planner
//!
//! Derives the six waypoints of a pick-and-place cycle from the raw pick and place poses. Each
//! waypoint is the raw pose plus one of three fixed offsets:
//!
//! - `above`: approach height above the object or destination
//! - `grip`: height at which the gripper closes or opens
//! - `lift`: retreat height after gripping or releasing

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A Cartesian target with a single rotational degree of freedom about the tool axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose4 {
    /// Units: millimeters
    pub x_mm: f64,

    /// Units: millimeters
    pub y_mm: f64,

    /// Units: millimeters
    pub z_mm: f64,

    /// Heading of the tool about the vertical axis.
    ///
    /// Units: degrees
    pub heading_deg: f64,
}

/// A fixed additive offset applied to a [`Pose4`].
///
/// In parameter files offsets are written as `[dx_mm, dy_mm, dz_mm, dheading_deg]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct OffsetVector {
    pub dx_mm: f64,
    pub dy_mm: f64,
    pub dz_mm: f64,
    pub dheading_deg: f64,
}

/// Offsets used to derive the waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetParams {
    pub above_offset: OffsetVector,
    pub grip_offset: OffsetVector,
    pub lift_offset: OffsetVector,
}

/// The six waypoints of one pick-and-place cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoints {
    pub pick_above: Pose4,
    pub pick_grip: Pose4,
    pub pick_lift: Pose4,
    pub place_above: Pose4,
    pub place_grip: Pose4,
    pub place_lift: Pose4,
}

/// Computes [`Waypoints`] from raw poses using fixed offsets.
#[derive(Debug, Clone)]
pub struct WaypointPlanner {
    offsets: OffsetParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identifies one of the six waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointId {
    PickAbove,
    PickGrip,
    PickLift,
    PlaceAbove,
    PlaceGrip,
    PlaceLift,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose4 {
    pub fn new(x_mm: f64, y_mm: f64, z_mm: f64, heading_deg: f64) -> Self {
        Self {
            x_mm,
            y_mm,
            z_mm,
            heading_deg,
        }
    }

    /// Azimuth of the pose's position about the base, `atan2(y, x)`.
    ///
    /// Units: degrees
    pub fn azimuth_deg(&self) -> f64 {
        self.y_mm.atan2(self.x_mm).to_degrees()
    }

    /// The position of the pose.
    ///
    /// Units: millimeters
    pub fn position_mm(&self) -> [f64; 3] {
        [self.x_mm, self.y_mm, self.z_mm]
    }
}

impl Add<OffsetVector> for Pose4 {
    type Output = Pose4;

    fn add(self, rhs: OffsetVector) -> Pose4 {
        Pose4 {
            x_mm: self.x_mm + rhs.dx_mm,
            y_mm: self.y_mm + rhs.dy_mm,
            z_mm: self.z_mm + rhs.dz_mm,
            heading_deg: self.heading_deg + rhs.dheading_deg,
        }
    }
}

impl Sub for Pose4 {
    type Output = OffsetVector;

    fn sub(self, rhs: Pose4) -> OffsetVector {
        OffsetVector {
            dx_mm: self.x_mm - rhs.x_mm,
            dy_mm: self.y_mm - rhs.y_mm,
            dz_mm: self.z_mm - rhs.z_mm,
            dheading_deg: self.heading_deg - rhs.heading_deg,
        }
    }
}

impl Sub for OffsetVector {
    type Output = OffsetVector;

    fn sub(self, rhs: OffsetVector) -> OffsetVector {
        OffsetVector {
            dx_mm: self.dx_mm - rhs.dx_mm,
            dy_mm: self.dy_mm - rhs.dy_mm,
            dz_mm: self.dz_mm - rhs.dz_mm,
            dheading_deg: self.dheading_deg - rhs.dheading_deg,
        }
    }
}

impl From<[f64; 4]> for OffsetVector {
    fn from(o: [f64; 4]) -> Self {
        Self {
            dx_mm: o[0],
            dy_mm: o[1],
            dz_mm: o[2],
            dheading_deg: o[3],
        }
    }
}

impl From<OffsetVector> for [f64; 4] {
    fn from(o: OffsetVector) -> Self {
        [o.dx_mm, o.dy_mm, o.dz_mm, o.dheading_deg]
    }
}

impl Waypoints {
    /// Get the waypoint with the given ID.
    pub fn get(&self, id: WaypointId) -> Pose4 {
        match id {
            WaypointId::PickAbove => self.pick_above,
            WaypointId::PickGrip => self.pick_grip,
            WaypointId::PickLift => self.pick_lift,
            WaypointId::PlaceAbove => self.place_above,
            WaypointId::PlaceGrip => self.place_grip,
            WaypointId::PlaceLift => self.place_lift,
        }
    }
}

impl WaypointPlanner {
    pub fn new(offsets: OffsetParams) -> Self {
        Self { offsets }
    }

    /// The offsets used by this planner.
    pub fn offsets(&self) -> &OffsetParams {
        &self.offsets
    }

    /// Derive the six waypoints for the given pick and place poses.
    pub fn plan(&self, pick: Pose4, place: Pose4) -> Waypoints {
        let o = &self.offsets;

        Waypoints {
            pick_above: pick + o.above_offset,
            pick_grip: pick + o.grip_offset,
            pick_lift: pick + o.lift_offset,
            place_above: place + o.above_offset,
            place_grip: place + o.grip_offset,
            place_lift: place + o.lift_offset,
        }
    }

    /// Report the waypoints in the log.
    pub fn log_waypoints(waypoints: &Waypoints) {
        info!("Waypoints:");
        for (name, p) in [
            ("Pick Above", waypoints.pick_above),
            ("Pick Grip", waypoints.pick_grip),
            ("Pick Lift", waypoints.pick_lift),
            ("Place Above", waypoints.place_above),
            ("Place Grip", waypoints.place_grip),
            ("Place Lift", waypoints.place_lift),
        ]
        .iter()
        {
            info!(
                "    {:<12} [{:.1}, {:.1}, {:.1}, {:.1}]",
                name, p.x_mm, p.y_mm, p.z_mm, p.heading_deg
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) fn offsets() -> OffsetParams {
        OffsetParams {
            above_offset: [0.0, 0.0, 120.0, 0.0].into(),
            grip_offset: [0.0, 0.0, 30.0, 0.0].into(),
            lift_offset: [0.0, 0.0, 150.0, 0.0].into(),
        }
    }

    #[test]
    fn test_plan_example() {
        let planner = WaypointPlanner::new(offsets());

        let wps = planner.plan(
            Pose4::new(150.0, 0.0, 100.0, 0.0),
            Pose4::new(300.0, 0.0, 100.0, 90.0),
        );

        assert_eq!(wps.pick_above, Pose4::new(150.0, 0.0, 220.0, 0.0));
        assert_eq!(wps.pick_grip, Pose4::new(150.0, 0.0, 130.0, 0.0));
        assert_eq!(wps.pick_lift, Pose4::new(150.0, 0.0, 250.0, 0.0));
        assert_eq!(wps.place_above, Pose4::new(300.0, 0.0, 220.0, 90.0));
        assert_eq!(wps.place_grip, Pose4::new(300.0, 0.0, 130.0, 90.0));
        assert_eq!(wps.place_lift, Pose4::new(300.0, 0.0, 250.0, 90.0));
    }

    #[test]
    fn test_plan_idempotent() {
        let planner = WaypointPlanner::new(OffsetParams {
            above_offset: [1.5, -2.0, 120.0, 5.0].into(),
            ..offsets()
        });
        let pick = Pose4::new(212.3, -87.1, 41.9, -33.0);
        let place = Pose4::new(-10.0, 250.0, 12.5, 170.0);

        assert_eq!(planner.plan(pick, place), planner.plan(pick, place));
    }

    #[test]
    fn test_offset_differences() {
        let planner = WaypointPlanner::new(offsets());
        let o = planner.offsets();

        for (pick, place) in [
            (Pose4::new(150.0, 0.0, 100.0, 0.0), Pose4::new(300.0, 0.0, 100.0, 90.0)),
            (Pose4::new(-120.0, 64.0, 0.0, 45.0), Pose4::new(0.0, -300.0, 60.0, -90.0)),
        ]
        .iter()
        {
            let wps = planner.plan(*pick, *place);

            assert_eq!(wps.pick_above - wps.pick_grip, o.above_offset - o.grip_offset);
            assert_eq!(wps.place_lift - wps.place_grip, o.lift_offset - o.grip_offset);
        }
    }

    #[test]
    fn test_offsets_from_toml() {
        let o: OffsetParams = util::params::parse(
            "above_offset = [0.0, 0.0, 120.0, 0.0]\n\
             grip_offset = [0.0, 0.0, 30.0, 0.0]\n\
             lift_offset = [0.0, 0.0, 150.0, 0.0]\n",
        )
        .unwrap();

        assert_eq!(o, offsets());
    }
}
