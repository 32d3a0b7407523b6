//! # Kinematics module
//!
//! Converts a 4 degree of freedom Cartesian target ([`Pose4`]) into the five joint angles the
//! motor controller accepts. The first four joints come from a numeric solver constrained so that
//! the tool's x-axis points along `tool_axis` (straight down by default). The fifth, the wrist, is
//! computed directly from the target's azimuth and heading:
//!
//! ```text
//! wrist = -atan2(y, x) - heading
//! ```
//!
//! wrapped into `[-180, 180)`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chain;
mod params;
mod solver;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::mech::JointAngles5;
use log::{debug, warn};
use nalgebra::Vector3;
use serde::Serialize;
use util::maths::{ang_dist_deg, round_dp, wrap_deg_180};

use crate::planner::Pose4;

pub use chain::*;
pub use params::*;
pub use solver::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of joints driven by the numeric solver.
pub const NUM_ACTIVE_JOINTS: usize = 4;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A numeric inverse kinematics capability for the four active joints.
pub trait IkSolver {
    /// Find joint angles placing the tool at `position_mm` with its x-axis along `tool_axis`.
    ///
    /// Returned angles are in degrees, base joint first.
    fn solve(
        &mut self,
        position_mm: &Vector3<f64>,
        tool_axis: &Vector3<f64>,
    ) -> Result<[f64; NUM_ACTIVE_JOINTS], KinError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wraps an [`IkSolver`] and adds the analytic wrist angle.
pub struct KinematicsAdapter {
    solver: Box<dyn IkSolver>,

    tool_axis: Vector3<f64>,

    angle_decimal_places: i32,

    base_azimuth_offset_deg: f64,

    azimuth_tolerance_deg: f64,
}

/// Status report for a single solve.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Azimuth of the target position, `atan2(y, x)`.
    ///
    /// Units: degrees
    pub target_azimuth_deg: f64,

    /// Azimuth of the arm plane implied by the solved base joint.
    ///
    /// Units: degrees
    pub solved_azimuth_deg: f64,

    /// Angular distance between the solved and target azimuths.
    ///
    /// Units: degrees
    pub azimuth_err_deg: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during kinematics processing.
#[derive(Debug, thiserror::Error)]
pub enum KinError {
    #[error(
        "No joint solution found for target {target_mm:?} mm (position error {position_err_mm:.2} \
         mm, tool axis error {orientation_err:.2e})"
    )]
    IkUnreachable {
        target_mm: [f64; 3],
        position_err_mm: f64,
        orientation_err: f64,
    },

    #[error("The solver's normal equations became singular at iteration {0}")]
    SolverDiverged(usize),

    #[error("Expected the arm chain to have {} active joints, found {0}", NUM_ACTIVE_JOINTS)]
    InvalidChain(usize),

    #[error("Target pose contains a non-finite value: {0:?}")]
    NonFiniteTarget(Pose4),

    #[error(
        "Solved arm plane azimuth {solved_azimuth_deg:.2} deg does not face the target azimuth \
         {target_azimuth_deg:.2} deg"
    )]
    AzimuthMismatch {
        target_azimuth_deg: f64,
        solved_azimuth_deg: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicsAdapter {
    /// Create an adapter around the damped least squares solver described by the parameters.
    pub fn from_params(params: &KinParams) -> Result<Self, KinError> {
        let chain = ArmChain::new(&params.links)?;
        let solver = DlsSolver::new(chain, params.solver.clone(), params.base_azimuth_offset_deg);

        Ok(Self::new(Box::new(solver), params))
    }

    /// Create an adapter around any solver.
    pub fn new(solver: Box<dyn IkSolver>, params: &KinParams) -> Self {
        Self {
            solver,
            tool_axis: Vector3::from(params.tool_axis),
            angle_decimal_places: params.angle_decimal_places,
            base_azimuth_offset_deg: params.base_azimuth_offset_deg,
            azimuth_tolerance_deg: params.azimuth_tolerance_deg,
        }
    }

    /// Solve for the joint angles reaching the given target.
    pub fn solve(&mut self, target: &Pose4) -> Result<(JointAngles5, StatusReport), KinError> {
        let all_finite = [target.x_mm, target.y_mm, target.z_mm, target.heading_deg]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(KinError::NonFiniteTarget(*target));
        }

        let position = Vector3::from(target.position_mm());
        let q = self.solver.solve(&position, &self.tool_axis)?;

        let mut angles = [0f64; 5];
        for (a, qi) in angles.iter_mut().zip(q.iter()) {
            *a = round_dp(*qi, self.angle_decimal_places);
        }
        angles[4] = wrist_angle_deg(target);
        let angles = JointAngles5(angles);

        let report = self.check_azimuth(target, angles.base_deg())?;

        debug!("IK {:?} -> {}", target, angles);

        Ok((angles, report))
    }

    /// Check that the arm plane implied by the base joint faces the target.
    ///
    /// A reach-over solution, with the arm plane pointing away from the target, is a mismatch.
    /// Targets on the base axis have no defined azimuth and always pass.
    fn check_azimuth(&self, target: &Pose4, base_deg: f64) -> Result<StatusReport, KinError> {
        let target_azimuth_deg = target.azimuth_deg();
        let solved_azimuth_deg = wrap_deg_180(base_deg + self.base_azimuth_offset_deg);

        let on_axis = target.x_mm.hypot(target.y_mm) < 1e-6;
        let azimuth_err_deg = if on_axis {
            0.0
        } else {
            ang_dist_deg(target_azimuth_deg, solved_azimuth_deg).abs()
        };

        if azimuth_err_deg > self.azimuth_tolerance_deg {
            warn!(
                "Solved base azimuth {:.2} deg does not match target azimuth {:.2} deg",
                solved_azimuth_deg, target_azimuth_deg
            );
            return Err(KinError::AzimuthMismatch {
                target_azimuth_deg,
                solved_azimuth_deg,
            });
        }

        Ok(StatusReport {
            target_azimuth_deg,
            solved_azimuth_deg,
            azimuth_err_deg,
        })
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrist angle which aligns the gripper with the target heading.
///
/// Uses `atan2` so that targets with `x == 0` are handled.
pub fn wrist_angle_deg(target: &Pose4) -> f64 {
    wrap_deg_180(-target.azimuth_deg() - target.heading_deg)
}
