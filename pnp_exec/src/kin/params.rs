//! Parameters structure for the kinematics module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::NUM_ACTIVE_JOINTS;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the kinematics adapter, the arm chain and the numeric solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinParams {
    // ---- CONSTRAINT ----
    /// Direction the end effector's x-axis must point in, in the base frame.
    pub tool_axis: [f64; 3],

    // ---- OUTPUT ----
    /// Number of decimal places the solved joint angles are rounded to.
    pub angle_decimal_places: i32,

    // ---- AZIMUTH CHECK ----
    /// Offset between the first joint angle and the azimuth of the arm plane. Also used to turn
    /// the solver's seed towards each target.
    ///
    /// Units: degrees
    pub base_azimuth_offset_deg: f64,

    /// Maximum allowed difference between the solved and target azimuths before a solution is
    /// rejected.
    ///
    /// Units: degrees
    pub azimuth_tolerance_deg: f64,

    // ---- CHAIN AND SOLVER ----
    pub links: Vec<LinkParams>,

    pub solver: SolverParams,
}

/// A single link of the arm chain.
///
/// The link's origin is placed at `[a, 0, d]` with roll/pitch/yaw `[alpha, 0, theta]` relative
/// to the previous link, and its joint rotates about the local z-axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkParams {
    pub name: String,

    /// Units: millimeters
    pub a_mm: f64,

    /// Units: millimeters
    pub d_mm: f64,

    /// Units: degrees
    pub alpha_deg: f64,

    /// Units: degrees
    pub theta_deg: f64,

    /// Whether the joint of this link is driven by the solver.
    pub active: bool,
}

/// Parameters for the damped least squares solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverParams {
    pub max_iters: usize,

    /// Units: millimeters
    pub position_tol_mm: f64,

    /// Tolerance on the norm of the difference between the tool axis and its target.
    pub orientation_tol: f64,

    /// Scale applied to the orientation error so that it is comparable to the position error.
    ///
    /// Units: millimeters
    pub orientation_weight_mm: f64,

    /// Damping factor, lambda.
    pub damping: f64,

    /// Step used for the central difference Jacobian.
    ///
    /// Units: degrees
    pub jacobian_step_deg: f64,

    /// Largest change of any joint in a single iteration.
    ///
    /// Units: degrees
    pub max_step_deg: f64,

    /// Initial guess for the active joints at the start of every solve. The base joint is replaced
    /// by the one facing the target.
    ///
    /// Units: degrees
    pub seed_deg: [f64; NUM_ACTIVE_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for KinParams {
    /// Geometry of the five axis arm, with the wrist and tool combined into the final link.
    fn default() -> Self {
        Self {
            tool_axis: [0.0, 0.0, -1.0],
            angle_decimal_places: 3,
            base_azimuth_offset_deg: 90.0,
            azimuth_tolerance_deg: 1.0,
            links: vec![
                LinkParams::new("link1", 0.0, 50.0, 0.0, 90.0, true),
                LinkParams::new("link2", 0.0, 65.95, 90.0, 0.0, true),
                LinkParams::new("link3", 332.5, 0.0, 0.0, 0.0, true),
                LinkParams::new("link4", 270.2, 0.0, 0.0, 0.0, true),
                LinkParams::new("link5", 81.75 + 17.25 + 132.47, 0.0, 90.0, 0.0, false),
            ],
            solver: SolverParams::default(),
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iters: 200,
            position_tol_mm: 0.1,
            orientation_tol: 1e-3,
            orientation_weight_mm: 200.0,
            damping: 10.0,
            jacobian_step_deg: 0.01,
            max_step_deg: 10.0,
            seed_deg: [-90.0, 60.0, -60.0, -90.0],
        }
    }
}

impl LinkParams {
    pub fn new(name: &str, a_mm: f64, d_mm: f64, alpha_deg: f64, theta_deg: f64, active: bool) -> Self {
        Self {
            name: name.to_string(),
            a_mm,
            d_mm,
            alpha_deg,
            theta_deg,
            active,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_params_file_matches_default() {
        let file: KinParams = util::params::parse(include_str!("../../../params/kin.toml")).unwrap();
        let default = KinParams::default();

        assert_eq!(file.tool_axis, default.tool_axis);
        assert_eq!(file.links.len(), default.links.len());
        assert_eq!(file.solver.seed_deg, default.solver.seed_deg);

        for (f, d) in file.links.iter().zip(default.links.iter()) {
            assert_eq!(f.name, d.name);
            assert_eq!(f.active, d.active);
            assert_relative_eq!(f.a_mm, d.a_mm, epsilon = 1e-9);
            assert_relative_eq!(f.d_mm, d.d_mm, epsilon = 1e-9);
            assert_relative_eq!(f.alpha_deg, d.alpha_deg);
            assert_relative_eq!(f.theta_deg, d.theta_deg);
        }
    }
}
