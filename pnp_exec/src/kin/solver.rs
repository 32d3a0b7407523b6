//! Damped least squares inverse kinematics solver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{Matrix4, Matrix6x4, Vector3, Vector4, Vector6};
use util::maths::wrap_deg_180;

use super::{ArmChain, IkSolver, KinError, SolverParams, NUM_ACTIVE_JOINTS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Numeric IK solver iterating `dq = (JᵀJ + λ²I)⁻¹ Jᵀ e` on a central difference Jacobian.
///
/// The error vector stacks the position error (mm) and the tool axis error scaled by
/// `orientation_weight_mm`.
pub struct DlsSolver {
    chain: ArmChain,

    params: SolverParams,

    /// Offset between the base joint and the azimuth of the arm plane.
    ///
    /// Units: degrees
    base_azimuth_offset_deg: f64,
}

/// Residuals of the last iteration of a solve.
#[derive(Debug, Clone, Copy)]
struct Residual {
    error: Vector6<f64>,
    position_err_mm: f64,
    orientation_err: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DlsSolver {
    pub fn new(chain: ArmChain, params: SolverParams, base_azimuth_offset_deg: f64) -> Self {
        Self {
            chain,
            params,
            base_azimuth_offset_deg,
        }
    }

    /// Starting point of a solve for the given target.
    ///
    /// Every solve starts from the configured seed so the solution only depends on the target.
    /// The base joint is turned to face the arm plane towards the target, unless the target is on
    /// the base axis.
    fn seed_for(&self, position_mm: &Vector3<f64>) -> [f64; NUM_ACTIVE_JOINTS] {
        let mut q = [0f64; NUM_ACTIVE_JOINTS];
        for (qi, s) in q.iter_mut().zip(self.params.seed_deg.iter()) {
            *qi = s.to_radians();
        }

        if position_mm.x.hypot(position_mm.y) > 1e-6 {
            let azimuth_deg = position_mm.y.atan2(position_mm.x).to_degrees();
            q[0] = wrap_deg_180(azimuth_deg - self.base_azimuth_offset_deg).to_radians();
        }

        q
    }

    pub fn chain(&self) -> &ArmChain {
        &self.chain
    }

    fn residual(
        &self,
        q: &[f64; NUM_ACTIVE_JOINTS],
        target_mm: &Vector3<f64>,
        target_axis: &Vector3<f64>,
    ) -> Residual {
        let (p, x) = self.chain.tool_position_axis(q);
        let dp = target_mm - p;
        let dx = target_axis - x;
        let w = self.params.orientation_weight_mm;

        Residual {
            error: Vector6::new(dp.x, dp.y, dp.z, w * dx.x, w * dx.y, w * dx.z),
            position_err_mm: dp.norm(),
            orientation_err: dx.norm(),
        }
    }

    /// Central difference Jacobian of the stacked tool position and weighted tool axis.
    fn jacobian(&self, q: &[f64; NUM_ACTIVE_JOINTS]) -> Matrix6x4<f64> {
        let h = self.params.jacobian_step_deg.to_radians();
        let w = self.params.orientation_weight_mm;
        let mut jac = Matrix6x4::zeros();

        for i in 0..NUM_ACTIVE_JOINTS {
            let mut q_plus = *q;
            let mut q_minus = *q;
            q_plus[i] += h;
            q_minus[i] -= h;

            let (p_plus, x_plus) = self.chain.tool_position_axis(&q_plus);
            let (p_minus, x_minus) = self.chain.tool_position_axis(&q_minus);

            let dp = (p_plus - p_minus) / (2.0 * h);
            let dx = (x_plus - x_minus) * (w / (2.0 * h));

            jac.set_column(i, &Vector6::new(dp.x, dp.y, dp.z, dx.x, dx.y, dx.z));
        }

        jac
    }

    fn converged(&self, r: &Residual) -> bool {
        r.position_err_mm < self.params.position_tol_mm
            && r.orientation_err < self.params.orientation_tol
    }
}

impl IkSolver for DlsSolver {
    fn solve(
        &mut self,
        position_mm: &Vector3<f64>,
        tool_axis: &Vector3<f64>,
    ) -> Result<[f64; NUM_ACTIVE_JOINTS], KinError> {
        let damping_sq = self.params.damping.powi(2);
        let max_step = self.params.max_step_deg.to_radians();

        let mut q = self.seed_for(position_mm);
        let mut res = self.residual(&q, position_mm, tool_axis);

        for iter in 0..self.params.max_iters {
            if self.converged(&res) {
                trace!(
                    "DLS converged in {} iterations (pos err {:.4} mm, axis err {:.2e})",
                    iter,
                    res.position_err_mm,
                    res.orientation_err
                );
                break;
            }

            let jac = self.jacobian(&q);
            let jt = jac.transpose();
            let lhs: Matrix4<f64> = &jt * &jac + Matrix4::identity() * damping_sq;

            let dq: Vector4<f64> = match lhs.try_inverse() {
                Some(inv) => inv * (jt * res.error),
                None => return Err(KinError::SolverDiverged(iter)),
            };

            // Limit the step so a poor linearisation can't throw the arm across the workspace
            let scale = match dq.amax() {
                m if m > max_step => max_step / m,
                _ => 1.0,
            };

            for (qi, dqi) in q.iter_mut().zip(dq.iter()) {
                *qi += dqi * scale;
            }

            res = self.residual(&q, position_mm, tool_axis);
        }

        if !self.converged(&res) {
            return Err(KinError::IkUnreachable {
                target_mm: [position_mm.x, position_mm.y, position_mm.z],
                position_err_mm: res.position_err_mm,
                orientation_err: res.orientation_err,
            });
        }

        let mut q_deg = [0f64; NUM_ACTIVE_JOINTS];
        for (d, r) in q_deg.iter_mut().zip(q.iter()) {
            *d = r.to_degrees();
        }

        Ok(q_deg)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kin::KinParams;

    fn solver() -> DlsSolver {
        let params = KinParams::default();
        DlsSolver::new(
            ArmChain::new(&params.links).unwrap(),
            params.solver,
            params.base_azimuth_offset_deg,
        )
    }

    fn to_rad(q_deg: [f64; 4]) -> [f64; 4] {
        let mut q = [0f64; 4];
        for (r, d) in q.iter_mut().zip(q_deg.iter()) {
            *r = d.to_radians();
        }
        q
    }

    #[test]
    fn test_solve_known_config() {
        let mut s = solver();
        let down = Vector3::new(0.0, 0.0, -1.0);

        // A tool-down configuration a few degrees away from the seed
        let q_true = to_rad([-60.0, 65.0, -70.0, -85.0]);
        let (target, _) = s.chain().tool_position_axis(&q_true);

        let q = s.solve(&target, &down).unwrap();

        let (p, x) = s.chain().tool_position_axis(&to_rad(q));
        assert!((p - target).norm() < 0.1);
        assert!((x - down).norm() < 1e-3);
    }

    #[test]
    fn test_solve_from_seed() {
        let mut s = solver();
        let down = Vector3::new(0.0, 0.0, -1.0);
        let target = Vector3::new(150.0, 0.0, 220.0);

        let q = s.solve(&target, &down).unwrap();

        let (p, _) = s.chain().tool_position_axis(&to_rad(q));
        assert!((p - target).norm() < 0.1);

        // Arm plane must face the target
        assert!((q[0] + 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_solve_independent_of_history() {
        let down = Vector3::new(0.0, 0.0, -1.0);
        let target = Vector3::new(250.0, -200.0, 120.0);

        let cold = solver().solve(&target, &down).unwrap();

        // Solve a target on the far side of the base first
        let mut s = solver();
        s.solve(&Vector3::new(-200.0, 150.0, 150.0), &down).unwrap();
        let after_far = s.solve(&target, &down).unwrap();

        assert_eq!(cold, after_far);

        let expected_base = (-200f64).atan2(250.0).to_degrees() - 90.0;
        assert!((cold[0] - expected_base).abs() < 1e-3, "base {} not facing target", cold[0]);
    }

    #[test]
    fn test_unreachable() {
        let mut s = solver();

        let err = s
            .solve(&Vector3::new(2000.0, 0.0, 0.0), &Vector3::new(0.0, 0.0, -1.0))
            .unwrap_err();

        assert!(matches!(err, KinError::IkUnreachable { .. }));
    }
}
