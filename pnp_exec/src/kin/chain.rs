//! Serial arm chain and forward kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use super::{KinError, LinkParams, NUM_ACTIVE_JOINTS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A link of the chain, with its fixed origin transform precomputed.
#[derive(Debug, Clone)]
struct Link {
    /// Transform from the previous link's frame to this link's origin, before the joint rotation.
    origin: Isometry3<f64>,

    active: bool,
}

/// A serial chain of revolute links starting at the arm base.
#[derive(Debug, Clone)]
pub struct ArmChain {
    links: Vec<Link>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Link {
    fn from_params(params: &LinkParams) -> Self {
        let origin = Isometry3::from_parts(
            Translation3::new(params.a_mm, 0.0, params.d_mm),
            UnitQuaternion::from_euler_angles(
                params.alpha_deg.to_radians(),
                0.0,
                params.theta_deg.to_radians(),
            ),
        );

        Self {
            origin,
            active: params.active,
        }
    }

    /// Transform from the previous frame to this link's frame with the joint at `angle_rad`.
    fn transform(&self, angle_rad: f64) -> Isometry3<f64> {
        self.origin * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle_rad)
    }
}

impl ArmChain {
    /// Build a chain from link parameters, checking that the chain has the expected number of
    /// active joints.
    pub fn new(params: &[LinkParams]) -> Result<Self, KinError> {
        let links: Vec<Link> = params.iter().map(Link::from_params).collect();

        let num_active = links.iter().filter(|l| l.active).count();
        if num_active != NUM_ACTIVE_JOINTS {
            return Err(KinError::InvalidChain(num_active));
        }

        debug!(
            "Arm chain: {}",
            params.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(" -> ")
        );

        Ok(Self { links })
    }

    /// Pose of the end effector in the base frame for the given active joint angles.
    ///
    /// Inactive joints are held at zero.
    pub fn forward(&self, active_rad: &[f64; NUM_ACTIVE_JOINTS]) -> Isometry3<f64> {
        let mut pose = Isometry3::identity();
        let mut active_iter = active_rad.iter();

        for link in self.links.iter() {
            let angle = if link.active {
                active_iter.next().copied().unwrap_or(0.0)
            } else {
                0.0
            };

            pose *= link.transform(angle);
        }

        pose
    }

    /// End effector position and x-axis direction for the given active joint angles.
    pub fn tool_position_axis(
        &self,
        active_rad: &[f64; NUM_ACTIVE_JOINTS],
    ) -> (Vector3<f64>, Vector3<f64>) {
        let pose = self.forward(active_rad);

        (pose.translation.vector, pose.rotation * Vector3::x())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kin::KinParams;
    use approx::assert_relative_eq;

    fn chain() -> ArmChain {
        ArmChain::new(&KinParams::default().links).unwrap()
    }

    #[test]
    fn test_forward_vertical() {
        // Upper arm vertical with the forearm and tool following it straight up
        let (p, x) = chain().tool_position_axis(&[0.0, 90f64.to_radians(), 0.0, 0.0]);

        assert_relative_eq!(p, Vector3::new(0.0, 0.0, 50.0 + 65.95 + 332.5 + 270.2 + 231.47), epsilon = 1e-6);
        assert_relative_eq!(x, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_forward_tool_down() {
        // Arm plane along +x when the base is at -90 deg, elbow joints sum to -90 deg
        let q = [-90f64.to_radians(), 0.0, 0.0, -90f64.to_radians()];
        let (p, x) = chain().tool_position_axis(&q);

        assert_relative_eq!(p, Vector3::new(332.5 + 270.2, 0.0, 115.95 - 231.47), epsilon = 1e-6);
        assert_relative_eq!(x, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_chain() {
        let mut links = KinParams::default().links;
        links[4].active = true;

        assert!(matches!(ArmChain::new(&links), Err(KinError::InvalidChain(5))));
    }
}
