//! Execution of individual sequencer states

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::mech::{JointAngles5, MotorDems};
use log::{debug, info};

use super::{ActionState, PnpSeq, PnpSeqError};
use crate::sink::MotionCommandSink;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PnpSeq {
    /// Emit the command for the given state.
    ///
    /// Fixed poses are sent without calling the kinematics, waypoint states are solved first and
    /// the gripper states send a separation. If the kinematics fail or the command can't be sent
    /// the sequencer is halted in `state`, so that `previous` executes it again.
    ///
    /// A pending cycle completion is signalled once the init pose has been sent.
    pub(crate) fn execute(
        &mut self,
        state: ActionState,
        sink: &mut dyn MotionCommandSink,
    ) -> Result<(), PnpSeqError> {
        let dems = match state {
            ActionState::Parking => MotorDems::GoalPose(JointAngles5(self.params.parking_deg)),
            ActionState::InitPose => MotorDems::GoalPose(JointAngles5(self.params.init_pose_deg)),
            ActionState::GripOn => {
                let ctx = self
                    .cycle
                    .as_ref()
                    .ok_or(PnpSeqError::NoCycleContext(state))?;

                MotorDems::GripSeparation(ctx.grip_width_mm)
            }
            ActionState::GripOff => MotorDems::GripSeparation(self.params.grip_open_mm),
            _ => {
                let target = self
                    .cycle
                    .as_ref()
                    .and_then(|c| c.waypoint_for(state))
                    .ok_or(PnpSeqError::NoCycleContext(state))?;

                match self.kin.solve(&target) {
                    Ok((angles, kin_report)) => {
                        self.report.azimuth_err_deg = kin_report.azimuth_err_deg;

                        debug!(
                            "goal pose ({:.1} {:.1} {:.1} {:.1})",
                            target.x_mm, target.y_mm, target.z_mm, target.heading_deg
                        );

                        MotorDems::GoalPose(angles)
                    }
                    Err(e) => {
                        self.state.halted = true;
                        return Err(PnpSeqError::IkUnreachable(state, e));
                    }
                }
            }
        };

        debug!("Executing {:?}: {:?}", state, dems);

        if let Err(e) = sink.send_dems(&dems) {
            self.state.halted = true;
            return Err(e.into());
        }
        self.report.command_emitted = true;

        if state == ActionState::InitPose && self.state.cycle_complete_pending {
            self.signal_cycle_complete(sink)?;
        }

        Ok(())
    }

    fn signal_cycle_complete(
        &mut self,
        sink: &mut dyn MotionCommandSink,
    ) -> Result<(), PnpSeqError> {
        if let Err(e) = sink.send_cycle_complete(true) {
            self.state.halted = true;
            return Err(e.into());
        }

        self.state.cycle_complete_pending = false;
        self.state.cycle_complete = true;
        self.report.cycle_complete = true;

        info!("Pick and place cycle {} complete", self.num_cycles);

        Ok(())
    }
}
