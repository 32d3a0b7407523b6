//! Implementations for the PnpSeq state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{error, info, warn};
use serde::Serialize;

// Internal
use super::{ActionState, CycleContext, PnpSeqError, PnpSeqParams, Transition};
use crate::{
    kin::{KinParams, KinematicsAdapter},
    planner::WaypointPlanner,
    sink::MotionCommandSink,
};
use comms_if::{
    eqpt::{
        mech::{MotorAck, MotorDems, MotorTask},
        vision::ObjectObservation,
    },
    tc::{OperatorNotice, Tc},
    trigger::Trigger,
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    params,
    session::{self, Session},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pick-and-place sequencer.
///
/// All inputs arrive as [`Trigger`]s through [`PnpSeq::handle`], which processes one trigger to
/// completion before returning.
pub struct PnpSeq {
    pub(crate) params: PnpSeqParams,

    pub(crate) planner: WaypointPlanner,

    pub(crate) kin: KinematicsAdapter,

    pub(crate) state: SequencerState,

    /// The current object, `None` until the first observation.
    pub(crate) cycle: Option<CycleContext>,

    /// Number of observations accepted so far.
    pub(crate) num_cycles: u64,

    pub(crate) report: StatusReport,
    arch_report: Archiver,
}

/// Mutable state of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SequencerState {
    pub current: ActionState,

    pub previous: ActionState,

    /// Motor control has acknowledged the last task.
    pub task_done: bool,

    /// The last cycle completed and no observation has arrived since.
    pub cycle_complete: bool,

    /// A stop was requested and motor control has not yet acknowledged it.
    pub paused: bool,

    /// An impact was reported, motion commands are rejected until `previous`.
    pub fault_suspended: bool,

    /// The command of the current state could not be solved or sent, advances are rejected
    /// until `previous`.
    pub halted: bool,

    /// The cycle has ended but the completion signal has not been sent yet.
    pub cycle_complete_pending: bool,
}

/// Status report for the handling of a single trigger.
///
/// Archived as one CSV row per trigger.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Units: seconds since the start of the session
    pub time_s: f64,

    pub cycle_number: u64,

    pub current_state: ActionState,
    pub previous_state: ActionState,

    /// A joint or gripper command was sent while handling the trigger.
    pub command_emitted: bool,

    /// The trigger was an observation which started a new cycle.
    pub new_cycle: bool,

    /// The trigger completed the cycle.
    pub cycle_complete: bool,

    /// The trigger was rejected.
    pub rejected: bool,

    pub paused: bool,
    pub fault_suspended: bool,
    pub halted: bool,

    /// Difference between the solved base joint azimuth and the target azimuth.
    ///
    /// Units: degrees
    pub azimuth_err_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Fixed poses the arm can be sent to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectMove {
    Parking,
    InitPose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DirectMove {
    pub fn state(&self) -> ActionState {
        match self {
            DirectMove::Parking => ActionState::Parking,
            DirectMove::InitPose => ActionState::InitPose,
        }
    }
}

impl PnpSeq {
    /// Create a new sequencer starting in `Parking`.
    pub fn new(params: PnpSeqParams, kin: KinematicsAdapter) -> Self {
        Self {
            planner: WaypointPlanner::new(params.offsets),
            params,
            kin,
            state: SequencerState::default(),
            cycle: None,
            num_cycles: 0,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        }
    }

    /// Initialise the sequencer from parameter files, archiving status reports in the session.
    pub fn init(
        params_file: &str,
        kin_params_file: &str,
        session: &Session,
    ) -> Result<Self, PnpSeqError> {
        let params: PnpSeqParams = params::load(params_file).map_err(PnpSeqError::ParamLoadError)?;
        let kin_params: KinParams =
            params::load(kin_params_file).map_err(PnpSeqError::ParamLoadError)?;

        let kin = KinematicsAdapter::from_params(&kin_params).map_err(PnpSeqError::KinInitError)?;

        let mut seq = Self::new(params, kin);
        seq.arch_report = Archiver::from_path(session, "pnp_seq_status_report.csv")
            .map_err(PnpSeqError::ArchiveError)?;

        Ok(seq)
    }

    /// Handle a single trigger.
    ///
    /// Triggers which are rejected (invalid observations, out of sequence advances, kinematics
    /// failures, faults) are logged, reported to the operator where a notice exists, and flagged
    /// in the report. Only sink errors and internal inconsistencies are returned as errors.
    pub fn handle(
        &mut self,
        trigger: &Trigger,
        sink: &mut dyn MotionCommandSink,
    ) -> Result<StatusReport, PnpSeqError> {
        self.report = StatusReport {
            time_s: session::get_elapsed_seconds(),
            ..Default::default()
        };

        let result = match trigger {
            Trigger::Observation(obs) => self.on_new_observation(obs, sink),
            Trigger::Operator(tc) => self.on_operator(*tc, sink),
            Trigger::Ack(ack) => self.on_ack(*ack, sink),
        };

        if let Err(e) = result {
            if !e.is_rejection() {
                return Err(e);
            }

            match &e {
                PnpSeqError::IkUnreachable(_, _) => error!("{}", e),
                PnpSeqError::OutOfSequenceAdvance(_) => info!("{}", e),
                _ => warn!("{}", e),
            }

            self.report.rejected = true;

            if let Some(notice) = e.notice() {
                sink.send_notice(notice)?;
            }
        }

        self.report.cycle_number = self.num_cycles;
        self.report.current_state = self.state.current;
        self.report.previous_state = self.state.previous;
        self.report.paused = self.state.paused;
        self.report.fault_suspended = self.state.fault_suspended;
        self.report.halted = self.state.halted;

        Ok(self.report)
    }

    /// Start a new cycle from an observation.
    ///
    /// The observation is validated before anything is changed, so a rejected observation leaves
    /// the current cycle as it was.
    pub fn on_new_observation(
        &mut self,
        obs: &ObjectObservation,
        sink: &mut dyn MotionCommandSink,
    ) -> Result<(), PnpSeqError> {
        if self.state.fault_suspended {
            return Err(PnpSeqError::FaultSuspended);
        }

        obs.validate().map_err(PnpSeqError::InvalidObservation)?;

        if obs.grip_width > self.params.max_grip_width_mm {
            return Err(PnpSeqError::GripTooWide {
                width_mm: obs.grip_width,
                max_mm: self.params.max_grip_width_mm,
            });
        }

        info!("New observation: {}", obs);

        self.num_cycles += 1;
        let ctx = CycleContext::new(
            self.num_cycles,
            *obs,
            &self.params.observation_frame,
            &self.planner,
        );
        WaypointPlanner::log_waypoints(&ctx.waypoints);

        self.cycle = Some(ctx);
        self.report.new_cycle = true;

        self.state.cycle_complete = false;
        self.state.cycle_complete_pending = false;
        self.state.halted = false;

        self.set_state(ActionState::PickAbove);
        self.execute(ActionState::PickAbove, sink)
    }

    /// Step to the next action after motor control reports the last one is done.
    pub fn on_advance(&mut self, sink: &mut dyn MotionCommandSink) -> Result<(), PnpSeqError> {
        if self.state.fault_suspended {
            return Err(PnpSeqError::FaultSuspended);
        }
        if self.state.paused {
            return Err(PnpSeqError::Paused);
        }
        if self.state.halted {
            return Err(PnpSeqError::Halted(self.state.current));
        }

        match self.state.current.transition() {
            Transition::Next(next) => {
                self.set_state(next);
                self.execute(next, sink)
            }
            Transition::CompleteCycle => {
                // Sent along with the init pose
                self.state.cycle_complete_pending = true;

                self.set_state(ActionState::InitPose);
                self.execute(ActionState::InitPose, sink)
            }
            Transition::AwaitObservation => {
                Err(PnpSeqError::OutOfSequenceAdvance(self.state.current))
            }
        }
    }

    /// Move straight to one of the fixed poses, leaving the cycle context untouched.
    pub fn on_direct_move(
        &mut self,
        target: DirectMove,
        sink: &mut dyn MotionCommandSink,
    ) -> Result<(), PnpSeqError> {
        if self.state.fault_suspended {
            return Err(PnpSeqError::FaultSuspended);
        }

        // The interrupted waypoint, if any, is abandoned
        self.state.halted = false;

        let state = target.state();
        self.set_state(state);
        self.execute(state, sink)
    }

    /// Handle an operator command.
    pub fn on_operator(
        &mut self,
        tc: Tc,
        sink: &mut dyn MotionCommandSink,
    ) -> Result<(), PnpSeqError> {
        info!("Operator command: {}", tc.token());

        match tc {
            Tc::Start => {
                if self.state.fault_suspended {
                    return Err(PnpSeqError::FaultSuspended);
                }
                sink.send_dems(&MotorDems::Start(true))?;
                self.on_direct_move(DirectMove::InitPose, sink)
            }
            Tc::MoveToInit => {
                if self.state.fault_suspended {
                    return Err(PnpSeqError::FaultSuspended);
                }
                sink.send_dems(&MotorDems::Task(MotorTask::Start))?;
                self.on_direct_move(DirectMove::InitPose, sink)
            }
            Tc::Parking => self.on_direct_move(DirectMove::Parking, sink),
            Tc::Stop | Tc::Pause => {
                sink.send_dems(&MotorDems::Task(MotorTask::Stop))?;
                self.state.paused = true;
                self.state.task_done = false;

                info!("Stop sent, waiting for motor control to acknowledge");

                Ok(())
            }
            Tc::Previous => {
                if self.state.halted || self.state.fault_suspended {
                    self.state.halted = false;
                    self.state.fault_suspended = false;

                    info!("Retrying {:?}", self.state.current);

                    let current = self.state.current;
                    self.execute(current, sink)
                } else {
                    self.on_direct_move(DirectMove::InitPose, sink)
                }
            }
        }
    }

    /// Handle an acknowledgement from motor control.
    pub fn on_ack(
        &mut self,
        ack: MotorAck,
        sink: &mut dyn MotionCommandSink,
    ) -> Result<(), PnpSeqError> {
        match ack {
            MotorAck::StateDone => self.on_advance(sink),
            MotorAck::TaskDone => {
                self.state.task_done = true;

                if self.state.paused {
                    self.state.paused = false;
                    info!("Stop acknowledged, continuing operation");
                }

                Ok(())
            }
            MotorAck::Impact => {
                self.state.fault_suspended = true;
                warn!(
                    "Impact reported in {:?}, command emission suspended",
                    self.state.current
                );

                sink.send_notice(OperatorNotice::Impact)?;

                Ok(())
            }
        }
    }

    /// The current sequencer state.
    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// The current cycle context, if an observation has been received.
    pub fn cycle(&self) -> Option<&CycleContext> {
        self.cycle.as_ref()
    }

    /// The report of the last handled trigger.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    fn set_state(&mut self, next: ActionState) {
        self.state.previous = self.state.current;
        self.state.current = next;

        info!("State {:?} -> {:?}", self.state.previous, self.state.current);
    }
}

impl Archived for PnpSeq {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        kin::{self, test::MockSolver, IkSolver, KinError, NUM_ACTIVE_JOINTS},
        planner::Pose4,
        pnp_seq::ObservationFrame,
        sink::test::{Output, Record, RecordingSink},
    };
    use comms_if::eqpt::mech::JointAngles5;
    use nalgebra::Vector3;
    use std::{cell::Cell, rc::Rc};

    /// Solver which returns the target position as the first three joint angles, and can be
    /// switched to fail.
    struct EchoSolver {
        fail: Rc<Cell<bool>>,
    }

    impl IkSolver for EchoSolver {
        fn solve(
            &mut self,
            p: &Vector3<f64>,
            _tool_axis: &Vector3<f64>,
        ) -> Result<[f64; NUM_ACTIVE_JOINTS], KinError> {
            if self.fail.get() {
                Err(KinError::IkUnreachable {
                    target_mm: [p.x, p.y, p.z],
                    position_err_mm: 1.0,
                    orientation_err: 0.0,
                })
            } else {
                Ok([p.x, p.y, p.z, 0.0])
            }
        }
    }

    const PARKING: [f64; 5] = [-90.0, 100.0, -125.0, -70.0, 0.0];
    const INIT_POSE: [f64; 5] = [0.0, 90.0, -90.0, -40.0, 0.0];

    fn params() -> PnpSeqParams {
        PnpSeqParams {
            parking_deg: PARKING,
            init_pose_deg: INIT_POSE,
            grip_open_mm: 49.0,
            max_grip_width_mm: 49.0,
            offsets: crate::planner::test::offsets(),
            observation_frame: ObservationFrame::default(),
        }
    }

    fn seq() -> (PnpSeq, Rc<Cell<bool>>) {
        let fail = Rc::new(Cell::new(false));
        let solver = EchoSolver { fail: fail.clone() };

        // The echoed base joint does not follow the target azimuth
        let kin_params = KinParams {
            azimuth_tolerance_deg: 180.0,
            ..KinParams::default()
        };
        let kin = KinematicsAdapter::new(Box::new(solver), &kin_params);

        (PnpSeq::new(params(), kin), fail)
    }

    fn obs(pick: [f64; 4], grip_width: f64, place: [f64; 4]) -> Trigger {
        Trigger::Observation(
            ObjectObservation::from_slice(&[
                pick[0], pick[1], pick[2], pick[3], grip_width, place[0], place[1], place[2],
                place[3],
            ])
            .unwrap(),
        )
    }

    fn example_obs() -> Trigger {
        obs([150.0, 0.0, 100.0, 0.0], 40.0, [300.0, 0.0, 100.0, 90.0])
    }

    fn advance() -> Trigger {
        Trigger::Ack(MotorAck::StateDone)
    }

    /// The joint record the echo solver produces for a waypoint.
    fn echo(x: f64, y: f64, z: f64, heading: f64) -> Record {
        let wrist = kin::wrist_angle_deg(&Pose4::new(x, y, z, heading));
        Record::Dems(MotorDems::GoalPose(JointAngles5([x, y, z, 0.0, wrist])))
    }

    fn fixed(angles: [f64; 5]) -> Record {
        Record::Dems(MotorDems::GoalPose(JointAngles5(angles)))
    }

    #[test]
    fn test_full_cycle() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        let rpt = seq.handle(&example_obs(), &mut sink).unwrap();
        assert!(rpt.new_cycle);
        assert!(rpt.command_emitted);
        assert_eq!(rpt.current_state, ActionState::PickAbove);

        for _ in 0..8 {
            let rpt = seq.handle(&advance(), &mut sink).unwrap();
            assert!(!rpt.rejected);
        }

        assert_eq!(
            sink.records,
            vec![
                echo(150.0, 0.0, 220.0, 0.0),
                echo(150.0, 0.0, 130.0, 0.0),
                Record::Dems(MotorDems::GripSeparation(40.0)),
                echo(150.0, 0.0, 250.0, 0.0),
                echo(300.0, 0.0, 220.0, 90.0),
                echo(300.0, 0.0, 130.0, 90.0),
                Record::Dems(MotorDems::GripSeparation(49.0)),
                echo(300.0, 0.0, 250.0, 90.0),
                fixed(INIT_POSE),
                Record::CycleComplete(true),
            ]
        );

        assert_eq!(seq.state().current, ActionState::InitPose);
        assert_eq!(seq.state().previous, ActionState::PlaceLift);
        assert!(seq.state().cycle_complete);
        assert_eq!(sink.num_cycle_complete(), 1);
        assert!(seq.report().cycle_complete);
    }

    #[test]
    fn test_advance_after_cycle_ignored() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        for _ in 0..8 {
            seq.handle(&advance(), &mut sink).unwrap();
        }
        sink.take();

        for _ in 0..3 {
            let rpt = seq.handle(&advance(), &mut sink).unwrap();
            assert!(rpt.rejected);
            assert!(!rpt.command_emitted);
        }

        assert!(sink.records.is_empty());
        assert_eq!(seq.state().current, ActionState::InitPose);

        // The next observation starts a new cycle
        seq.handle(&example_obs(), &mut sink).unwrap();
        assert_eq!(seq.state().current, ActionState::PickAbove);
        assert!(!seq.state().cycle_complete);
        assert_eq!(seq.cycle().unwrap().cycle_number, 2);
    }

    #[test]
    fn test_mid_cycle_observation_resets() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        for _ in 0..4 {
            seq.handle(&advance(), &mut sink).unwrap();
        }
        assert_eq!(seq.state().current, ActionState::PlaceAbove);
        sink.take();

        let rpt = seq
            .handle(&obs([100.0, 100.0, 50.0, 10.0], 20.0, [0.0, 250.0, 50.0, 0.0]), &mut sink)
            .unwrap();

        assert!(rpt.new_cycle);
        assert_eq!(seq.state().current, ActionState::PickAbove);
        assert_eq!(sink.records, vec![echo(100.0, 100.0, 170.0, 10.0)]);
        assert_eq!(seq.cycle().unwrap().grip_width_mm, 20.0);
    }

    #[test]
    fn test_invalid_observation_rejected() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        seq.handle(&advance(), &mut sink).unwrap();
        sink.take();

        let before_state = *seq.state();
        let before_waypoints = seq.cycle().unwrap().waypoints;

        let mut bad = ObjectObservation::from_slice(&[0.0; 9]).unwrap();
        bad.place_z = f64::NAN;

        let rpt = seq.handle(&Trigger::Observation(bad), &mut sink).unwrap();
        assert!(rpt.rejected);

        // Wider than the gripper can open
        let rpt = seq
            .handle(&obs([150.0, 0.0, 100.0, 0.0], 60.0, [300.0, 0.0, 100.0, 90.0]), &mut sink)
            .unwrap();
        assert!(rpt.rejected);

        assert_eq!(*seq.state(), before_state);
        assert_eq!(seq.cycle().unwrap().waypoints, before_waypoints);
        assert_eq!(seq.cycle().unwrap().cycle_number, 1);
        assert_eq!(
            sink.records,
            vec![
                Record::Notice(OperatorNotice::InvalidObservation),
                Record::Notice(OperatorNotice::InvalidObservation),
            ]
        );
    }

    #[test]
    fn test_impact_suspends_until_previous() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        seq.handle(&advance(), &mut sink).unwrap();
        sink.take();

        seq.handle(&Trigger::Ack(MotorAck::Impact), &mut sink).unwrap();
        assert!(seq.state().fault_suspended);
        assert_eq!(sink.take(), vec![Record::Notice(OperatorNotice::Impact)]);

        // Every motion trigger is rejected while suspended
        for t in [
            advance(),
            example_obs(),
            Trigger::Operator(Tc::Start),
            Trigger::Operator(Tc::Parking),
        ]
        .iter()
        {
            let rpt = seq.handle(t, &mut sink).unwrap();
            assert!(rpt.rejected);
            assert!(!rpt.command_emitted);
        }
        assert_eq!(
            sink.take(),
            vec![Record::Notice(OperatorNotice::FaultSuspended); 4]
        );
        assert_eq!(seq.state().current, ActionState::PickGrip);

        // Resume retries the interrupted state
        seq.handle(&Trigger::Operator(Tc::Previous), &mut sink).unwrap();
        assert!(!seq.state().fault_suspended);
        assert_eq!(sink.take(), vec![echo(150.0, 0.0, 130.0, 0.0)]);

        seq.handle(&advance(), &mut sink).unwrap();
        assert_eq!(seq.state().current, ActionState::GripOn);
        assert_eq!(sink.take(), vec![Record::Dems(MotorDems::GripSeparation(40.0))]);
    }

    #[test]
    fn test_ik_failure_halts() {
        let (mut seq, fail) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        seq.handle(&advance(), &mut sink).unwrap();
        fail.set(true);

        // Grip needs no kinematics
        seq.handle(&advance(), &mut sink).unwrap();
        sink.take();

        let rpt = seq.handle(&advance(), &mut sink).unwrap();
        assert!(rpt.rejected);
        assert!(rpt.halted);
        assert!(!rpt.command_emitted);
        assert_eq!(seq.state().current, ActionState::PickLift);
        assert_eq!(sink.take(), vec![Record::Notice(OperatorNotice::IkUnreachable)]);

        // No advancing past the failed state
        let rpt = seq.handle(&advance(), &mut sink).unwrap();
        assert!(rpt.rejected);
        assert_eq!(sink.take(), vec![Record::Notice(OperatorNotice::Halted)]);
        assert_eq!(seq.state().current, ActionState::PickLift);

        fail.set(false);
        seq.handle(&Trigger::Operator(Tc::Previous), &mut sink).unwrap();
        assert!(!seq.state().halted);
        assert_eq!(sink.take(), vec![echo(150.0, 0.0, 250.0, 0.0)]);

        seq.handle(&advance(), &mut sink).unwrap();
        assert_eq!(seq.state().current, ActionState::PlaceAbove);
    }

    #[test]
    fn test_pause_until_task_done() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        sink.take();

        seq.handle(&Trigger::Operator(Tc::Pause), &mut sink).unwrap();
        assert!(seq.state().paused);
        assert_eq!(sink.take(), vec![Record::Dems(MotorDems::Task(MotorTask::Stop))]);

        let rpt = seq.handle(&advance(), &mut sink).unwrap();
        assert!(rpt.rejected);
        assert_eq!(sink.take(), vec![Record::Notice(OperatorNotice::Paused)]);

        seq.handle(&Trigger::Ack(MotorAck::TaskDone), &mut sink).unwrap();
        assert!(!seq.state().paused);
        assert!(seq.state().task_done);

        seq.handle(&advance(), &mut sink).unwrap();
        assert_eq!(seq.state().current, ActionState::PickGrip);
        assert_eq!(sink.take(), vec![echo(150.0, 0.0, 130.0, 0.0)]);
    }

    #[test]
    fn test_operator_moves() {
        // Fixed poses never need the kinematics
        let mut seq = PnpSeq::new(params(), kin::test::adapter(Box::new(MockSolver { angles: None })));
        let mut sink = RecordingSink::default();

        seq.handle(&Trigger::Operator(Tc::Start), &mut sink).unwrap();
        assert_eq!(
            sink.take(),
            vec![Record::Dems(MotorDems::Start(true)), fixed(INIT_POSE)]
        );
        assert_eq!(seq.state().current, ActionState::InitPose);

        seq.handle(&Trigger::Operator(Tc::Parking), &mut sink).unwrap();
        assert_eq!(sink.take(), vec![fixed(PARKING)]);

        // Parking steps on to the ready pose
        seq.handle(&advance(), &mut sink).unwrap();
        assert_eq!(sink.take(), vec![fixed(INIT_POSE)]);

        seq.handle(&Trigger::Operator(Tc::MoveToInit), &mut sink).unwrap();
        assert_eq!(
            sink.take(),
            vec![Record::Dems(MotorDems::Task(MotorTask::Start)), fixed(INIT_POSE)]
        );

        seq.handle(&Trigger::Operator(Tc::Previous), &mut sink).unwrap();
        assert_eq!(sink.take(), vec![fixed(INIT_POSE)]);
    }

    #[test]
    fn test_direct_move_keeps_cycle() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        let waypoints = seq.cycle().unwrap().waypoints;

        seq.on_direct_move(DirectMove::Parking, &mut sink).unwrap();

        assert_eq!(seq.state().current, ActionState::Parking);
        assert_eq!(seq.state().previous, ActionState::PickAbove);
        assert_eq!(seq.cycle().unwrap().waypoints, waypoints);
    }

    #[test]
    fn test_failed_send_halts_until_previous() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        sink.take();

        sink.failing = vec![Output::Dems];
        assert!(matches!(
            seq.handle(&advance(), &mut sink),
            Err(PnpSeqError::SinkError(_))
        ));
        assert_eq!(seq.state().current, ActionState::PickGrip);
        assert!(seq.state().halted);
        assert!(sink.take().is_empty());

        // The unsent state is not skipped
        sink.failing.clear();
        let rpt = seq.handle(&advance(), &mut sink).unwrap();
        assert!(rpt.rejected);
        assert_eq!(sink.take(), vec![Record::Notice(OperatorNotice::Halted)]);
        assert_eq!(seq.state().current, ActionState::PickGrip);

        seq.handle(&Trigger::Operator(Tc::Previous), &mut sink).unwrap();
        assert!(!seq.state().halted);
        assert_eq!(seq.state().current, ActionState::PickGrip);
        assert_eq!(sink.take(), vec![echo(150.0, 0.0, 130.0, 0.0)]);

        seq.handle(&advance(), &mut sink).unwrap();
        assert_eq!(seq.state().current, ActionState::GripOn);
    }

    #[test]
    fn test_failed_cycle_complete_resent() {
        let (mut seq, _) = seq();
        let mut sink = RecordingSink::default();

        seq.handle(&example_obs(), &mut sink).unwrap();
        for _ in 0..7 {
            seq.handle(&advance(), &mut sink).unwrap();
        }
        assert_eq!(seq.state().current, ActionState::PlaceLift);
        sink.take();

        sink.failing = vec![Output::CycleComplete];
        assert!(matches!(
            seq.handle(&advance(), &mut sink),
            Err(PnpSeqError::SinkError(_))
        ));
        assert_eq!(sink.take(), vec![fixed(INIT_POSE)]);
        assert_eq!(seq.state().current, ActionState::InitPose);
        assert!(seq.state().halted);
        assert!(seq.state().cycle_complete_pending);
        assert!(!seq.state().cycle_complete);

        sink.failing.clear();
        let rpt = seq.handle(&Trigger::Operator(Tc::Previous), &mut sink).unwrap();
        assert!(rpt.cycle_complete);
        assert_eq!(sink.take(), vec![fixed(INIT_POSE), Record::CycleComplete(true)]);
        assert!(seq.state().cycle_complete);
        assert!(!seq.state().cycle_complete_pending);
        assert!(!seq.state().halted);

        // Idle until the next observation
        let rpt = seq.handle(&advance(), &mut sink).unwrap();
        assert!(rpt.rejected);
        assert!(sink.take().is_empty());
    }
}
