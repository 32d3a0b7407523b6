//! # Motion command sinks
//!
//! The sequencer emits everything it produces through [`MotionCommandSink`], so it can be driven
//! against the network ([`crate::pnp_server::PnpServer`]), the log ([`LogSink`]) or a recorder
//! in tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::mech::MotorDems,
    net::MonitoredSocketError,
    tc::OperatorNotice,
};
use log::info;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Destination of the sequencer's outputs.
pub trait MotionCommandSink {
    /// Send demands (joint pose, grip separation, motor task or start flag) to motor control.
    fn send_dems(&mut self, dems: &MotorDems) -> Result<(), SinkError>;

    /// Signal that the pick-and-place cycle has finished.
    fn send_cycle_complete(&mut self, complete: bool) -> Result<(), SinkError>;

    /// Notify the operator of a fault or rejected trigger.
    fn send_notice(&mut self, notice: OperatorNotice) -> Result<(), SinkError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sink which only logs its outputs, used when running from a script.
#[derive(Debug, Default)]
pub struct LogSink {
    /// Number of outputs sent so far.
    pub num_sent: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to publish on {0}: {1}")]
    PublishError(&'static str, MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCommandSink for LogSink {
    fn send_dems(&mut self, dems: &MotorDems) -> Result<(), SinkError> {
        self.num_sent += 1;

        match dems {
            MotorDems::GoalPose(a) => info!("[{}] goal axis {}", dems.topic(), a),
            MotorDems::GripSeparation(s) => info!("[{}] {:.1} mm", dems.topic(), s),
            MotorDems::Task(t) => info!("[{}] {}", dems.topic(), t.token()),
            MotorDems::Start(s) => info!("[{}] {}", dems.topic(), s),
        }

        Ok(())
    }

    fn send_cycle_complete(&mut self, complete: bool) -> Result<(), SinkError> {
        self.num_sent += 1;
        info!("[pnp_done] {}", complete);

        Ok(())
    }

    fn send_notice(&mut self, notice: OperatorNotice) -> Result<(), SinkError> {
        self.num_sent += 1;
        info!("[input_task] {}", notice.token());

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// A single recorded output.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Record {
        Dems(MotorDems),
        CycleComplete(bool),
        Notice(OperatorNotice),
    }

    /// Sink which records every output for later inspection.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub records: Vec<Record>,

        /// Outputs of these kinds fail and are not recorded.
        pub failing: Vec<Output>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Output {
        Dems,
        CycleComplete,
        Notice,
    }

    impl RecordingSink {
        /// Remove and return everything recorded so far.
        pub fn take(&mut self) -> Vec<Record> {
            std::mem::take(&mut self.records)
        }

        pub fn num_cycle_complete(&self) -> usize {
            self.records
                .iter()
                .filter(|r| **r == Record::CycleComplete(true))
                .count()
        }

        fn record(&mut self, output: Output, record: Record) -> Result<(), SinkError> {
            if self.failing.contains(&output) {
                return Err(SinkError::PublishError(
                    "test",
                    MonitoredSocketError::CouldNotConnect(None),
                ));
            }

            self.records.push(record);
            Ok(())
        }
    }

    impl MotionCommandSink for RecordingSink {
        fn send_dems(&mut self, dems: &MotorDems) -> Result<(), SinkError> {
            self.record(Output::Dems, Record::Dems(dems.clone()))
        }

        fn send_cycle_complete(&mut self, complete: bool) -> Result<(), SinkError> {
            self.record(Output::CycleComplete, Record::CycleComplete(complete))
        }

        fn send_notice(&mut self, notice: OperatorNotice) -> Result<(), SinkError> {
            self.record(Output::Notice, Record::Notice(notice))
        }
    }

    #[test]
    fn test_log_sink_counts() {
        let mut sink = LogSink::default();

        sink.send_dems(&MotorDems::GripSeparation(49.0)).unwrap();
        sink.send_cycle_complete(true).unwrap();
        sink.send_notice(OperatorNotice::Impact).unwrap();

        assert_eq!(sink.num_sent, 3);
    }
}
