//! # Data Store

use std::collections::VecDeque;

use comms_if::trigger::Trigger;
use log::{info, warn};

use crate::pnp_seq::StatusReport;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The network links of the executable.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Link {
    Vision,
    Operator,
    MotorAck,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    /// Number of loops already executed
    pub num_loops: u128,

    /// Triggers received but not yet handled, oldest first.
    pub trigger_queue: VecDeque<Trigger>,

    // Monitoring counters
    pub num_triggers_handled: u64,
    pub num_triggers_rejected: u64,
    pub num_cycles_complete: u64,

    /// Number of consecutive triggers whose outputs could not be published
    pub num_consec_sink_errors: u64,

    /// Links which are currently not connected
    disconnected: Vec<Link>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Queue a trigger to be handled after everything received before it.
    pub fn push_trigger(&mut self, trigger: Trigger) {
        self.trigger_queue.push_back(trigger);
    }

    /// Take the oldest pending trigger.
    pub fn pop_trigger(&mut self) -> Option<Trigger> {
        self.trigger_queue.pop_front()
    }

    /// Update the counters from the report of a handled trigger.
    pub fn record_report(&mut self, report: &StatusReport) {
        self.num_triggers_handled += 1;
        self.num_consec_sink_errors = 0;

        if report.rejected {
            self.num_triggers_rejected += 1;
        }
        if report.cycle_complete {
            self.num_cycles_complete += 1;
        }
    }

    /// Record the connection status of a link, logging any change.
    pub fn update_link(&mut self, link: Link, connected: bool) {
        let known_down = self.disconnected.contains(&link);

        match (connected, known_down) {
            (true, true) => {
                self.disconnected.retain(|l| *l != link);
                info!("{:?} link connected", link);
            }
            (false, false) => {
                self.disconnected.push(link);
                warn!("{:?} link not connected", link);
            }
            _ => (),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{eqpt::mech::MotorAck, tc::Tc};

    #[test]
    fn test_trigger_queue_order() {
        let mut ds = DataStore::default();

        ds.push_trigger(Trigger::Operator(Tc::Start));
        ds.push_trigger(Trigger::Ack(MotorAck::StateDone));

        assert_eq!(ds.pop_trigger(), Some(Trigger::Operator(Tc::Start)));
        assert_eq!(ds.pop_trigger(), Some(Trigger::Ack(MotorAck::StateDone)));
        assert_eq!(ds.pop_trigger(), None);
    }

    #[test]
    fn test_counters() {
        let mut ds = DataStore::default();
        ds.num_consec_sink_errors = 3;

        ds.record_report(&StatusReport {
            rejected: true,
            ..Default::default()
        });
        ds.record_report(&StatusReport {
            cycle_complete: true,
            ..Default::default()
        });

        assert_eq!(ds.num_triggers_handled, 2);
        assert_eq!(ds.num_triggers_rejected, 1);
        assert_eq!(ds.num_cycles_complete, 1);
        assert_eq!(ds.num_consec_sink_errors, 0);
    }

    #[test]
    fn test_link_status() {
        let mut ds = DataStore::default();
        assert!(ds.disconnected.is_empty());

        // Repeated reports of the same status are only recorded once
        ds.update_link(Link::Vision, false);
        ds.update_link(Link::Vision, false);
        ds.update_link(Link::Operator, true);
        assert_eq!(ds.disconnected, vec![Link::Vision]);

        ds.update_link(Link::Vision, true);
        assert!(ds.disconnected.is_empty());
    }
}
