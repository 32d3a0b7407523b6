//! # Trigger script interpreter module
//!
//! This module provides an interpreter for trigger scripts, allowing a pick-and-place run to be
//! replayed without any network peers. A script is a list of lines of the form
//!
//! ```text
//! <time_s>: <trigger json>;
//! ```
//!
//! for example `1.5: {"Ack": "StateDone"};`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;
use comms_if::trigger::Trigger;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trigger which is scripted to occur at a specific time.
#[derive(Debug)]
struct ScriptedTrigger {
    /// The time the trigger is supposed to fire at
    exec_time_s: f64,

    trigger: Trigger,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_triggers` to
/// acquire the triggers that are due.
#[derive(Debug)]
pub struct ScriptInterpreter {
    triggers: VecDeque<ScriptedTrigger>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script contains an invalid timestamp: {0}. Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid trigger at {0} s: {1}")]
    InvalidTrigger(f64, serde_json::Error),
}

#[derive(Debug, PartialEq)]
pub enum PendingTriggers {
    None,
    Some(Vec<Trigger>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path.display().to_string()));
        }

        let script = fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)?;

        Self::from_str(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        let mut triggers = VecDeque::new();

        for cap in re.captures_iter(script) {
            let exec_time_s: f64 = cap[1]
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let trigger = Trigger::from_json(&cap[3])
                .map_err(|e| ScriptError::InvalidTrigger(exec_time_s, e))?;

            triggers.push_back(ScriptedTrigger {
                exec_time_s,
                trigger,
            });
        }

        if triggers.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(Self { triggers })
    }

    /// Return the triggers which are due at the current session time.
    pub fn get_pending_triggers(&mut self) -> PendingTriggers {
        self.get_pending_triggers_at(get_elapsed_seconds())
    }

    /// Return the triggers which are due at the given time.
    pub fn get_pending_triggers_at(&mut self, current_time_s: f64) -> PendingTriggers {
        if self.triggers.is_empty() {
            return PendingTriggers::EndOfScript;
        }

        let mut due = vec![];

        while let Some(st) = self.triggers.front() {
            if st.exec_time_s > current_time_s {
                break;
            }

            if let Some(st) = self.triggers.pop_front() {
                due.push(st.trigger);
            }
        }

        if due.is_empty() {
            PendingTriggers::None
        } else {
            PendingTriggers::Some(due)
        }
    }

    /// Get the number of triggers remaining in the script
    pub fn get_num_triggers(&self) -> usize {
        self.triggers.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.triggers.back() {
            Some(t) => t.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{eqpt::mech::MotorAck, tc::Tc};

    const SCRIPT: &str = r#"
        0.0: {"Operator": "Start"};
        1.0: {"Ack": "StateDone"};
        1.0: {"Ack": "TaskDone"};
        2.5: {"Ack": "Impact"};
    "#;

    #[test]
    fn test_pending_triggers() {
        let mut si = ScriptInterpreter::from_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_triggers(), 4);
        assert_eq!(si.get_duration(), 2.5);

        assert_eq!(
            si.get_pending_triggers_at(0.5),
            PendingTriggers::Some(vec![Trigger::Operator(Tc::Start)])
        );
        assert_eq!(si.get_pending_triggers_at(0.7), PendingTriggers::None);
        assert_eq!(
            si.get_pending_triggers_at(1.2),
            PendingTriggers::Some(vec![
                Trigger::Ack(MotorAck::StateDone),
                Trigger::Ack(MotorAck::TaskDone)
            ])
        );
        assert_eq!(
            si.get_pending_triggers_at(3.0),
            PendingTriggers::Some(vec![Trigger::Ack(MotorAck::Impact)])
        );
        assert_eq!(si.get_pending_triggers_at(4.0), PendingTriggers::EndOfScript);
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::from_str("nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str(r#"1.0: {"Ack": "Dance"};"#),
            Err(ScriptError::InvalidTrigger(_, _))
        ));
    }
}
