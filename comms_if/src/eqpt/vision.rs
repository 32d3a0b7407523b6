//! # Vision Equipment Interface
//!
//! Object observations produced by the perception pipeline. One observation describes a single
//! object to pick up and the place it should be put down.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of numeric fields in an observation.
pub const NUM_OBSERVATION_FIELDS: usize = 9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An observation of an object to be picked and placed.
///
/// Positions are in millimeters in the arm base frame (unless an observation frame transform is
/// configured in the sequencer), headings are in degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ObjectObservation {
    pub pick_x: f64,
    pub pick_y: f64,
    pub pick_z: f64,
    pub pick_heading: f64,

    /// Separation of the gripper fingers required to hold the object.
    ///
    /// Units: millimeters
    pub grip_width: f64,

    pub place_x: f64,
    pub place_y: f64,
    pub place_z: f64,
    pub place_heading: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons an observation may be rejected.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("Expected {} observation fields, found {0}", NUM_OBSERVATION_FIELDS)]
    WrongFieldCount(usize),

    #[error("Observation field {0} is not a finite number")]
    NonFinite(&'static str),

    #[error("Grip width must not be negative, found {0}")]
    NegativeGripWidth(f64),

    #[error("Observation is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ObjectObservation {
    /// Build an observation from the flat message layout
    /// `[pick_x, pick_y, pick_z, pick_heading, grip_width, place_x, place_y, place_z,
    /// place_heading]`.
    pub fn from_slice(data: &[f64]) -> Result<Self, ObservationError> {
        if data.len() != NUM_OBSERVATION_FIELDS {
            return Err(ObservationError::WrongFieldCount(data.len()));
        }

        let obs = Self {
            pick_x: data[0],
            pick_y: data[1],
            pick_z: data[2],
            pick_heading: data[3],
            grip_width: data[4],
            place_x: data[5],
            place_y: data[6],
            place_z: data[7],
            place_heading: data[8],
        };

        obs.validate()?;

        Ok(obs)
    }

    /// Parse an observation from JSON, either as a flat array of nine numbers or as an object
    /// with named fields.
    pub fn from_json(json_str: &str) -> Result<Self, ObservationError> {
        if let Ok(data) = serde_json::from_str::<Vec<f64>>(json_str) {
            return Self::from_slice(&data);
        }

        let obs: Self = serde_json::from_str(json_str).map_err(ObservationError::InvalidJson)?;
        obs.validate()?;

        Ok(obs)
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ObservationError> {
        for &(name, value) in self.fields().iter() {
            if !value.is_finite() {
                return Err(ObservationError::NonFinite(name));
            }
        }

        if self.grip_width < 0.0 {
            return Err(ObservationError::NegativeGripWidth(self.grip_width));
        }

        Ok(())
    }

    /// All fields of the observation by name, in message order.
    pub fn fields(&self) -> [(&'static str, f64); NUM_OBSERVATION_FIELDS] {
        [
            ("pick_x", self.pick_x),
            ("pick_y", self.pick_y),
            ("pick_z", self.pick_z),
            ("pick_heading", self.pick_heading),
            ("grip_width", self.grip_width),
            ("place_x", self.place_x),
            ("place_y", self.place_y),
            ("place_z", self.place_z),
            ("place_heading", self.place_heading),
        ]
    }
}

impl fmt::Display for ObjectObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object pos ({:.1} {:.1} {:.1}) ori ({:.1} deg), object size ({:.1}), \
            goal pos ({:.1} {:.1} {:.1}) ori ({:.1} deg)",
            self.pick_x,
            self.pick_y,
            self.pick_z,
            self.pick_heading,
            self.grip_width,
            self.place_x,
            self.place_y,
            self.place_z,
            self.place_heading
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_array_json() {
        let obs = ObjectObservation::from_json("[150, 0, 100, 0, 40, 300, 0, 100, 90]").unwrap();

        assert_eq!(obs.pick_x, 150.0);
        assert_eq!(obs.grip_width, 40.0);
        assert_eq!(obs.place_heading, 90.0);
    }

    #[test]
    fn test_from_object_json() {
        let obs = ObjectObservation::from_json(
            r#"{"pick_x": 150, "pick_y": 0, "pick_z": 100, "pick_heading": 0,
                "grip_width": 40,
                "place_x": 300, "place_y": 0, "place_z": 100, "place_heading": 90}"#,
        )
        .unwrap();

        assert_eq!(obs.place_x, 300.0);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            ObjectObservation::from_json("[150, 0, 100, 0, 40, 300, 0, 100]"),
            Err(ObservationError::WrongFieldCount(8))
        ));
        assert!(matches!(
            ObjectObservation::from_json(r#"{"pick_x": 150}"#),
            Err(ObservationError::InvalidJson(_))
        ));
        assert!(matches!(
            ObjectObservation::from_slice(&[150., 0., 100., 0., -1., 300., 0., 100., 90.]),
            Err(ObservationError::NegativeGripWidth(_))
        ));
        assert!(matches!(
            ObjectObservation::from_slice(&[150., f64::NAN, 100., 0., 40., 300., 0., 100., 90.]),
            Err(ObservationError::NonFinite("pick_y"))
        ));
    }
}
