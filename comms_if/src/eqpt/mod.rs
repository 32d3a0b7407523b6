//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the equipment around
//! the sequencer: the motor controller and the vision pipeline.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod mech;
pub mod vision;
