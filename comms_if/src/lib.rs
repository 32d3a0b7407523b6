//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the pick-and-place software: the messages
//! exchanged with perception, the operator and motor control, and the network layer they travel
//! over.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator commands and notifications
pub mod tc;

/// Command and response definitions for equipment (motor control, vision)
pub mod eqpt;

/// Network module
pub mod net;

/// Serialisable inputs to the sequencer
pub mod trigger;
