//! # Pick-and-place library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the pick-and-place executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - trigger queue and monitoring counters for the executable
pub mod data_store;

/// Kinematics - converts Cartesian waypoints into joint angle demands
pub mod kin;

/// Mechanisms client - recieves acknowledgements from motor control
pub mod mech_client;

/// Operator client - recieves commands from the operator control surface
pub mod operator_client;

/// Waypoint planner - derives the approach, grip and lift poses of a cycle
pub mod planner;

/// Pick-and-place sequencer - the state machine driving each cycle
pub mod pnp_seq;

/// Pick-and-place server - publishes the sequencer's outputs
pub mod pnp_server;

/// Motion command sinks
pub mod sink;

/// Vision client - recieves object observations from perception
pub mod vision_client;
