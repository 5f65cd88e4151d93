//! Two-pool options AMM and the epoch-driven simulation around it.
//!
//! The engine lives in [`amm`]; [`paper::simulator::run`] walks a generated
//! price path with a set of [`agents`] trading against it.

pub mod agents;
pub mod amm;
pub mod config;
pub mod errors;
pub mod feeds;
pub mod models;
pub mod paper;
pub mod risk;
pub mod state;
