//! corridor-planner core
//!
//! Turns a planned route geometry plus a projected arrival time into a
//! bounded, spaced, time-windowed sequence of prioritized junctions.

pub mod geo;
pub mod planner;
pub mod route;
