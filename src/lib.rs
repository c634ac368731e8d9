//! symbol-detect library crate.
//!
//! Samples a live camera feed at a fixed interval, posts each frame to a
//! remote detector and presents the label and spoken audio it returns.

pub mod camera;
pub mod cli;
pub mod config;
pub mod inference;
pub mod pipeline;
pub mod presentation;
pub mod sampler;
